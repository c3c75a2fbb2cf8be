//! Static extension and filename tables mapping files to languages.

use crate::utils::file_name;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;

/// What part a file plays in a repository, which drives its base priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LanguageRole {
    /// Program source.
    Primary,
    /// Build definitions such as Dockerfiles and Makefiles.
    Build,
    /// Configuration and structured data.
    Config,
    /// Prose documentation.
    Documentation,
}

use LanguageRole::{Build, Config, Documentation, Primary};

const EXTENSIONS: &[(&str, &str, LanguageRole)] = &[
    ("py", "Python", Primary),
    ("pyi", "Python", Primary),
    ("pyx", "Cython", Primary),
    ("js", "JavaScript", Primary),
    ("jsx", "JavaScript", Primary),
    ("mjs", "JavaScript", Primary),
    ("cjs", "JavaScript", Primary),
    ("ts", "TypeScript", Primary),
    ("tsx", "TypeScript", Primary),
    ("mts", "TypeScript", Primary),
    ("java", "Java", Primary),
    ("kt", "Kotlin", Primary),
    ("kts", "Kotlin", Primary),
    ("scala", "Scala", Primary),
    ("groovy", "Groovy", Primary),
    ("go", "Go", Primary),
    ("rs", "Rust", Primary),
    ("c", "C", Primary),
    ("h", "C", Primary),
    ("cc", "C++", Primary),
    ("cpp", "C++", Primary),
    ("cxx", "C++", Primary),
    ("hpp", "C++", Primary),
    ("hh", "C++", Primary),
    ("hxx", "C++", Primary),
    ("cs", "C#", Primary),
    ("fs", "F#", Primary),
    ("vb", "Visual Basic", Primary),
    ("rb", "Ruby", Primary),
    ("php", "PHP", Primary),
    ("swift", "Swift", Primary),
    ("m", "Objective-C", Primary),
    ("mm", "Objective-C++", Primary),
    ("dart", "Dart", Primary),
    ("lua", "Lua", Primary),
    ("r", "R", Primary),
    ("jl", "Julia", Primary),
    ("ex", "Elixir", Primary),
    ("exs", "Elixir", Primary),
    ("erl", "Erlang", Primary),
    ("hs", "Haskell", Primary),
    ("ml", "OCaml", Primary),
    ("clj", "Clojure", Primary),
    ("zig", "Zig", Primary),
    ("nim", "Nim", Primary),
    ("pl", "Perl", Primary),
    ("pm", "Perl", Primary),
    ("sh", "Shell", Primary),
    ("bash", "Shell", Primary),
    ("zsh", "Shell", Primary),
    ("fish", "Shell", Primary),
    ("ps1", "PowerShell", Primary),
    ("bat", "Batchfile", Primary),
    ("sql", "SQL", Primary),
    ("vue", "Vue", Primary),
    ("svelte", "Svelte", Primary),
    ("html", "HTML", Primary),
    ("htm", "HTML", Primary),
    ("css", "CSS", Primary),
    ("scss", "SCSS", Primary),
    ("sass", "Sass", Primary),
    ("less", "Less", Primary),
    ("sol", "Solidity", Primary),
    ("proto", "Protocol Buffers", Primary),
    ("graphql", "GraphQL", Primary),
    ("tf", "HCL", Primary),
    ("ipynb", "Jupyter Notebook", Primary),
    ("cmake", "CMake", Build),
    ("mk", "Makefile", Build),
    ("gradle", "Gradle", Build),
    ("bazel", "Starlark", Build),
    ("bzl", "Starlark", Build),
    ("json", "JSON", Config),
    ("jsonc", "JSON", Config),
    ("yaml", "YAML", Config),
    ("yml", "YAML", Config),
    ("toml", "TOML", Config),
    ("xml", "XML", Config),
    ("csproj", "XML", Config),
    ("ini", "INI", Config),
    ("cfg", "INI", Config),
    ("conf", "INI", Config),
    ("properties", "Java Properties", Config),
    ("env", "Dotenv", Config),
    ("csv", "CSV", Config),
    ("md", "Markdown", Documentation),
    ("mdx", "Markdown", Documentation),
    ("rst", "reStructuredText", Documentation),
    ("adoc", "AsciiDoc", Documentation),
    ("txt", "Text", Documentation),
    ("tex", "TeX", Documentation),
];

const FILENAMES: &[(&str, &str, LanguageRole)] = &[
    ("dockerfile", "Dockerfile", Build),
    ("containerfile", "Dockerfile", Build),
    ("makefile", "Makefile", Build),
    ("gnumakefile", "Makefile", Build),
    ("cmakelists.txt", "CMake", Build),
    ("justfile", "Just", Build),
    ("build", "Starlark", Build),
    ("workspace", "Starlark", Build),
    ("jenkinsfile", "Groovy", Build),
    ("vagrantfile", "Ruby", Build),
    ("rakefile", "Ruby", Build),
    ("gemfile", "Ruby", Config),
    ("podfile", "Ruby", Config),
    ("pipfile", "TOML", Config),
    ("procfile", "Procfile", Config),
    ("requirements.txt", "Pip Requirements", Config),
    ("license", "Text", Documentation),
    ("copying", "Text", Documentation),
];

static BY_EXTENSION: Lazy<HashMap<&'static str, (&'static str, LanguageRole)>> =
    Lazy::new(|| EXTENSIONS.iter().map(|(ext, name, role)| (*ext, (*name, *role))).collect());

static BY_FILENAME: Lazy<HashMap<&'static str, (&'static str, LanguageRole)>> =
    Lazy::new(|| FILENAMES.iter().map(|(file, name, role)| (*file, (*name, *role))).collect());

/// Language name and role for a path, from its filename first, then its extension.
pub fn detect(path: &str) -> Option<(&'static str, LanguageRole)> {
    let name = file_name(path).to_ascii_lowercase();
    if let Some(hit) = BY_FILENAME.get(name.as_str()) {
        return Some(*hit);
    }
    if name.starts_with("dockerfile.") || name.ends_with(".dockerfile") {
        return Some(("Dockerfile", Build));
    }
    if name.starts_with("requirements") && name.ends_with(".txt") {
        return Some(("Pip Requirements", Config));
    }
    let (_, ext) = name.rsplit_once('.')?;
    BY_EXTENSION.get(ext).copied()
}

pub fn language_of(path: &str) -> Option<&'static str> {
    detect(path).map(|(name, _)| name)
}

/// Whether a language counts toward the repository's language mix.
pub fn counts_toward_mix(role: LanguageRole) -> bool {
    matches!(role, Primary | Build)
}
