//! Dependency manifest recognition and parsing.
//!
//! Each parser is lenient: unparsable input yields an empty list.

use crate::utils::file_name;
use once_cell::sync::Lazy;
use regex::Regex;

static REQUIREMENT_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([A-Za-z0-9][A-Za-z0-9._-]*)").unwrap());

static SETUP_INSTALL_REQUIRES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)install_requires\s*=\s*\[(.*?)\]").unwrap());

static QUOTED: Lazy<Regex> = Lazy::new(|| Regex::new(r#"["']([^"']+)["']"#).unwrap());

static GEM: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?m)^\s*gem\s+["']([^"']+)["']"#).unwrap());

static POM_DEPENDENCY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<dependency>.*?<artifactId>\s*([^<\s]+)\s*</artifactId>.*?</dependency>")
        .unwrap()
});

static GRADLE_DEPENDENCY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?m)^\s*(?:implementation|api|compile|compileOnly|runtimeOnly|",
        r"testImplementation|testCompile|kapt|annotationProcessor)",
        r#"\s*\(?\s*["']([^:"']+):([^:"']+)"#,
    ))
    .unwrap()
});

static CSPROJ_PACKAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<PackageReference\s+Include\s*=\s*"([^"]+)""#).unwrap());

static GO_REQUIRE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([a-zA-Z0-9][^\s]*\.[^\s]+)\s+v\S+").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManifestKind {
    Requirements,
    Pipfile,
    Pyproject,
    SetupPy,
    PackageJson,
    Cargo,
    GoMod,
    Gemfile,
    Composer,
    Pom,
    Gradle,
    Csproj,
    Pubspec,
}

impl ManifestKind {
    pub fn recognize(path: &str) -> Option<Self> {
        let name = file_name(path).to_ascii_lowercase();
        let kind = match name.as_str() {
            "pipfile" => Self::Pipfile,
            "pyproject.toml" => Self::Pyproject,
            "setup.py" => Self::SetupPy,
            "package.json" => Self::PackageJson,
            "cargo.toml" => Self::Cargo,
            "go.mod" => Self::GoMod,
            "gemfile" => Self::Gemfile,
            "composer.json" => Self::Composer,
            "pom.xml" => Self::Pom,
            "build.gradle" | "build.gradle.kts" => Self::Gradle,
            "pubspec.yaml" => Self::Pubspec,
            n if n.starts_with("requirements") && n.ends_with(".txt") => Self::Requirements,
            n if n.ends_with(".csproj") => Self::Csproj,
            _ => return None,
        };
        Some(kind)
    }

    /// Declared package names, unfiltered.
    pub fn parse(self, content: &str) -> Vec<String> {
        match self {
            Self::Requirements => parse_requirements(content),
            Self::Pipfile => parse_toml_tables(content, &[&["packages"], &["dev-packages"]]),
            Self::Pyproject => parse_pyproject(content),
            Self::SetupPy => parse_setup_py(content),
            Self::PackageJson => parse_json_keys(
                content,
                &["dependencies", "devDependencies", "peerDependencies", "optionalDependencies"],
            ),
            Self::Cargo => parse_toml_tables(
                content,
                &[
                    &["dependencies"],
                    &["dev-dependencies"],
                    &["build-dependencies"],
                    &["workspace", "dependencies"],
                ],
            ),
            Self::GoMod => parse_go_mod(content),
            Self::Gemfile => captures(&GEM, content, 1),
            Self::Composer => parse_json_keys(content, &["require", "require-dev"])
                .into_iter()
                .filter(|name| name != "php" && !name.starts_with("ext-"))
                .collect(),
            Self::Pom => captures(&POM_DEPENDENCY, content, 1),
            Self::Gradle => captures(&GRADLE_DEPENDENCY, content, 2),
            Self::Csproj => captures(&CSPROJ_PACKAGE, content, 1),
            Self::Pubspec => parse_pubspec(content),
        }
    }
}

/// Keep plausible package names only.
pub fn is_plausible_name(name: &str) -> bool {
    (2..=100).contains(&name.len()) && !name.starts_with('.') && !name.contains(char::is_whitespace)
}

fn captures(pattern: &Regex, content: &str, group: usize) -> Vec<String> {
    pattern
        .captures_iter(content)
        .filter_map(|caps| caps.get(group).map(|m| m.as_str().trim().to_string()))
        .collect()
}

/// PEP 508 requirement string to bare project name.
fn requirement_name(spec: &str) -> Option<String> {
    REQUIREMENT_NAME.captures(spec).and_then(|caps| caps.get(1)).map(|m| m.as_str().to_string())
}

fn parse_requirements(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|line| !line.is_empty() && !line.starts_with('-'))
        .filter(|line| !line.contains("://"))
        .filter_map(requirement_name)
        .collect()
}

fn parse_toml_tables(content: &str, tables: &[&[&str]]) -> Vec<String> {
    let Ok(root) = toml::from_str::<toml::Value>(content) else {
        return Vec::new();
    };
    let mut names = Vec::new();
    for path in tables {
        let mut node = Some(&root);
        for key in path.iter() {
            node = node.and_then(|n| n.get(key));
        }
        if let Some(table) = node.and_then(|n| n.as_table()) {
            names.extend(table.keys().cloned());
        }
    }
    names
}

fn parse_pyproject(content: &str) -> Vec<String> {
    let Ok(root) = toml::from_str::<toml::Value>(content) else {
        return Vec::new();
    };
    let mut names = Vec::new();

    let project = root.get("project");
    if let Some(deps) = project.and_then(|p| p.get("dependencies")).and_then(|d| d.as_array()) {
        names.extend(deps.iter().filter_map(|d| d.as_str()).filter_map(requirement_name));
    }
    if let Some(groups) =
        project.and_then(|p| p.get("optional-dependencies")).and_then(|d| d.as_table())
    {
        for group in groups.values().filter_map(|g| g.as_array()) {
            names.extend(group.iter().filter_map(|d| d.as_str()).filter_map(requirement_name));
        }
    }

    let poetry = root.get("tool").and_then(|t| t.get("poetry"));
    if let Some(deps) = poetry.and_then(|p| p.get("dependencies")).and_then(|d| d.as_table()) {
        names.extend(deps.keys().cloned());
    }
    if let Some(deps) = poetry.and_then(|p| p.get("dev-dependencies")).and_then(|d| d.as_table()) {
        names.extend(deps.keys().cloned());
    }
    if let Some(groups) = poetry.and_then(|p| p.get("group")).and_then(|g| g.as_table()) {
        for group in groups.values() {
            if let Some(deps) = group.get("dependencies").and_then(|d| d.as_table()) {
                names.extend(deps.keys().cloned());
            }
        }
    }

    names.retain(|name| !name.eq_ignore_ascii_case("python"));
    names
}

fn parse_setup_py(content: &str) -> Vec<String> {
    let Some(block) = SETUP_INSTALL_REQUIRES.captures(content).and_then(|c| c.get(1)) else {
        return Vec::new();
    };
    QUOTED
        .captures_iter(block.as_str())
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| requirement_name(m.as_str()))
        .collect()
}

fn parse_json_keys(content: &str, sections: &[&str]) -> Vec<String> {
    let Ok(root) = serde_json::from_str::<serde_json::Value>(content) else {
        return Vec::new();
    };
    sections
        .iter()
        .filter_map(|section| root.get(*section).and_then(|s| s.as_object()))
        .flat_map(|deps| deps.keys().cloned())
        .collect()
}

fn parse_go_mod(content: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut in_block = false;
    for line in content.lines() {
        let line = line.split("//").next().unwrap_or("").trim();
        if in_block {
            if line.starts_with(')') {
                in_block = false;
            } else if let Some(caps) = GO_REQUIRE_LINE.captures(line) {
                names.push(caps[1].to_string());
            }
        } else if let Some(rest) = line.strip_prefix("require") {
            let rest = rest.trim();
            if rest.starts_with('(') {
                in_block = true;
            } else if let Some(caps) = GO_REQUIRE_LINE.captures(rest) {
                names.push(caps[1].to_string());
            }
        }
    }
    names
}

fn parse_pubspec(content: &str) -> Vec<String> {
    let Ok(root) = serde_yaml::from_str::<serde_yaml::Value>(content) else {
        return Vec::new();
    };
    ["dependencies", "dev_dependencies"]
        .iter()
        .filter_map(|section| root.get(*section).and_then(|s| s.as_mapping()))
        .flat_map(|deps| deps.iter())
        .filter(|(_, spec)| spec.get("sdk").is_none())
        .filter_map(|(name, _)| name.as_str().map(str::to_string))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(path: &str, content: &str) -> Vec<String> {
        let mut names = ManifestKind::recognize(path).expect("manifest").parse(content);
        names.sort();
        names
    }

    #[test]
    fn recognizes_manifests() {
        assert_eq!(
            ManifestKind::recognize("backend/requirements-dev.txt"),
            Some(ManifestKind::Requirements)
        );
        assert_eq!(ManifestKind::recognize("app/App.csproj"), Some(ManifestKind::Csproj));
        assert_eq!(ManifestKind::recognize("build.gradle.kts"), Some(ManifestKind::Gradle));
        assert_eq!(ManifestKind::recognize("src/main.rs"), None);
    }

    #[test]
    fn requirements_txt() {
        let content = "# deps\nrequests>=2.0\nflask==2.3.1  # web\n-r base.txt\n\n\
                       numpy[extra]; python_version>'3.8'\ngit+https://x/y.git\n";
        assert_eq!(parse("requirements.txt", content), vec!["flask", "numpy", "requests"]);
    }

    #[test]
    fn package_json() {
        let content =
            r#"{"name":"web","dependencies":{"react":"^18"},"devDependencies":{"vite":"5"}}"#;
        assert_eq!(parse("package.json", content), vec!["react", "vite"]);
    }

    #[test]
    fn cargo_toml() {
        let content = "[package]\nname = \"x\"\n\n[dependencies]\nserde = \"1\"\n\
                       tokio = { version = \"1\" }\n\n[dev-dependencies]\ntempfile = \"3\"\n";
        assert_eq!(parse("Cargo.toml", content), vec!["serde", "tempfile", "tokio"]);
    }

    #[test]
    fn pyproject_pep621_and_poetry() {
        let content = r#"
[project]
dependencies = ["httpx>=0.27", "rich"]
[project.optional-dependencies]
dev = ["pytest"]
[tool.poetry.dependencies]
python = "^3.11"
click = "^8"
"#;
        assert_eq!(parse("pyproject.toml", content), vec!["click", "httpx", "pytest", "rich"]);
    }

    #[test]
    fn setup_py() {
        let content = "setup(name='x', install_requires=[\n  'requests>=2',\n  \"pyyaml\",\n])";
        assert_eq!(parse("setup.py", content), vec!["pyyaml", "requests"]);
    }

    #[test]
    fn go_mod() {
        let content = "module example.com/app\n\ngo 1.22\n\n\
                       require github.com/spf13/cobra v1.8.0\n\n\
                       require (\n\tgolang.org/x/sync v0.7.0 // indirect\n\
                       \tgithub.com/stretchr/testify v1.9.0\n)\n";
        assert_eq!(
            parse("go.mod", content),
            vec!["github.com/spf13/cobra", "github.com/stretchr/testify", "golang.org/x/sync"]
        );
    }

    #[test]
    fn jvm_and_dotnet_manifests() {
        let pom = "<project><dependencies><dependency>\
                   <groupId>org.slf4j</groupId><artifactId>slf4j-api</artifactId>\
                   </dependency></dependencies></project>";
        assert_eq!(parse("pom.xml", pom), vec!["slf4j-api"]);

        let gradle = concat!(
            "dependencies {\n",
            "    implementation 'com.google.guava:guava:33.0'\n",
            "    testImplementation(\"junit:junit:4.13\")\n",
            "}\n",
        );
        assert_eq!(parse("build.gradle", gradle), vec!["guava", "junit"]);

        let csproj = concat!(
            r#"<ItemGroup><PackageReference Include="Newtonsoft.Json" Version="13.0.1" />"#,
            "</ItemGroup>",
        );
        assert_eq!(parse("Api.csproj", csproj), vec!["Newtonsoft.Json"]);
    }

    #[test]
    fn ruby_php_dart() {
        let gemfile = "source 'https://rubygems.org'\ngem 'rails', '~> 7'\n  gem \"puma\"\n";
        assert_eq!(parse("Gemfile", gemfile), vec!["puma", "rails"]);

        let composer = r#"{"require":{"php":">=8.1","ext-json":"*","laravel/framework":"^10"}}"#;
        assert_eq!(parse("composer.json", composer), vec!["laravel/framework"]);

        let pubspec = concat!(
            "dependencies:\n  flutter:\n    sdk: flutter\n  http: ^1.2.0\n",
            "dev_dependencies:\n  lints: ^3.0.0\n",
        );
        assert_eq!(parse("pubspec.yaml", pubspec), vec!["http", "lints"]);
    }

    #[test]
    fn garbage_yields_nothing() {
        assert!(parse("package.json", "{not json").is_empty());
        assert!(parse("Cargo.toml", "[[[").is_empty());
        assert!(parse("pubspec.yaml", ": : :").is_empty());
    }

    #[test]
    fn plausible_names() {
        assert!(is_plausible_name("serde"));
        assert!(!is_plausible_name("x"));
        assert!(!is_plausible_name(".hidden"));
    }
}
