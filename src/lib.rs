//! repo-bundle: condense GitHub repositories into ranked analysis bundles
//!
//! Acquisition prefers a single zip archive and falls back to the per-file
//! contents API. Retrieved files are triaged, ranked and summarized into a
//! [`render::RepositoryBundle`].

pub mod auth;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod fetch;
pub mod infer;
pub mod pipeline;
pub mod rank;
pub mod ratelimit;
pub mod render;
pub mod triage;
pub mod utils;

pub use error::{AnalyzerError, TransportError, Warning};
pub use pipeline::Analyzer;
