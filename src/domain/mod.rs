//! Core domain types shared by acquisition, triage and rendering.

mod acquisition;
mod config;
mod file;

pub use acquisition::{AcquisitionAttempt, AcquisitionMethod, AttemptOutcome};
pub use config::{ArchiveEndpoint, Config, MethodMode, OutputFormat, RankingWeights};
pub use file::{FileRecord, NoiseKind, TriageReason, TriagedFile};

/// Version stamped into every bundle's metadata.
pub const BUNDLE_VERSION: &str = env!("CARGO_PKG_VERSION");
