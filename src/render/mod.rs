//! Output rendering (bundle assembly, JSON and text sinks)

pub mod bundle;
pub mod report;
pub mod summary;

pub use bundle::{assemble, BundleOptions, BundleStatus, RepositoryBundle};
pub use report::write_bundle;
pub use summary::render_summary;
