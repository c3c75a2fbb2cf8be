//! Repository acquisition from GitHub (zip archive or per-file contents API)

pub mod api;
pub mod archive;
pub mod github;
pub mod strategy;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use github::{Endpoints, RepoInfo, RepoRef};
pub use strategy::{
    next_after_archive, Acquisition, AcquisitionEngine, AcquisitionPolicy, Transition,
};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
