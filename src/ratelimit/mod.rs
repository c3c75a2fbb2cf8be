//! Rate-limit tracking with an injectable clock

pub mod clock;
pub mod tracker;

pub use clock::{Clock, ManualClock, SystemClock};
pub use tracker::{QuotaPool, RateLimitState, RateLimitTracker};
