//! Resilience helpers.
//!
//! The relayer never retries a failed call on its own. The only repeated
//! request is transaction status polling, which is spaced out here.

pub mod backoff;

pub use backoff::{calculate_backoff, PollSchedule};
