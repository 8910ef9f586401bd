//! Resilience helpers for remote polling.
//!
//! A failed poll is retried after an exponential, jittered delay so that many clients
//! losing the service at once do not come back in lockstep.

pub mod backoff;

pub use backoff::RetryBackoff;
