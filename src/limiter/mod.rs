//! Admission control for voters

pub mod admission;

pub use admission::{
    AdmissionDecision, LimitConfig, RateLimiter, DEFAULT_MAX_VOTES, DEFAULT_WINDOW_HOURS,
};
