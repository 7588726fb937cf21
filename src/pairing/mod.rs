//! Pair selection for head-to-head voting

pub mod sampler;

pub use sampler::{MatchSampler, SamplerConfig, DEFAULT_MAX_DRAW_ATTEMPTS};
