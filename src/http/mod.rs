//! HTTP transport for the voting API

pub mod error;
pub mod handlers;
pub mod server;

pub use error::ApiError;
pub use handlers::{Actor, ApiState, VoteRequest, ACTOR_HEADER};
pub use server::{router, ApiServer};
