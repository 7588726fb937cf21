//! Vote ingestion
//!
//! This module owns the append-only vote log and the serialized rating
//! updates it drives.

pub mod locks;
pub mod recorder;

// Re-export commonly used types
pub use locks::{EntityLocks, LockScope};
pub use recorder::{RecordedVote, VoteLedger, MAX_WRITE_ATTEMPTS};
