//! In-memory store backend
//!
//! Default [`ClaimStore`] implementation backed by concurrent maps.
//! Used by the server binary and by the engine's tests; a relational
//! backend can implement the same seam without the engine changing.
//!
//! [`ClaimStore`]: claimcall_core::ClaimStore

pub mod memory;

pub use memory::InMemoryStore;
