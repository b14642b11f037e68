//! In-memory document-store backend.
//!
//! Backs local runs and every test. Write batches are validated against the
//! current state before anything is applied, so a failing batch leaves the
//! store untouched.

pub mod store;

pub use store::MemoryStore;
