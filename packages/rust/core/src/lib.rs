//! Core orchestration and domain logic for Incidesk.
//!
//! This crate ties together the document-source crawler, the storage
//! reconciler, text cleanup, and the language-model assistant into
//! end-to-end workflows (`sync`, `search`, `ask`).

pub mod assistant;
pub mod search;
pub mod sync;
