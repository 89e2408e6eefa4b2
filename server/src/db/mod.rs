//! In-memory persistence for remote collections.

mod records;

pub use records::*;
