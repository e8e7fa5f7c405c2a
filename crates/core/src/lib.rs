//! Core business logic for peersup.

pub mod services;

pub use services::*;

/// Generate a unique ID using ULID.
#[must_use]
pub fn generate_id() -> String {
    peersup_common::IdGenerator::new().generate()
}
