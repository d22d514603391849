//! Catalog name handling for Catalog-Harvester
//!
//! This module provides display-name normalization, deterministic artifact
//! identifier derivation, and the exclusion registry used to keep obsolete
//! catalog entries out of storage.

mod exclusion;
mod identifier;
mod normalize;

// Re-export main types and functions
pub use exclusion::{load_exclusion_source, save_exclusion_source, ExclusionRegistry, ExclusionSource};
pub use identifier::{derive_identifier, recover_display_name, MAX_STEM_CHARS};
pub use normalize::normalize_name;
