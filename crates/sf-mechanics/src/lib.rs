//! Savage-Worlds-style character mechanics for Statforge.
//!
//! A [`Ruleset`] compiles a content catalog into a rule graph once; the
//! repair engine ([`Ruleset::make_valid`]) and the randomized generator
//! ([`Ruleset::randomize_one_attribute`]) then use the graph as an oracle
//! while they mutate a caller-owned [`sf_core::Selection`].

/// Allocation encoding and budget facts.
pub mod allocation;
/// Selection categories.
pub mod category;
/// Repair and generator configuration.
pub mod config;
/// Error types.
pub mod error;
/// Randomized generator.
pub mod generate;
/// Repair engine.
pub mod repair;
/// Ruleset construction.
pub mod rules;
/// Content validation.
pub mod validate;

pub use category::Category;
pub use config::{GeneratorConfig, RepairConfig};
pub use error::{MechError, MechResult};
pub use rules::{Ruleset, SAMPLE_CATALOG};
pub use validate::{ContentIssue, validate_catalog};
