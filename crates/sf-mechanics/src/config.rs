//! Configuration for the repair engine and the generator.

/// Configuration for [`Ruleset::make_valid`](crate::Ruleset::make_valid).
#[derive(Debug, Clone, PartialEq)]
pub struct RepairConfig {
    /// Upper bound on repair passes.
    pub max_passes: u32,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self { max_passes: 8 }
    }
}

impl RepairConfig {
    /// Set the pass cap (at least 1).
    pub fn with_max_passes(mut self, passes: u32) -> Self {
        self.max_passes = passes.max(1);
        self
    }
}

/// Configuration for the randomized generator.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    /// Probability of drawing from the concept's preferred items.
    pub concept_affinity: f64,
    /// Upper bound on picks tried per category call, accepted or not.
    pub max_attempts: u32,
    /// Share of a spellcaster's remaining edge budget diverted to
    /// power-point edges.
    pub capacity_fraction: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            concept_affinity: 0.65,
            max_attempts: 256,
            capacity_fraction: 1.0 / 3.0,
        }
    }
}

impl GeneratorConfig {
    /// Set the concept affinity (clamped to 0.6-0.7).
    pub fn with_concept_affinity(mut self, affinity: f64) -> Self {
        self.concept_affinity = affinity.clamp(0.6, 0.7);
        self
    }

    /// Set the attempt cap (at least 1).
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Set the capacity fraction (clamped to 0-1).
    pub fn with_capacity_fraction(mut self, fraction: f64) -> Self {
        self.capacity_fraction = fraction.clamp(0.0, 1.0);
        self
    }
}
