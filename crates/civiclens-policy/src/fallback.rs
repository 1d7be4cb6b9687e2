//! Seedable source of random, well-typed fallback answers

use civiclens_core::{FusionDecision, IssueType, Severity, SeverityDecision};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Random answers for when no real signal is available
///
/// Shared across requests; a fixed seed makes the sequence of fallback
/// answers reproducible.
#[derive(Debug)]
pub struct FallbackGenerator {
    rng: Mutex<StdRng>,
}

impl FallbackGenerator {
    /// Deterministic generator
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Generator seeded from OS entropy
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Seeded when `seed` is set, entropy otherwise
    pub fn new(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }

    /// Uniform confidence in `[0, 1)`
    pub fn confidence(&self) -> f32 {
        self.rng.lock().gen::<f32>()
    }

    /// Uniform issue type over the full label set, with a random confidence
    pub fn issue(&self) -> FusionDecision {
        let mut rng = self.rng.lock();
        let issue_type = IssueType::ALL[rng.gen_range(0..IssueType::ALL.len())];
        FusionDecision::new(issue_type, rng.gen::<f32>())
    }

    /// Uniform severity band, with a random confidence
    pub fn severity(&self) -> SeverityDecision {
        let mut rng = self.rng.lock();
        SeverityDecision {
            severity: Severity::ALL[rng.gen_range(0..Severity::ALL.len())],
            confidence: rng.gen::<f32>(),
        }
    }
}

impl Default for FallbackGenerator {
    fn default() -> Self {
        Self::from_entropy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let a = FallbackGenerator::seeded(7);
        let b = FallbackGenerator::seeded(7);

        for _ in 0..10 {
            assert_eq!(a.issue(), b.issue());
        }
    }

    #[test]
    fn test_issue_covers_label_set() {
        let fallback = FallbackGenerator::seeded(42);
        let mut seen = std::collections::HashSet::new();

        for _ in 0..500 {
            let decision = fallback.issue();
            assert!((0.0..1.0).contains(&decision.confidence));
            seen.insert(decision.issue_type);
        }

        assert_eq!(seen.len(), IssueType::ALL.len());
    }

    #[test]
    fn test_severity_in_range() {
        let fallback = FallbackGenerator::seeded(3);
        for _ in 0..100 {
            let decision = fallback.severity();
            assert!((0.0..1.0).contains(&decision.confidence));
        }
    }
}
