use serde::Serialize;
use tracing::debug;

use crate::similarity::{field_equals, optional_token_similarity};
use crate::types::{MatchDecision, MatchReason, MatchType, Profile, ProfileId};

/// Weights and thresholds for the probabilistic rule.
#[derive(Debug, Clone, Copy)]
pub struct MatcherConfig {
    /// Weight of bio token similarity.
    pub bio_weight: f64,
    /// Bonus for an exact display-name match.
    pub name_weight: f64,
    /// Scores strictly above this merge automatically.
    pub match_threshold: f64,
    /// Scores strictly above this (and not above `match_threshold`) are
    /// queued for review.
    pub suggestion_threshold: f64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            bio_weight: 0.8,
            name_weight: 0.2,
            match_threshold: 0.85,
            suggestion_threshold: 0.5,
        }
    }
}

/// One non-trivial decision produced by [`Matcher::resolve_all`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairDecision {
    pub a: ProfileId,
    pub b: ProfileId,
    pub decision: MatchDecision,
}

/// Pairwise matcher. Pure and safe to share across threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct Matcher {
    config: MatcherConfig,
}

impl Matcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: MatcherConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Decide whether `source` and `target` are the same creator.
    ///
    /// Rules are evaluated in order and the first that applies wins:
    /// 1. Both verified with the same non-empty handle: deterministic match.
    /// 2. Weighted bio similarity plus name bonus, classified against the
    ///    match and suggestion thresholds.
    pub fn resolve(&self, source: &Profile, target: &Profile) -> MatchDecision {
        if let (Some(a), Some(b)) = (source.handle(), target.handle()) {
            if a == b && source.verified && target.verified {
                debug!(source = %source.id, target = %target.id, "identity: verified handle match");
                return MatchDecision::deterministic();
            }
        }

        let raw = self.probabilistic_score(source, target);
        let cfg = &self.config;

        let decision = if raw > cfg.match_threshold {
            MatchDecision {
                matched: true,
                match_type: MatchType::Probabilistic,
                score: round2(raw),
                reason: MatchReason::HighConfidenceSignals,
            }
        } else if raw > cfg.suggestion_threshold {
            MatchDecision {
                matched: false,
                match_type: MatchType::Suggestion,
                score: round2(raw),
                reason: MatchReason::NeedsReview,
            }
        } else {
            MatchDecision::no_match()
        };

        debug!(
            source = %source.id,
            target = %target.id,
            raw,
            match_type = %decision.match_type,
            "identity: probabilistic decision"
        );
        decision
    }

    /// Unrounded probabilistic score in `[0, 1]`.
    pub fn probabilistic_score(&self, source: &Profile, target: &Profile) -> f64 {
        let bio = optional_token_similarity(source.bio.as_deref(), target.bio.as_deref());
        let name = if field_equals(
            source.display_name.as_deref(),
            target.display_name.as_deref(),
        ) {
            self.config.name_weight
        } else {
            0.0
        };
        (bio * self.config.bio_weight + name).clamp(0.0, 1.0)
    }

    /// Compare every unordered pair once. Pairs that resolve to no match are
    /// omitted.
    pub fn resolve_all(&self, profiles: &[Profile]) -> Vec<PairDecision> {
        let mut out = Vec::new();
        for (i, a) in profiles.iter().enumerate() {
            for b in &profiles[i + 1..] {
                if a.id == b.id {
                    continue;
                }
                let decision = self.resolve(a, b);
                if decision.match_type != MatchType::NoMatch {
                    out.push(PairDecision {
                        a: a.id.clone(),
                        b: b.id.clone(),
                        decision,
                    });
                }
            }
        }
        out
    }
}

fn round2(score: f64) -> f64 {
    (score * 100.0).round() / 100.0
}
