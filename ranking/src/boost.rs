//! Rerank signals added on top of the retrieval score.

use crate::types::Candidate;

/// Scoring strategy for the rerank stage. The returned amount is added to
/// the candidate's retrieval score.
pub trait Booster: Send + Sync {
    fn boost(&self, candidate: &Candidate) -> f32;
}

/// Flat bonus when any keyword occurs in the candidate's text.
///
/// Matching is a case-sensitive substring test over the string metadata
/// values named in `fields`, which defaults to the bio alone.
#[derive(Debug, Clone)]
pub struct KeywordBoost {
    pub keywords: Vec<String>,
    pub amount: f32,
    pub fields: Vec<String>,
}

pub const DEFAULT_KEYWORDS: [&str; 2] = ["AI", "Tech"];
pub const DEFAULT_BOOST: f32 = 0.1;
pub const DEFAULT_FIELDS: [&str; 1] = ["bio"];

impl Default for KeywordBoost {
    fn default() -> Self {
        Self::new(DEFAULT_KEYWORDS, DEFAULT_BOOST)
    }
}

impl KeywordBoost {
    pub fn new<I, S>(keywords: I, amount: f32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: keywords.into_iter().map(Into::into).collect(),
            amount,
            fields: DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect(),
        }
    }

    /// Replace the metadata fields searched for keywords.
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    fn hit(&self, text: &str) -> bool {
        self.keywords
            .iter()
            .any(|k| !k.is_empty() && text.contains(k.as_str()))
    }
}

impl Booster for KeywordBoost {
    fn boost(&self, candidate: &Candidate) -> f32 {
        let hit = self
            .fields
            .iter()
            .filter_map(|f| candidate.metadata.get(f.as_str()))
            .filter_map(|v| v.as_str())
            .any(|s| self.hit(s));
        if hit {
            self.amount
        } else {
            0.0
        }
    }
}

/// Leaves retrieval order untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBoost;

impl Booster for NoBoost {
    fn boost(&self, _: &Candidate) -> f32 {
        0.0
    }
}
