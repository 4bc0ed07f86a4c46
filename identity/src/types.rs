use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::IdentityError;
use crate::keys::SEP;

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// Social platform a profile was scraped from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Youtube,
    Instagram,
    Tiktok,
    Twitter,
    Twitch,
    Other,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Youtube => "youtube",
            Platform::Instagram => "instagram",
            Platform::Tiktok => "tiktok",
            Platform::Twitter => "twitter",
            Platform::Twitch => "twitch",
            Platform::Other => "other",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "youtube" => Ok(Platform::Youtube),
            "instagram" => Ok(Platform::Instagram),
            "tiktok" => Ok(Platform::Tiktok),
            "twitter" | "x" => Ok(Platform::Twitter),
            "twitch" => Ok(Platform::Twitch),
            "other" => Ok(Platform::Other),
            _ => Err(IdentityError::Validation(format!("unknown platform {s:?}"))),
        }
    }
}

/// Platform-scoped profile identifier, e.g. `"youtube:UC123"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(String);

impl ProfileId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reject ids that cannot be used as key segments.
    pub fn validate(&self) -> Result<(), IdentityError> {
        if self.0.trim().is_empty() {
            return Err(IdentityError::Validation("profile id is empty".into()));
        }
        if self.0.contains(SEP) {
            return Err(IdentityError::Validation(format!(
                "profile id {:?} contains the key separator",
                self.0
            )));
        }
        Ok(())
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProfileId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ProfileId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// One platform-specific account snapshot.
///
/// Snapshots are immutable: re-ingesting a profile replaces the stored
/// snapshot as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,

    pub platform: Platform,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,

    #[serde(default)]
    pub verified: bool,

    #[serde(default, alias = "name", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follower_count: Option<u64>,
}

impl Profile {
    pub fn new(id: impl Into<ProfileId>, platform: Platform) -> Self {
        Self {
            id: id.into(),
            platform,
            handle: None,
            verified: false,
            display_name: None,
            bio: None,
            follower_count: None,
        }
    }

    pub fn with_handle(mut self, handle: &str) -> Self {
        self.handle = Some(handle.to_string());
        self
    }

    pub fn verified(mut self) -> Self {
        self.verified = true;
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.display_name = Some(name.to_string());
        self
    }

    pub fn with_bio(mut self, bio: &str) -> Self {
        self.bio = Some(bio.to_string());
        self
    }

    pub fn with_followers(mut self, n: u64) -> Self {
        self.follower_count = Some(n);
        self
    }

    /// Non-empty handle, if any.
    pub fn handle(&self) -> Option<&str> {
        self.handle.as_deref().filter(|h| !h.trim().is_empty())
    }

    /// Check the fields the store relies on.
    ///
    /// A verified profile must carry a handle because verified handles back
    /// the uniqueness index and the deterministic match rule.
    pub fn validate(&self) -> Result<(), IdentityError> {
        self.id.validate()?;
        if self.verified && self.handle().is_none() {
            return Err(IdentityError::Validation(format!(
                "profile {} is verified but has no handle",
                self.id
            )));
        }
        if let Some(h) = self.handle() {
            if h.contains(SEP) {
                return Err(IdentityError::Validation(format!(
                    "handle {h:?} contains the key separator"
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MatchDecision
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Deterministic,
    Probabilistic,
    Suggestion,
    #[serde(rename = "none")]
    NoMatch,
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MatchType::Deterministic => "deterministic",
            MatchType::Probabilistic => "probabilistic",
            MatchType::Suggestion => "suggestion",
            MatchType::NoMatch => "none",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchReason {
    VerifiedHandleMatch,
    HighConfidenceSignals,
    NeedsReview,
    InsufficientSignals,
    ManualConfirmation,
}

/// Outcome of comparing two profiles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchDecision {
    /// Merge now.
    #[serde(rename = "match")]
    pub matched: bool,

    #[serde(rename = "type")]
    pub match_type: MatchType,

    /// Reported score, rounded to two decimals.
    pub score: f64,

    pub reason: MatchReason,
}

impl MatchDecision {
    pub fn deterministic() -> Self {
        Self {
            matched: true,
            match_type: MatchType::Deterministic,
            score: 1.0,
            reason: MatchReason::VerifiedHandleMatch,
        }
    }

    pub fn no_match() -> Self {
        Self {
            matched: false,
            match_type: MatchType::NoMatch,
            score: 0.0,
            reason: MatchReason::InsufficientSignals,
        }
    }
}

// ---------------------------------------------------------------------------
// Persisted records
// ---------------------------------------------------------------------------

/// A persisted match between two profiles. Stored once per unordered pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityEdge {
    pub source_id: ProfileId,
    pub target_id: ProfileId,
    pub confidence_score: f64,
    pub match_type: MatchType,
    pub reason: MatchReason,
    pub created_at: DateTime<Utc>,
}

impl IdentityEdge {
    pub fn new(a: &ProfileId, b: &ProfileId, decision: &MatchDecision) -> Self {
        Self {
            source_id: a.clone(),
            target_id: b.clone(),
            confidence_score: decision.score,
            match_type: decision.match_type,
            reason: decision.reason,
            created_at: Utc::now(),
        }
    }

    /// True if this edge connects `a` and `b` in either direction.
    pub fn connects(&self, a: &ProfileId, b: &ProfileId) -> bool {
        (&self.source_id == a && &self.target_id == b)
            || (&self.source_id == b && &self.target_id == a)
    }
}

/// A borderline pair waiting for manual confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub a: ProfileId,
    pub b: ProfileId,
    pub score: f64,
    pub queued_at: DateTime<Utc>,
}

/// Result of [`crate::ClusterBuilder::ingest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Two clusters were merged; carries the surviving canonical identity.
    Merged { identity: ProfileId },
    /// Both profiles were already in the same cluster.
    AlreadyLinked { identity: ProfileId },
    /// The pair was queued for review.
    Queued,
    /// Nothing was recorded.
    Ignored,
}

/// Cluster-level view used by downstream consolidation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsolidatedIdentity {
    pub identity_id: ProfileId,
    pub members: BTreeSet<ProfileId>,
    pub platforms: BTreeSet<Platform>,
    pub total_followers: u64,
}
