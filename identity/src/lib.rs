//! Cross-platform creator identity resolution.
//!
//! [`Matcher`] decides whether two platform profiles belong to the same
//! creator. [`ClusterBuilder`] folds those decisions into canonical
//! identities with a persistent union-find over an injected
//! [`increator_kv::KVStore`].

pub mod cluster;
pub mod creators;
pub mod edges;
pub mod error;
pub mod keys;
pub mod matcher;
pub mod review;
pub mod similarity;
pub mod types;

pub use cluster::ClusterBuilder;
pub use creators::CreatorStore;
pub use edges::EdgeStore;
pub use error::{IdentityError, Result};
pub use matcher::{Matcher, MatcherConfig, PairDecision};
pub use review::ReviewQueue;
pub use similarity::{field_equals, token_similarity, tokenize};
pub use types::{
    ConsolidatedIdentity, IdentityEdge, IngestOutcome, MatchDecision, MatchReason, MatchType,
    Platform, Profile, ProfileId, Suggestion,
};

#[cfg(test)]
mod tests;
