//! KV key layout for the identity collections.
//!
//! ```text
//! idn:creator:{profile_id}                      -> msgpack Profile
//! idn:handle:{platform}:{handle}                -> profile_id (verified handles only)
//! idn:edge:{lo}\x1F{hi}                         -> msgpack IdentityEdge
//! idn:edge_by:{id}\x1F{other}                   -> empty (endpoint index, both directions)
//! idn:edge_conf:{score_bp:05}\x1F{lo}\x1F{hi}   -> empty (confidence index)
//! idn:uf:{profile_id}                           -> msgpack UfNode
//! idn:suggest:{lo}\x1F{hi}                      -> msgpack Suggestion
//! idn:dismissed:{lo}\x1F{hi}                    -> empty (reviewer rejected the pair)
//! ```
//!
//! Pair keys order their endpoints so that `(a, b)` and `(b, a)` map to the
//! same key. Profile ids and handles must not contain [`SEP`].

use crate::types::{Platform, ProfileId};

/// Separator between id segments inside a key.
pub const SEP: char = '\x1F';

pub fn creator_key(id: &ProfileId) -> String {
    format!("idn:creator:{id}")
}

pub fn creator_prefix() -> &'static str {
    "idn:creator:"
}

pub fn handle_key(platform: Platform, handle: &str) -> String {
    format!("idn:handle:{platform}:{handle}")
}

/// Order a pair so that the smaller id comes first.
pub fn ordered<'a>(a: &'a ProfileId, b: &'a ProfileId) -> (&'a ProfileId, &'a ProfileId) {
    if a <= b { (a, b) } else { (b, a) }
}

pub fn edge_key(a: &ProfileId, b: &ProfileId) -> String {
    let (lo, hi) = ordered(a, b);
    format!("idn:edge:{lo}{SEP}{hi}")
}

pub fn edge_prefix() -> &'static str {
    "idn:edge:"
}

pub fn edge_by_key(id: &ProfileId, other: &ProfileId) -> String {
    format!("idn:edge_by:{id}{SEP}{other}")
}

pub fn edge_by_prefix(id: &ProfileId) -> String {
    format!("idn:edge_by:{id}{SEP}")
}

/// Confidence in basis points, so that keys sort by score.
pub fn score_bp(score: f64) -> u32 {
    (score.clamp(0.0, 1.0) * 10_000.0).round() as u32
}

pub fn edge_conf_key(score: f64, a: &ProfileId, b: &ProfileId) -> String {
    let (lo, hi) = ordered(a, b);
    format!("idn:edge_conf:{:05}{SEP}{lo}{SEP}{hi}", score_bp(score))
}

pub fn edge_conf_prefix() -> &'static str {
    "idn:edge_conf:"
}

/// Parse `idn:edge_conf:{bp}\x1F{lo}\x1F{hi}` into its parts.
pub fn parse_edge_conf_key(key: &str) -> Option<(u32, ProfileId, ProfileId)> {
    let rest = key.strip_prefix(edge_conf_prefix())?;
    let mut parts = rest.splitn(3, SEP);
    let bp = parts.next()?.parse().ok()?;
    let lo = parts.next()?;
    let hi = parts.next()?;
    Some((bp, ProfileId::from(lo), ProfileId::from(hi)))
}

pub fn uf_key(id: &ProfileId) -> String {
    format!("idn:uf:{id}")
}

pub fn uf_prefix() -> &'static str {
    "idn:uf:"
}

pub fn suggest_key(a: &ProfileId, b: &ProfileId) -> String {
    let (lo, hi) = ordered(a, b);
    format!("idn:suggest:{lo}{SEP}{hi}")
}

pub fn suggest_prefix() -> &'static str {
    "idn:suggest:"
}

pub fn dismissed_key(a: &ProfileId, b: &ProfileId) -> String {
    let (lo, hi) = ordered(a, b);
    format!("idn:dismissed:{lo}{SEP}{hi}")
}
