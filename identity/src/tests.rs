use std::sync::Arc;

use increator_kv::{KVStore, MemoryStore, RedbStore};
use proptest::prelude::*;

use crate::cluster::ClusterBuilder;
use crate::creators::CreatorStore;
use crate::error::IdentityError;
use crate::matcher::Matcher;
use crate::types::{IngestOutcome, MatchReason, MatchType, Platform, Profile, ProfileId};

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

const WORDS: &[&str] = &[
    "tech", "gadgets", "ai", "reviews", "daily", "news", "gaming", "cooking", "travel", "music",
];

fn arb_text() -> impl Strategy<Value = Option<String>> {
    prop::option::of(
        prop::collection::vec(prop::sample::select(WORDS), 0..6).prop_map(|w| w.join(" ")),
    )
}

fn arb_profile(id: &'static str) -> impl Strategy<Value = Profile> {
    (
        prop::option::of(prop::sample::select(&["@a", "@b", ""][..])),
        any::<bool>(),
        prop::option::of(prop::sample::select(&["Tech Guru", "Chef", " Tech Guru "][..])),
        arb_text(),
    )
        .prop_map(move |(handle, verified, name, bio)| Profile {
            id: ProfileId::from(id),
            platform: Platform::Youtube,
            handle: handle.map(str::to_string),
            verified,
            display_name: name.map(str::to_string),
            bio,
            follower_count: None,
        })
}

fn pid(s: &str) -> ProfileId {
    ProfileId::from(s)
}

fn memory_builder(ids: &[&str]) -> ClusterBuilder {
    let b = ClusterBuilder::open(Arc::new(MemoryStore::new())).unwrap();
    for id in ids {
        b.register(&pid(id)).unwrap();
    }
    b
}

// ---------------------------------------------------------------------------
// Matcher properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn resolve_is_symmetric(a in arb_profile("a"), b in arb_profile("b")) {
        let m = Matcher::new();
        let ab = m.resolve(&a, &b);
        let ba = m.resolve(&b, &a);
        prop_assert_eq!(ab, ba);
    }

    #[test]
    fn verified_handle_dominates(a in arb_profile("a"), b in arb_profile("b")) {
        let a = Profile { handle: Some("@same".into()), verified: true, ..a };
        let b = Profile { handle: Some("@same".into()), verified: true, ..b };
        let d = Matcher::new().resolve(&a, &b);
        prop_assert!(d.matched);
        prop_assert_eq!(d.match_type, MatchType::Deterministic);
        prop_assert_eq!(d.score, 1.0);
    }

    #[test]
    fn more_overlap_never_lowers_score(
        shared in prop::collection::vec(prop::sample::select(WORDS), 0..5),
        extra in prop::sample::select(WORDS),
        only_a in prop::collection::vec(prop::sample::select(&["alpha", "beta", "gamma"][..]), 1..3),
        same_name in any::<bool>(),
    ) {
        let name_b = if same_name { "N" } else { "M" };
        let mut words_a: Vec<&str> = shared.clone();
        words_a.extend(only_a.iter().copied());
        words_a.push(extra);
        let bio_a = words_a.join(" ");
        let before_b = shared.join(" ");
        let after_b = format!("{before_b} {extra}");

        let m = Matcher::new();
        let a = Profile::new("a", Platform::Youtube).with_name("N").with_bio(&bio_a);
        let before = m.probabilistic_score(&a, &Profile::new("b", Platform::Youtube).with_name(name_b).with_bio(&before_b));
        let after = m.probabilistic_score(&a, &Profile::new("b", Platform::Youtube).with_name(name_b).with_bio(&after_b));
        prop_assert!(after >= before, "before {before}, after {after}");
    }

    #[test]
    fn repeated_ingest_is_idempotent(times in 1usize..5) {
        let m = Matcher::new();
        let a = Profile::new("a", Platform::Youtube).with_handle("@x").verified();
        let b = Profile::new("b", Platform::Twitch).with_handle("@x").verified();
        let decision = m.resolve(&a, &b);

        let once = memory_builder(&["a", "b", "c"]);
        once.ingest(&decision, &a.id, &b.id).unwrap();

        let many = memory_builder(&["a", "b", "c"]);
        for _ in 0..times {
            many.ingest(&decision, &a.id, &b.id).unwrap();
        }
        prop_assert_eq!(once.clusters(), many.clusters());
        prop_assert_eq!(many.edges().all().unwrap().len(), 1);
    }

    #[test]
    fn merges_are_never_undone(
        ops in prop::collection::vec((0usize..6, 0usize..6, 0u8..3), 1..30),
    ) {
        let ids = ["p0", "p1", "p2", "p3", "p4", "p5"];
        let b = memory_builder(&ids);
        let mut linked: Vec<(usize, usize)> = Vec::new();

        for (x, y, kind) in ops {
            if x == y {
                continue;
            }
            let decision = match kind {
                0 => crate::types::MatchDecision::deterministic(),
                1 => crate::types::MatchDecision {
                    matched: false,
                    match_type: MatchType::Suggestion,
                    score: 0.6,
                    reason: MatchReason::NeedsReview,
                },
                _ => crate::types::MatchDecision::no_match(),
            };
            b.ingest(&decision, &pid(ids[x]), &pid(ids[y])).unwrap();
            if kind == 0 {
                linked.push((x, y));
            }
            for &(p, q) in &linked {
                prop_assert!(b.same_identity(&pid(ids[p]), &pid(ids[q])).unwrap());
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn scenario_verified_handles() {
    let a = Profile::new("yt:1", Platform::Youtube).with_handle("@x").verified();
    let b = Profile::new("ig:1", Platform::Instagram).with_handle("@x").verified();
    let d = Matcher::new().resolve(&a, &b);
    assert!(d.matched);
    assert_eq!(d.match_type, MatchType::Deterministic);
    assert_eq!(d.score, 1.0);
}

#[test]
fn scenario_reordered_bio_with_same_name() {
    let a = Profile::new("yt:1", Platform::Youtube)
        .with_name("Tech Guru")
        .with_bio("reviews gadgets and ai");
    let b = Profile::new("tt:1", Platform::Tiktok)
        .with_name("Tech Guru")
        .with_bio("gadgets ai and reviews");
    let d = Matcher::new().resolve(&a, &b);
    assert!(d.matched);
    assert_eq!(d.match_type, MatchType::Probabilistic);
    assert_eq!(d.score, 1.0);
}

#[test]
fn scenario_disjoint_profiles() {
    let a = Profile::new("yt:1", Platform::Youtube)
        .with_name("Chef")
        .with_bio("cooking recipes");
    let b = Profile::new("tw:1", Platform::Twitch)
        .with_name("Speedrunner")
        .with_bio("retro games");
    let d = Matcher::new().resolve(&a, &b);
    assert!(!d.matched);
    assert_eq!(d.score, 0.0);
}

// ---------------------------------------------------------------------------
// End to end
// ---------------------------------------------------------------------------

#[test]
fn resolve_all_then_ingest_builds_clusters() {
    let kv: Arc<dyn KVStore> = Arc::new(MemoryStore::new());
    let creators = CreatorStore::new(kv.clone());
    let builder = ClusterBuilder::open(kv).unwrap();

    let profiles = vec![
        Profile::new("yt:1", Platform::Youtube)
            .with_handle("@guru")
            .verified()
            .with_followers(10_000),
        Profile::new("ig:1", Platform::Instagram)
            .with_handle("@guru")
            .verified()
            .with_followers(5_000),
        Profile::new("tt:1", Platform::Tiktok)
            .with_name("Guru")
            .with_bio("tech reviews daily"),
        Profile::new("tw:1", Platform::Twitch)
            .with_name("Other")
            .with_bio("tech reviews daily"),
        Profile::new("x:1", Platform::Twitter).with_bio("cooking"),
    ];
    for p in &profiles {
        creators.insert(p).unwrap();
        builder.register(&p.id).unwrap();
    }

    let mut queued = 0;
    for pair in Matcher::new().resolve_all(&profiles) {
        if builder.ingest(&pair.decision, &pair.a, &pair.b).unwrap() == IngestOutcome::Queued {
            queued += 1;
        }
    }

    assert!(builder.same_identity(&pid("yt:1"), &pid("ig:1")).unwrap());
    assert!(!builder.same_identity(&pid("tt:1"), &pid("tw:1")).unwrap());
    assert_eq!(queued, 1);
    assert_eq!(builder.clusters().len(), 4);

    let consolidated = builder.consolidate(&pid("yt:1"), &creators).unwrap();
    assert_eq!(consolidated.total_followers, 15_000);
    assert_eq!(
        consolidated.platforms.into_iter().collect::<Vec<_>>(),
        vec![Platform::Youtube, Platform::Instagram]
    );
}

#[test]
fn unknown_reference_is_not_found_and_changes_nothing() {
    let b = memory_builder(&["a", "b"]);
    let before = b.clusters();
    for (x, y) in [("a", "ghost"), ("ghost", "b")] {
        let err = b
            .ingest(&crate::types::MatchDecision::deterministic(), &pid(x), &pid(y))
            .unwrap_err();
        assert!(matches!(err, IdentityError::NotFound(_)));
    }
    assert_eq!(b.clusters(), before);
    assert!(b.edges().all().unwrap().is_empty());
}

#[test]
fn clusters_survive_reopen_on_redb() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("identity.redb");

    let expected = {
        let store: Arc<dyn KVStore> = Arc::new(RedbStore::open(&path).unwrap());
        let b = ClusterBuilder::open(store).unwrap();
        for id in ["a", "b", "c", "d"] {
            b.register(&pid(id)).unwrap();
        }
        let d = crate::types::MatchDecision::deterministic();
        b.ingest(&d, &pid("a"), &pid("c")).unwrap();
        b.ingest(&d, &pid("d"), &pid("c")).unwrap();
        b.clusters()
    };

    let store: Arc<dyn KVStore> = Arc::new(RedbStore::open(&path).unwrap());
    let reopened = ClusterBuilder::open(store).unwrap();
    assert_eq!(reopened.clusters(), expected);
    assert_eq!(reopened.find(&pid("d")).unwrap(), pid("a"));
    assert_eq!(reopened.edges().all().unwrap().len(), 2);
}
