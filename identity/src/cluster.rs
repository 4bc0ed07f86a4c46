use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use increator_kv::{KVStore, WriteBatch};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::creators::CreatorStore;
use crate::edges::EdgeStore;
use crate::error::{IdentityError, Result};
use crate::keys::{uf_key, uf_prefix};
use crate::review::ReviewQueue;
use crate::types::{
    ConsolidatedIdentity, IdentityEdge, IngestOutcome, MatchDecision, MatchReason, MatchType,
    ProfileId, Suggestion,
};

/// Checkpointed form of one union-find node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct UfNode {
    parent: ProfileId,
    size: u64,
}

/// Disjoint-set forest over registered profiles.
///
/// Parent pointers are atomics so that [`UnionFind::root`] can compress paths
/// through a shared reference. Compression only ever repoints a node at one of
/// its own ancestors, so concurrent finds agree on the root. Unions need
/// `&mut self`.
struct UnionFind {
    index: HashMap<ProfileId, usize>,
    ids: Vec<ProfileId>,
    parent: Vec<AtomicUsize>,
    size: Vec<u64>,
}

impl UnionFind {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            ids: Vec::new(),
            parent: Vec::new(),
            size: Vec::new(),
        }
    }

    /// Fresh singletons for `ids`, in the given order.
    fn singletons(ids: &[ProfileId]) -> Self {
        let mut uf = Self::new();
        for id in ids {
            uf.push(id.clone());
        }
        uf
    }

    fn len(&self) -> usize {
        self.ids.len()
    }

    fn slot(&self, id: &ProfileId) -> Option<usize> {
        self.index.get(id).copied()
    }

    fn push(&mut self, id: ProfileId) -> usize {
        let i = self.ids.len();
        self.index.insert(id.clone(), i);
        self.ids.push(id);
        self.parent.push(AtomicUsize::new(i));
        self.size.push(1);
        i
    }

    fn root(&self, mut i: usize) -> usize {
        loop {
            let p = self.parent[i].load(Ordering::Acquire);
            if p == i {
                return i;
            }
            let gp = self.parent[p].load(Ordering::Acquire);
            if gp != p {
                // Path halving.
                let _ = self.parent[i].compare_exchange(p, gp, Ordering::AcqRel, Ordering::Relaxed);
            }
            i = gp;
        }
    }

    /// Pick `(winner, loser)` roots for merging the sets of `a` and `b`, or
    /// `None` if they already share a root. The larger set wins; equal sizes
    /// go to the smaller profile id so the outcome depends only on history.
    fn plan_union(&self, a: usize, b: usize) -> Option<(usize, usize)> {
        let (ra, rb) = (self.root(a), self.root(b));
        if ra == rb {
            return None;
        }
        let a_wins = match self.size[ra].cmp(&self.size[rb]) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Less => false,
            std::cmp::Ordering::Equal => self.ids[ra] < self.ids[rb],
        };
        Some(if a_wins { (ra, rb) } else { (rb, ra) })
    }

    fn apply_union(&mut self, winner: usize, loser: usize) {
        *self.parent[loser].get_mut() = winner;
        self.size[winner] += self.size[loser];
    }

    fn union(&mut self, a: usize, b: usize) -> bool {
        match self.plan_union(a, b) {
            Some((w, l)) => {
                self.apply_union(w, l);
                true
            }
            None => false,
        }
    }

    /// Node as it would be checkpointed, with `parent` as stored (not the
    /// compressed root).
    fn node(&self, i: usize) -> UfNode {
        let p = self.parent[i].load(Ordering::Acquire);
        UfNode {
            parent: self.ids[p].clone(),
            size: self.size[i],
        }
    }

    fn members_by_root(&self) -> BTreeMap<ProfileId, BTreeSet<ProfileId>> {
        let mut out: BTreeMap<ProfileId, BTreeSet<ProfileId>> = BTreeMap::new();
        for i in 0..self.len() {
            let r = self.root(i);
            out.entry(self.ids[r].clone())
                .or_default()
                .insert(self.ids[i].clone());
        }
        out
    }
}

/// Maintains canonical identity clusters from a stream of match decisions.
///
/// State lives in memory behind a single lock and is checkpointed to the
/// injected store before every mutation takes effect: a failed write leaves
/// both the store and the in-memory clusters unchanged.
///
/// Merges are monotonic. [`ClusterBuilder::ingest`] and
/// [`ClusterBuilder::confirm_match`] can only join clusters; the explicit
/// [`ClusterBuilder::retract`] is the only way to split one.
pub struct ClusterBuilder {
    store: Arc<dyn KVStore>,
    edges: EdgeStore,
    review: ReviewQueue,
    state: RwLock<UnionFind>,
}

impl ClusterBuilder {
    /// Load the checkpointed clusters from `store`.
    pub fn open(store: Arc<dyn KVStore>) -> Result<Self> {
        let state = load(store.as_ref())?;
        info!(profiles = state.len(), "identity: cluster state loaded");
        Ok(Self {
            edges: EdgeStore::new(store.clone()),
            review: ReviewQueue::new(store.clone()),
            store,
            state: RwLock::new(state),
        })
    }

    pub fn edges(&self) -> &EdgeStore {
        &self.edges
    }

    /// Number of registered profiles.
    pub fn len(&self) -> usize {
        self.state.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: &ProfileId) -> bool {
        self.state.read().slot(id).is_some()
    }

    /// Make a profile known to the clustering as a singleton. Returns false
    /// if it was already registered.
    pub fn register(&self, id: &ProfileId) -> Result<bool> {
        id.validate()?;
        let mut state = self.state.write();
        if state.slot(id).is_some() {
            return Ok(false);
        }
        let node = UfNode {
            parent: id.clone(),
            size: 1,
        };
        let key = uf_key(id);
        self.store
            .set(&key, &encode(&node)?)
            .map_err(|e| IdentityError::storage("register", key, e))?;
        state.push(id.clone());
        Ok(true)
    }

    /// Apply one pairwise decision.
    ///
    /// A `match` decision persists an edge, merges the two clusters and
    /// drops any queued suggestion for the pair. A suggestion is queued for
    /// review and never merges; a pair a reviewer already dismissed is not
    /// queued again. Anything else is ignored. Both profiles must be registered; otherwise this fails with
    /// [`IdentityError::NotFound`] and changes nothing.
    pub fn ingest(
        &self,
        decision: &MatchDecision,
        a: &ProfileId,
        b: &ProfileId,
    ) -> Result<IngestOutcome> {
        if a == b {
            return Err(IdentityError::Validation(format!("cannot match {a} with itself")));
        }
        if decision.matched
            && !matches!(
                decision.match_type,
                MatchType::Deterministic | MatchType::Probabilistic
            )
        {
            return Err(IdentityError::Validation(format!(
                "decision marked as match has type {}",
                decision.match_type
            )));
        }

        let mut state = self.state.write();
        let (ia, ib) = (require_slot(&state, a)?, require_slot(&state, b)?);

        if decision.matched {
            let mut batch = WriteBatch::new();
            self.review.stage_take(a, b, &mut batch)?;
            let edge = IdentityEdge::new(a, b, decision);
            return self.link(&mut state, ia, ib, &edge, batch);
        }

        if decision.match_type == MatchType::Suggestion {
            if state.root(ia) == state.root(ib) {
                let identity = state.ids[state.root(ia)].clone();
                debug!(%a, %b, "identity: suggestion for already linked pair");
                return Ok(IngestOutcome::AlreadyLinked { identity });
            }
            if self.review.is_dismissed(a, b)? {
                debug!(%a, %b, "identity: suggestion previously dismissed");
                return Ok(IngestOutcome::Ignored);
            }
            self.review.enqueue(a, b, decision.score)?;
            debug!(%a, %b, score = decision.score, "identity: suggestion queued");
            return Ok(IngestOutcome::Queued);
        }

        Ok(IngestOutcome::Ignored)
    }

    /// Manually confirm that `a` and `b` are the same creator.
    ///
    /// The edge carries the queued suggestion's score, or 1.0 if the pair
    /// was never queued. The pair leaves the review queue.
    pub fn confirm_match(&self, a: &ProfileId, b: &ProfileId) -> Result<IngestOutcome> {
        if a == b {
            return Err(IdentityError::Validation(format!("cannot match {a} with itself")));
        }
        let mut state = self.state.write();
        let (ia, ib) = (require_slot(&state, a)?, require_slot(&state, b)?);

        let mut batch = WriteBatch::new();
        let queued = self.review.stage_take(a, b, &mut batch)?;
        let decision = MatchDecision {
            matched: true,
            match_type: MatchType::Suggestion,
            score: queued.map(|s| s.score).unwrap_or(1.0),
            reason: MatchReason::ManualConfirmation,
        };
        let edge = IdentityEdge::new(a, b, &decision);
        self.link(&mut state, ia, ib, &edge, batch)
    }

    /// Remove a queued suggestion without merging.
    pub fn dismiss_suggestion(&self, a: &ProfileId, b: &ProfileId) -> Result<bool> {
        self.review.dismiss(a, b)
    }

    pub fn pending_suggestions(&self) -> Result<Vec<Suggestion>> {
        self.review.pending()
    }

    /// Out-of-band correction of a false merge: drop the edge between `a`
    /// and `b` and rebuild the clusters from the remaining edges.
    pub fn retract(&self, a: &ProfileId, b: &ProfileId) -> Result<IdentityEdge> {
        let mut state = self.state.write();

        let mut batch = WriteBatch::new();
        let removed = self
            .edges
            .stage_remove(a, b, &mut batch)?
            .ok_or_else(|| IdentityError::NotFound(format!("edge {a} - {b}")))?;

        let mut rebuilt = UnionFind::singletons(&state.ids);
        for edge in self.edges.all()? {
            if edge.connects(a, b) {
                continue;
            }
            match (rebuilt.slot(&edge.source_id), rebuilt.slot(&edge.target_id)) {
                (Some(x), Some(y)) => {
                    rebuilt.union(x, y);
                }
                _ => warn!(
                    source = %edge.source_id,
                    target = %edge.target_id,
                    "identity: edge references unregistered profile, skipped in rebuild"
                ),
            }
        }

        for i in 0..rebuilt.len() {
            batch.put(uf_key(&rebuilt.ids[i]), encode(&rebuilt.node(i))?);
        }
        self.store
            .write(&batch)
            .map_err(|e| IdentityError::storage("retract", format!("{a} - {b}"), e))?;
        *state = rebuilt;

        info!(%a, %b, "identity: edge retracted, clusters rebuilt");
        Ok(removed)
    }

    /// Canonical identity of a profile.
    pub fn find(&self, id: &ProfileId) -> Result<ProfileId> {
        let state = self.state.read();
        let i = require_slot(&state, id)?;
        Ok(state.ids[state.root(i)].clone())
    }

    /// True if both profiles belong to the same cluster.
    pub fn same_identity(&self, a: &ProfileId, b: &ProfileId) -> Result<bool> {
        let state = self.state.read();
        let (ia, ib) = (require_slot(&state, a)?, require_slot(&state, b)?);
        Ok(state.root(ia) == state.root(ib))
    }

    /// Members of the cluster containing `identity`.
    pub fn cluster_members(&self, identity: &ProfileId) -> Result<BTreeSet<ProfileId>> {
        let state = self.state.read();
        let r = state.root(require_slot(&state, identity)?);
        Ok((0..state.len())
            .filter(|&i| state.root(i) == r)
            .map(|i| state.ids[i].clone())
            .collect())
    }

    /// Every cluster, keyed by canonical identity.
    pub fn clusters(&self) -> BTreeMap<ProfileId, BTreeSet<ProfileId>> {
        self.state.read().members_by_root()
    }

    /// Aggregate the stored profiles of a cluster. Members without a stored
    /// profile contribute nothing beyond their id.
    pub fn consolidate(
        &self,
        identity: &ProfileId,
        creators: &CreatorStore,
    ) -> Result<ConsolidatedIdentity> {
        let identity_id = self.find(identity)?;
        let members = self.cluster_members(&identity_id)?;

        let mut platforms = BTreeSet::new();
        let mut total_followers: u64 = 0;
        for id in &members {
            if let Some(p) = creators.get(id)? {
                platforms.insert(p.platform);
                total_followers = total_followers.saturating_add(p.follower_count.unwrap_or(0));
            }
        }

        Ok(ConsolidatedIdentity {
            identity_id,
            members,
            platforms,
            total_followers,
        })
    }

    /// Persist `edge` (if new) and merge the clusters of `ia` and `ib`,
    /// committing `batch` together with the checkpoint.
    fn link(
        &self,
        state: &mut UnionFind,
        ia: usize,
        ib: usize,
        edge: &IdentityEdge,
        mut batch: WriteBatch,
    ) -> Result<IngestOutcome> {
        let new_edge = self.edges.stage_put(edge, &mut batch)?;
        let plan = state.plan_union(ia, ib);

        if let Some((w, l)) = plan {
            let merged = UfNode {
                parent: state.ids[w].clone(),
                size: state.size[w] + state.size[l],
            };
            let absorbed = UfNode {
                parent: state.ids[w].clone(),
                size: state.size[l],
            };
            batch
                .put(uf_key(&state.ids[w]), encode(&merged)?)
                .put(uf_key(&state.ids[l]), encode(&absorbed)?);
        }

        let target = format!("{} - {}", edge.source_id, edge.target_id);
        self.store
            .write(&batch)
            .map_err(|e| IdentityError::storage("link", target, e))?;

        match plan {
            Some((w, l)) => {
                state.apply_union(w, l);
                let identity = state.ids[w].clone();
                info!(
                    %identity,
                    absorbed = %state.ids[l],
                    size = state.size[w],
                    match_type = %edge.match_type,
                    new_edge,
                    "identity: clusters merged"
                );
                Ok(IngestOutcome::Merged { identity })
            }
            None => {
                let identity = state.ids[state.root(ia)].clone();
                debug!(%identity, new_edge, "identity: pair already linked");
                Ok(IngestOutcome::AlreadyLinked { identity })
            }
        }
    }
}

fn require_slot(state: &UnionFind, id: &ProfileId) -> Result<usize> {
    state
        .slot(id)
        .ok_or_else(|| IdentityError::NotFound(format!("profile {id}")))
}

fn encode(node: &UfNode) -> Result<Vec<u8>> {
    rmp_serde::to_vec_named(node).map_err(|e| IdentityError::Serialization(e.to_string()))
}

/// Rebuild the forest from its checkpoint.
fn load(store: &dyn KVStore) -> Result<UnionFind> {
    let entries = store
        .scan(uf_prefix())
        .map_err(|e| IdentityError::storage("load", uf_prefix(), e))?;

    let mut nodes = Vec::with_capacity(entries.len());
    let mut uf = UnionFind::new();
    for (key, value) in &entries {
        let id = ProfileId::from(&key[uf_prefix().len()..]);
        let node: UfNode = rmp_serde::from_slice(value)
            .map_err(|e| IdentityError::Serialization(e.to_string()))?;
        uf.push(id);
        nodes.push(node);
    }

    for (i, node) in nodes.into_iter().enumerate() {
        let p = uf.slot(&node.parent).ok_or_else(|| {
            IdentityError::Serialization(format!(
                "checkpoint for {} points at unknown parent {}",
                uf.ids[i], node.parent
            ))
        })?;
        *uf.parent[i].get_mut() = p;
        uf.size[i] = node.size;
    }

    // A corrupt checkpoint could contain a cycle, which would hang `root`.
    for start in 0..uf.len() {
        let mut i = start;
        let mut steps = 0;
        loop {
            let p = *uf.parent[i].get_mut();
            if p == i {
                break;
            }
            steps += 1;
            if steps > uf.len() {
                return Err(IdentityError::Serialization(format!(
                    "checkpoint has a parent cycle through {}",
                    uf.ids[start]
                )));
            }
            i = p;
        }
    }

    Ok(uf)
}
