use fnv::{FnvHashMap, FnvHashSet};

use crate::meta::Meta;
use crate::sparse_set::SparseSet;

/// The three possible answers to "is this vector known, on this side, already?".
///
/// Collapsing `NotInAuthoritativeRange` and `Unknown` into a single `false` would let
/// [`crate::learn::level::LevelLearn`] mistake "haven't scanned this weight yet" for
/// "scanned it and it wasn't there", which would silently break the compatibility-count
/// filter it relies on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Presence {
    In,
    NotInAuthoritativeRange,
    Unknown,
}

impl Presence {
    pub fn is_in(self) -> bool {
        matches!(self, Presence::In)
    }
}

/// Per-weight index of vectors classified on one side (lower or upper), plus the
/// contiguous weight range over which that index is authoritative.
#[derive(Clone, Debug)]
pub struct LevelCache<M> {
    /// `cache[w]` holds every vector of weight `w` known on this side.
    cache: Vec<FnvHashSet<SparseSet>>,
    meta: FnvHashMap<SparseSet, M>,
    range: Option<(usize, usize)>,
}

impl<M> Default for LevelCache<M> {
    fn default() -> Self {
        LevelCache { cache: Vec::new(), meta: FnvHashMap::default(), range: None }
    }
}

impl<M: Clone> LevelCache<M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn range(&self) -> Option<(usize, usize)> {
        self.range
    }

    pub fn add(&mut self, v: SparseSet, meta: Option<M>) {
        let w = v.weight();
        while self.cache.len() <= w {
            self.cache.push(FnvHashSet::default());
        }
        if let Some(m) = meta {
            self.meta.insert(v.clone(), m);
        }
        self.cache[w].insert(v);
    }

    pub fn set_range(&mut self, lo: usize, hi: usize) {
        self.range = Some((lo, hi));
    }

    pub fn has(&self, v: &SparseSet) -> Presence {
        let w = v.weight();
        match self.range {
            Some((lo, hi)) if lo <= w && w <= hi => {
                if self.cache.get(w).is_some_and(|level| level.contains(v)) {
                    Presence::In
                } else {
                    Presence::NotInAuthoritativeRange
                }
            }
            _ => Presence::Unknown,
        }
    }

    /// The recorded metadata for `v`, or [`Meta::Unknown`] if it was classified without
    /// metadata (or is not present at all — callers are expected to have checked [`has`]
    /// first when the distinction matters).
    ///
    /// [`has`]: LevelCache::has
    pub fn meta_or_unknown(&self, v: &SparseSet) -> Meta<M> {
        self.meta.get(v).cloned().into()
    }

    pub fn iter_weight(&self, weight: usize) -> impl Iterator<Item = &SparseSet> {
        self.cache.get(weight).into_iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.cache.iter().map(|s| s.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
