use fnv::FnvHashMap;

use crate::error::Error;
use crate::level_cache::LevelCache;
use crate::macros::log_trace;
use crate::meta::Meta;
use crate::sparse_set::SparseSet;

/// The interface this crate consumes from the concrete predicate being learned:
/// `classify(v) -> (is_lower, meta)`, fallible so a predicate that can fail (network
/// lookup, external solver call, ...) surfaces an [`Error::OracleFailure`] rather than
/// panicking the whole learning run.
pub trait Predicate<M> {
    fn classify(&mut self, v: &SparseSet) -> Result<(bool, Option<M>), Error>;
}

/// Adapts any `FnMut(&SparseSet) -> bool` into a [`Predicate`], defaulting metadata to
/// [`Meta::Unknown`] — the "convenience wrapper" the external interfaces section calls
/// for.
pub struct FnPredicate<F>(pub F);

impl<F, M> Predicate<M> for FnPredicate<F>
where
    F: FnMut(&SparseSet) -> bool,
{
    fn classify(&mut self, v: &SparseSet) -> Result<(bool, Option<M>), Error> {
        Ok(((self.0)(v), None))
    }
}

/// Wraps a user predicate, memoizing every classification and consulting the level
/// caches (populated by [`crate::learn::level::LevelLearn`]) before ever calling the
/// predicate again.
///
/// Resolution order, first hit wins: the main classification cache, then the lower
/// level cache, then the upper level cache, then the predicate itself.
pub struct Oracle<M, P> {
    lower_cache: LevelCache<M>,
    upper_cache: LevelCache<M>,
    cache: Option<FnvHashMap<SparseSet, (bool, Meta<M>)>>,
    n_calls: u64,
    n_queries: u64,
    predicate: P,
}

impl<M: Clone, P: Predicate<M>> Oracle<M, P> {
    pub fn new(predicate: P) -> Self {
        Oracle {
            lower_cache: LevelCache::new(),
            upper_cache: LevelCache::new(),
            cache: Some(FnvHashMap::default()),
            n_calls: 0,
            n_queries: 0,
            predicate,
        }
    }

    pub fn lower_cache(&self) -> &LevelCache<M> {
        &self.lower_cache
    }

    pub fn lower_cache_mut(&mut self) -> &mut LevelCache<M> {
        &mut self.lower_cache
    }

    pub fn upper_cache(&self) -> &LevelCache<M> {
        &self.upper_cache
    }

    pub fn upper_cache_mut(&mut self) -> &mut LevelCache<M> {
        &mut self.upper_cache
    }

    pub fn n_calls(&self) -> u64 {
        self.n_calls
    }

    pub fn n_queries(&self) -> u64 {
        self.n_queries
    }

    /// Disables the main classification cache (the level caches keep working), useful
    /// when `N` is large enough that memoizing every classified vector is itself a
    /// memory concern.
    pub fn disable_cache(&mut self) {
        self.cache = None;
    }

    /// Drops the level caches and/or the main classification cache, forcing every future
    /// call to re-resolve against the predicate (except for anything the level caches
    /// are repopulated with afterwards).
    pub fn clean(&mut self, levels: bool, main: bool) {
        if levels {
            self.lower_cache = LevelCache::new();
            self.upper_cache = LevelCache::new();
        }
        if main {
            self.cache = Some(FnvHashMap::default());
        }
    }

    pub fn classify(&mut self, v: &SparseSet) -> Result<(bool, Meta<M>), Error> {
        self.n_calls += 1;

        if let Some(cache) = &self.cache {
            if let Some((is_lower, meta)) = cache.get(v) {
                log_trace!("oracle: main cache hit for {:?} -> {}", v, is_lower);
                return Ok((*is_lower, meta.clone()));
            }
        }

        if self.lower_cache.has(v).is_in() {
            let meta = self.lower_cache.meta_or_unknown(v);
            log_trace!("oracle: lower level cache hit for {:?}", v);
            return Ok((true, meta));
        }

        if self.upper_cache.has(v).is_in() {
            let meta = self.upper_cache.meta_or_unknown(v);
            log_trace!("oracle: upper level cache hit for {:?}", v);
            return Ok((false, meta));
        }

        self.n_queries += 1;
        let (is_lower, meta_raw) = self.predicate.classify(v)?;
        let meta: Meta<M> = meta_raw.into();

        if let Some(cache) = &mut self.cache {
            cache.insert(v.clone(), (is_lower, meta.clone()));
        }

        Ok((is_lower, meta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_order_prefers_main_cache_then_level_caches() {
        let mut calls = 0usize;
        let mut oracle: Oracle<(), _> = Oracle::new(FnPredicate(|_v: &SparseSet| {
            calls += 1;
            true
        }));

        let v = SparseSet::from_iter([0, 1]);
        assert_eq!(oracle.classify(&v).unwrap().0, true);
        assert_eq!(calls, 1);
        assert_eq!(oracle.n_queries(), 1);

        // Second call hits the main cache, not the predicate.
        assert_eq!(oracle.classify(&v).unwrap().0, true);
        assert_eq!(calls, 1);
        assert_eq!(oracle.n_calls(), 2);
        assert_eq!(oracle.n_queries(), 1);
    }

    #[test]
    fn level_cache_hit_short_circuits_predicate() {
        let mut calls = 0usize;
        let mut oracle: Oracle<(), _> = Oracle::new(FnPredicate(|_v: &SparseSet| {
            calls += 1;
            false
        }));
        oracle.disable_cache();

        let v = SparseSet::from_iter([0]);
        oracle.lower_cache_mut().set_range(0, 1);
        oracle.lower_cache_mut().add(v.clone(), None);

        let (is_lower, meta) = oracle.classify(&v).unwrap();
        assert!(is_lower);
        assert_eq!(meta, Meta::Unknown);
        assert_eq!(calls, 0);
    }
}
