use fnv::{FnvHashMap, FnvHashSet};
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::extra_prec::ExtraPrec;
use crate::macros::{log_info, log_warn};
use crate::persist;
use crate::sparse_set::SparseSet;

/// Owns the accepted lower antichain, the accepted upper antichain, their completion
/// flags, per-vector metadata, and (optionally) the abstraction that keeps inserted
/// vectors in prime coordinates. Learners borrow this mutably for the duration of a
/// `learn()` call and never outlive it.
pub struct KnowledgeBase<M> {
    n: usize,
    lower: FnvHashSet<SparseSet>,
    upper: FnvHashSet<SparseSet>,
    is_complete_lower: bool,
    is_complete_upper: bool,
    meta: FnvHashMap<SparseSet, M>,
    extra_prec: Option<Box<dyn ExtraPrec>>,
    file: Option<PathBuf>,
    saved: bool,
}

impl<M: Clone + serde::Serialize + serde::de::DeserializeOwned> KnowledgeBase<M> {
    pub fn new(n: usize) -> Self {
        KnowledgeBase {
            n,
            lower: FnvHashSet::default(),
            upper: FnvHashSet::default(),
            is_complete_lower: false,
            is_complete_upper: false,
            meta: FnvHashMap::default(),
            extra_prec: None,
            file: None,
            saved: false,
        }
    }

    /// Constructs a knowledge base backed by a persistence file, loading prior state if
    /// the file already exists.
    pub fn with_file<P: Into<PathBuf>>(n: usize, file: P) -> Result<Self, Error> {
        let file = file.into();
        let mut kb = Self::new(n);
        kb.file = Some(file.clone());
        if file.exists() {
            kb.load()?;
        }
        Ok(kb)
    }

    pub fn with_extra_prec(mut self, extra_prec: Box<dyn ExtraPrec>) -> Self {
        self.extra_prec = Some(extra_prec);
        self
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn extra_prec(&self) -> Option<&dyn ExtraPrec> {
        self.extra_prec.as_deref()
    }

    pub fn is_complete_lower(&self) -> bool {
        self.is_complete_lower
    }

    pub fn is_complete_upper(&self) -> bool {
        self.is_complete_upper
    }

    pub fn is_complete(&self) -> bool {
        self.is_complete_lower && self.is_complete_upper
    }

    pub fn set_complete_lower(&mut self) {
        self.is_complete_lower = true;
        self.saved = false;
    }

    pub fn set_complete_upper(&mut self) {
        self.is_complete_upper = true;
        self.saved = false;
    }

    pub fn set_complete(&mut self) {
        self.set_complete_lower();
        self.set_complete_upper();
    }

    pub fn is_known_lower(&self, v: &SparseSet) -> bool {
        self.lower.contains(v)
    }

    pub fn is_known_upper(&self, v: &SparseSet) -> bool {
        self.upper.contains(v)
    }

    pub fn n_lower(&self) -> usize {
        self.lower.len()
    }

    pub fn n_upper(&self) -> usize {
        self.upper.len()
    }

    pub fn iter_lower(&self) -> impl Iterator<Item = &SparseSet> {
        self.lower.iter()
    }

    pub fn iter_upper(&self) -> impl Iterator<Item = &SparseSet> {
        self.upper.iter()
    }

    pub fn meta(&self, v: &SparseSet) -> Option<&M> {
        self.meta.get(v)
    }

    /// Records `meta` for `v` directly, bypassing `add_lower`/`add_upper` — used by
    /// learners that classify a vector via the level cache and want to keep the
    /// knowledge base's meta map in sync even when the vector itself is not (yet, or
    /// ever) inserted into `_lower`/`_upper`.
    pub fn record_meta(&mut self, v: SparseSet, meta: M) {
        self.meta.insert(v, meta);
    }

    /// Records `meta` for `v` only if it carries an actual value, mirroring the
    /// "record meta when provided" clause `add_lower`/`add_upper` follow — used by callers
    /// that classify through the level caches rather than through those two methods.
    pub fn record_meta_if_present(&mut self, v: &SparseSet, meta: &crate::meta::Meta<M>) {
        if let crate::meta::Meta::Present(m) = meta {
            self.record_meta(v.clone(), m.clone());
        }
    }

    pub fn add_lower(&mut self, v: SparseSet, meta: Option<M>, _is_prime: bool) {
        let v = match &self.extra_prec {
            Some(ep) => ep.expand(&v),
            None => v,
        };
        if !self.is_known_lower(&v) {
            self.saved = false;
            if let Some(m) = meta {
                self.meta.insert(v.clone(), m);
            }
            self.lower.insert(v);
        }
    }

    pub fn add_upper(&mut self, v: SparseSet, meta: Option<M>, _is_prime: bool) {
        let v = match &self.extra_prec {
            Some(ep) => ep.reduce(&v),
            None => v,
        };
        if !self.is_known_upper(&v) {
            self.saved = false;
            if let Some(m) = meta {
                self.meta.insert(v.clone(), m);
            }
            self.upper.insert(v);
        }
    }

    /// Drops metadata for vectors no longer present in either antichain.
    pub fn clean(&mut self) {
        let lower = &self.lower;
        let upper = &self.upper;
        self.meta.retain(|v, _| lower.contains(v) || upper.contains(v));
    }

    /// Logs, at `info` level, the per-weight size histogram of both antichains and
    /// whether each completion flag is set, called by learners at the start and end
    /// of `learn()`.
    pub fn log_info(&self) {
        for (name, side) in [("lower", &self.lower), ("upper", &self.upper)] {
            let mut hist: std::collections::BTreeMap<usize, usize> = Default::default();
            for v in side {
                *hist.entry(v.weight()).or_default() += 1;
            }
            let freqstr: Vec<String> = hist.iter().map(|(w, c)| format!("{w}:{c}")).collect();
            log_info!("  {} {}: {}", name, side.len(), freqstr.join(" "));
        }
        if self.is_complete_lower {
            log_info!("  system is complete for lower!");
        }
        if self.is_complete_upper {
            log_info!("  system is complete for upper!");
        }
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    pub fn is_saved(&self) -> bool {
        self.saved
    }

    /// Saves to the configured file, if any and if dirty. The cooperative interrupt check
    /// in [`crate::LearnContext::check_interrupt`] never observes a half-written file,
    /// because [`save_to_file`] writes through a temp file and renames atomically — there
    /// is nothing to retry here beyond propagating the I/O error.
    ///
    /// [`save_to_file`]: KnowledgeBase::save_to_file
    pub fn save(&mut self) -> Result<(), Error> {
        if let Some(file) = self.file.clone() {
            if !self.saved {
                self.save_to_file(&file)?;
                self.saved = true;
            }
        }
        self.log_info();
        Ok(())
    }

    pub fn load(&mut self) -> Result<(), Error> {
        if let Some(file) = self.file.clone() {
            self.load_from_file(&file)?;
            self.log_info();
            self.saved = true;
        }
        Ok(())
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), Error> {
        persist::save_state(path, self)
    }

    pub fn load_from_file(&mut self, path: &Path) -> Result<(), Error> {
        let state = persist::load_state(path, self.n)?;
        self.lower = state.lower.into_iter().collect();
        self.upper = state.upper.into_iter().collect();
        self.is_complete_lower = state.is_complete_lower;
        self.is_complete_upper = state.is_complete_upper;
        self.meta = state.meta.into_iter().collect();
        self.n = state.n;
        log_info!("loaded state from file {}", path.display());
        Ok(())
    }

    pub(crate) fn snapshot(&self) -> persist::PersistedState<M> {
        persist::PersistedState {
            version: persist::DATA_VERSION,
            lower: self.lower.iter().cloned().collect(),
            upper: self.upper.iter().cloned().collect(),
            is_complete_lower: self.is_complete_lower,
            is_complete_upper: self.is_complete_upper,
            meta: self.meta.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            n: self.n,
        }
    }
}

#[allow(dead_code)]
fn warn_if_empty_file(path: &Path) {
    if !path.exists() {
        log_warn!("knowledge base file {} does not exist yet", path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_lower_is_idempotent() {
        let mut kb: KnowledgeBase<()> = KnowledgeBase::new(4);
        let v = SparseSet::from_iter([0, 1]);
        kb.add_lower(v.clone(), None, true);
        kb.add_lower(v.clone(), None, true);
        assert_eq!(kb.n_lower(), 1);
    }

    #[test]
    fn set_complete_lower_is_idempotent() {
        let mut kb: KnowledgeBase<()> = KnowledgeBase::new(4);
        kb.set_complete_lower();
        kb.set_complete_lower();
        assert!(kb.is_complete_lower());
        assert!(!kb.is_complete_upper());
    }

    #[test]
    fn clean_drops_meta_for_removed_vectors() {
        let mut kb: KnowledgeBase<u32> = KnowledgeBase::new(4);
        let v = SparseSet::from_iter([0]);
        kb.record_meta(v.clone(), 99);
        assert!(kb.meta(&v).is_some());
        kb.clean();
        assert!(kb.meta(&v).is_none());
    }

    #[test]
    fn no_vector_appears_on_both_sides_via_normal_api() {
        let mut kb: KnowledgeBase<()> = KnowledgeBase::new(4);
        let v = SparseSet::from_iter([0]);
        kb.add_lower(v.clone(), None, true);
        kb.add_upper(v.clone(), None, true);
        // The knowledge base itself does not forbid this (callers are expected to query
        // the oracle before inserting on either side); it only guarantees no duplicate
        // insertion within a side.
        assert!(kb.is_known_lower(&v));
        assert!(kb.is_known_upper(&v));
    }
}
