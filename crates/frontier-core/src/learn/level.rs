//! Weight-by-weight breadth-first learner: grows the lower cache outward from
//! weight 0 and/or the upper cache inward from weight N, one Hamming weight at a time,
//! using a compatibility count to skip candidates monotonicity already rules out —
//! O(true-lowers × N) instead of O(C(N, ℓ)).

use fnv::FnvHashMap;

use super::{Interrupt, LearnContext, LearnOutcome};
use crate::error::Error;
use crate::knowledge_base::KnowledgeBase;
use crate::macros::{log_debug, log_error, log_info};
use crate::oracle::{Oracle, Predicate};
use crate::sparse_set::SparseSet;

/// Configured with the number of levels to scan from each end; 0 disables that
/// direction.
pub struct LevelLearn {
    levels_lower: usize,
    levels_upper: usize,
}

impl LevelLearn {
    pub fn new(levels_lower: usize, levels_upper: usize) -> Self {
        LevelLearn { levels_lower, levels_upper }
    }

    pub fn learn<M, P>(
        &self,
        kb: &mut KnowledgeBase<M>,
        oracle: &mut Oracle<M, P>,
    ) -> Result<LearnOutcome, Error>
    where
        M: Clone + serde::Serialize + serde::de::DeserializeOwned,
        P: Predicate<M>,
    {
        self.learn_with_interrupt(kb, oracle, None)
    }

    pub fn learn_with_interrupt<M, P>(
        &self,
        kb: &mut KnowledgeBase<M>,
        oracle: &mut Oracle<M, P>,
        interrupt: Option<Interrupt>,
    ) -> Result<LearnOutcome, Error>
    where
        M: Clone + serde::Serialize + serde::de::DeserializeOwned,
        P: Predicate<M>,
    {
        let result = self.run(&mut *kb, &mut *oracle, interrupt);
        if let Err(ref e) = result {
            log_error!("level: learning failed ({}), saving knowledge base", e);
            let _ = kb.save();
        }
        result
    }

    fn run<M, P>(
        &self,
        kb: &mut KnowledgeBase<M>,
        oracle: &mut Oracle<M, P>,
        interrupt: Option<Interrupt>,
    ) -> Result<LearnOutcome, Error>
    where
        M: Clone + serde::Serialize + serde::de::DeserializeOwned,
        P: Predicate<M>,
    {
        kb.log_info();
        let mut ctx = LearnContext::new(kb, oracle);
        if let Some(i) = interrupt {
            ctx = ctx.with_interrupt(i);
        }

        let mut covered_complete = true;

        if self.levels_lower > 0 {
            Self::learn_lower(&mut ctx, self.levels_lower - 1)?;
            covered_complete &= ctx.kb.is_complete_lower();
        }
        if self.levels_upper > 0 {
            let n = ctx.kb.n();
            Self::learn_upper(&mut ctx, n.saturating_sub(self.levels_upper) + 1)?;
            covered_complete &= ctx.kb.is_complete_upper();
        }

        ctx.kb.save()?;
        ctx.kb.log_info();
        if covered_complete {
            Ok(LearnOutcome::Complete)
        } else {
            Ok(LearnOutcome::LimitReached)
        }
    }

    fn learn_lower<M, P>(ctx: &mut LearnContext<M, P>, up_to: usize) -> Result<(), Error>
    where
        M: Clone + serde::Serialize + serde::de::DeserializeOwned,
        P: Predicate<M>,
    {
        let n = ctx.kb.n();

        if ctx.oracle.lower_cache().range().is_none() {
            let empty = SparseSet::empty();
            let (is_lower, meta) = ctx.oracle.classify(&empty)?;
            if !is_lower {
                log_info!("learn_lower: {{}} is already upper, trivial");
                ctx.kb.add_upper(empty, meta.into_option(), true);
                ctx.kb.set_complete_lower();
                return Ok(());
            }
            ctx.kb.record_meta_if_present(&empty, &meta);
            ctx.oracle.lower_cache_mut().add(empty, meta.into_option());
            ctx.oracle.lower_cache_mut().set_range(0, 0);
        }

        let mut hi = ctx.oracle.lower_cache().range().unwrap().1;
        let mut stopped_early = false;
        for level in (hi + 1)..=up_to.min(n) {
            ctx.check_interrupt()?;

            let mut to_check: FnvHashMap<SparseSet, usize> = FnvHashMap::default();
            for v in ctx.oracle.lower_cache().iter_weight(level - 1) {
                for u in v.neibs_up(n) {
                    *to_check.entry(u).or_default() += 1;
                }
            }

            let mut found_any = false;
            for (v, cnt) in to_check {
                if cnt != level {
                    continue;
                }
                let (is_lower, meta) = ctx.oracle.classify(&v)?;
                if is_lower {
                    found_any = true;
                    ctx.kb.record_meta_if_present(&v, &meta);
                    ctx.oracle.lower_cache_mut().add(v, meta.into_option());
                } else {
                    log_debug!("learn_lower: {:?} is a prime upper at weight {}", v, level);
                    ctx.kb.add_upper(v, meta.into_option(), true);
                }
            }

            hi = level;
            ctx.oracle.lower_cache_mut().set_range(0, hi);
            if !found_any {
                log_info!("learn_lower: no new lowers at weight {}, stopping early", level);
                stopped_early = true;
                break;
            }
        }

        // Finding no new lower at some weight means, by monotonicity, every weight above
        // it is upper too — the frontier is fully characterized even though the scan
        // never visited those weights directly.
        if stopped_early || hi >= n {
            ctx.kb.set_complete_lower();
        }
        Ok(())
    }

    fn learn_upper<M, P>(ctx: &mut LearnContext<M, P>, down_to: usize) -> Result<(), Error>
    where
        M: Clone + serde::Serialize + serde::de::DeserializeOwned,
        P: Predicate<M>,
    {
        let n = ctx.kb.n();

        if ctx.oracle.upper_cache().range().is_none() {
            let full = SparseSet::full(n);
            let (is_lower, meta) = ctx.oracle.classify(&full)?;
            if is_lower {
                log_info!("learn_upper: full set is already lower, trivial");
                ctx.kb.add_lower(full, meta.into_option(), true);
                ctx.kb.set_complete_upper();
                return Ok(());
            }
            ctx.kb.record_meta_if_present(&full, &meta);
            ctx.oracle.upper_cache_mut().add(full, meta.into_option());
            ctx.oracle.upper_cache_mut().set_range(n, n);
        }

        let mut lo = ctx.oracle.upper_cache().range().unwrap().0;
        let mut stopped_early = false;
        for level in (down_to.min(n)..lo).rev() {
            ctx.check_interrupt()?;

            let threshold = n - level;
            let mut to_check: FnvHashMap<SparseSet, usize> = FnvHashMap::default();
            for v in ctx.oracle.upper_cache().iter_weight(level + 1) {
                for d in v.neibs_down() {
                    *to_check.entry(d).or_default() += 1;
                }
            }

            let mut found_any = false;
            for (v, cnt) in to_check {
                if cnt != threshold {
                    continue;
                }
                let (is_lower, meta) = ctx.oracle.classify(&v)?;
                if !is_lower {
                    found_any = true;
                    ctx.kb.record_meta_if_present(&v, &meta);
                    ctx.oracle.upper_cache_mut().add(v, meta.into_option());
                } else {
                    log_debug!("learn_upper: {:?} is a prime lower at weight {}", v, level);
                    ctx.kb.add_lower(v, meta.into_option(), true);
                }
            }

            lo = level;
            ctx.oracle.upper_cache_mut().set_range(lo, n);
            if !found_any {
                log_info!("learn_upper: no new uppers at weight {}, stopping early", level);
                stopped_early = true;
                break;
            }
        }

        if stopped_early || lo == 0 {
            ctx.kb.set_complete_upper();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::FnPredicate;

    #[test]
    fn learns_the_weight_at_most_one_predicate() {
        let mut kb: KnowledgeBase<()> = KnowledgeBase::new(3);
        let mut oracle: Oracle<(), _> = Oracle::new(FnPredicate(|v: &SparseSet| v.weight() <= 1));

        let outcome = LevelLearn::new(3, 3).learn(&mut kb, &mut oracle).unwrap();
        assert_eq!(outcome, LearnOutcome::Complete);

        let lowers: std::collections::HashSet<_> = kb.iter_lower().cloned().collect();
        assert_eq!(
            lowers,
            [
                SparseSet::empty(),
                SparseSet::from_iter([0]),
                SparseSet::from_iter([1]),
                SparseSet::from_iter([2]),
            ]
            .into_iter()
            .collect()
        );

        let uppers: std::collections::HashSet<_> = kb.iter_upper().cloned().collect();
        assert_eq!(
            uppers,
            [
                SparseSet::from_iter([0, 1]),
                SparseSet::from_iter([0, 2]),
                SparseSet::from_iter([1, 2]),
            ]
            .into_iter()
            .collect()
        );
        assert!(kb.is_complete_lower());
        assert!(kb.is_complete_upper());
    }

    #[test]
    fn contains_zero_predicate_is_trivial_from_the_empty_set() {
        let mut kb: KnowledgeBase<()> = KnowledgeBase::new(4);
        let mut oracle: Oracle<(), _> = Oracle::new(FnPredicate(|v: &SparseSet| v.contains(0)));

        LevelLearn::new(1, 0).learn(&mut kb, &mut oracle).unwrap();

        assert_eq!(kb.n_lower(), 0);
        assert_eq!(kb.iter_upper().collect::<Vec<_>>(), vec![&SparseSet::empty()]);
    }
}
