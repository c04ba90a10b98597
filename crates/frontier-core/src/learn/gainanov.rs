//! SAT-driven learner: seeds a [`crate::ConstraintModel`] with the current
//! knowledge base, then repeatedly asks the solver for an assignment outside what is
//! already known, classifies it through the oracle, and either accepts it as a terminal
//! frontier vector or walks it ([`LearnContext::learn_up`]/[`LearnContext::learn_down`])
//! to a prime one. Optionally targets a specific Hamming weight (`sense`), narrowing the
//! search toward the minimal uppers or maximal lowers instead of any unknown vector.

use crate::constraint::{lit, ConstraintModel, Lit, SolveResult, VarId};
use crate::error::Error;
use crate::extra_prec::ExtraPrec;
use crate::knowledge_base::KnowledgeBase;
use crate::macros::{log_debug, log_error};
use crate::oracle::{Oracle, Predicate};
use crate::sparse_set::SparseSet;

use super::{Interrupt, LearnContext, LearnOutcome};

/// Which side of the frontier the weight-level search narrows toward. `None` disables
/// level targeting entirely: `find_new_unknown` takes whatever the solver returns first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Min,
    Max,
    None,
}

enum Probe {
    Found(SparseSet),
    Complete,
}

/// Owns the solver backend for the duration of a `learn()` call; a fresh model is seeded
/// every time, so a `GainanovSat` can be reused across calls against different knowledge
/// bases of the same `N`.
pub struct GainanovSat<Model> {
    sense: Sense,
    save_rate: usize,
    limit: usize,
    start_level: Option<usize>,
    model: Model,
}

impl<Model: ConstraintModel> GainanovSat<Model> {
    pub fn new(sense: Sense, model: Model) -> Self {
        GainanovSat { sense, save_rate: usize::MAX, limit: usize::MAX, start_level: None, model }
    }

    pub fn with_save_rate(mut self, save_rate: usize) -> Self {
        self.save_rate = save_rate.max(1);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_start_level(mut self, start_level: usize) -> Self {
        self.start_level = Some(start_level);
        self
    }

    pub fn learn<M, P>(
        &mut self,
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
        &mut self,
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
            log_error!("gainanov: learning failed ({}), saving knowledge base", e);
            let _ = kb.save();
        }
        result
    }

    fn run<M, P>(
        &mut self,
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

        let n = ctx.kb.n();
        let vars = self.model.new_vars(n);
        ctx.seed_model(&mut self.model, &vars);

        let xsum = if self.sense != Sense::None { Some(self.model.cardinality(&vars)) } else { None };

        if xsum.is_some() {
            if let SolveResult::Unsat = self.model.solve(&[]) {
                ctx.kb.set_complete();
                ctx.kb.save()?;
                return Ok(LearnOutcome::Complete);
            }
        }

        let mut level: i64 = match self.start_level {
            Some(l) => l as i64,
            None => match self.sense {
                Sense::Min | Sense::None => 0,
                Sense::Max => n as i64,
            },
        };

        let mut iterations = 0usize;
        loop {
            if iterations >= self.limit {
                ctx.kb.save()?;
                return Ok(LearnOutcome::LimitReached);
            }
            ctx.check_interrupt()?;
            if iterations > 0 && iterations % self.save_rate == 0 {
                ctx.kb.save()?;
            }

            match self.find_new_unknown(&mut ctx, &vars, xsum.as_deref(), n, &mut level)? {
                Probe::Complete => {
                    ctx.kb.set_complete();
                    ctx.kb.save()?;
                    return Ok(LearnOutcome::Complete);
                }
                Probe::Found(v) => self.learn_unknown(&mut ctx, &vars, v)?,
            }
            iterations += 1;
        }
    }

    /// Builds the level assumption (if in opt mode), solves, and on UNSAT advances `level`
    /// toward its bound — re-checking the unconstrained model after every advance, since an
    /// UNSAT there means the whole frontier is sealed regardless of how far `level` has left
    /// to go.
    fn find_new_unknown<M, P>(
        &mut self,
        ctx: &mut LearnContext<M, P>,
        vars: &[VarId],
        xsum: Option<&[VarId]>,
        n: usize,
        level: &mut i64,
    ) -> Result<Probe, Error>
    where
        M: Clone + serde::Serialize + serde::de::DeserializeOwned,
        P: Predicate<M>,
    {
        loop {
            ctx.check_interrupt()?;
            let assumptions = self.level_assumptions(xsum, n, *level);

            match self.model.solve(&assumptions) {
                SolveResult::Sat(assignment) => {
                    let v = LearnContext::<M, P>::vector_from_assignment(vars, &assignment);
                    return Ok(Probe::Found(v));
                }
                SolveResult::Unsat => {
                    if xsum.is_none() {
                        return Ok(Probe::Complete);
                    }
                    match self.sense {
                        Sense::Min => {
                            *level += 1;
                            if *level > n as i64 {
                                return Ok(Probe::Complete);
                            }
                        }
                        Sense::Max => {
                            *level -= 1;
                            if *level < 0 {
                                return Ok(Probe::Complete);
                            }
                        }
                        Sense::None => unreachable!("xsum is only built when sense != None"),
                    }
                    log_debug!("gainanov: advanced to level {}", *level);
                    if let SolveResult::Unsat = self.model.solve(&[]) {
                        return Ok(Probe::Complete);
                    }
                }
            }
        }
    }

    /// `min`: assert `xsum[level+1..=n]` false, bounding the weight to at most `level`.
    /// `max`: the mirror image, asserting `xsum[0..=level]` true, bounding the weight to at
    /// least `level`. `none`: no assumptions at all.
    fn level_assumptions(&self, xsum: Option<&[VarId]>, n: usize, level: i64) -> Vec<Lit> {
        let xsum = match xsum {
            Some(xsum) => xsum,
            None => return Vec::new(),
        };
        let level = level as usize;
        match self.sense {
            Sense::Min => (level + 1..=n).map(|k| lit(xsum[k], false)).collect(),
            Sense::Max => (0..=level).map(|k| lit(xsum[k], true)).collect(),
            Sense::None => Vec::new(),
        }
    }

    /// Classifies `v` and either accepts it as a terminal frontier vector (when it lands
    /// on the side the active `sense` is searching for a cross-section of) or walks it to
    /// a prime one, excluding whichever vector actually ends up recorded.
    fn learn_unknown<M, P>(
        &mut self,
        ctx: &mut LearnContext<M, P>,
        vars: &[VarId],
        v: SparseSet,
    ) -> Result<(), Error>
    where
        M: Clone + serde::Serialize + serde::de::DeserializeOwned,
        P: Predicate<M>,
    {
        let (is_lower, meta) = ctx.oracle.classify(&v)?;
        log_debug!("gainanov: classified {:?} as {}", v, if is_lower { "lower" } else { "upper" });
        if is_lower {
            if self.sense == Sense::Max {
                ctx.kb.add_lower(v.clone(), meta.into_option(), true);
                self.exclude_vector_lower(ctx, vars, &v);
            } else {
                let settled = ctx.learn_up(v, meta)?;
                self.exclude_vector_lower(ctx, vars, &settled);
            }
        } else if self.sense == Sense::Min {
            ctx.kb.add_upper(v.clone(), meta.into_option(), true);
            self.exclude_vector_upper(ctx, vars, &v);
        } else {
            let settled = ctx.learn_down(v, meta)?;
            self.exclude_vector_upper(ctx, vars, &settled);
        }
        Ok(())
    }

    /// Mirrors [`LearnContext::seed_model`]'s per-lower-vector clause, but for a single
    /// freshly-learned vector rather than the whole knowledge base.
    fn exclude_vector_lower<M, P>(&mut self, ctx: &LearnContext<M, P>, vars: &[VarId], v: &SparseSet) {
        let l = match ctx.kb.extra_prec() {
            Some(ep) => ep.expand(v),
            None => v.clone(),
        };
        let complement: Vec<VarId> =
            (0..ctx.kb.n()).filter(|&i| !l.contains(i as u32)).map(|i| vars[i]).collect();
        self.model.exclude_sub(&complement);
    }

    /// Mirrors [`LearnContext::seed_model`]'s per-upper-vector clause.
    fn exclude_vector_upper<M, P>(&mut self, ctx: &LearnContext<M, P>, vars: &[VarId], v: &SparseSet) {
        let u = match ctx.kb.extra_prec() {
            Some(ep) => ep.reduce(v),
            None => v.clone(),
        };
        let in_u: Vec<VarId> = u.iter().map(|i| vars[i as usize]).collect();
        self.model.exclude_super(&in_u);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::SatModel;
    use crate::oracle::FnPredicate;

    #[cfg(feature = "sat-batsat")]
    type TestBackend = crate::constraint::sat_backend::BatSatBackend;

    #[cfg(feature = "sat-batsat")]
    fn fresh_model() -> SatModel<TestBackend> {
        SatModel::new("batsat")
    }

    #[test]
    #[cfg(feature = "sat-batsat")]
    fn finds_every_weight_three_subset_of_four_as_upper() {
        let mut kb: KnowledgeBase<()> = KnowledgeBase::new(4);
        let mut oracle: Oracle<(), _> = Oracle::new(FnPredicate(|v: &SparseSet| v.weight() <= 2));

        let mut learner = GainanovSat::new(Sense::Min, fresh_model());
        let outcome = learner.learn(&mut kb, &mut oracle).unwrap();
        assert_eq!(outcome, LearnOutcome::Complete);

        let expected_uppers: std::collections::HashSet<SparseSet> = (0u32..4)
            .map(|skip| SparseSet::from_iter((0..4).filter(|&i| i != skip)))
            .collect();
        let uppers: std::collections::HashSet<_> = kb.iter_upper().cloned().collect();
        assert_eq!(uppers, expected_uppers);
        assert!(kb.iter_lower().all(|v| v.weight() <= 2));
        assert!(kb.is_complete());
    }

    #[test]
    #[cfg(feature = "sat-batsat")]
    fn finds_the_five_maximal_independent_sets_of_a_five_cycle() {
        let mut kb: KnowledgeBase<()> = KnowledgeBase::new(5);
        let mut oracle: Oracle<(), _> = Oracle::new(FnPredicate(|v: &SparseSet| {
            let members: Vec<u32> = v.iter().collect();
            for (idx, &a) in members.iter().enumerate() {
                for &b in &members[idx + 1..] {
                    let (lo, hi) = (a.min(b), a.max(b));
                    let adjacent = hi - lo == 1 || (lo == 0 && hi == 4);
                    if adjacent {
                        return false;
                    }
                }
            }
            true
        }));

        let mut learner = GainanovSat::new(Sense::Max, fresh_model());
        let outcome = learner.learn(&mut kb, &mut oracle).unwrap();
        assert_eq!(outcome, LearnOutcome::Complete);

        let expected_lowers: std::collections::HashSet<SparseSet> =
            [[0u32, 2], [1, 3], [2, 4], [3, 0], [4, 1]]
                .into_iter()
                .map(SparseSet::from_iter)
                .collect();
        let lowers: std::collections::HashSet<_> = kb.iter_lower().cloned().collect();
        assert_eq!(lowers, expected_lowers);
        assert!(kb.is_complete());
    }

    #[test]
    #[cfg(feature = "sat-batsat")]
    fn already_complete_knowledge_base_solves_once_and_returns() {
        let mut kb: KnowledgeBase<()> = KnowledgeBase::new(2);
        kb.add_lower(SparseSet::from_iter([0, 1]), None, true);
        kb.add_upper(SparseSet::empty(), None, true);
        let mut oracle: Oracle<(), _> = Oracle::new(FnPredicate(|_: &SparseSet| true));

        let mut learner = GainanovSat::new(Sense::Min, fresh_model());
        let outcome = learner.learn(&mut kb, &mut oracle).unwrap();
        assert_eq!(outcome, LearnOutcome::Complete);
        assert_eq!(oracle.n_calls(), 0);
    }
}
