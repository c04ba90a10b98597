//! Shared plumbing used by both concrete learners: cooperative interrupt
//! handling, seeding a fresh [`crate::ConstraintModel`] from the current knowledge base,
//! and the two randomized walk procedures that finish a vector at a prime boundary.

pub mod gainanov;
pub mod level;

use rand::seq::SliceRandom;
use rand::thread_rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::constraint::{ConstraintModel, VarId};
use crate::error::Error;
use crate::extra_prec::ExtraPrec;
use crate::knowledge_base::KnowledgeBase;
use crate::macros::log_debug;
use crate::meta::Meta;
use crate::oracle::{Oracle, Predicate};
use crate::sparse_set::SparseSet;

/// Cooperative cancellation flag, polled at oracle-call boundaries rather than
/// delivered by a signal handler reaching into learner state. Cloning shares the same
/// underlying flag; a CLI front-end installs a `ctrlc` handler that calls [`Interrupt::set`]
/// on its own clone.
#[derive(Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    pub fn new() -> Self {
        Interrupt(Arc::new(AtomicBool::new(false)))
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// What a `learn()` call accomplished before returning normally (an interrupt instead
/// surfaces as `Err(Error::Interrupt)`, never as a variant here).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearnOutcome {
    /// The knowledge base is now known complete on the side(s) this learner covers.
    Complete,
    /// An iteration or weight bound was reached with unknowns potentially remaining.
    LimitReached,
}

/// Borrows the knowledge base and the oracle for the duration of one `learn()` call.
/// Neither outlives this context; both are released back to the caller when it drops.
pub struct LearnContext<'a, M, P> {
    pub kb: &'a mut KnowledgeBase<M>,
    pub oracle: &'a mut Oracle<M, P>,
    pub interrupt: Option<Interrupt>,
}

impl<'a, M, P> LearnContext<'a, M, P>
where
    M: Clone + serde::Serialize + serde::de::DeserializeOwned,
    P: Predicate<M>,
{
    pub fn new(kb: &'a mut KnowledgeBase<M>, oracle: &'a mut Oracle<M, P>) -> Self {
        LearnContext { kb, oracle, interrupt: None }
    }

    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = Some(interrupt);
        self
    }

    /// Checked at every oracle-call boundary. On a set flag, saves once (atomically, via
    /// the temp-file-then-rename protocol the persistence layer already uses) and returns
    /// `Error::Interrupt`; a second interrupt observed mid-save is moot, since the save
    /// already committed or didn't.
    pub(crate) fn check_interrupt(&mut self) -> Result<(), Error> {
        if self.interrupt.as_ref().is_some_and(Interrupt::is_set) {
            self.kb.save()?;
            return Err(Error::Interrupt);
        }
        Ok(())
    }

    /// Seeds a fresh model with an exclusion for every vector already on either side of
    /// the knowledge base. `vars[i]` must be the model variable standing for ground
    /// element `i`.
    pub fn seed_model(&self, model: &mut dyn ConstraintModel, vars: &[VarId]) {
        for l in self.kb.iter_lower() {
            let l = match self.kb.extra_prec() {
                Some(ep) => ep.expand(l),
                None => l.clone(),
            };
            let complement: Vec<VarId> = (0..self.kb.n())
                .filter(|&i| !l.contains(i as u32))
                .map(|i| vars[i])
                .collect();
            model.exclude_sub(&complement);
        }
        for u in self.kb.iter_upper() {
            let u = match self.kb.extra_prec() {
                Some(ep) => ep.reduce(u),
                None => u.clone(),
            };
            let in_u: Vec<VarId> = u.iter().map(|i| vars[i as usize]).collect();
            model.exclude_super(&in_u);
        }
    }

    /// Reads a solved model's assignment back into a ground-set `SparseSet`.
    pub fn vector_from_assignment(vars: &[VarId], assignment: &[bool]) -> SparseSet {
        SparseSet::from_iter(
            vars.iter()
                .enumerate()
                .filter(|(_, v)| assignment[v.0 as usize])
                .map(|(i, _)| i as u32),
        )
    }

    /// Randomized walk from a known-upper `v` down to a minimal (prime) upper.
    /// Returns the settled vector, which is also now present in `self.kb`'s upper set.
    pub fn learn_down(&mut self, mut v: SparseSet, mut meta: Meta<M>) -> Result<SparseSet, Error> {
        if self.kb.is_known_upper(&v) {
            return Ok(v);
        }
        let mut order: Vec<u32> = v.iter().collect();
        order.shuffle(&mut thread_rng());

        for i in order {
            self.check_interrupt()?;
            let candidate = &v - i;
            debug_assert!(
                !self.kb.is_known_upper(&candidate),
                "walk produced a candidate already known upper"
            );
            if self.kb.is_known_lower(&candidate) {
                continue;
            }
            let (is_lower, candidate_meta) = self.oracle.classify(&candidate)?;
            if is_lower {
                continue;
            }
            v = candidate;
            meta = candidate_meta;
        }

        log_debug!("learn_down settled at {:?}", v);
        self.kb.add_upper(v.clone(), meta.into_option(), true);
        Ok(v)
    }

    /// Randomized walk from a known-lower `v` up to a maximal (prime) lower.
    /// Returns the settled vector, which is also now present in `self.kb`'s lower set.
    pub fn learn_up(&mut self, mut v: SparseSet, mut meta: Meta<M>) -> Result<SparseSet, Error> {
        if self.kb.is_known_lower(&v) {
            return Ok(v);
        }
        let n = self.kb.n() as u32;
        let mut order: Vec<u32> = (0..n).filter(|&i| !v.contains(i)).collect();
        order.shuffle(&mut thread_rng());

        for i in order {
            self.check_interrupt()?;
            let candidate = &v | i;
            debug_assert!(
                !self.kb.is_known_lower(&candidate),
                "walk produced a candidate already known lower"
            );
            if self.kb.is_known_upper(&candidate) {
                continue;
            }
            let (is_lower, candidate_meta) = self.oracle.classify(&candidate)?;
            if !is_lower {
                continue;
            }
            v = candidate;
            meta = candidate_meta;
        }

        log_debug!("learn_up settled at {:?}", v);
        self.kb.add_lower(v.clone(), meta.into_option(), true);
        Ok(v)
    }
}
