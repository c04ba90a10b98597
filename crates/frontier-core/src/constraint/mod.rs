//! The shared seeding/solving interface behind two mutually exclusive backends: a SAT
//! model (default, built on `batsat`) and an optional MILP model (built on `good_lp`).
//! Neither backend leaks past this trait into [`crate::learn`].

mod sat_model;
pub use sat_model::{SatBackend, SatModel};

#[cfg(feature = "sat-batsat")]
pub mod sat_backend;

#[cfg(feature = "milp")]
pub mod milp_backend;

/// A model variable. Backend-opaque: callers never learn how it is represented inside a
/// concrete `SatBackend`/MILP solver, only that it can be turned into a [`Lit`] of either
/// polarity when building clauses or assumptions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VarId(pub u32);

/// A signed literal: `lit(v, true)` asserts `v`, `lit(v, false)` asserts `¬v`. Plain
/// DIMACS-style encoding (`i64`, sign carries polarity, magnitude is `1 + VarId`) so both
/// the SAT and the MILP adaptor can share one representation for assumptions.
pub type Lit = i64;

pub fn lit(v: VarId, polarity: bool) -> Lit {
    let magnitude = v.0 as i64 + 1;
    if polarity {
        magnitude
    } else {
        -magnitude
    }
}

pub fn lit_var(l: Lit) -> VarId {
    VarId((l.unsigned_abs() - 1) as u32)
}

pub fn lit_polarity(l: Lit) -> bool {
    l > 0
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SolveResult {
    /// A satisfying assignment, indexed by `VarId.0`.
    Sat(Vec<bool>),
    Unsat,
}

impl SolveResult {
    pub fn is_sat(&self) -> bool {
        matches!(self, SolveResult::Sat(_))
    }

    pub fn value_of(&self, v: VarId) -> Option<bool> {
        match self {
            SolveResult::Sat(assignment) => assignment.get(v.0 as usize).copied(),
            SolveResult::Unsat => None,
        }
    }
}

/// The interface the SAT and MILP adaptors both implement: allocate ground-set
/// variables, seed exclusions from the current knowledge base, build a monotone
/// cardinality encoding, and solve under assumptions.
pub trait ConstraintModel {
    /// Allocates `n` fresh ground-set variables `x_0, ..., x_{n-1}`.
    fn new_vars(&mut self, n: usize) -> Vec<VarId>;

    /// Bans every subset of `l` by asserting at least one variable outside `l` is true.
    /// `complement_of_l` is `{x_i : i not in l}`, already computed by the caller (which
    /// knows the full ground-set variable list and `l`'s indices).
    fn exclude_sub(&mut self, complement_of_l: &[VarId]);

    /// Bans every superset of `u` by asserting at least one variable inside `u` is false.
    fn exclude_super(&mut self, u: &[VarId]);

    /// Builds a monotone cardinality encoding over `xs`: the returned `xsum` has
    /// `xsum.len() == xs.len() + 1`, and `xsum[k]` is true in any solution iff at least
    /// `k` of `xs` are true.
    fn cardinality(&mut self, xs: &[VarId]) -> Vec<VarId>;

    /// Solves under the given assumption literals.
    fn solve(&mut self, assumptions: &[Lit]) -> SolveResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lit_round_trips_var_and_polarity() {
        let v = VarId(5);
        let pos = lit(v, true);
        let neg = lit(v, false);
        assert_eq!(lit_var(pos), v);
        assert_eq!(lit_var(neg), v);
        assert!(lit_polarity(pos));
        assert!(!lit_polarity(neg));
    }
}
