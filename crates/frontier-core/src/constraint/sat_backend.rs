//! [`SatBackend`] over the real `batsat` solver. Kept in its own module, gated behind the
//! `sat-batsat` feature, so the core learning algorithms never see a `batsat` type
//! directly — only [`super::ConstraintModel`].

use batsat::{lbool, Lit as BLit, SolverInterface, Var};

use super::{lit_polarity, lit_var, Lit, SatBackend, SolveResult, VarId};

pub struct BatSatBackend {
    solver: batsat::Solver,
    vars: Vec<Var>,
}

impl BatSatBackend {
    fn blit(&self, l: Lit) -> BLit {
        let v = self.vars[lit_var(l).0 as usize];
        BLit::new(v, lit_polarity(l))
    }
}

impl SatBackend for BatSatBackend {
    fn new(_solver_name: &str) -> Self {
        BatSatBackend { solver: batsat::Solver::default(), vars: Vec::new() }
    }

    fn new_var(&mut self) -> VarId {
        let v = self.solver.new_var_default();
        let id = VarId(self.vars.len() as u32);
        self.vars.push(v);
        id
    }

    fn add_clause(&mut self, lits: &[Lit]) {
        let mut clause: Vec<BLit> = lits.iter().map(|&l| self.blit(l)).collect();
        self.solver.add_clause_reuse(&mut clause);
    }

    fn solve(&mut self, assumptions: &[Lit]) -> SolveResult {
        let assumption_lits: Vec<BLit> = assumptions.iter().map(|&l| self.blit(l)).collect();
        match self.solver.solve_limited(&assumption_lits) {
            lbool::TRUE => {
                let assignment: Vec<bool> = self
                    .vars
                    .iter()
                    .map(|&v| self.solver.value_var(v) == lbool::TRUE)
                    .collect();
                SolveResult::Sat(assignment)
            }
            _ => SolveResult::Unsat,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::{lit, ConstraintModel, SatModel};
    use super::*;

    #[test]
    fn cardinality_over_the_real_solver_matches_popcount() {
        let mut model: SatModel<BatSatBackend> = SatModel::new("batsat");
        let xs = model.new_vars(3);
        let xsum = model.cardinality(&xs);

        let all_true: Vec<Lit> = xs.iter().map(|&v| lit(v, true)).collect();
        let result = model.solve(&all_true);
        assert!(result.is_sat());
        for &v in &xsum {
            assert_eq!(result.value_of(v), Some(true));
        }
    }

    #[test]
    fn exclude_sub_rules_out_the_empty_set() {
        let mut model: SatModel<BatSatBackend> = SatModel::new("batsat");
        let xs = model.new_vars(2);
        model.exclude_sub(&xs);

        let none: Vec<Lit> = xs.iter().map(|&v| lit(v, false)).collect();
        assert_eq!(model.solve(&none), super::super::SolveResult::Unsat);
    }
}
