//! [`ConstraintModel`] backed by `good_lp` (the `microlp` solver), the MILP alternative
//! to the default SAT-based model named in the backend contract. `good_lp`'s `Variable`
//! handles are plain indices into a `ProblemVariables`, so this model keeps its own
//! `ProblemVariables` around and clones it at solve time rather than rebuilding variable
//! identities from scratch.

use good_lp::{constraint, default_solver, Expression, ProblemVariables, Solution, SolverModel, Variable};

use super::{lit_polarity, lit_var, ConstraintModel, Lit, SolveResult, VarId};

pub struct MilpModel {
    vars: ProblemVariables,
    handles: Vec<Variable>,
    constraints: Vec<good_lp::Constraint>,
}

impl Default for MilpModel {
    fn default() -> Self {
        MilpModel { vars: ProblemVariables::new(), handles: Vec::new(), constraints: Vec::new() }
    }
}

impl MilpModel {
    pub fn new() -> Self {
        Self::default()
    }

    fn new_binary_var(&mut self) -> VarId {
        let v = self.vars.add(good_lp::variable().binary());
        let id = VarId(self.handles.len() as u32);
        self.handles.push(v);
        id
    }

    fn handle(&self, v: VarId) -> Variable {
        self.handles[v.0 as usize]
    }
}

impl ConstraintModel for MilpModel {
    fn new_vars(&mut self, n: usize) -> Vec<VarId> {
        (0..n).map(|_| self.new_binary_var()).collect()
    }

    fn exclude_sub(&mut self, complement_of_l: &[VarId]) {
        let sum: Expression = complement_of_l.iter().map(|&v| Expression::from(self.handle(v))).sum();
        self.constraints.push(constraint!(sum >= 1.0));
    }

    fn exclude_super(&mut self, u: &[VarId]) {
        let sum: Expression = u.iter().map(|&v| Expression::from(self.handle(v))).sum();
        self.constraints.push(constraint!(sum <= (u.len() as f64 - 1.0)));
    }

    /// `xsum[k]` is defined by the pair of linear constraints `sum >= k * xsum[k]` and
    /// `sum <= (k - 1) + n * xsum[k]`, forcing `xsum[k] == 1` exactly when at least `k`
    /// of `xs` are set — the standard big-M indicator-variable cardinality encoding.
    fn cardinality(&mut self, xs: &[VarId]) -> Vec<VarId> {
        let n = xs.len();
        let sum: Expression = xs.iter().map(|&v| Expression::from(self.handle(v))).sum();

        let y0 = self.new_binary_var();
        self.constraints.push(constraint!(Expression::from(self.handle(y0)) == 1.0));

        let mut xsum = vec![y0];
        for k in 1..=n {
            let yk = self.new_binary_var();
            let yk_var = self.handle(yk);
            self.constraints
                .push(constraint!(sum.clone() - (k as f64) * yk_var >= 0.0));
            self.constraints
                .push(constraint!(sum.clone() - (n as f64) * yk_var <= k as f64 - 1.0));
            xsum.push(yk);
        }
        xsum
    }

    fn solve(&mut self, assumptions: &[Lit]) -> SolveResult {
        let mut problem = self.vars.clone().minimise(Expression::from(0.0)).using(default_solver);
        for c in self.constraints.clone() {
            problem = problem.with(c);
        }
        for &a in assumptions {
            let v = self.handle(lit_var(a));
            let want = if lit_polarity(a) { 1.0 } else { 0.0 };
            problem = problem.with(constraint!(Expression::from(v) == want));
        }

        match problem.solve() {
            Ok(solution) => {
                let assignment = self.handles.iter().map(|&v| solution.value(v) > 0.5).collect();
                SolveResult::Sat(assignment)
            }
            Err(_) => SolveResult::Unsat,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::lit;
    use super::*;

    #[test]
    fn cardinality_threshold_matches_count_of_set_variables() {
        let mut model = MilpModel::new();
        let xs = model.new_vars(3);
        let xsum = model.cardinality(&xs);

        let assumptions = vec![lit(xs[0], true), lit(xs[1], true), lit(xs[2], false)];
        let result = model.solve(&assumptions);
        assert!(result.is_sat());
        assert_eq!(result.value_of(xsum[0]), Some(true));
        assert_eq!(result.value_of(xsum[1]), Some(true));
        assert_eq!(result.value_of(xsum[2]), Some(true));
        assert_eq!(result.value_of(xsum[3]), Some(false));
    }

    #[test]
    fn exclude_super_bans_the_full_set() {
        let mut model = MilpModel::new();
        let xs = model.new_vars(2);
        model.exclude_super(&xs);

        let all_true = vec![lit(xs[0], true), lit(xs[1], true)];
        assert_eq!(model.solve(&all_true), SolveResult::Unsat);
    }
}
