use super::{lit, ConstraintModel, Lit, SolveResult, VarId};

/// The SAT backend contract this crate consumes: a solver constructed by name,
/// capable of allocating variables, accepting clauses over signed literals, and solving
/// under a list of assumption literals.
pub trait SatBackend {
    fn new(solver_name: &str) -> Self
    where
        Self: Sized;
    fn new_var(&mut self) -> VarId;
    fn add_clause(&mut self, lits: &[Lit]);
    fn solve(&mut self, assumptions: &[Lit]) -> SolveResult;
}

/// A value flowing through the cardinality encoding's Tseitin construction: either a
/// solver literal, or a compile-time-known constant that lets the encoder fold away
/// trivial AND/OR gates (e.g. "at least 0 of the first i" is always true) without
/// spending a variable or a clause on them.
enum Node {
    True,
    False,
    Lit(Lit),
}

/// [`ConstraintModel`] implemented over any [`SatBackend`]. Exclusions translate
/// directly into single clauses; the cardinality encoding is a textbook
/// sequential-counter (Sinz) construction generalized to expose every threshold
/// `0..=n`, not just one fixed `k`, since [`crate::learn::gainanov::GainanovSat`] needs
/// to assume over an arbitrary level.
pub struct SatModel<B> {
    backend: B,
}

impl<B: SatBackend> SatModel<B> {
    pub fn new(solver_name: &str) -> Self {
        SatModel { backend: B::new(solver_name) }
    }

    fn and_node(&mut self, a: Node, b: Node) -> Node {
        match (a, b) {
            (Node::False, _) | (_, Node::False) => Node::False,
            (Node::True, x) | (x, Node::True) => x,
            (Node::Lit(la), Node::Lit(lb)) => {
                let s = lit(self.backend.new_var(), true);
                self.backend.add_clause(&[-s, la]);
                self.backend.add_clause(&[-s, lb]);
                self.backend.add_clause(&[-la, -lb, s]);
                Node::Lit(s)
            }
        }
    }

    fn or_node(&mut self, a: Node, b: Node) -> Node {
        match (a, b) {
            (Node::True, _) | (_, Node::True) => Node::True,
            (Node::False, x) | (x, Node::False) => x,
            (Node::Lit(la), Node::Lit(lb)) => {
                let s = lit(self.backend.new_var(), true);
                self.backend.add_clause(&[-la, s]);
                self.backend.add_clause(&[-lb, s]);
                self.backend.add_clause(&[-s, la, lb]);
                Node::Lit(s)
            }
        }
    }
}

impl<B: SatBackend> ConstraintModel for SatModel<B> {
    fn new_vars(&mut self, n: usize) -> Vec<VarId> {
        (0..n).map(|_| self.backend.new_var()).collect()
    }

    fn exclude_sub(&mut self, complement_of_l: &[VarId]) {
        let clause: Vec<Lit> = complement_of_l.iter().map(|&v| lit(v, true)).collect();
        self.backend.add_clause(&clause);
    }

    fn exclude_super(&mut self, u: &[VarId]) {
        let clause: Vec<Lit> = u.iter().map(|&v| lit(v, false)).collect();
        self.backend.add_clause(&clause);
    }

    /// Returns `xsum` of length `xs.len() + 1`, one `VarId` per threshold `0..=xs.len()`.
    /// `xsum[0]` ("at least zero ones") is vacuously true; rather than leak that as an
    /// `Option<VarId>` through the trait, it gets its own variable pinned true by a unit
    /// clause, same as every other threshold.
    fn cardinality(&mut self, xs: &[VarId]) -> Vec<VarId> {
        let mut cur: Vec<Node> = vec![Node::True];

        for &x in xs {
            let x_lit = lit(x, true);
            let mut next: Vec<Node> = Vec::with_capacity(cur.len() + 1);
            next.push(Node::True);
            for j in 1..cur.len() {
                let carry = match &cur[j - 1] {
                    Node::True => Node::Lit(x_lit),
                    Node::False => Node::False,
                    Node::Lit(l) => self.and_node(Node::Lit(*l), Node::Lit(x_lit)),
                };
                let kept = match &cur[j] {
                    Node::True => Node::True,
                    Node::False => Node::False,
                    Node::Lit(l) => Node::Lit(*l),
                };
                next.push(self.or_node(kept, carry));
            }
            // "at least (i) of first i": AND of everything so far and x_i.
            let top = match cur.last().unwrap() {
                Node::True => Node::Lit(x_lit),
                Node::False => Node::False,
                Node::Lit(l) => self.and_node(Node::Lit(*l), Node::Lit(x_lit)),
            };
            next.push(top);
            cur = next;
        }

        // Materialize every register as a real literal (folding True/False constants
        // into a freshly-asserted always-true/always-false variable) so the return type
        // stays a plain `Vec<VarId>`, matching the trait signature; index 0 becomes a
        // variable asserted true by a unit clause rather than a free pass, since the
        // trait promises one VarId per threshold.
        cur.into_iter()
            .map(|node| match node {
                Node::Lit(l) => self.var_for(l),
                Node::True => {
                    let v = self.backend.new_var();
                    self.backend.add_clause(&[lit(v, true)]);
                    v
                }
                Node::False => {
                    let v = self.backend.new_var();
                    self.backend.add_clause(&[lit(v, false)]);
                    v
                }
            })
            .collect()
    }

    fn solve(&mut self, assumptions: &[Lit]) -> SolveResult {
        self.backend.solve(assumptions)
    }
}

impl<B: SatBackend> SatModel<B> {
    /// A literal is already "a variable, possibly negated"; when it happens to be
    /// negative we need a genuine positive-polarity `VarId` handle to hand back, so we
    /// introduce one more variable bound to it by a biconditional unit pair.
    fn var_for(&mut self, l: Lit) -> VarId {
        if super::lit_polarity(l) {
            return super::lit_var(l);
        }
        let v = self.backend.new_var();
        let vl = lit(v, true);
        self.backend.add_clause(&[-vl, l]);
        self.backend.add_clause(&[vl, -l]);
        v
    }
}
