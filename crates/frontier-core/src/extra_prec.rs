use fnv::FnvHashMap;
use std::collections::HashSet;

use crate::sparse_set::SparseSet;

/// A pair of abstraction functions projecting a raw ground-set vector to its canonical
/// prime form before (`reduce`) or after (`expand`) an oracle call, used when the ground
/// elements themselves carry extra partial-order structure (see `LowerSetExtraPrec`
/// below for the concrete instance this crate ships).
///
/// Both functions must be idempotent on the side they serve: `reduce(reduce(v)) ==
/// reduce(v)` and `expand(expand(v)) == expand(v)`.
pub trait ExtraPrec {
    /// "MaxSet": keep only the maximal points of `v` under the ambient poset.
    fn reduce(&self, v: &SparseSet) -> SparseSet;
    /// "LowerClosure": every point reachable from `v` by repeatedly stepping to a point
    /// immediately below it.
    fn expand(&self, v: &SparseSet) -> SparseSet;
}

/// The no-op `ExtraPrec`, for ground sets with no extra poset structure.
#[derive(Clone, Copy, Debug, Default)]
pub struct Identity;

impl ExtraPrec for Identity {
    fn reduce(&self, v: &SparseSet) -> SparseSet {
        v.clone()
    }
    fn expand(&self, v: &SparseSet) -> SparseSet {
        v.clone()
    }
}

/// Maps ground-set indices to points of an ambient poset (each point itself represented
/// as the `SparseSet` of coordinates where it is "on"), and back. `reduce` computes the
/// maximal points (`MaxSet`); `expand` computes their downward closure (`LowerClosure`)
/// via an explicit work-stack BFS over `neibs_down` rather than a queue — traversal order
/// doesn't affect the result, only bookkeeping, so a stack avoids a deque dependency for
/// no benefit.
pub struct LowerSetExtraPrec {
    int2point: Vec<SparseSet>,
    point2int: FnvHashMap<SparseSet, u32>,
}

impl LowerSetExtraPrec {
    /// `points` is indexed by ground-set index `i`: `points[i]` is the poset point that
    /// index `i` stands for.
    pub fn new(points: Vec<SparseSet>) -> Self {
        let point2int = points
            .iter()
            .enumerate()
            .map(|(i, p)| (p.clone(), i as u32))
            .collect();
        LowerSetExtraPrec { int2point: points, point2int }
    }

    fn point_of(&self, i: u32) -> &SparseSet {
        &self.int2point[i as usize]
    }
}

impl ExtraPrec for LowerSetExtraPrec {
    fn reduce(&self, v: &SparseSet) -> SparseSet {
        let points: Vec<&SparseSet> = v.iter().map(|i| self.point_of(i)).collect();
        let mut res = Vec::new();
        for p in &points {
            let dominated = points.iter().any(|q| p.is_strict_subset_of(q));
            if !dominated {
                res.push(self.point2int[*p]);
            }
        }
        SparseSet::from_iter(res)
    }

    fn expand(&self, v: &SparseSet) -> SparseSet {
        let seeds: Vec<SparseSet> = v.iter().map(|i| self.point_of(i).clone()).collect();

        let mut visited: HashSet<SparseSet> = seeds.iter().cloned().collect();
        let mut stack: Vec<SparseSet> = seeds;

        while let Some(q) = stack.pop() {
            for sub in q.neibs_down() {
                if visited.insert(sub.clone()) {
                    stack.push(sub);
                }
            }
        }

        let res = visited.into_iter().filter_map(|q| self.point2int.get(&q).copied());
        SparseSet::from_iter(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_poset() -> LowerSetExtraPrec {
        // Three ground indices standing for points 0 < {0,1} < {0,1,2} in the subset
        // order, i.e. a simple 3-element chain.
        LowerSetExtraPrec::new(vec![
            SparseSet::from_iter([0]),
            SparseSet::from_iter([0, 1]),
            SparseSet::from_iter([0, 1, 2]),
        ])
    }

    #[test]
    fn reduce_keeps_only_maximal_points() {
        let ep = chain_poset();
        let v = SparseSet::from_iter([0, 1, 2]); // all three points
        assert_eq!(ep.reduce(&v), SparseSet::from_iter([2]));
    }

    #[test]
    fn expand_adds_the_downward_closure() {
        let ep = chain_poset();
        let v = SparseSet::from_iter([2]); // the top point only
        assert_eq!(ep.expand(&v), SparseSet::from_iter([0, 1, 2]));
    }

    #[test]
    fn reduce_and_expand_are_idempotent() {
        let ep = chain_poset();
        let v = SparseSet::from_iter([0, 1, 2]);
        let r = ep.reduce(&v);
        assert_eq!(ep.reduce(&r), r);
        let e = ep.expand(&v);
        assert_eq!(ep.expand(&e), e);
    }
}
