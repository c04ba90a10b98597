use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::fmt;

/// An immutable, ordered subset of `{0, ..., N-1}`.
///
/// Stored as a sorted, deduplicated vector of indices, inline up to 8 elements (the common
/// case for frontier vectors discovered by the walks) and spilling to the heap beyond that,
/// the way hot interior collections here favor `smallvec` over a plain `Vec`.
/// Equality and hashing only ever see the sorted form, so two `SparseSet`s built from the
/// same elements in different orders compare and hash identically.
#[derive(Clone, Eq, PartialEq, Hash, Default)]
pub struct SparseSet {
    elems: SmallVec<[u32; 8]>,
}

impl SparseSet {
    /// The empty set.
    pub fn empty() -> Self {
        SparseSet { elems: SmallVec::new() }
    }

    /// The full set `{0, ..., n-1}`.
    pub fn full(n: usize) -> Self {
        SparseSet { elems: (0..n as u32).collect() }
    }

    /// Builds a `SparseSet` from an arbitrary (possibly unsorted, possibly duplicated)
    /// iterator of indices.
    pub fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        let mut elems: SmallVec<[u32; 8]> = iter.into_iter().collect();
        elems.sort_unstable();
        elems.dedup();
        SparseSet { elems }
    }

    pub fn len(&self) -> usize {
        self.elems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    /// Hamming weight: alias of `len`, spelled out at call sites that reason about
    /// weight-by-weight enumeration rather than "set size".
    pub fn weight(&self) -> usize {
        self.elems.len()
    }

    pub fn contains(&self, i: u32) -> bool {
        self.elems.binary_search(&i).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.elems.iter().copied()
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.elems
    }

    /// `self ⊆ other`.
    pub fn is_subset_of(&self, other: &SparseSet) -> bool {
        self.elems.iter().all(|i| other.contains(*i))
    }

    /// `self ⊂ other` (proper subset).
    pub fn is_strict_subset_of(&self, other: &SparseSet) -> bool {
        self.len() < other.len() && self.is_subset_of(other)
    }

    /// `S ∪ {i}`. A no-op (returns a clone) if `i` is already present.
    pub fn union_elem(&self, i: u32) -> SparseSet {
        if self.contains(i) {
            return self.clone();
        }
        let mut elems = self.elems.clone();
        elems.push(i);
        elems.sort_unstable();
        SparseSet { elems }
    }

    /// `S \ {i}`. A no-op (returns a clone) if `i` is absent.
    pub fn diff_elem(&self, i: u32) -> SparseSet {
        if !self.contains(i) {
            return self.clone();
        }
        SparseSet {
            elems: self.elems.iter().copied().filter(|&x| x != i).collect(),
        }
    }

    /// `A \ B`, full set difference.
    pub fn difference(&self, other: &SparseSet) -> SparseSet {
        SparseSet {
            elems: self.elems.iter().copied().filter(|i| !other.contains(*i)).collect(),
        }
    }

    /// `{ S ∪ {i} : i ∉ S, 0 ≤ i < n }`.
    pub fn neibs_up(&self, n: usize) -> Vec<SparseSet> {
        (0..n as u32)
            .filter(|i| !self.contains(*i))
            .map(|i| self.union_elem(i))
            .collect()
    }

    /// `{ S \ {i} : i ∈ S }`.
    pub fn neibs_down(&self) -> Vec<SparseSet> {
        self.elems.iter().map(|&i| self.diff_elem(i)).collect()
    }
}

impl std::ops::Sub<u32> for &SparseSet {
    type Output = SparseSet;
    fn sub(self, i: u32) -> SparseSet {
        self.diff_elem(i)
    }
}

impl std::ops::BitOr<u32> for &SparseSet {
    type Output = SparseSet;
    fn bitor(self, i: u32) -> SparseSet {
        self.union_elem(i)
    }
}

impl std::ops::Sub<&SparseSet> for &SparseSet {
    type Output = SparseSet;
    fn sub(self, other: &SparseSet) -> SparseSet {
        self.difference(other)
    }
}

/// Subset ordering is a partial order: two sets with elements on both sides are
/// incomparable, hence `PartialOrd` (not `Ord`).
impl PartialOrd for SparseSet {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self == other {
            Some(Ordering::Equal)
        } else if self.is_subset_of(other) {
            Some(Ordering::Less)
        } else if other.is_subset_of(self) {
            Some(Ordering::Greater)
        } else {
            None
        }
    }
}

impl fmt::Debug for SparseSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (idx, e) in self.elems.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", e)?;
        }
        write!(f, "}}")
    }
}

impl FromIterator<u32> for SparseSet {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        SparseSet::from_iter(iter)
    }
}

/// Wire shape: `{"t": "SparseSet", "l": [i0, i1, ...]}`, matching the type-tagging codec
/// of the persisted-state format so a `SparseSet` round-trips the same way regardless of
/// where in the knowledge base it appears (a bare lower/upper element, a meta-map key, ...).
impl Serialize for SparseSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("SparseSet", 2)?;
        s.serialize_field("t", "SparseSet")?;
        s.serialize_field("l", self.elems.as_slice())?;
        s.end()
    }
}

impl<'de> Deserialize<'de> for SparseSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct SparseSetVisitor;

        impl<'de> Visitor<'de> for SparseSetVisitor {
            type Value = SparseSet;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "a {{\"t\": \"SparseSet\", \"l\": [...]}} object")
            }

            fn visit_map<A: de::MapAccess<'de>>(self, mut map: A) -> std::result::Result<SparseSet, A::Error> {
                let mut tag: Option<String> = None;
                let mut list: Option<Vec<u32>> = None;
                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "t" => tag = Some(map.next_value()?),
                        "l" => list = Some(map.next_value()?),
                        _ => {
                            let _ignored: serde::de::IgnoredAny = map.next_value()?;
                        }
                    }
                }
                if tag.as_deref() != Some("SparseSet") {
                    return Err(de::Error::custom("expected tag \"SparseSet\""));
                }
                let list = list.ok_or_else(|| de::Error::missing_field("l"))?;
                Ok(SparseSet::from_iter(list))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, seq: A) -> std::result::Result<SparseSet, A::Error> {
                // Accept a bare array too, for forward compatibility with untagged writers.
                let elems: Vec<u32> = de::Deserialize::deserialize(de::value::SeqAccessDeserializer::new(seq))?;
                Ok(SparseSet::from_iter(elems))
            }
        }

        deserializer.deserialize_any(SparseSetVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_eq_ignore_insertion_order() {
        let a = SparseSet::from_iter([3, 1, 2]);
        let b = SparseSet::from_iter([1, 2, 3]);
        assert_eq!(a, b);

        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};
        let mut ha = DefaultHasher::new();
        a.hash(&mut ha);
        let mut hb = DefaultHasher::new();
        b.hash(&mut hb);
        assert_eq!(ha.finish(), hb.finish());
    }

    #[test]
    fn subset_ordering_is_partial() {
        let a = SparseSet::from_iter([0, 1]);
        let b = SparseSet::from_iter([0, 1, 2]);
        let c = SparseSet::from_iter([0, 2]);
        assert!(a < b);
        assert!(a.partial_cmp(&c).is_none());
        assert_eq!(a.partial_cmp(&a), Some(Ordering::Equal));
    }

    #[test]
    fn union_and_diff_elem_roundtrip() {
        let a = SparseSet::from_iter([0, 2]);
        let b = (&a) | 1;
        assert_eq!(b, SparseSet::from_iter([0, 1, 2]));
        let c = (&b) - 1;
        assert_eq!(c, a);
    }

    #[test]
    fn neibs_up_and_down() {
        let a = SparseSet::from_iter([1]);
        let mut up: Vec<_> = a.neibs_up(3).into_iter().collect();
        up.sort_by_key(|s| s.as_slice().to_vec());
        assert_eq!(
            up,
            vec![SparseSet::from_iter([0, 1]), SparseSet::from_iter([1, 2])]
        );

        let b = SparseSet::from_iter([0, 1]);
        let mut down = b.neibs_down();
        down.sort_by_key(|s| s.as_slice().to_vec());
        assert_eq!(down, vec![SparseSet::from_iter([0]), SparseSet::from_iter([1])]);
    }

    #[test]
    fn set_difference() {
        let a = SparseSet::from_iter([0, 1, 2]);
        let b = SparseSet::from_iter([1]);
        assert_eq!(a.difference(&b), SparseSet::from_iter([0, 2]));
    }
}
