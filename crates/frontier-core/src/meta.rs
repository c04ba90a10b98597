use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::sparse_set::SparseSet;

/// The result of looking up a classified vector's metadata.
///
/// Distinguishes "classified, but the caller stored no metadata" (`Unknown`) from the
/// absence of a cache entry entirely (which callers model as `Option<Meta<M>>` or simply
/// don't reach this type at all) — never collapsed into a null.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Meta<M> {
    Unknown,
    Present(M),
}

impl<M> Meta<M> {
    pub fn present(value: M) -> Self {
        Meta::Present(value)
    }

    pub fn into_option(self) -> Option<M> {
        match self {
            Meta::Unknown => None,
            Meta::Present(v) => Some(v),
        }
    }

    pub fn as_ref(&self) -> Meta<&M> {
        match self {
            Meta::Unknown => Meta::Unknown,
            Meta::Present(v) => Meta::Present(v),
        }
    }
}

impl<M> From<Option<M>> for Meta<M> {
    fn from(opt: Option<M>) -> Self {
        match opt {
            Some(v) => Meta::Present(v),
            None => Meta::Unknown,
        }
    }
}

/// A fixed-width bit vector: an integer value together with the number of bits it is
/// meaningful over. Used by metadata that records e.g. a fixed-width S-box input/output
/// difference rather than an arbitrary-size subset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub struct Bin {
    pub x: u128,
    pub n: u32,
}

impl Bin {
    pub fn new(x: u128, n: u32) -> Self {
        debug_assert!(n <= 128, "Bin only supports up to 128 bits");
        debug_assert!(n == 128 || x < (1u128 << n), "value does not fit in n bits");
        Bin { x, n }
    }
}

/// An open, JSON-value-like payload usable as a `Meta` type when the caller has no
/// statically-typed metadata of its own and instead wants a dynamically-tagged value.
///
/// This is a closed enumeration of the supported payload kinds rather than a runtime type
/// registry: decoding an unrecognized `"t"` tag is a hard error (`Error::StateCorrupt`).
#[derive(Clone, Debug, PartialEq)]
pub enum TaggedValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<TaggedValue>),
    Tuple(Vec<TaggedValue>),
    Set(Vec<TaggedValue>),
    Dict(Vec<(TaggedValue, TaggedValue)>),
    SparseSet(SparseSet),
    Bin(Bin),
}

impl Serialize for TaggedValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        match self {
            TaggedValue::Null => serializer.serialize_unit(),
            TaggedValue::Bool(b) => serializer.serialize_bool(*b),
            TaggedValue::Int(i) => serializer.serialize_i64(*i),
            TaggedValue::Float(f) => serializer.serialize_f64(*f),
            TaggedValue::Str(s) => serializer.serialize_str(s),
            // Built-in sequence kinds pass through without a wrapper.
            TaggedValue::List(items) => items.serialize(serializer),
            TaggedValue::Tuple(items) => items.serialize(serializer),
            TaggedValue::Set(items) => {
                let mut m = serializer.serialize_map(Some(2))?;
                m.serialize_entry("t", "set")?;
                m.serialize_entry("l", items)?;
                m.end()
            }
            TaggedValue::Dict(entries) => {
                let mut m = serializer.serialize_map(Some(2))?;
                m.serialize_entry("t", "dict")?;
                m.serialize_entry("d", entries)?;
                m.end()
            }
            TaggedValue::SparseSet(s) => s.serialize(serializer),
            TaggedValue::Bin(b) => {
                let mut m = serializer.serialize_map(Some(3))?;
                m.serialize_entry("t", "Bin")?;
                m.serialize_entry("x", &b.x.to_string())?;
                m.serialize_entry("n", &b.n)?;
                m.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for TaggedValue {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        tagged_from_json(value).map_err(serde::de::Error::custom)
    }
}

fn tagged_from_json(value: serde_json::Value) -> Result<TaggedValue, String> {
    use serde_json::Value;
    match value {
        Value::Null => Ok(TaggedValue::Null),
        Value::Bool(b) => Ok(TaggedValue::Bool(b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(TaggedValue::Int(i))
            } else if let Some(f) = n.as_f64() {
                Ok(TaggedValue::Float(f))
            } else {
                Err(format!("unsupported number {n}"))
            }
        }
        Value::String(s) => Ok(TaggedValue::Str(s)),
        Value::Array(items) => {
            let items = items
                .into_iter()
                .map(tagged_from_json)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(TaggedValue::List(items))
        }
        Value::Object(mut map) => {
            let tag = map
                .remove("t")
                .and_then(|v| v.as_str().map(str::to_owned))
                .ok_or_else(|| "missing \"t\" tag on compound value".to_string())?;
            match tag.as_str() {
                "set" => {
                    let items = map
                        .remove("l")
                        .ok_or_else(|| "\"set\" missing \"l\"".to_string())?;
                    let Value::Array(items) = items else {
                        return Err("\"set\".\"l\" must be an array".into());
                    };
                    Ok(TaggedValue::Set(
                        items.into_iter().map(tagged_from_json).collect::<Result<_, _>>()?,
                    ))
                }
                "dict" => {
                    let entries = map
                        .remove("d")
                        .ok_or_else(|| "\"dict\" missing \"d\"".to_string())?;
                    let Value::Array(entries) = entries else {
                        return Err("\"dict\".\"d\" must be an array".into());
                    };
                    let mut out = Vec::with_capacity(entries.len());
                    for entry in entries {
                        let Value::Array(pair) = entry else {
                            return Err("dict entry must be a [key, value] pair".into());
                        };
                        let mut it = pair.into_iter();
                        let k = it.next().ok_or_else(|| "missing dict key".to_string())?;
                        let v = it.next().ok_or_else(|| "missing dict value".to_string())?;
                        out.push((tagged_from_json(k)?, tagged_from_json(v)?));
                    }
                    Ok(TaggedValue::Dict(out))
                }
                "SparseSet" => {
                    let l = map
                        .remove("l")
                        .ok_or_else(|| "\"SparseSet\" missing \"l\"".to_string())?;
                    let elems: Vec<u32> =
                        serde_json::from_value(l).map_err(|e| format!("bad SparseSet.l: {e}"))?;
                    Ok(TaggedValue::SparseSet(SparseSet::from_iter(elems)))
                }
                "Bin" => {
                    let x = map
                        .remove("x")
                        .ok_or_else(|| "\"Bin\" missing \"x\"".to_string())?;
                    let x: u128 = match x {
                        Value::String(s) => s.parse().map_err(|e| format!("bad Bin.x: {e}"))?,
                        Value::Number(n) => n
                            .as_u64()
                            .ok_or_else(|| "bad Bin.x".to_string())? as u128,
                        _ => return Err("bad Bin.x type".into()),
                    };
                    let n = map
                        .remove("n")
                        .and_then(|v| v.as_u64())
                        .ok_or_else(|| "\"Bin\" missing \"n\"".to_string())? as u32;
                    Ok(TaggedValue::Bin(Bin::new(x, n)))
                }
                other => Err(format!("unrecognized tag {other:?}")),
            }
        }
    }
}

/// Hashable wrapper used only to let a [`TaggedValue`] serve as a meta-map *key* (the
/// "dict carries arbitrary hashable keys as a list of `[key, value]` pairs" guarantee of
/// the persistence contract). Equality/ordering are structural on a canonical textual
/// form, since floats have no total order and `TaggedValue` itself is not `Eq`/`Hash`.
pub fn tagged_sort_key(v: &TaggedValue) -> String {
    fn go(v: &TaggedValue, out: &mut String) {
        match v {
            TaggedValue::Null => out.push_str("n"),
            TaggedValue::Bool(b) => out.push_str(if *b { "t1" } else { "t0" }),
            TaggedValue::Int(i) => out.push_str(&format!("i{i}")),
            TaggedValue::Float(f) => out.push_str(&format!("f{f}")),
            TaggedValue::Str(s) => out.push_str(&format!("s{s}")),
            TaggedValue::List(xs) | TaggedValue::Tuple(xs) | TaggedValue::Set(xs) => {
                out.push('[');
                for x in xs {
                    go(x, out);
                    out.push(',');
                }
                out.push(']');
            }
            TaggedValue::Dict(entries) => {
                out.push('{');
                for (k, val) in entries {
                    go(k, out);
                    out.push(':');
                    go(val, out);
                    out.push(',');
                }
                out.push('}');
            }
            TaggedValue::SparseSet(s) => {
                out.push_str("S(");
                for e in s.iter() {
                    out.push_str(&e.to_string());
                    out.push(',');
                }
                out.push(')');
            }
            TaggedValue::Bin(b) => out.push_str(&format!("B({},{})", b.x, b.n)),
        }
    }
    let mut s = String::new();
    go(v, &mut s);
    s
}

/// Convenience constructor for a plain `dict` with `TaggedValue` keys: callers build one
/// from a `BTreeMap` keyed by the value's canonical sort key when they need deterministic
/// iteration order.
pub fn dict_from_sorted(entries: BTreeMap<String, (TaggedValue, TaggedValue)>) -> TaggedValue {
    TaggedValue::Dict(entries.into_values().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_value_round_trips_through_json() {
        let v = TaggedValue::Dict(vec![
            (TaggedValue::Str("a".into()), TaggedValue::Int(1)),
            (
                TaggedValue::SparseSet(SparseSet::from_iter([1, 2, 3])),
                TaggedValue::Set(vec![TaggedValue::Bool(true), TaggedValue::Null]),
            ),
            (TaggedValue::Int(7), TaggedValue::Bin(Bin::new(5, 4))),
        ]);
        let s = serde_json::to_string(&v).unwrap();
        let back: TaggedValue = serde_json::from_str(&s).unwrap();
        assert_eq!(v, back);
    }

    #[test]
    fn meta_unknown_is_not_a_null() {
        let m: Meta<u32> = Meta::Unknown;
        assert_eq!(m.into_option(), None);
        let m2: Meta<u32> = Meta::from(Some(3));
        assert_eq!(m2, Meta::Present(3));
    }
}
