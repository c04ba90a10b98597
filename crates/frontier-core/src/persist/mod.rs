//! On-disk persistence for a [`crate::KnowledgeBase`]: a JSON payload, compressed with
//! bzip2, written atomically via temp-file-then-rename.
//!
//! The top-level payload is the tuple `(DATA_VERSION, lower, upper, is_complete_lower,
//! is_complete_upper, meta, n)`. `lower`/`upper` are plain JSON arrays of
//! [`crate::SparseSet`] (each already self-tagging via its own `Serialize` impl); the
//! meta map is carried as a list of `[key, value]` pairs rather than a JSON object, since
//! neither `SparseSet` nor JSON's string-keyed objects can represent it directly — the
//! same reason the tagged-value codec turns every `dict` into `{"t": "dict", "d": [...]}`.

use bzip2::read::BzDecoder;
use bzip2::write::BzEncoder;
use bzip2::Compression;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;

use crate::error::Error;
use crate::knowledge_base::KnowledgeBase;
use crate::macros::log_info;
use crate::sparse_set::SparseSet;

pub const DATA_VERSION: u32 = 4;

#[derive(Serialize, Deserialize)]
pub struct PersistedState<M> {
    pub version: u32,
    pub lower: Vec<SparseSet>,
    pub upper: Vec<SparseSet>,
    pub is_complete_lower: bool,
    pub is_complete_upper: bool,
    #[serde(with = "meta_as_pairs")]
    pub meta: Vec<(SparseSet, M)>,
    pub n: usize,
}

/// Serializes a `Vec<(SparseSet, M)>` as a JSON array of `[key, value]` pairs — the
/// "dicts carry their entries as a list of pairs" rule from the persistence contract,
/// applied here directly since we already keep the meta map as a `Vec` rather than a
/// `HashMap` for serialization purposes.
mod meta_as_pairs {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer, M: Serialize>(
        pairs: &[(SparseSet, M)],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        pairs.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>, M: Deserialize<'de>>(
        deserializer: D,
    ) -> Result<Vec<(SparseSet, M)>, D::Error> {
        Vec::<(SparseSet, M)>::deserialize(deserializer)
    }
}

pub fn save_state<M>(path: &Path, kb: &KnowledgeBase<M>) -> Result<(), Error>
where
    M: Clone + Serialize + for<'de> Deserialize<'de>,
{
    let state = kb.snapshot();
    let json = serde_json::to_vec(&state)?;

    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
    let tmp = tempfile::NamedTempFile::new_in(dir)?;

    {
        let mut encoder = BzEncoder::new(tmp.as_file(), Compression::best());
        encoder.write_all(&json)?;
        encoder.finish()?;
    }

    // Atomic on the happy path: same filesystem, single rename.
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    log_info!("saved state to file {}", path.display());
    Ok(())
}

pub fn load_state<M>(path: &Path, expected_n: usize) -> Result<PersistedState<M>, Error>
where
    M: for<'de> Deserialize<'de>,
{
    let file = std::fs::File::open(path)?;
    let mut decoder = BzDecoder::new(file);
    let mut json = Vec::new();
    decoder
        .read_to_end(&mut json)
        .map_err(|e| Error::StateCorrupt(format!("bzip2 decompression failed: {e}")))?;

    let state: PersistedState<M> = serde_json::from_slice(&json)
        .map_err(|e| Error::StateCorrupt(format!("json parse failed: {e}")))?;

    if state.version != DATA_VERSION {
        return Err(Error::StateVersionMismatch(format!(
            "file has version {}, expected {}",
            state.version, DATA_VERSION
        )));
    }
    if state.n != expected_n {
        return Err(Error::StateVersionMismatch(format!(
            "file has n={}, expected n={}",
            state.n, expected_n
        )));
    }

    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn save_then_load_round_trips() {
        let mut kb: KnowledgeBase<u32> = KnowledgeBase::new(6);
        kb.add_lower(SparseSet::from_iter([0]), Some(1), true);
        kb.add_lower(SparseSet::from_iter([1]), None, true);
        kb.add_lower(SparseSet::from_iter([2]), Some(2), true);
        kb.add_upper(SparseSet::from_iter([0, 1, 2]), Some(9), true);
        kb.add_upper(SparseSet::from_iter([3, 4]), None, true);
        kb.set_complete_lower();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.bin");
        save_state(&path, &kb).unwrap();

        let loaded = load_state::<u32>(&path, 6).unwrap();
        assert_eq!(loaded.version, DATA_VERSION);
        assert_eq!(loaded.n, 6);
        assert!(loaded.is_complete_lower);
        assert!(!loaded.is_complete_upper);

        let lower: std::collections::HashSet<_> = loaded.lower.into_iter().collect();
        assert_eq!(
            lower,
            [
                SparseSet::from_iter([0]),
                SparseSet::from_iter([1]),
                SparseSet::from_iter([2])
            ]
            .into_iter()
            .collect()
        );

        let meta: HashMap<_, _> = loaded.meta.into_iter().collect();
        assert_eq!(meta.get(&SparseSet::from_iter([0])), Some(&1));
        assert_eq!(meta.get(&SparseSet::from_iter([1])), None);
    }

    #[test]
    fn version_mismatch_is_rejected() {
        let mut kb: KnowledgeBase<()> = KnowledgeBase::new(3);
        kb.add_lower(SparseSet::from_iter([0]), None, true);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.bin");
        save_state(&path, &kb).unwrap();

        let err = load_state::<()>(&path, 4).unwrap_err();
        assert!(matches!(err, Error::StateVersionMismatch(_)));
    }

    #[test]
    fn corrupt_file_is_reported_as_state_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.bin");
        std::fs::write(&path, b"not a bzip2 stream").unwrap();

        let err = load_state::<()>(&path, 3).unwrap_err();
        assert!(matches!(err, Error::StateCorrupt(_)));
    }
}
