// src/dex/snapshot.rs
//! Streaming filter over the Raydium liquidity snapshot (`mainnet.json`).
//!
//! The snapshot is tens of megabytes. It is never materialized: the outer
//! object is walked key by key, the pool arrays element by element, and every
//! other value is skipped without building it.

use crate::dex::raydium_models::{Pool, SnapshotEntry};
use crate::error::SyncError;
use log::{debug, info};
use serde::de::value::MapAccessDeserializer;
use serde::de::{DeserializeSeed, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Top-level keys holding pool arrays. `unOfficial` is the live feed spelling.
pub const POOL_ARRAY_KEYS: &[&str] = &["official", "unofficial", "unOfficial"];

/// Selects pools owned by `program_id` that pair against `anchor_mint`.
#[derive(Debug, Clone)]
pub struct SnapshotFilter {
    program_id: String,
    anchor_mint: String,
}

#[derive(Debug, Default)]
struct FilterState {
    pools: Vec<Pool>,
    scanned: usize,
}

impl SnapshotFilter {
    pub fn new(program_id: impl Into<String>, anchor_mint: impl Into<String>) -> Self {
        Self {
            program_id: program_id.into(),
            anchor_mint: anchor_mint.into(),
        }
    }

    /// Filter predicate plus canonicalization for a single entry.
    pub fn accept(&self, entry: SnapshotEntry) -> Option<Pool> {
        if entry.program_id != self.program_id {
            return None;
        }
        Pool::from(entry).canonicalize(&self.anchor_mint)
    }

    pub fn filter_file<P: AsRef<Path>>(&self, path: P) -> Result<Vec<Pool>, SyncError> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| SyncError::Io(format!("failed to open {}: {}", path.display(), e)))?;
        self.filter_reader(BufReader::new(file))
    }

    pub fn filter_slice(&self, bytes: &[u8]) -> Result<Vec<Pool>, SyncError> {
        self.filter_reader(bytes)
    }

    /// Runs the filter over any reader. Buffer the reader for file/network input.
    pub fn filter_reader<R: Read>(&self, reader: R) -> Result<Vec<Pool>, SyncError> {
        let mut state = FilterState::default();
        let mut deserializer = serde_json::Deserializer::from_reader(reader);
        (&mut deserializer).deserialize_map(SnapshotVisitor {
            filter: self,
            state: &mut state,
        })?;
        deserializer.end()?;

        info!(
            "Snapshot filtered: {} entries scanned, {} pools matched",
            state.scanned,
            state.pools.len()
        );
        Ok(state.pools)
    }
}

struct SnapshotVisitor<'a> {
    filter: &'a SnapshotFilter,
    state: &'a mut FilterState,
}

impl<'de, 'a> Visitor<'de> for SnapshotVisitor<'a> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a liquidity snapshot object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<(), A::Error> {
        let SnapshotVisitor { filter, state } = self;
        while let Some(key) = map.next_key::<String>()? {
            if POOL_ARRAY_KEYS.contains(&key.as_str()) {
                debug!("Processing pool array '{}'", key);
                map.next_value_seed(PoolArraySeed {
                    filter,
                    state: &mut *state,
                })?;
            } else {
                debug!("Skipping snapshot key '{}'", key);
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(())
    }
}

struct PoolArraySeed<'a> {
    filter: &'a SnapshotFilter,
    state: &'a mut FilterState,
}

impl<'de, 'a> DeserializeSeed<'de> for PoolArraySeed<'a> {
    type Value = ();

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<(), D::Error> {
        deserializer.deserialize_seq(self)
    }
}

impl<'de, 'a> Visitor<'de> for PoolArraySeed<'a> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an array of pool entries")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<(), A::Error> {
        while let Some(entry) = seq.next_element_seed(EntrySeed)? {
            self.state.scanned += 1;
            if let Some(pool) = self.filter.accept(entry) {
                self.state.pools.push(pool);
            }
        }
        Ok(())
    }
}

/// Decodes one pool element. Only JSON objects are accepted; a positional
/// array would otherwise bind fields by order.
struct EntrySeed;

impl<'de> DeserializeSeed<'de> for EntrySeed {
    type Value = SnapshotEntry;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<SnapshotEntry, D::Error> {
        deserializer.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for EntrySeed {
    type Value = SnapshotEntry;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a pool entry object")
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<SnapshotEntry, A::Error> {
        SnapshotEntry::deserialize(MapAccessDeserializer::new(map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PROGRAM: &str = "X";
    const ANCHOR: &str = "ANCHOR";

    fn filter() -> SnapshotFilter {
        SnapshotFilter::new(PROGRAM, ANCHOR)
    }

    #[test]
    fn test_end_to_end_example_is_swapped() {
        let doc = r#"{"official":[{"id":"P1","programId":"X","baseMint":"ANCHOR","quoteMint":"T1","baseVault":"BV1","quoteVault":"QV1"}],"unofficial":[]}"#;
        let pools = filter().filter_slice(doc.as_bytes()).unwrap();
        assert_eq!(
            pools,
            vec![Pool {
                id: "P1".into(),
                program_id: "X".into(),
                base_mint: "T1".into(),
                quote_mint: "ANCHOR".into(),
                base_vault: "QV1".into(),
                quote_vault: "BV1".into(),
            }]
        );
    }

    #[test]
    fn test_filters_by_program_and_anchor() {
        let doc = r#"{
            "name": "Raydium Mainnet Liquidity Pools",
            "version": {"major": 1, "minor": 0, "patch": 0},
            "official": [
                {"id":"A","programId":"X","baseMint":"T1","quoteMint":"ANCHOR","baseVault":"b","quoteVault":"q"},
                {"id":"B","programId":"OTHER","baseMint":"T2","quoteMint":"ANCHOR"},
                {"id":"C","programId":"X","baseMint":"T3","quoteMint":"USDC"}
            ],
            "unOfficial": [
                {"id":"D","programId":"X","baseMint":"ANCHOR","quoteMint":"T4","baseVault":"b4","quoteVault":"q4"}
            ]
        }"#;
        let pools = filter().filter_slice(doc.as_bytes()).unwrap();
        let ids: Vec<&str> = pools.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "D"]);
        assert!(pools.iter().all(|p| p.quote_mint == ANCHOR));
        assert_eq!(pools[1].base_mint, "T4");
        assert_eq!(pools[1].base_vault, "q4");
    }

    #[test]
    fn test_keeps_duplicates_in_document_order() {
        let doc = r#"{"unofficial":[
                {"id":"U1","programId":"X","baseMint":"T1","quoteMint":"ANCHOR"}
            ],
            "official":[
                {"id":"O1","programId":"X","baseMint":"T1","quoteMint":"ANCHOR"},
                {"id":"O2","programId":"X","baseMint":"ANCHOR","quoteMint":"T1"}
            ]}"#;
        let pools = filter().filter_slice(doc.as_bytes()).unwrap();
        let ids: Vec<&str> = pools.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["U1", "O1", "O2"]);
        assert!(pools.iter().all(|p| p.base_mint == "T1"));
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        // No vaults and no id: still accepted because the predicate passes.
        let doc = r#"{"official":[{"programId":"X","baseMint":"T1","quoteMint":"ANCHOR"}]}"#;
        let pools = filter().filter_slice(doc.as_bytes()).unwrap();
        assert_eq!(pools.len(), 1);
        assert_eq!(pools[0].id, "");
        assert_eq!(pools[0].cache_value(), ",,");
    }

    #[test]
    fn test_document_without_pool_arrays_is_empty() {
        let pools = filter().filter_slice(br#"{"name":"x","tokens":[1,2,3]}"#).unwrap();
        assert!(pools.is_empty());
    }

    #[test]
    fn test_structural_errors_fail_whole_parse() {
        let cases: &[&str] = &[
            "",
            "[]",
            "\"official\"",
            r#"{"official":{"id":"P1"}}"#,
            r#"{"official":"nope"}"#,
            r#"{"official":[{"id":"P1","programId":"X","baseMint":"T1","quoteMint":"ANCHOR"}"#,
            r#"{"official":[{"id":"P1"},]}"#,
            r#"{"official":[], "unofficial":[] } trailing"#,
            r#"{"official":[[]]}"#,
            r#"{"official":[["P1","T1","BV1","QV1","X","ANCHOR"]]}"#,
            r#"{"unOfficial":[{"id":"P1"},["P2"]]}"#,
        ];
        for case in cases {
            let result = filter().filter_slice(case.as_bytes());
            assert!(
                matches!(result, Err(SyncError::SnapshotFormat(_))),
                "expected format error for {:?}, got {:?}",
                case,
                result
            );
        }
    }

    #[test]
    fn test_refiltering_is_idempotent() {
        let doc = r#"{"official":[
            {"id":"A","programId":"X","baseMint":"ANCHOR","quoteMint":"T1","baseVault":"1","quoteVault":"2"},
            {"id":"B","programId":"X","baseMint":"T2","quoteMint":"ANCHOR","baseVault":"3","quoteVault":"4"}
        ]}"#;
        let first = filter().filter_slice(doc.as_bytes()).unwrap();
        let second = filter().filter_slice(doc.as_bytes()).unwrap();
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = filter().filter_file("/definitely/not/here/mainnet.json");
        assert!(matches!(result, Err(SyncError::Io(_))));
    }
}
