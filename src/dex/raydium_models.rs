// src/dex/raydium_models.rs
//! Data models for Raydium liquidity pools and their cache representation

use crate::error::SyncError;
use serde::de::{self, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical pool record.
///
/// After [`Pool::canonicalize`] the anchor mint is always on the quote side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pool {
    /// Pool ID (address)
    pub id: String,
    /// Program owning the pool
    pub program_id: String,
    pub base_mint: String,
    pub quote_mint: String,
    pub base_vault: String,
    pub quote_vault: String,
}

impl Pool {
    /// Puts `anchor` on the quote side, swapping mints and vaults as a pair.
    ///
    /// Returns `None` unless exactly one side equals `anchor`.
    pub fn canonicalize(mut self, anchor: &str) -> Option<Pool> {
        let base_is_anchor = self.base_mint == anchor;
        let quote_is_anchor = self.quote_mint == anchor;
        match (base_is_anchor, quote_is_anchor) {
            (false, true) => Some(self),
            (true, false) => {
                std::mem::swap(&mut self.base_mint, &mut self.quote_mint);
                std::mem::swap(&mut self.base_vault, &mut self.quote_vault);
                Some(self)
            }
            _ => None,
        }
    }

    /// Cache key: the distinguishing (non-anchor) mint.
    pub fn cache_key(&self) -> &str {
        &self.base_mint
    }

    pub fn cache_value(&self) -> String {
        PoolKeys::from(self).to_string()
    }
}

/// The value stored under a mint key: `id,baseVault,quoteVault`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolKeys {
    pub pool_id: String,
    pub base_vault: String,
    pub quote_vault: String,
}

impl From<&Pool> for PoolKeys {
    fn from(pool: &Pool) -> Self {
        Self {
            pool_id: pool.id.clone(),
            base_vault: pool.base_vault.clone(),
            quote_vault: pool.quote_vault.clone(),
        }
    }
}

impl fmt::Display for PoolKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.pool_id, self.base_vault, self.quote_vault)
    }
}

impl FromStr for PoolKeys {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(',');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(pool_id), Some(base_vault), Some(quote_vault), None) => Ok(Self {
                pool_id: pool_id.to_string(),
                base_vault: base_vault.to_string(),
                quote_vault: quote_vault.to_string(),
            }),
            _ => Err(SyncError::Decode(format!(
                "expected 'poolId,baseVault,quoteVault', got '{}'",
                s
            ))),
        }
    }
}

/// One element of the `official`/`unOfficial` arrays of the liquidity snapshot.
///
/// Every field is optional and tolerant of wrong JSON types: anything that is
/// not a string becomes an empty string. Unknown fields are skipped.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEntry {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub base_mint: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub base_vault: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub quote_vault: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub program_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub quote_mint: String,
}

impl From<SnapshotEntry> for Pool {
    fn from(entry: SnapshotEntry) -> Self {
        Pool {
            id: entry.id,
            program_id: entry.program_id,
            base_mint: entry.base_mint,
            quote_mint: entry.quote_mint,
            base_vault: entry.base_vault,
            quote_vault: entry.quote_vault,
        }
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(LenientStringVisitor)
}

/// Accepts any JSON value, keeps strings, drains everything else.
struct LenientStringVisitor;

impl<'de> Visitor<'de> for LenientStringVisitor {
    type Value = String;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<String, E> {
        Ok(v)
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<String, E> {
        Ok(String::new())
    }

    fn visit_i64<E: de::Error>(self, _: i64) -> Result<String, E> {
        Ok(String::new())
    }

    fn visit_u64<E: de::Error>(self, _: u64) -> Result<String, E> {
        Ok(String::new())
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> Result<String, E> {
        Ok(String::new())
    }

    fn visit_unit<E: de::Error>(self) -> Result<String, E> {
        Ok(String::new())
    }

    fn visit_none<E: de::Error>(self) -> Result<String, E> {
        Ok(String::new())
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<String, A::Error> {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(String::new())
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<String, A::Error> {
        while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
        Ok(String::new())
    }
}
