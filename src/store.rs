//! One row per stored path. Row key: bit length (u16, big-endian) followed
//! by the key bytes. Row value: the bincode-encoded bundle.

use std::path::Path;

use rocksdb::{IteratorMode, WriteBatch, DB};
use tracing::info;

use crate::dictionary::{BitKey, Bundle, PrefixDict};
use crate::error::{DnsError, Result};

pub struct SnapshotStore {
    db: DB,
}

fn row_key(key: &BitKey) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + key.as_bytes().len());
    out.extend_from_slice(&(key.len() as u16).to_be_bytes());
    out.extend_from_slice(key.as_bytes());
    return out;
}

fn parse_row_key(row: &[u8]) -> Result<BitKey> {
    if row.len() < 2 {
        return Err(DnsError::CorruptSnapshot(format!("row key of {} bytes", row.len())));
    }
    let len = u16::from_be_bytes([row[0], row[1]]) as usize;
    let bytes = &row[2..];
    if (len + 7) / 8 != bytes.len() {
        return Err(DnsError::CorruptSnapshot(format!("{} bits in {} bytes", len, bytes.len())));
    }
    return Ok(BitKey::from_bits(bytes, len));
}

impl SnapshotStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<SnapshotStore> {
        let db = DB::open_default(path)?;
        return Ok(SnapshotStore { db });
    }

    /// Replaces whatever was saved before with `dict`.
    pub fn save(&self, dict: &PrefixDict) -> Result<()> {
        let mut batch = WriteBatch::default();
        for (row, _) in self.db.iterator(IteratorMode::Start) {
            batch.delete(&row);
        }
        let entries = dict.iter();
        for (key, bundle) in entries.iter() {
            batch.put(row_key(key), bundle.to_bytes()?);
        }
        self.db.write(batch)?;
        info!(entries = entries.len(), "saved dictionary snapshot");
        return Ok(());
    }

    pub fn load(&self) -> Result<PrefixDict> {
        let mut dict = PrefixDict::new();
        for (row, value) in self.db.iterator(IteratorMode::Start) {
            let key = parse_row_key(&row)?;
            dict.set(&key, Bundle::from_bytes(&value)?)?;
        }
        return Ok(dict);
    }
}
