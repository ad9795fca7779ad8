//! Write-ahead file store
//!
//! Durable `EventStore` backend: an append-only file of checksummed frames,
//! one frame per committed batch. A commit is the transactional unit: the
//! frame is written, flushed, and fsynced before the call returns, and a
//! torn tail frame is detected on read by its length prefix and CRC32C.
//!
//! # Frame format
//! ```text
//! [payload_len: u32 LE]
//! [checksum: u32 LE]      // CRC32C over payload
//! [payload]               // JSON-serialized PersistenceBatch
//! ```

use crate::store::{EventStore, PersistenceBatch, StoreError};
use crc32c::crc32c;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Append-only file-backed store.
pub struct WalStore {
    path: PathBuf,
    writer: BufWriter<File>,
    batches_written: u64,
}

impl WalStore {
    /// Open (or create) the store file, appending to existing content.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        info!(path = %path.display(), "WAL store opened");
        Ok(Self {
            path,
            writer: BufWriter::new(file),
            batches_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn batches_written(&self) -> u64 {
        self.batches_written
    }

    /// Read every intact frame back. A torn or corrupt tail frame ends the
    /// scan with a warning rather than an error; everything before it was
    /// durably committed.
    pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<PersistenceBatch>, StoreError> {
        let mut data = Vec::new();
        File::open(path.as_ref())?.read_to_end(&mut data)?;

        let mut batches = Vec::new();
        let mut pos = 0usize;
        while pos + 8 <= data.len() {
            let payload_len =
                u32::from_le_bytes(data[pos..pos + 4].try_into().expect("sliced 4 bytes")) as usize;
            let checksum =
                u32::from_le_bytes(data[pos + 4..pos + 8].try_into().expect("sliced 4 bytes"));
            let start = pos + 8;
            let end = start + payload_len;
            if end > data.len() {
                warn!(offset = pos, "torn frame at end of WAL, stopping scan");
                break;
            }
            let payload = &data[start..end];
            if crc32c(payload) != checksum {
                warn!(offset = pos, "checksum mismatch in WAL, stopping scan");
                break;
            }
            let batch: PersistenceBatch = serde_json::from_slice(payload)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            batches.push(batch);
            pos = end;
        }
        Ok(batches)
    }
}

impl EventStore for WalStore {
    fn commit(&mut self, batch: &PersistenceBatch) -> Result<(), StoreError> {
        let payload =
            serde_json::to_vec(batch).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let checksum = crc32c(&payload);

        self.writer.write_all(&(payload.len() as u32).to_le_bytes())?;
        self.writer.write_all(&checksum.to_le_bytes())?;
        self.writer.write_all(&payload)?;
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;

        self.batches_written += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{OrderRow, TradeRow};
    use types::numeric::Price;
    use types::order::{OrderStatus, OrderType, Side};

    fn sample_batch(order_id: u64) -> PersistenceBatch {
        PersistenceBatch {
            orders: vec![OrderRow {
                order_id,
                user_id: "trader1".into(),
                symbol: "BTCUSD".into(),
                order_type: OrderType::Limit,
                side: Side::Buy,
                price: Some(Price::from_str("50000.00").unwrap()),
                quantity: 100,
                remaining_qty: 100,
                status: OrderStatus::Pending,
                created_at: 1_000,
                updated_at: 1_000,
            }],
            trades: vec![TradeRow {
                trade_id: order_id,
                symbol: "BTCUSD".into(),
                price: Price::from_str("50000.00").unwrap(),
                quantity: 10,
                buyer_id: "b".into(),
                seller_id: "s".into(),
                executed_at: 2_000,
            }],
        }
    }

    #[test]
    fn test_commit_and_read_back() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("exchange.wal");

        let mut store = WalStore::open(&path).unwrap();
        store.commit(&sample_batch(1)).unwrap();
        store.commit(&sample_batch(2)).unwrap();
        assert_eq!(store.batches_written(), 2);
        drop(store);

        let batches = WalStore::read_all(&path).unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0], sample_batch(1));
        assert_eq!(batches[1], sample_batch(2));
    }

    #[test]
    fn test_reopen_appends() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("exchange.wal");

        WalStore::open(&path).unwrap().commit(&sample_batch(1)).unwrap();
        WalStore::open(&path).unwrap().commit(&sample_batch(2)).unwrap();

        let batches = WalStore::read_all(&path).unwrap();
        assert_eq!(batches.len(), 2);
    }

    #[test]
    fn test_torn_tail_frame_is_dropped() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("exchange.wal");

        let mut store = WalStore::open(&path).unwrap();
        store.commit(&sample_batch(1)).unwrap();
        drop(store);

        // Simulate a crash mid-write: append a frame header with no payload
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&500u32.to_le_bytes()).unwrap();
        file.write_all(&0u32.to_le_bytes()).unwrap();
        file.write_all(b"partial").unwrap();
        drop(file);

        let batches = WalStore::read_all(&path).unwrap();
        assert_eq!(batches.len(), 1, "torn frame must not surface");
    }

    #[test]
    fn test_corrupt_checksum_stops_scan() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("exchange.wal");

        let mut store = WalStore::open(&path).unwrap();
        store.commit(&sample_batch(1)).unwrap();
        store.commit(&sample_batch(2)).unwrap();
        drop(store);

        // Flip a byte inside the second frame's payload
        let mut data = std::fs::read(&path).unwrap();
        let first_frame_len =
            8 + u32::from_le_bytes(data[0..4].try_into().unwrap()) as usize;
        data[first_frame_len + 12] ^= 0xFF;
        std::fs::write(&path, &data).unwrap();

        let batches = WalStore::read_all(&path).unwrap();
        assert_eq!(batches.len(), 1);
    }
}
