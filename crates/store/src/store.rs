use std::path::Path;

use rocksdb::{DBIterator, Direction, IteratorMode, Options, WriteBatch, WriteOptions, DB};
use statehist_primitives::{
    AccountData, Address, EntityKey, HistoricalRecord, B256, CODE_HASH_LEN,
};

use crate::{
    errors::{StoreError, StoreResult},
    keys::{
        decode_record, encode_creation_counter_key, encode_deletion_key, encode_version_key,
        ACCOUNT_TAG, STORAGE_TAG,
    },
    resolver::SeqResolver,
};

/// Handle to the on-disk versioned index.
///
/// The handle is passed explicitly to every component that needs it and the
/// underlying database closes when the last handle drops, on every exit path.
/// Writers and the scanner must not run concurrently against one instance.
pub struct HistoryStore {
    db: DB,
}

impl std::fmt::Debug for HistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryStore").finish_non_exhaustive()
    }
}

impl HistoryStore {
    /// Opens the index at `path`, creating it if missing.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, path)?;
        Ok(Self { db })
    }

    /// Opens an existing index read-only, for the reconstruction phase.
    pub fn open_read_only(path: impl AsRef<Path>) -> StoreResult<Self> {
        let opts = Options::default();
        let db = DB::open_for_read_only(&opts, path, false)?;
        Ok(Self { db })
    }

    /// Starts an atomic batch for one block's diffs.
    ///
    /// All puts in the returned writer land at `height`; dropping the writer
    /// without [`BlockWriter::commit`] discards the batch.
    pub fn begin_write(&self, height: u64) -> BlockWriter<'_> {
        BlockWriter {
            store: self,
            batch: WriteBatch::default(),
            height,
        }
    }

    /// The height at which `addr` was deleted, if it ever was.
    pub fn deletion_height(&self, addr: &Address) -> StoreResult<Option<u64>> {
        let Some(bytes) = self.db.get(encode_deletion_key(addr))? else {
            return Ok(None);
        };
        let height: [u8; 8] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| StoreError::MalformedDeletionMarker(*addr, bytes.len()))?;
        Ok(Some(u64::from_be_bytes(height)))
    }

    /// The creation-counter value written for `lsb` at exactly `height`.
    pub fn creation_counter_at(&self, lsb: u8, height: u64) -> StoreResult<Option<u64>> {
        let bytes = self.db.get(encode_creation_counter_key(lsb, height))?;
        Ok(bytes
            .and_then(|b| <[u8; 8]>::try_from(b.as_slice()).ok())
            .map(u64::from_le_bytes))
    }

    /// Lazily reconstructs the validity-interval history of every entity in
    /// the index, in key order: grouped by kind, then address, then slot,
    /// versions oldest to newest.
    ///
    /// Intervals still current at the end of the indexed range are closed at
    /// `latest_height`. The scan is a single forward pass; it cannot be
    /// restarted without re-scanning from the start.
    pub fn historical_records(&self, latest_height: u64) -> RecordIter<'_> {
        let inner = self
            .db
            .iterator(IteratorMode::From(&[ACCOUNT_TAG], Direction::Forward));
        RecordIter {
            store: self,
            inner,
            cur: None,
            latest_height,
            done: false,
        }
    }
}

/// Accumulates one block's diffs and commits them as one durable batch.
pub struct BlockWriter<'a> {
    store: &'a HistoryStore,
    batch: WriteBatch,
    height: u64,
}

impl std::fmt::Debug for BlockWriter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockWriter")
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl BlockWriter<'_> {
    pub fn height(&self) -> u64 {
        self.height
    }

    /// Writes an account version. Empty bytes delete the account: the
    /// deletion also tombstones the account's bytecode at the same height and
    /// records the deletion height for storage interval closure.
    pub fn put_account(&mut self, addr: Address, account: &[u8]) -> StoreResult<()> {
        if !account.is_empty() {
            AccountData::new(account)
                .map_err(|_| StoreError::MalformedAccount(addr, account.len()))?;
        }
        self.batch
            .put(encode_version_key(&addr, &EntityKey::Account, self.height), account);
        if account.is_empty() {
            self.batch.put(
                encode_version_key(&addr, &EntityKey::Bytecode, self.height),
                account,
            );
            self.batch
                .put(encode_deletion_key(&addr), self.height.to_be_bytes());
        }
        Ok(())
    }

    /// Writes a bytecode version (code-hash-prefixed blob, empty = deleted).
    pub fn put_bytecode(&mut self, addr: Address, bytecode: &[u8]) -> StoreResult<()> {
        if !bytecode.is_empty() && bytecode.len() < CODE_HASH_LEN {
            return Err(StoreError::MalformedBytecode(addr, bytecode.len()));
        }
        self.batch.put(
            encode_version_key(&addr, &EntityKey::Bytecode, self.height),
            bytecode,
        );
        Ok(())
    }

    /// Writes a storage-slot version for an already-resolved address.
    pub fn put_storage(&mut self, addr: Address, slot: B256, value: &[u8]) {
        self.batch.put(
            encode_version_key(&addr, &EntityKey::Storage(slot), self.height),
            value,
        );
    }

    /// Writes a storage-slot version addressed by sequence number.
    ///
    /// An unresolved sequence means the upstream diff stream broke its
    /// contract; the error must abort the batch, never skip the write.
    pub fn put_storage_seq(
        &mut self,
        resolver: &SeqResolver,
        seq: u64,
        slot: B256,
        value: &[u8],
    ) -> StoreResult<()> {
        let addr = resolver
            .resolve(seq)
            .ok_or(StoreError::UnresolvedSequence(seq))?;
        self.put_storage(addr, slot, value);
        Ok(())
    }

    /// Writes a creation-counter version. Independent namespace, never part
    /// of historical scanning.
    pub fn put_creation_counter(&mut self, lsb: u8, counter: u64) {
        self.batch.put(
            encode_creation_counter_key(lsb, self.height),
            counter.to_le_bytes(),
        );
    }

    /// Commits the batch durably. A committed block's diffs survive a crash
    /// before the next block is ingested.
    pub fn commit(self) -> StoreResult<()> {
        let mut opts = WriteOptions::default();
        opts.set_sync(true);
        self.store.db.write_opt(self.batch, &opts)?;
        Ok(())
    }
}

/// Forward scanner yielding [`HistoricalRecord`]s with closed intervals.
pub struct RecordIter<'a> {
    store: &'a HistoryStore,
    inner: DBIterator<'a>,
    cur: Option<HistoricalRecord>,
    latest_height: u64,
    done: bool,
}

impl std::fmt::Debug for RecordIter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordIter")
            .field("latest_height", &self.latest_height)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl RecordIter<'_> {
    /// Pulls and decodes the next key inside the historical range, with
    /// `end_height` defaulted to the end of the indexed range.
    fn next_decoded(&mut self) -> StoreResult<Option<HistoricalRecord>> {
        let Some(item) = self.inner.next() else {
            return Ok(None);
        };
        let (key, value) = item?;
        if key.first().map_or(true, |tag| *tag > STORAGE_TAG) {
            return Ok(None);
        }
        let mut rec = decode_record(&key, &value)?;
        rec.end_height = self.latest_height;
        Ok(Some(rec))
    }

    /// Closes a record whose run of versions has ended. A deleted account's
    /// trailing storage interval is bounded by the deletion marker, since no
    /// further storage writes will ever be observed for that address.
    fn close_run(&self, mut rec: HistoricalRecord) -> StoreResult<HistoricalRecord> {
        if matches!(rec.key, EntityKey::Storage(_)) {
            if let Some(deleted_at) = self.store.deletion_height(&rec.addr)? {
                if deleted_at >= rec.start_height {
                    rec.end_height = deleted_at;
                }
            }
        }
        Ok(rec)
    }
}

impl Iterator for RecordIter<'_> {
    type Item = StoreResult<HistoricalRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let next = match self.next_decoded() {
                Ok(next) => next,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };
            match (self.cur.take(), next) {
                (None, None) => {
                    self.done = true;
                    return None;
                }
                (None, Some(rec)) => {
                    self.cur = Some(rec);
                }
                (Some(mut prev), Some(rec)) => {
                    let same_entity = prev.addr == rec.addr && prev.key == rec.key;
                    if same_entity {
                        prev.end_height = rec.start_height;
                        self.cur = Some(rec);
                        return Some(Ok(prev));
                    }
                    self.cur = Some(rec);
                    match self.close_run(prev) {
                        Ok(closed) => return Some(Ok(closed)),
                        Err(e) => {
                            self.done = true;
                            return Some(Err(e));
                        }
                    }
                }
                (Some(prev), None) => {
                    self.done = true;
                    return Some(self.close_run(prev));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use statehist_primitives::{encode_account_data, encode_bytecode_data, ReadWriteLists, U256};
    use tempfile::TempDir;

    use super::*;

    fn open_store() -> (TempDir, HistoryStore) {
        let dir = TempDir::new().expect("tempdir");
        let store = HistoryStore::open(dir.path()).expect("open store");
        (dir, store)
    }

    fn collect(store: &HistoryStore, latest: u64) -> Vec<HistoricalRecord> {
        store
            .historical_records(latest)
            .collect::<StoreResult<Vec<_>>>()
            .expect("scan")
    }

    fn write_account(store: &HistoryStore, height: u64, addr: Address, value: &[u8]) {
        let mut writer = store.begin_write(height);
        writer.put_account(addr, value).unwrap();
        writer.commit().unwrap();
    }

    fn write_storage(store: &HistoryStore, height: u64, addr: Address, slot: B256, value: &[u8]) {
        let mut writer = store.begin_write(height);
        writer.put_storage(addr, slot, value);
        writer.commit().unwrap();
    }

    fn dump(store: &HistoryStore) -> Vec<(Box<[u8]>, Box<[u8]>)> {
        store
            .db
            .iterator(IteratorMode::Start)
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn account_lifecycle_partitions_history() {
        let (_dir, store) = open_store();
        let addr = Address::repeat_byte(0xaa);
        let v1 = encode_account_data(1, 0, U256::from(100u64));
        let v2 = encode_account_data(1, 1, U256::from(90u64));
        write_account(&store, 1, addr, &v1);
        write_account(&store, 2, addr, &v2);
        write_account(&store, 3, addr, &[]);

        let records = collect(&store, 5);
        let accounts: Vec<_> = records
            .iter()
            .filter(|r| r.key == EntityKey::Account)
            .collect();
        assert_eq!(accounts.len(), 3);
        assert_eq!(
            (accounts[0].start_height, accounts[0].end_height),
            (1, 2),
            "first value holds over [1, 2)"
        );
        assert_eq!(accounts[0].value, v1);
        assert_eq!((accounts[1].start_height, accounts[1].end_height), (2, 3));
        assert_eq!(accounts[1].value, v2);
        // the deletion itself is the final, empty-valued interval
        assert_eq!((accounts[2].start_height, accounts[2].end_height), (3, 5));
        assert!(accounts[2].is_deletion());

        // no record carries the first value past height 2
        assert!(!records
            .iter()
            .any(|r| r.value == v1 && r.end_height > 2));

        // deletion marker and implicit bytecode tombstone
        assert_eq!(store.deletion_height(&addr).unwrap(), Some(3));
        let bytecodes: Vec<_> = records
            .iter()
            .filter(|r| r.key == EntityKey::Bytecode)
            .collect();
        assert_eq!(bytecodes.len(), 1);
        assert_eq!(
            (bytecodes[0].start_height, bytecodes[0].end_height),
            (3, 5)
        );
        assert!(bytecodes[0].is_deletion());
    }

    #[test]
    fn lone_storage_write_stays_open_to_latest() {
        let (_dir, store) = open_store();
        let addr = Address::repeat_byte(0xbb);
        let slot = B256::with_last_byte(0x01);
        write_storage(&store, 4, addr, slot, &[0xff; 32]);

        let records = collect(&store, 10);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key, EntityKey::Storage(slot));
        assert_eq!((records[0].start_height, records[0].end_height), (4, 10));
    }

    #[test]
    fn storage_versions_partition_without_gaps() {
        let (_dir, store) = open_store();
        let addr = Address::repeat_byte(0xcd);
        let slot = B256::with_last_byte(0x07);
        for (height, byte) in [(2u64, 1u8), (5, 2), (9, 3)] {
            write_storage(&store, height, addr, slot, &[byte; 32]);
        }

        let records = collect(&store, 12);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].start_height, 2);
        for pair in records.windows(2) {
            assert_eq!(pair[0].end_height, pair[1].start_height);
        }
        assert_eq!(records.last().unwrap().end_height, 12);
    }

    #[test]
    fn deletion_closes_trailing_storage_records() {
        let (_dir, store) = open_store();
        let addr = Address::repeat_byte(0xcc);
        let slot1 = B256::with_last_byte(0x01);
        let slot2 = B256::with_last_byte(0x02);
        write_account(&store, 1, addr, &encode_account_data(3, 0, U256::ZERO));
        write_storage(&store, 2, addr, slot1, &[0x11; 32]);
        write_storage(&store, 4, addr, slot2, &[0x22; 32]);
        write_account(&store, 6, addr, &[]);

        let records = collect(&store, 20);
        let storage: Vec<_> = records
            .iter()
            .filter(|r| matches!(r.key, EntityKey::Storage(_)))
            .collect();
        assert_eq!(storage.len(), 2);
        // both slots close at the deletion height, not at latest
        assert_eq!((storage[0].start_height, storage[0].end_height), (2, 6));
        assert_eq!((storage[1].start_height, storage[1].end_height), (4, 6));
    }

    #[test]
    fn records_group_by_kind_then_address() {
        let (_dir, store) = open_store();
        let addr = Address::repeat_byte(0x42);
        let slot = B256::with_last_byte(0x09);
        let mut writer = store.begin_write(1);
        writer
            .put_account(addr, &encode_account_data(4, 0, U256::ZERO))
            .unwrap();
        writer
            .put_bytecode(addr, &encode_bytecode_data(B256::repeat_byte(1), &[0x60]))
            .unwrap();
        writer.put_storage(addr, slot, &[0x01; 32]);
        writer.commit().unwrap();

        let records = collect(&store, 3);
        let kinds: Vec<_> = records.iter().map(|r| r.key).collect();
        assert_eq!(
            kinds,
            vec![EntityKey::Account, EntityKey::Bytecode, EntityKey::Storage(slot)]
        );
    }

    #[test]
    fn reingesting_a_block_is_idempotent() {
        let (_dir, store) = open_store();
        let addr = Address::repeat_byte(0x77);
        let slot = B256::with_last_byte(0x03);
        let account = encode_account_data(9, 2, U256::from(55u64));

        let apply = |store: &HistoryStore| {
            let mut writer = store.begin_write(3);
            writer.put_account(addr, &account).unwrap();
            writer
                .put_bytecode(addr, &encode_bytecode_data(B256::repeat_byte(2), &[0xfe]))
                .unwrap();
            writer.put_storage(addr, slot, &[0xab; 32]);
            writer.put_creation_counter(1, 10);
            writer.commit().unwrap();
        };

        apply(&store);
        let first = dump(&store);
        apply(&store);
        let second = dump(&store);
        assert_eq!(first, second);
    }

    #[test]
    fn creation_counters_stay_out_of_the_scan() {
        let (_dir, store) = open_store();
        let mut writer = store.begin_write(2);
        writer.put_creation_counter(7, 99);
        writer.commit().unwrap();

        assert_eq!(store.creation_counter_at(7, 2).unwrap(), Some(99));
        assert_eq!(store.creation_counter_at(7, 3).unwrap(), None);
        assert!(collect(&store, 4).is_empty());
    }

    #[test]
    fn unresolved_sequence_aborts_the_batch() {
        let (_dir, store) = open_store();
        let resolver = SeqResolver::from_rw_lists(&ReadWriteLists::default()).unwrap();
        let mut writer = store.begin_write(1);
        writer
            .put_account(Address::repeat_byte(0x10), &encode_account_data(1, 0, U256::ZERO))
            .unwrap();
        let err = writer
            .put_storage_seq(&resolver, 42, B256::ZERO, &[0x01; 32])
            .unwrap_err();
        assert!(matches!(err, StoreError::UnresolvedSequence(42)));
        drop(writer);

        // nothing from the discarded batch reached the store
        assert!(collect(&store, 5).is_empty());
    }

    #[test]
    fn malformed_blobs_are_rejected() {
        let (_dir, store) = open_store();
        let addr = Address::repeat_byte(0x20);
        let mut writer = store.begin_write(1);
        assert!(matches!(
            writer.put_account(addr, &[1, 2, 3]),
            Err(StoreError::MalformedAccount(_, 3))
        ));
        assert!(matches!(
            writer.put_bytecode(addr, &[0u8; 16]),
            Err(StoreError::MalformedBytecode(_, 16))
        ));
        // an empty bytecode write is a legal tombstone
        writer.put_bytecode(addr, &[]).unwrap();
    }

    #[test]
    fn read_only_reopen_sees_committed_history() {
        let dir = TempDir::new().unwrap();
        let addr = Address::repeat_byte(0x55);
        {
            let store = HistoryStore::open(dir.path()).unwrap();
            write_account(&store, 1, addr, &encode_account_data(2, 1, U256::from(7u64)));
        }
        let store = HistoryStore::open_read_only(dir.path()).unwrap();
        let records = collect(&store, 4);
        assert_eq!(records.len(), 1);
        assert_eq!((records[0].start_height, records[0].end_height), (1, 4));
    }
}
