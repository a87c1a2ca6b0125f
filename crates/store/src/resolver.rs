//! Per-block table mapping account sequence numbers to addresses.
//!
//! Storage writes carry a sequence number instead of the owning address; the
//! table is rebuilt for every block from that block's account reads and
//! writes, so it must cover every sequence the block's storage writes
//! reference.

use std::collections::HashMap;

use statehist_primitives::{AccountData, Address, ReadWriteLists};

use crate::errors::{StoreError, StoreResult};

/// Sequence reserved for the system staking contract. It can be written to
/// without ever appearing in a read list, so it is seeded unconditionally.
const SYSTEM_SEQ: u64 = 2000;
const SYSTEM_ADDR: Address = Address::new([
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x27, 0x11,
]);

#[derive(Debug, Default)]
pub struct SeqResolver {
    table: HashMap<u64, Address>,
}

impl SeqResolver {
    /// Builds the table from one block's account read and write lists.
    ///
    /// Read entries carry their sequence explicitly; write entries carry it
    /// inside the account blob. Deletion writes (empty blob) contribute
    /// nothing.
    pub fn from_rw_lists(rw: &ReadWriteLists) -> StoreResult<Self> {
        let mut table =
            HashMap::with_capacity(1 + rw.account_rlist.len() + rw.account_wlist.len());
        table.insert(SYSTEM_SEQ, SYSTEM_ADDR);
        for op in &rw.account_rlist {
            table.insert(op.seq, op.addr);
        }
        for op in &rw.account_wlist {
            if op.account.is_empty() {
                continue;
            }
            let data = AccountData::new(&op.account)
                .map_err(|_| StoreError::MalformedAccount(op.addr, op.account.len()))?;
            table.insert(data.sequence(), op.addr);
        }
        Ok(Self { table })
    }

    pub fn resolve(&self, seq: u64) -> Option<Address> {
        self.table.get(&seq).copied()
    }
}
