//! Composite binary key layout for the versioned index.
//!
//! Keys compare byte-lexicographically as `(tag, address, slot, height)` with
//! big-endian heights, so a single forward scan over
//! `[ACCOUNT_TAG, STORAGE_TAG + 1)` visits entities grouped by kind, then
//! address, then slot, with versions oldest to newest. The creation-counter
//! and deletion-marker namespaces sit outside that range so they never show
//! up in a historical scan.

use statehist_primitives::{Address, EntityKey, HistoricalRecord, B256};

use crate::errors::{StoreError, StoreResult};

pub(crate) const CREATION_COUNTER_TAG: u8 = 100;
pub const ACCOUNT_TAG: u8 = 102;
pub const BYTECODE_TAG: u8 = 104;
pub const STORAGE_TAG: u8 = 106;
pub(crate) const DELETION_TAG: u8 = 108;

const ADDR_LEN: usize = 20;
const SLOT_LEN: usize = 32;
const HEIGHT_LEN: usize = 8;

/// Encodes the version key for one entity at one height.
pub fn encode_version_key(addr: &Address, key: &EntityKey, height: u64) -> Vec<u8> {
    let (tag, slot) = match key {
        EntityKey::Account => (ACCOUNT_TAG, None),
        EntityKey::Bytecode => (BYTECODE_TAG, None),
        EntityKey::Storage(slot) => (STORAGE_TAG, Some(slot)),
    };
    let mut out = Vec::with_capacity(1 + ADDR_LEN + SLOT_LEN + HEIGHT_LEN);
    out.push(tag);
    out.extend_from_slice(addr.as_slice());
    if let Some(slot) = slot {
        out.extend_from_slice(slot.as_slice());
    }
    out.extend_from_slice(&height.to_be_bytes());
    out
}

/// Key for the per-`lsb` creation-counter version at `height`.
pub(crate) fn encode_creation_counter_key(lsb: u8, height: u64) -> [u8; 10] {
    let mut key = [0u8; 10];
    key[0] = CREATION_COUNTER_TAG;
    key[1] = lsb;
    key[2..].copy_from_slice(&height.to_be_bytes());
    key
}

/// Key for the per-address deletion-height marker.
pub(crate) fn encode_deletion_key(addr: &Address) -> [u8; 21] {
    let mut key = [0u8; 21];
    key[0] = DELETION_TAG;
    key[1..].copy_from_slice(addr.as_slice());
    key
}

fn read_exact<'a, const N: usize>(data: &mut &'a [u8], tag: u8) -> StoreResult<&'a [u8; N]> {
    if data.len() < N {
        return Err(StoreError::TruncatedKey {
            tag,
            len: data.len(),
        });
    }
    let (head, rest) = data.split_at(N);
    *data = rest;
    Ok(head.try_into().expect("split_at returned N bytes"))
}

/// Decodes a stored `(key, value)` pair back into a [`HistoricalRecord`].
///
/// `end_height` is left at zero; the forward scanner fills it in once the
/// next version (or the end of the range) is known.
pub fn decode_record(key: &[u8], value: &[u8]) -> StoreResult<HistoricalRecord> {
    let mut data = key;
    let tag = read_exact::<1>(&mut data, 0)?[0];
    let addr = Address::from(*read_exact::<ADDR_LEN>(&mut data, tag)?);
    let entity = match tag {
        ACCOUNT_TAG => EntityKey::Account,
        BYTECODE_TAG => EntityKey::Bytecode,
        STORAGE_TAG => EntityKey::Storage(B256::from(*read_exact::<SLOT_LEN>(&mut data, tag)?)),
        other => return Err(StoreError::InvalidTag(other)),
    };
    let start_height = u64::from_be_bytes(*read_exact::<HEIGHT_LEN>(&mut data, tag)?);
    if !data.is_empty() {
        return Err(StoreError::TruncatedKey {
            tag,
            len: key.len(),
        });
    }
    Ok(HistoricalRecord {
        addr,
        key: entity,
        value: value.to_vec(),
        start_height,
        end_height: 0,
    })
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    #[test]
    fn heights_sort_chronologically() {
        let keys = [
            EntityKey::Account,
            EntityKey::Bytecode,
            EntityKey::Storage(B256::repeat_byte(1)),
        ];
        for key in &keys {
            let lo = encode_version_key(&addr(0xaa), key, 1);
            let mid = encode_version_key(&addr(0xaa), key, 255);
            let hi = encode_version_key(&addr(0xaa), key, 1 << 40);
            assert!(lo < mid, "height 1 must sort before 255 for {key:?}");
            assert!(mid < hi, "height 255 must sort before 2^40 for {key:?}");
        }
    }

    #[test]
    fn kinds_sort_account_bytecode_storage() {
        let a = encode_version_key(&addr(0xff), &EntityKey::Account, u64::MAX);
        let b = encode_version_key(&addr(0x00), &EntityKey::Bytecode, 0);
        let s = encode_version_key(&addr(0x00), &EntityKey::Storage(B256::ZERO), 0);
        assert!(a < b);
        assert!(b < s);
    }

    #[test]
    fn side_namespaces_sit_outside_scan_range() {
        let counter = encode_creation_counter_key(0xff, u64::MAX);
        let deletion = encode_deletion_key(&addr(0x00));
        let scan_start = encode_version_key(&addr(0x00), &EntityKey::Account, 0);
        let scan_last = encode_version_key(
            &addr(0xff),
            &EntityKey::Storage(B256::repeat_byte(0xff)),
            u64::MAX,
        );
        assert!(counter.as_slice() < scan_start.as_slice());
        assert!(deletion.as_slice() > scan_last.as_slice());
    }

    #[test]
    fn version_key_round_trip() {
        let slot = B256::from(hex!(
            "00000000000000000000000000000000000000000000000000000000000000aa"
        ));
        let cases = [
            (EntityKey::Account, vec![1, 2, 3]),
            (EntityKey::Bytecode, vec![]),
            (EntityKey::Storage(slot), vec![0xde, 0xad]),
        ];
        for (key, value) in cases {
            let encoded = encode_version_key(&addr(0xbc), &key, 77);
            let rec = decode_record(&encoded, &value).unwrap();
            assert_eq!(rec.addr, addr(0xbc));
            assert_eq!(rec.key, key);
            assert_eq!(rec.value, value);
            assert_eq!(rec.start_height, 77);
            assert_eq!(rec.end_height, 0);
        }
    }

    #[test]
    fn decode_rejects_foreign_tags() {
        let mut key = encode_version_key(&addr(0x01), &EntityKey::Account, 1);
        key[0] = DELETION_TAG;
        assert!(matches!(
            decode_record(&key, &[]),
            Err(StoreError::InvalidTag(DELETION_TAG))
        ));
    }

    #[test]
    fn decode_rejects_truncated_keys() {
        let key = encode_version_key(&addr(0x01), &EntityKey::Storage(B256::ZERO), 1);
        assert!(matches!(
            decode_record(&key[..30], &[]),
            Err(StoreError::TruncatedKey { tag: STORAGE_TAG, .. })
        ));
    }
}
