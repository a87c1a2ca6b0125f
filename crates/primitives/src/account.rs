use alloy_primitives::{B256, U256};
use thiserror::Error;

/// Length of the fixed account encoding: `[sequence:8][nonce:8][balance:32]`,
/// all big-endian.
pub const ACCOUNT_DATA_LEN: usize = 48;

/// Length of the code-hash prefix on stored bytecode blobs.
pub const CODE_HASH_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataError {
    #[error("account blob has {0} bytes, expected 48")]
    BadAccountLen(usize),

    #[error("bytecode blob has {0} bytes, shorter than its 32-byte code hash")]
    BadBytecodeLen(usize),
}

fn be_u64(chunk: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(chunk);
    u64::from_be_bytes(buf)
}

/// Borrowed view over the fixed 48-byte account encoding.
#[derive(Debug, Clone, Copy)]
pub struct AccountData<'a>(&'a [u8]);

impl<'a> AccountData<'a> {
    /// Wraps `data`, rejecting anything but the exact 48-byte layout.
    pub fn new(data: &'a [u8]) -> Result<Self, DataError> {
        if data.len() != ACCOUNT_DATA_LEN {
            return Err(DataError::BadAccountLen(data.len()));
        }
        Ok(Self(data))
    }

    /// The account's internal sequence number, referenced by storage writes.
    pub fn sequence(&self) -> u64 {
        be_u64(&self.0[..8])
    }

    pub fn nonce(&self) -> u64 {
        be_u64(&self.0[8..16])
    }

    pub fn balance(&self) -> U256 {
        U256::from_be_slice(&self.0[16..48])
    }
}

/// Borrowed view over a stored bytecode blob: `[code_hash:32][code:N]`.
#[derive(Debug, Clone, Copy)]
pub struct BytecodeData<'a>(&'a [u8]);

impl<'a> BytecodeData<'a> {
    pub fn new(data: &'a [u8]) -> Result<Self, DataError> {
        if data.len() < CODE_HASH_LEN {
            return Err(DataError::BadBytecodeLen(data.len()));
        }
        Ok(Self(data))
    }

    pub fn code_hash(&self) -> B256 {
        B256::from_slice(&self.0[..CODE_HASH_LEN])
    }

    /// The deployed code itself, as a live node would serve it.
    pub fn code(&self) -> &'a [u8] {
        &self.0[CODE_HASH_LEN..]
    }
}

/// Encodes the 48-byte account layout.
pub fn encode_account_data(sequence: u64, nonce: u64, balance: U256) -> Vec<u8> {
    let mut out = Vec::with_capacity(ACCOUNT_DATA_LEN);
    out.extend_from_slice(&sequence.to_be_bytes());
    out.extend_from_slice(&nonce.to_be_bytes());
    out.extend_from_slice(&balance.to_be_bytes::<32>());
    out
}

/// Encodes a bytecode blob with its code-hash prefix.
pub fn encode_bytecode_data(code_hash: B256, code: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(CODE_HASH_LEN + code.len());
    out.extend_from_slice(code_hash.as_slice());
    out.extend_from_slice(code);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_data_round_trip() {
        let blob = encode_account_data(7, 42, U256::from(1_000_000u64));
        let data = AccountData::new(&blob).unwrap();
        assert_eq!(data.sequence(), 7);
        assert_eq!(data.nonce(), 42);
        assert_eq!(data.balance(), U256::from(1_000_000u64));
    }

    #[test]
    fn account_data_rejects_bad_lengths() {
        assert!(matches!(
            AccountData::new(&[]),
            Err(DataError::BadAccountLen(0))
        ));
        let short = [0u8; 47];
        assert!(matches!(
            AccountData::new(&short),
            Err(DataError::BadAccountLen(47))
        ));
        let long = [0u8; 49];
        assert!(matches!(
            AccountData::new(&long),
            Err(DataError::BadAccountLen(49))
        ));
    }

    #[test]
    fn bytecode_data_splits_hash_and_code() {
        let hash = B256::repeat_byte(0xab);
        let blob = encode_bytecode_data(hash, &[0x60, 0x00, 0x60, 0x00]);
        let data = BytecodeData::new(&blob).unwrap();
        assert_eq!(data.code_hash(), hash);
        assert_eq!(data.code(), &[0x60, 0x00, 0x60, 0x00]);
    }

    #[test]
    fn bytecode_data_rejects_truncated_blob() {
        assert!(matches!(
            BytecodeData::new(&[0u8; 31]),
            Err(DataError::BadBytecodeLen(31))
        ));
    }
}
