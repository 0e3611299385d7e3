//! Canonical ELA binary encoding used for digests and raw transactions

use crate::error::{eyre, Result};
use alloy::primitives::hex;
use sha2::{Digest as _, Sha256};

/// Length of an ELA program hash (prefix byte + 20-byte hash)
pub const PROGRAM_HASH_LEN: usize = 21;

/// Length of a compressed secp256r1 public key
pub const PUBLIC_KEY_LEN: usize = 33;

const DID_PREFIX: &str = "did:elastos:";

/// Little-endian writer with compact-size length prefixes
#[derive(Debug, Default)]
pub struct ElaWriter {
    buf: Vec<u8>,
}

impl ElaWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_u8(&mut self, value: u8) -> &mut Self {
        self.buf.push(value);
        self
    }

    pub fn write_u16(&mut self, value: u16) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn write_u32(&mut self, value: u32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn write_u64(&mut self, value: u64) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Bitcoin-style compact size
    pub fn write_var_uint(&mut self, value: u64) -> &mut Self {
        match value {
            0..=0xfc => self.write_u8(value as u8),
            0xfd..=0xffff => self.write_u8(0xfd).write_u16(value as u16),
            0x1_0000..=0xffff_ffff => self.write_u8(0xfe).write_u32(value as u32),
            _ => self.write_u8(0xff).write_u64(value),
        }
    }

    pub fn write_var_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.write_var_uint(bytes.len() as u64);
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn write_var_string(&mut self, value: &str) -> &mut Self {
        self.write_var_bytes(value.as_bytes())
    }

    /// 32-byte hash given in display (reversed) hex order
    pub fn write_hash(&mut self, hash_hex: &str) -> Result<&mut Self> {
        let mut bytes = decode_fixed::<32>(hash_hex, "hash")?;
        bytes.reverse();
        self.buf.extend_from_slice(&bytes);
        Ok(self)
    }

    /// Compressed public key as var-bytes
    pub fn write_public_key(&mut self, key_hex: &str) -> Result<&mut Self> {
        let key = decode_fixed::<PUBLIC_KEY_LEN>(key_hex, "public key")?;
        if key[0] != 0x02 && key[0] != 0x03 {
            return Err(eyre!("public key {key_hex} is not compressed"));
        }
        Ok(self.write_var_bytes(&key))
    }

    /// Base58check address as its raw program hash
    pub fn write_address(&mut self, address: &str) -> Result<&mut Self> {
        let program_hash = decode_address(address)?;
        self.buf.extend_from_slice(&program_hash);
        Ok(self)
    }

    /// `did:elastos:<id>` or bare id, as its raw program hash
    pub fn write_did(&mut self, did: &str) -> Result<&mut Self> {
        self.write_address(did.strip_prefix(DID_PREFIX).unwrap_or(did))
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }
}

/// Decode hex with or without a 0x prefix
pub fn decode_hex(value: &str) -> Result<Vec<u8>> {
    let trimmed = value.trim();
    let trimmed = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    hex::decode(trimmed).map_err(|e| eyre!("invalid hex {value:?}: {e}"))
}

fn decode_fixed<const N: usize>(value: &str, what: &str) -> Result<[u8; N]> {
    let bytes = decode_hex(value)?;
    let len = bytes.len();
    bytes
        .try_into()
        .map_err(|_| eyre!("{what} must be {N} bytes, got {len}"))
}

/// Decode a base58check ELA address into its 21-byte program hash
pub fn decode_address(address: &str) -> Result<[u8; PROGRAM_HASH_LEN]> {
    let raw = bs58::decode(address.trim())
        .into_vec()
        .map_err(|e| eyre!("invalid address {address:?}: {e}"))?;
    if raw.len() != PROGRAM_HASH_LEN + 4 {
        return Err(eyre!("invalid address {address:?}: wrong length {}", raw.len()));
    }

    let (program_hash, checksum) = raw.split_at(PROGRAM_HASH_LEN);
    if double_sha256(program_hash)[..4] != *checksum {
        return Err(eyre!("invalid address {address:?}: checksum mismatch"));
    }

    let mut out = [0u8; PROGRAM_HASH_LEN];
    out.copy_from_slice(program_hash);
    Ok(out)
}

/// Check an address without keeping the decoded bytes
pub fn is_valid_address(address: &str) -> bool {
    decode_address(address).is_ok()
}

pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}
