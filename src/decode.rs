// Raw JSON-RPC result decoding: hex quantities, ABI words, unit scaling.

use sha3::{Digest, Keccak256};
use thiserror::Error;

/// 18-decimals fixed point: wei per ETH.
const WEI_PER_ETH: f64 = 1e18;
/// 9-decimals fixed point: gwei per ETH.
const GWEI_PER_ETH: f64 = 1e9;
/// ABI word width in bytes.
const WORD_BYTES: usize = 32;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("not a hex quantity: {0:?}")]
    InvalidQuantity(String),
    #[error("invalid hex payload: {0}")]
    InvalidPayload(#[from] hex::FromHexError),
    #[error("value does not fit in 128 bits: 0x{0}")]
    Overflow(String),
    #[error("payload too short: word {word} needs {need} bytes, payload has {len}")]
    ShortPayload { word: usize, need: usize, len: usize },
}

/// First 4 bytes of keccak-256 over the canonical function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let mut hasher = Keccak256::new();
    hasher.update(signature.as_bytes());
    let digest = hasher.finalize();
    [digest[0], digest[1], digest[2], digest[3]]
}

/// Calldata for a zero-argument view call, 0x-prefixed.
pub fn calldata(signature: &str) -> String {
    format!("0x{}", hex::encode(selector(signature)))
}

/// Parses a hex quantity ("0x1b4") or a single ABI word into a u128.
///
/// A missing, empty, or bare "0x" result decodes to 0: a failed read
/// degrades one bucket to zero instead of aborting the whole snapshot.
/// A malformed non-empty result is still an error.
pub fn parse_uint(raw: Option<&str>) -> Result<u128, DecodeError> {
    let Some(raw) = raw else { return Ok(0) };
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(0);
    }
    // 32 hex digits = 128 bits
    if digits.len() > 32 {
        return Err(DecodeError::Overflow(digits.to_string()));
    }
    u128::from_str_radix(digits, 16).map_err(|_| DecodeError::InvalidQuantity(raw.to_string()))
}

/// Extracts the `word`-th 32-byte word of an ABI-encoded payload as a u128.
pub fn word_at(payload: &str, word: usize) -> Result<u128, DecodeError> {
    let bytes = hex::decode(payload.strip_prefix("0x").unwrap_or(payload))?;
    let start = word * WORD_BYTES;
    let end = start + WORD_BYTES;
    if bytes.len() < end {
        return Err(DecodeError::ShortPayload {
            word,
            need: end,
            len: bytes.len(),
        });
    }
    let slice = &bytes[start..end];
    if slice[..WORD_BYTES / 2].iter().any(|&b| b != 0) {
        return Err(DecodeError::Overflow(hex::encode(slice)));
    }
    let mut buf = [0u8; 16];
    buf.copy_from_slice(&slice[WORD_BYTES / 2..]);
    Ok(u128::from_be_bytes(buf))
}

/// Total TVL from the `calculateTVLs()` return payload.
///
/// The call returns `(uint256[][], uint256[], uint256)`: two dynamic-array
/// offsets followed by the scalar total, so the total is head word 2
/// (byte offset 64). The layout is fixed by the contract ABI; keep this
/// accessor as the single place that knows the offset.
pub fn tvl_total(payload: Option<&str>) -> Result<u128, DecodeError> {
    match payload {
        None => Ok(0),
        Some(p) if p.is_empty() || p == "0x" => Ok(0),
        Some(p) => word_at(p, 2),
    }
}

/// Decodes a boolean ABI word (any nonzero value is true).
pub fn parse_bool(raw: Option<&str>) -> Result<bool, DecodeError> {
    Ok(parse_uint(raw)? != 0)
}

/// Decodes a scalar that must fit u64 (counts, durations).
pub fn parse_u64(raw: Option<&str>) -> Result<u64, DecodeError> {
    let value = parse_uint(raw)?;
    u64::try_from(value).map_err(|_| DecodeError::Overflow(format!("{value:x}")))
}

/// Raw wei amount to ETH (IEEE double; precision floor is the f64 mantissa).
pub fn wei_to_eth(raw: u128) -> f64 {
    raw as f64 / WEI_PER_ETH
}

/// Raw gwei amount to ETH (EigenPod rewards are 9-decimals).
pub fn gwei_to_eth(raw: u128) -> f64 {
    raw as f64 / GWEI_PER_ETH
}
