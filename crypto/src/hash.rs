//! Blake2b hashing and content addressing.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use haven_types::ContentAddress;

type Blake2b256 = Blake2b<U32>;

/// Prefix marking a Blake2b-256 content address.
pub const CONTENT_ADDRESS_PREFIX: &str = "b2-";

/// Compute a 256-bit Blake2b hash of arbitrary data.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Hash multiple byte slices in sequence (avoids concatenation allocation).
pub fn blake2b_256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Derive the content address of a blob. Pure function of the bytes.
pub fn content_address(bytes: &[u8]) -> ContentAddress {
    ContentAddress::new(format!(
        "{CONTENT_ADDRESS_PREFIX}{}",
        hex::encode(blake2b_256(bytes))
    ))
}

/// Whether `bytes` are exactly the content `address` was derived from.
pub fn matches_content_address(address: &ContentAddress, bytes: &[u8]) -> bool {
    content_address(bytes) == *address
}
