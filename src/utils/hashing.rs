//! Content hashing for shader cache keys.
//!
//! Everything that feeds a cache key (property stores, template names,
//! stage suffixes, languages, profile lists) goes through the same fixed
//! non-cryptographic 32-bit mix, MurmurHash3 x86_32, with a process-wide
//! seed. Input bytes are consumed little-endian so the resulting hashes
//! are identical across platforms and runs.

/// Process-wide seed for all cache-key hashing.
pub const HASH_SEED: u32 = 0x3A8E_FA67;

/// MurmurHash3 x86_32 over a byte slice.
#[must_use]
pub fn murmur3_32(data: &[u8], seed: u32) -> u32 {
    const C1: u32 = 0xcc9e_2d51;
    const C2: u32 = 0x1b87_3593;

    let mut h = seed;

    let mut chunks = data.chunks_exact(4);
    for chunk in &mut chunks {
        let mut k = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        k = k.wrapping_mul(C1).rotate_left(15).wrapping_mul(C2);
        h ^= k;
        h = h.rotate_left(13).wrapping_mul(5).wrapping_add(0xe654_6b64);
    }

    let tail = chunks.remainder();
    if !tail.is_empty() {
        let mut k: u32 = 0;
        for (i, &b) in tail.iter().enumerate() {
            k |= u32::from(b) << (8 * i);
        }
        k = k.wrapping_mul(C1).rotate_left(15).wrapping_mul(C2);
        h ^= k;
    }

    h ^= data.len() as u32;
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}

/// Hashes a string with the process-wide seed.
#[inline]
#[must_use]
pub fn hash_str(s: &str) -> u32 {
    murmur3_32(s.as_bytes(), HASH_SEED)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Reference vectors for MurmurHash3 x86_32.
    #[test]
    fn murmur_reference_vectors() {
        assert_eq!(murmur3_32(b"", 0), 0);
        assert_eq!(murmur3_32(b"", 1), 0x514E_28B7);
        assert_eq!(murmur3_32(b"", 0xFFFF_FFFF), 0x81F1_6F39);
    }

    #[test]
    fn murmur_is_deterministic() {
        let a = murmur3_32(b"hlms_skeleton", HASH_SEED);
        let b = murmur3_32(b"hlms_skeleton", HASH_SEED);
        assert_eq!(a, b);
    }

    #[test]
    fn murmur_distinguishes_inputs() {
        assert_ne!(hash_str("hlms_normal"), hash_str("hlms_colour"));
        assert_ne!(murmur3_32(b"abc", 0), murmur3_32(b"abc", 1));
        // Tail handling: lengths 1..=4 must all differ.
        let hashes: Vec<u32> = (1..=4).map(|n| murmur3_32(&b"abcd"[..n], 0)).collect();
        for i in 0..hashes.len() {
            for j in i + 1..hashes.len() {
                assert_ne!(hashes[i], hashes[j]);
            }
        }
    }
}
