use crate::models::Fingerprint;
use sha2::{Digest, Sha256};

/// Deduplication key for an upload; not meant to resist crafted collisions.
pub fn fingerprint(bytes: &[u8]) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    Fingerprint::from_hex(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::fingerprint;

    #[test]
    fn checksum_is_reproducible() {
        let first = fingerprint(b"%PDF-1.4 same bytes");
        let second = fingerprint(b"%PDF-1.4 same bytes");
        assert_eq!(first, second);
    }

    #[test]
    fn digest_is_lowercase_hex_of_fixed_length() {
        let digest = fingerprint(b"abc");
        assert_eq!(
            digest.as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(fingerprint(&[]).as_str().len(), 64);
    }

    #[test]
    fn single_bit_flip_changes_digest() {
        let original = vec![0b1010_1010u8; 64];
        let mut flipped = original.clone();
        flipped[17] ^= 0b0000_0001;
        assert_ne!(fingerprint(&original), fingerprint(&flipped));
    }
}
