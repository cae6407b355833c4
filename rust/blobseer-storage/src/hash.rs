use base58::ToBase58;

/// The hash type used for content addressing throughout the store (BLAKE3).
pub type Blake3Hash = [u8; 32];

/// Hash arbitrary bytes with BLAKE3.
pub fn blake3_hash(bytes: &[u8]) -> Blake3Hash {
    *blake3::hash(bytes).as_bytes()
}

/// Render a short, human readable prefix of some key bytes, for logs and
/// error messages.
pub fn display_key(bytes: &[u8]) -> String {
    let digest = blake3_hash(bytes);
    format!("#{}...", digest[0..6].to_base58())
}
