//! `H` (§4.2): a 32-bit non-cryptographic stable hash with textual decimal
//! output, built on `xxhash-rust`'s `xxh3_64` (truncated to the low 32 bits).
//! Field separators are ASCII unit/record separators so that, say, an empty
//! trailing field can't collide with a shifted boundary between two others.

use xxhash_rust::xxh3::xxh3_64;

const FIELD_SEP: char = '\u{1f}';

/// Hash an ordered tuple of fields. Order matters — this is `H(a || b || c)`,
/// not a set hash.
pub fn hash_fields(fields: &[&str]) -> String {
    let joined = fields.join(&FIELD_SEP.to_string());
    let digest = xxh3_64(joined.as_bytes()) as u32;
    digest.to_string()
}

/// `H(concat_sorted(values))` (§4.2) — used for `parent_data_hash` /
/// `parent_metadata_hash`, where sorting first is what makes the mix
/// commutative over the parent set.
pub fn hash_sorted(values: impl IntoIterator<Item = String>) -> String {
    let mut sorted: Vec<String> = values.into_iter().collect();
    sorted.sort();
    let refs: Vec<&str> = sorted.iter().map(String::as_str).collect();
    hash_fields(&refs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_fields_is_deterministic() {
        let a = hash_fields(&["select 1", "FULL", "generic"]);
        let b = hash_fields(&["select 1", "FULL", "generic"]);
        assert_eq!(a, b);
    }

    #[test]
    fn hash_fields_is_order_sensitive() {
        let a = hash_fields(&["x", "y"]);
        let b = hash_fields(&["y", "x"]);
        assert_ne!(a, b);
    }

    #[test]
    fn hash_sorted_is_commutative() {
        let a = hash_sorted(vec!["p1".to_string(), "p2".to_string()]);
        let b = hash_sorted(vec!["p2".to_string(), "p1".to_string()]);
        assert_eq!(a, b);
    }

    #[test]
    fn hash_is_decimal_text() {
        let h = hash_fields(&["anything"]);
        assert!(h.chars().all(|c| c.is_ascii_digit()));
    }
}
