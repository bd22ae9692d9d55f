//! Hashing helpers shared across the interning and memo tables.

/// [Szudzik pairing function][szudzik-pairing].
///
/// ```text
/// (a, b) -> if (a<b) then (b^2 + a) else (a^2 + a + b)
/// ```
///
/// [szudzik-pairing]: http://szudzik.com/ElegantPairing.pdf
pub fn pairing2(a: u64, b: u64) -> u64 {
    if a < b {
        b.wrapping_mul(b).wrapping_add(a)
    } else {
        a.wrapping_mul(a).wrapping_add(a).wrapping_add(b)
    }
}

/// Pairing function for three `u64` values.
pub fn pairing3(a: u64, b: u64, c: u64) -> u64 {
    pairing2(pairing2(a, b), c)
}

/// Folds one value into a running hash, boost-style. Order-sensitive:
/// callers fold sorted sequences so equal sets hash equally.
pub fn hash_combine(seed: u64, value: u64) -> u64 {
    seed ^ value
        .wrapping_add(0x9e37_79b9)
        .wrapping_add(seed << 6)
        .wrapping_add(seed >> 2)
}

/// Hash of a sorted id sequence, used as the column-state memo key.
pub fn hash_sorted(ids: impl IntoIterator<Item = u64>) -> u64 {
    let mut seed = 0u64;
    for id in ids {
        seed = hash_combine(seed, id);
    }
    seed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_szudzik() {
        // a\b  0  1  2  3  4
        // ------------------
        // 0    0  1  4  9 16
        // 1    2  3  5 10 17
        // 2    6  7  8 11 18
        // 3   12 13 14 15 19
        // 4   20 21 22 23 24
        assert_eq!(pairing2(0, 0), 0);
        assert_eq!(pairing2(0, 1), 1);
        assert_eq!(pairing2(1, 0), 2);
        assert_eq!(pairing2(1, 1), 3);
        assert_eq!(pairing2(0, 2), 4);
        assert_eq!(pairing2(2, 1), 7);
        assert_eq!(pairing2(4, 0), 20);
        assert_eq!(pairing2(4, 4), 24);
    }

    #[test]
    fn test_pairing3_distinguishes_order() {
        assert_ne!(pairing3(1, 2, 3), pairing3(3, 2, 1));
        assert_ne!(pairing3(1, 2, 3), pairing3(2, 1, 3));
    }

    #[test]
    fn test_hash_sorted_equal_sets() {
        let a = hash_sorted([1u64, 5, 9]);
        let b = hash_sorted([1u64, 5, 9]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_hash_sorted_distinguishes_sets() {
        assert_ne!(hash_sorted([1u64, 5, 9]), hash_sorted([1u64, 5, 10]));
        assert_ne!(hash_sorted([1u64, 5]), hash_sorted([1u64, 5, 9]));
        assert_ne!(hash_sorted([] as [u64; 0]), hash_sorted([0u64]));
    }
}
