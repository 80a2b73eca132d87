//! Match scheduling: which pairs play on which map.

/// Round-robin pairings for one competition map.
///
/// Algorithm `i` meets `j = (i + 1 + k mod (N-1)) mod N` on map `k`; the
/// game is emitted only when `i < j`, which deduplicates the mirrored
/// pairing (and, for even `N` on the half-way offset, the self-mirrored
/// one). Requires `num_algorithms >= 2`.
pub fn competition_pairings(num_algorithms: usize, map_index: usize) -> Vec<(usize, usize)> {
    let n = num_algorithms;
    let offset = map_index % (n - 1);
    (0..n)
        .filter_map(|i| {
            let j = (i + 1 + offset) % n;
            (i < j).then_some((i, j))
        })
        .collect()
}
