//! Weight-driven (code, length) derivation for the VLC table builder (§4.2).
//!
//! Real MSMPEG4-family codeword tables were themselves derived by running a
//! Huffman construction over measured symbol frequencies once, then freezing
//! the result into the bitstream format. This module reproduces that step:
//! each concrete table (`tables::dc`, `tables::rl`, `tables::mv`,
//! `tables::mb`) supplies a list of symbols ordered from most to least
//! likely and gets back canonical (code, length) pairs that are prefix-free
//! by construction, which `vlc::build_tree` then assembles into a lookup
//! tree.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Derive a code length for every symbol in `weights` via a standard
/// Huffman merge (heavier weight -> shorter code). A single-symbol input
/// gets length 0, since a one-symbol table can be represented as an
/// immediate leaf with no bits consumed.
pub fn lengths_from_weights(weights: &[u32]) -> Vec<u8> {
    let n = weights.len();
    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return vec![0];
    }

    let mut node_weight: Vec<u64> = weights.iter().map(|&w| w.max(1) as u64).collect();
    let mut parent: Vec<usize> = vec![usize::MAX; 2 * n - 1];

    let mut heap: BinaryHeap<Reverse<(u64, usize)>> = weights
        .iter()
        .enumerate()
        .map(|(i, &w)| Reverse((w.max(1) as u64, i)))
        .collect();

    let mut next_id = n;
    node_weight.resize(2 * n - 1, 0);

    while heap.len() > 1 {
        let Reverse((w1, i1)) = heap.pop().unwrap();
        let Reverse((w2, i2)) = heap.pop().unwrap();
        parent[i1] = next_id;
        parent[i2] = next_id;
        node_weight[next_id] = w1 + w2;
        heap.push(Reverse((w1 + w2, next_id)));
        next_id += 1;
    }

    (0..n)
        .map(|leaf| {
            let mut depth = 0u8;
            let mut cur = leaf;
            while parent[cur] != usize::MAX {
                cur = parent[cur];
                depth += 1;
            }
            depth
        })
        .collect()
}

/// Assign canonical codes to a list of code lengths produced by
/// [`lengths_from_weights`]. Symbols are visited in their original order;
/// within a length class, earlier symbols get numerically smaller codes.
/// This is the standard canonical-Huffman assignment and is prefix-free
/// whenever the input lengths came from an actual Huffman tree (which they
/// do here, since every internal node in that construction has exactly two
/// children).
pub fn canonical_codes(lengths: &[u8]) -> Vec<(u32, u8)> {
    let max_len = lengths.iter().copied().max().unwrap_or(0) as usize;
    let mut bl_count = vec![0u32; max_len + 2];
    for &l in lengths {
        if l > 0 {
            bl_count[l as usize] += 1;
        }
    }

    let mut next_code = vec![0u32; max_len + 2];
    let mut code = 0u32;
    for bits in 1..=max_len {
        code = (code + bl_count[bits - 1]) << 1;
        next_code[bits] = code;
    }

    lengths
        .iter()
        .map(|&len| {
            if len == 0 {
                (0, 0)
            } else {
                let c = next_code[len as usize];
                next_code[len as usize] += 1;
                (c, len)
            }
        })
        .collect()
}

/// Convenience wrapper: go straight from weights + values to the
/// `(code, length, value)` triples `vlc::build_tree` expects.
pub fn build_entries<T: Clone>(weights: &[u32], values: &[T]) -> Vec<(u32, u8, T)> {
    assert_eq!(weights.len(), values.len());
    let lengths = lengths_from_weights(weights);
    let codes = canonical_codes(&lengths);
    codes
        .into_iter()
        .zip(values.iter().cloned())
        .map(|((code, len), value)| (code, len, value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_symbol_needs_no_bits() {
        let lengths = lengths_from_weights(&[42]);
        assert_eq!(lengths, vec![0]);
    }

    #[test]
    fn kraft_equality_holds() {
        let weights = [50, 30, 10, 5, 4, 1];
        let lengths = lengths_from_weights(&weights);
        let kraft: f64 = lengths.iter().map(|&l| 2f64.powi(-(l as i32))).sum();
        assert!((kraft - 1.0).abs() < 1e-9, "kraft sum was {kraft}");
    }

    #[test]
    fn heavier_weights_get_shorter_or_equal_codes() {
        let weights = [100, 1, 1, 1];
        let lengths = lengths_from_weights(&weights);
        assert!(lengths[0] <= lengths[1]);
        assert!(lengths[0] <= lengths[2]);
        assert!(lengths[0] <= lengths[3]);
    }

    #[test]
    fn codes_are_prefix_free() {
        let weights = [8, 7, 6, 5, 4, 3, 2, 1];
        let values: Vec<u8> = (0..8).collect();
        let entries = build_entries(&weights, &values);
        let tree = crate::vlc::build_tree(&entries);
        // every value must be reachable and distinct
        for v in 0..8u8 {
            assert!(tree.iter().any(|e| matches!(e, crate::vlc::Entry::End(x) if *x == v)));
        }
    }
}
