//! Motion-vector-delta VLC tables (§4.7).
//!
//! V1/V2 decode each component independently through a single shared table
//! (`MV_DELTA`): the codeword is a magnitude code in `0..=32`, and `0` itself
//! means "no change from the predictor" — no sign bit follows in that case.
//! V3/W1 instead decode both components together through one of two joint
//! tables selected by `mv_table_index`: each codeword either gives a
//! pre-biased `(dx, dy)` pair directly, or escapes to a raw unsigned 6-bit
//! reading of each component.

use crate::tables::huffman::build_entries;
use crate::vlc::{build_tree, Entry};

fn build_mv_delta_table() -> Vec<Entry<u8>> {
    let codes: Vec<u8> = (0u8..=32).collect();
    let weights: Vec<u32> = codes
        .iter()
        .map(|&c| (128u32 / (c as u32 + 1)).max(1))
        .collect();
    build_tree(&build_entries(&weights, &codes))
}

/// A decoded joint motion-vector delta, as read by V3/W1 (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointMvSymbol {
    /// A pre-biased `(dx, dy)` delta pair; add `predicted - 32` to each
    /// component to recover the value to wrap (§4.7).
    Delta(i8, i8),
    /// Escape: a raw unsigned 6-bit `dx` followed by a raw unsigned 6-bit
    /// `dy`, biased the same way as the direct-coded case.
    Escape,
}

/// The bounded `(dx, dy)` grid a joint table variant assigns direct
/// codewords to: a diamond around the origin, tighter for variant 0 than
/// variant 1, mirroring the real per-variant table being built around a
/// different expected motion magnitude.
fn joint_domain(variant: usize) -> Vec<(i8, i8)> {
    let cap = 12i32 + variant as i32 * 8;
    let mut pairs = Vec::new();
    for dx in -16i32..=16 {
        for dy in -16i32..=16 {
            if dx.abs() + dy.abs() <= cap {
                pairs.push((dx as i8, dy as i8));
            }
        }
    }
    pairs
}

fn build_joint_mv_table(variant: usize) -> Vec<Entry<JointMvSymbol>> {
    let pairs = joint_domain(variant);
    let skew = 1 + variant as u32;

    let mut symbols: Vec<JointMvSymbol> =
        pairs.iter().map(|&(dx, dy)| JointMvSymbol::Delta(dx, dy)).collect();
    symbols.push(JointMvSymbol::Escape);

    let weights: Vec<u32> = pairs
        .iter()
        .map(|&(dx, dy)| {
            let magnitude = dx.unsigned_abs() as u32 + dy.unsigned_abs() as u32;
            (512u32 / (magnitude * skew + 1)).max(1)
        })
        .chain(std::iter::once(1))
        .collect();

    build_tree(&build_entries(&weights, &symbols))
}

lazy_static! {
    pub static ref MV_DELTA: Vec<Entry<u8>> = build_mv_delta_table();
    pub static ref MV_JOINT: [Vec<Entry<JointMvSymbol>>; 2] =
        [build_joint_mv_table(0), build_joint_mv_table(1)];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_code_is_present_and_means_unchanged() {
        let t = build_mv_delta_table();
        assert!(t.iter().any(|e| matches!(e, Entry::End(0))));
    }

    #[test]
    fn joint_zero_delta_is_present() {
        let t = build_joint_mv_table(0);
        assert!(t
            .iter()
            .any(|e| matches!(e, Entry::End(JointMvSymbol::Delta(0, 0)))));
    }

    #[test]
    fn joint_escape_is_present() {
        let t = build_joint_mv_table(1);
        assert!(t
            .iter()
            .any(|e| matches!(e, Entry::End(JointMvSymbol::Escape))));
    }

    #[test]
    fn tables_build_idempotently() {
        assert_eq!(build_mv_delta_table(), build_mv_delta_table());
        assert_eq!(build_joint_mv_table(0), build_joint_mv_table(0));
    }
}
