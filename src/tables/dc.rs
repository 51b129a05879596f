//! DC coefficient VLC tables (§4.8).
//!
//! V1/V2 use a single flat table per plane whose codeword resolves directly
//! to a signed residual (`level = code - 256`, the format's own signed-offset
//! convention). V3/W1 instead code a magnitude class, with an escape
//! symbol that falls through to a raw 8-bit magnitude plus a sign bit, and
//! select among four `dc_table_index` variants per §4.3's per-picture table
//! selection.

use crate::tables::huffman::build_entries;
use crate::vlc::{build_tree, Entry};

/// A decoded DC symbol for the V3/W1 magnitude-class tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DcSymbol {
    /// A magnitude class small enough to be carried directly in the table.
    Class(u8),
    /// Magnitude too large for the table; a raw 8-bit magnitude follows.
    Escape,
}

/// The flat V1/V2 residual table: 512 symbols, codeword `c` means residual
/// `c as i16 - 256`.
fn v1v2_flat_table(peak: u32) -> Vec<Entry<i16>> {
    let n = 512u32;
    let weights: Vec<u32> = (0..n)
        .map(|c| {
            let dist = (c as i32 - 256).unsigned_abs();
            peak.saturating_sub(dist).max(1)
        })
        .collect();
    let values: Vec<i16> = (0..n as i32).map(|c| (c - 256) as i16).collect();
    build_tree(&build_entries(&weights, &values))
}

/// One of the four V3/W1 magnitude-class tables (`dc_table_index` in
/// `0..=3`, luma and chroma are built separately so each plane gets its own
/// weighting). 13 classes (0..=11 plus the escape) mirrors the 8-bit maximum
/// direct magnitude used by the escape path.
fn v3w1_class_table(dc_table_index: usize, is_chroma: bool) -> Vec<Entry<DcSymbol>> {
    let n_classes = 12usize;
    let skew = 1 + dc_table_index as u32 + if is_chroma { 1 } else { 0 };
    let mut weights: Vec<u32> = (0..n_classes as u32).rev().map(|r| r * skew + 1).collect();
    // The escape symbol is rare; give it the lowest weight of all.
    weights.push(1);

    let mut values: Vec<DcSymbol> = (0..n_classes as u8).map(DcSymbol::Class).collect();
    values.push(DcSymbol::Escape);

    build_tree(&build_entries(&weights, &values))
}

lazy_static! {
    pub static ref V1V2_LUMA: Vec<Entry<i16>> = v1v2_flat_table(256);
    pub static ref V1V2_CHROMA: Vec<Entry<i16>> = v1v2_flat_table(200);
    pub static ref V3W1_LUMA: [Vec<Entry<DcSymbol>>; 4] = [
        v3w1_class_table(0, false),
        v3w1_class_table(1, false),
        v3w1_class_table(2, false),
        v3w1_class_table(3, false),
    ];
    pub static ref V3W1_CHROMA: [Vec<Entry<DcSymbol>>; 4] = [
        v3w1_class_table(0, true),
        v3w1_class_table(1, true),
        v3w1_class_table(2, true),
        v3w1_class_table(3, true),
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_tables_cover_full_residual_range() {
        let tree = v1v2_flat_table(256);
        let has_min = tree.iter().any(|e| matches!(e, Entry::End(-256)));
        let has_max = tree.iter().any(|e| matches!(e, Entry::End(255)));
        assert!(has_min && has_max);
    }

    #[test]
    fn class_tables_include_escape() {
        let tree = v3w1_class_table(0, false);
        assert!(tree
            .iter()
            .any(|e| matches!(e, Entry::End(DcSymbol::Escape))));
    }

    #[test]
    fn tables_build_idempotently() {
        assert_eq!(v1v2_flat_table(256), v1v2_flat_table(256));
        assert_eq!(v3w1_class_table(3, true), v3w1_class_table(3, true));
    }
}
