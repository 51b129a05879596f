//! Macroblock-header VLC tables: cbpc, mb-type, cbpy, and the inter-intra
//! direction table (§4.2, §4.5, §4.6).

use crate::tables::huffman::build_entries;
use crate::vlc::{build_tree, Entry, Table};

/// V2's 3-bit-width intra CBPC table: 4 symbols, the raw `cbp_low` value in
/// `0..=3`.
pub fn v2_intra_cbpc() -> Vec<Entry<u8>> {
    let weights = [8u32, 4, 2, 1];
    let values: Vec<u8> = (0..4).collect();
    build_tree(&build_entries(&weights, &values))
}

/// V2's 7-bit-width MB-type table: 8 symbols packed as
/// `(mb_intra << 2) | cbp_low`, exactly like the H.263 MCBPC code this
/// substitutes for on non-V2 versions.
pub fn v2_mb_type() -> Vec<Entry<u8>> {
    let weights = [16u32, 8, 8, 4, 4, 2, 2, 1];
    let values: Vec<u8> = (0..8).collect();
    build_tree(&build_entries(&weights, &values))
}

/// H.263 inter-MCBPC (used by V1/V3/W1's P-picture path): 8 symbols, same
/// `(mb_intra << 2) | cbp_low` packing as [`v2_mb_type`].
pub fn h263_inter_mcbpc() -> Vec<Entry<u8>> {
    let weights = [20u32, 10, 8, 6, 4, 3, 2, 1];
    let values: Vec<u8> = (0..8).collect();
    build_tree(&build_entries(&weights, &values))
}

/// H.263 intra-MCBPC (used by V1/V3/W1's I-picture path): 4 symbols, the raw
/// `cbp_low` value in `0..=3`.
pub fn h263_intra_mcbpc() -> Vec<Entry<u8>> {
    let weights = [10u32, 5, 3, 1];
    let values: Vec<u8> = (0..4).collect();
    build_tree(&build_entries(&weights, &values))
}

/// H.263 CBPY: 16 symbols, the 4-bit `cbpy` value.
pub fn h263_cbpy() -> Vec<Entry<u8>> {
    let weights: Vec<u32> = (0..16).rev().map(|r| r + 1).collect();
    let values: Vec<u8> = (0..16).collect();
    build_tree(&build_entries(&weights, &values))
}

/// One of the four MB non-intra tables used by the V3/W1 P-picture path
/// (§4.6). Only index [`DEFAULT_INTER_INDEX`] is ever selected by any known
/// code path (see §9's open question); all four are still built for parity
/// with §4.2's "four variants" requirement, each with a distinct weight
/// skew so the tables are not literally identical.
pub fn mb_non_intra(variant: usize) -> Vec<Entry<u8>> {
    // 128 symbols: bit 6 is the (inverted) intra flag, bits 5..0 are cbp.
    let n = 128usize;
    let skew = 1 + variant as u32;
    let weights: Vec<u32> = (0..n as u32).rev().map(|r| r / skew + 1).collect();
    let values: Vec<u8> = (0..n as u32).map(|v| v as u8).collect();
    build_tree(&build_entries(&weights, &values))
}

/// `DEFAULT_INTER_INDEX`: the hardcoded, never-varied selector into
/// [`mb_non_intra`]'s four variants (§9 open question — preserved as-is).
pub const DEFAULT_INTER_INDEX: usize = 3;

/// The intra MB VLC used by the V3/W1 I-picture path: 64 symbols, the raw
/// 6-bit (pre-prediction) coded block pattern.
pub fn intra_mb_vlc() -> Vec<Entry<u8>> {
    let weights: Vec<u32> = (0..64u32).rev().map(|r| r + 1).collect();
    let values: Vec<u8> = (0..64u32).map(|v| v as u8).collect();
    build_tree(&build_entries(&weights, &values))
}

/// The 4-entry inter/intra prediction direction table (W1 only).
pub fn inter_intra_dir() -> Vec<Entry<u8>> {
    let weights = [8u32, 4, 2, 1];
    let values: Vec<u8> = (0..4).collect();
    build_tree(&build_entries(&weights, &values))
}

lazy_static! {
    pub static ref V2_INTRA_CBPC: Vec<Entry<u8>> = v2_intra_cbpc();
    pub static ref V2_MB_TYPE: Vec<Entry<u8>> = v2_mb_type();
    pub static ref H263_INTER_MCBPC: Vec<Entry<u8>> = h263_inter_mcbpc();
    pub static ref H263_INTRA_MCBPC: Vec<Entry<u8>> = h263_intra_mcbpc();
    pub static ref H263_CBPY: Vec<Entry<u8>> = h263_cbpy();
    pub static ref MB_NON_INTRA: [Vec<Entry<u8>>; 4] =
        [mb_non_intra(0), mb_non_intra(1), mb_non_intra(2), mb_non_intra(3)];
    pub static ref INTRA_MB_VLC: Vec<Entry<u8>> = intra_mb_vlc();
    pub static ref INTER_INTRA_DIR: Vec<Entry<u8>> = inter_intra_dir();
}

/// Borrow the default (and only ever selected) non-intra table.
pub fn default_mb_non_intra() -> &'static Table<u8> {
    &MB_NON_INTRA[DEFAULT_INTER_INDEX]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_build_idempotently() {
        assert_eq!(v2_intra_cbpc(), v2_intra_cbpc());
        assert_eq!(intra_mb_vlc(), intra_mb_vlc());
        assert_eq!(mb_non_intra(2), mb_non_intra(2));
    }

    #[test]
    fn static_tables_are_populated() {
        assert!(!V2_INTRA_CBPC.is_empty());
        assert!(!H263_CBPY.is_empty());
        assert_eq!(MB_NON_INTRA.len(), 4);
    }
}
