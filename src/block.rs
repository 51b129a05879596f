//! Per-8x8-block coefficient decoding: DC prediction and the three-level
//! escape run-length AC loop (§4.8, §4.9).

use crate::context::Context;
use crate::error::{Error, Result};
use crate::neighbors::NeighborPredictor;
use crate::reader::BitReader;
use crate::tables::dc::{DcSymbol, V1V2_CHROMA, V1V2_LUMA, V3W1_CHROMA, V3W1_LUMA};
use crate::tables::rl::{RlSymbol, RlTable, RL_INTER, RL_INTRA};
use crate::types::{CoefficientBlock, MacroblockType};

/// Standard zigzag scan order: `ZIGZAG[n]` is the raster-order index of the
/// `n`th coefficient in scan order (index 0 is always the DC term).
const ZIGZAG: [usize; 64] = [
    0, 1, 8, 16, 9, 2, 3, 10, 17, 24, 32, 25, 18, 11, 4, 5, 12, 19, 26, 33, 40, 48, 41, 34, 27, 20,
    13, 6, 7, 14, 21, 28, 35, 42, 49, 56, 57, 50, 43, 36, 29, 22, 15, 23, 30, 37, 44, 51, 58, 59,
    52, 45, 38, 31, 39, 46, 53, 60, 61, 54, 47, 55, 62, 63,
];

/// Sign-extend the low `bits` bits of `value` into a full `i32`.
fn sign_extend(value: u32, bits: u32) -> i32 {
    let shift = 32 - bits;
    ((value << shift) as i32) >> shift
}

/// Map a block index (`0..6`, Y0..Y3, Cb, Cr) onto V1's 3-slot rotating
/// predictor: all four luma blocks share slot 0, Cb is slot 1, Cr is slot 2
/// (`msmpeg4v1_pred_dc`, §4.8).
fn v1_predictor_slot(block: usize) -> usize {
    if block < 4 {
        0
    } else {
        block - 3
    }
}

/// Decode one block's DC coefficient (§4.8). `block` is the `0..6` index
/// (Y0..Y3, Cb, Cr). V1 alone predicts through its internal rotating
/// predictor; V2/V3/W1 all predict spatially through `NeighborPredictor`,
/// even though V1/V2 share the same flat residual VLC table.
pub fn decode_dc(
    reader: &mut BitReader,
    ctx: &mut Context,
    predictor: &mut dyn NeighborPredictor,
    mb_x: u32,
    mb_y: u32,
    block: usize,
) -> Result<i16> {
    debug_assert!(block < 6);
    let is_luma = block < 4;

    let residual = if ctx.version.is_v1_v2() {
        let table = if is_luma { &*V1V2_LUMA } else { &*V1V2_CHROMA };
        reader.read_vlc(table, "dc_v1v2")? as i32
    } else {
        let tables = if is_luma { &*V3W1_LUMA } else { &*V3W1_CHROMA };
        let table = &tables[ctx.dc_table_index];
        let magnitude = match reader.read_vlc(table, "dc_v3w1")? {
            DcSymbol::Class(c) => c as i32,
            DcSymbol::Escape => reader.read_bits::<u32>(8)? as i32,
        };

        if magnitude == 0 {
            0
        } else if reader.read_flag()? {
            -magnitude
        } else {
            magnitude
        }
    };

    if ctx.version.is_v1() {
        let slot = v1_predictor_slot(block);
        let predicted = ctx.v1_dc_predictor[slot];
        let dc = predicted.saturating_add(residual as i16);
        ctx.v1_dc_predictor[slot] = dc;
        Ok(dc)
    } else {
        // The predictor is stored scaled by the per-plane DC quantizer scale;
        // the overflow check against that same scale happens one level up,
        // in `decode_block`, against the raw (unscaled) value returned here
        // (§4.8).
        let predicted = predictor.predict_dc_spatial(mb_x, mb_y, block);
        let dc = (predicted as i32 + residual).clamp(i16::MIN as i32, i16::MAX as i32) as i16;
        let scale = if is_luma {
            crate::context::y_dc_scale(ctx.qscale)
        } else {
            crate::context::c_dc_scale(ctx.qscale)
        };
        predictor.store_dc(
            mb_x,
            mb_y,
            block,
            (dc as i32 * scale).clamp(i16::MIN as i32, i16::MAX as i32) as i16,
        );
        Ok(dc)
    }
}

/// First-tier escape (non-V1 only): re-decode a `(last, run, level)` triple
/// from the table's escape domain, then widen `level` by that run's largest
/// directly-coded magnitude before applying the sign bit that follows
/// (§4.8). `level` here is a magnitude; the caller applies the sign.
fn decode_escape1(reader: &mut BitReader, table: &RlTable) -> Result<(bool, u8, i32)> {
    let (last, run, level) = reader.read_vlc(&table.escape_tree, "rl_escape1")?;
    let widened = level as i32 + table.max_level[run as usize] as i32;
    let sign = reader.read_flag()?;
    Ok((last, run, if sign { -widened } else { widened }))
}

/// Second-tier escape (non-V1 only): re-decode a `(last, run, level)`
/// triple, but this time it is the run that gets widened, by the longest
/// run ever directly coded for that magnitude plus a version-dependent fixup
/// (§4.8).
fn decode_escape2(reader: &mut BitReader, table: &RlTable, run_diff: u8) -> Result<(bool, u8, i32)> {
    let (last, run, level) = reader.read_vlc(&table.escape_tree, "rl_escape2")?;
    let widened_run = run + table.max_run[level as usize] + run_diff;
    let sign = reader.read_flag()?;
    let signed_level = level as i32;
    Ok((last, widened_run, if sign { -signed_level } else { signed_level }))
}

/// Third-tier escape: reached unconditionally on V1, or when both escape
/// lookahead bits are clear on V2/V3/W1. V1/V2/V3 use a fixed
/// `last(1)+run(6)+level(8 signed)` layout; W1 instead reads a per-picture
/// sticky bit-length code for the run/level fields from the first block
/// that needs it, then reuses those widths for the rest of the picture
/// (§4.8, §9).
fn decode_escape3(reader: &mut BitReader, ctx: &mut Context) -> Result<(bool, u8, i32)> {
    let last = reader.read_flag()?;

    if !ctx.version.is_w1() {
        let run: u32 = reader.read_bits(6)?;
        let level = sign_extend(reader.read_bits(8)?, 8);
        return Ok((last, run as u8, level));
    }

    let (run_length, level_length) = match (ctx.esc3_run_length, ctx.esc3_level_length) {
        (Some(r), Some(l)) => (r, l),
        _ => {
            let level_length: u8 = if ctx.qscale < 8 {
                let ll: u8 = reader.read_bits(3)?;
                if ll == 0 {
                    8 + reader.read_bits::<u8>(1)?
                } else {
                    ll
                }
            } else {
                let mut ll: u8 = 2;
                while ll < 8 && reader.peek_bits::<u8>(1)? == 0 {
                    reader.skip_bits(1)?;
                    ll += 1;
                }
                if ll < 8 {
                    reader.skip_bits(1)?;
                }
                ll
            };
            let run_length: u8 = reader.read_bits::<u8>(2)? + 3;
            ctx.esc3_level_length = Some(level_length);
            ctx.esc3_run_length = Some(run_length);
            (run_length, level_length)
        }
    };

    let run: u32 = reader.read_bits(run_length as u32)?;
    let sign = reader.read_flag()?;
    let magnitude: u32 = reader.read_bits(level_length as u32)?;
    let level = if sign { -(magnitude as i32) } else { magnitude as i32 };
    Ok((last, run as u8, level))
}

/// Decode one block's AC coefficients onto a DC value already obtained from
/// [`decode_dc`], returning the completed coefficient block and the index
/// (in scan order, `-1` if none) of its last nonzero coefficient (§4.8,
/// §4.9).
#[allow(clippy::too_many_arguments)]
pub fn decode_block(
    reader: &mut BitReader,
    ctx: &mut Context,
    predictor: &mut dyn NeighborPredictor,
    mb_x: u32,
    mb_y: u32,
    block: usize,
    mb_type: MacroblockType,
    ac_pred: bool,
    dc: i16,
) -> Result<(CoefficientBlock, i32)> {
    let intra = mb_type.is_intra();
    let is_luma = block < 4;
    let mut coeffs: CoefficientBlock = [0; 64];
    coeffs[0] = dc;
    let mut last_index: i32 = 0;

    if intra {
        // Intra blocks never dequantize in this step at all: the DC was
        // already stored at full scale by `decode_dc`, and intra AC
        // coefficients are coded at qmul=1, qadd=0 regardless of picture
        // qscale (§4.8). The DC-overflow check on the other hand belongs
        // here, not in `decode_dc`: it compares the raw (unscaled) DC value
        // this block's caller obtained against the same per-plane scale.
        let scale = if is_luma {
            crate::context::y_dc_scale(ctx.qscale)
        } else {
            crate::context::c_dc_scale(ctx.qscale)
        };
        if dc as i32 > 256 * scale && !ctx.inter_intra_pred {
            return Err(Error::DcOverflow { block, qscale: ctx.qscale });
        }
    }

    let qscale = ctx.qscale as i32;
    let (qmul, qadd) = if intra { (1, 0) } else { (qscale * 2, (qscale - 1) | 1) };

    // Intra chroma blocks reuse the *inter* table family, indexed by
    // `rl_chroma_table_index`; intra luma uses the intra family; inter
    // blocks of either plane always use the inter family indexed by
    // `rl_table_index` alone, with no luma/chroma split (§4.9).
    let table = if intra {
        if is_luma {
            &RL_INTRA[ctx.rl_table_index]
        } else {
            &RL_INTER[ctx.rl_chroma_table_index]
        }
    } else {
        &RL_INTER[ctx.rl_table_index]
    };

    let run_diff: u8 = if intra {
        ctx.version.is_w1() as u8
    } else {
        !ctx.version.is_v2() as u8
    };

    let mut index: i32 = if intra { 0 } else { -1 };
    loop {
        let (last, run, level) = match reader.read_vlc(&table.tree, "rl")? {
            RlSymbol::Run { last, run, level } => (last, run, level as i32),
            RlSymbol::Escape => {
                if ctx.version.is_v1() {
                    decode_escape3(reader, ctx)?
                } else {
                    match reader.peek_bits::<u8>(2)? {
                        0b10 | 0b11 => {
                            reader.skip_bits(1)?;
                            decode_escape1(reader, table)?
                        }
                        0b01 => {
                            reader.skip_bits(2)?;
                            decode_escape2(reader, table, run_diff)?
                        }
                        _ => {
                            reader.skip_bits(2)?;
                            decode_escape3(reader, ctx)?
                        }
                    }
                }
            }
        };

        index += run as i32 + 1;
        if index > 63 {
            if ctx.err_recognition.rejects_overflow() {
                return Err(Error::AcOverflow { index, block });
            }
            break;
        }

        let dequant = if level < 0 {
            level * qmul - qadd
        } else {
            level * qmul + qadd
        };
        coeffs[ZIGZAG[index as usize]] = dequant.clamp(i16::MIN as i32, i16::MAX as i32) as i16;
        last_index = index;

        if last {
            break;
        }
    }

    if ac_pred && intra {
        let predicted_ac = predictor.predict_ac_from_neighbors(mb_x, mb_y, block);
        for (k, addend) in predicted_ac.iter().enumerate() {
            let pos = k + 1;
            coeffs[pos] = coeffs[pos].saturating_add(*addend);
        }
        predictor.store_ac_coefficients(mb_x, mb_y, block, predicted_ac);
        last_index = 63;
    }

    Ok((coeffs, last_index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neighbors::NullPredictor;
    use crate::types::Version;

    #[test]
    fn sign_extend_round_trips_negative_values() {
        assert_eq!(sign_extend(0b1111_1111, 8), -1);
        assert_eq!(sign_extend(0b0111_1111, 8), 127);
        assert_eq!(sign_extend(0b1000_0000, 8), -128);
    }

    #[test]
    fn v1_dc_predictor_accumulates_across_calls() {
        let mut ctx = Context::new(Version::V1, 16, 16).unwrap();
        let mut predictor = NullPredictor;
        ctx.v1_dc_predictor[0] = 100;

        // A residual table symbol for 0 should leave the predictor as-is;
        // we can't easily force a specific residual without a real table
        // codeword, so just confirm the call succeeds and updates state.
        let data = [0u8; 4];
        let mut reader = BitReader::new(&data);
        let result = decode_dc(&mut reader, &mut ctx, &mut predictor, 0, 0, 0);
        assert!(result.is_ok());
    }

    #[test]
    fn zigzag_is_a_permutation() {
        let mut seen = [false; 64];
        for &p in ZIGZAG.iter() {
            assert!(!seen[p]);
            seen[p] = true;
        }
    }

    #[test]
    fn overflow_is_lenient_by_default() {
        let mut ctx = Context::new(Version::W1, 16, 16).unwrap();
        let mut predictor = NullPredictor;
        let data = [0xFFu8; 16];
        let mut reader = BitReader::new(&data);
        let result = decode_block(
            &mut reader,
            &mut ctx,
            &mut predictor,
            0,
            0,
            0,
            MacroblockType::Intra,
            false,
            512,
        );
        assert!(result.is_ok());
    }
}
