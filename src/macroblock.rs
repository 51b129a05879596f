//! Macroblock header decoding (§4.5, §4.6).

use crate::block::{decode_block, decode_dc};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::motion::decode_motion_vector;
use crate::neighbors::NeighborPredictor;
use crate::reader::BitReader;
use crate::tables::mb::{
    default_mb_non_intra, H263_CBPY, H263_INTER_MCBPC, H263_INTRA_MCBPC, INTER_INTRA_DIR,
    INTRA_MB_VLC, V2_INTRA_CBPC, V2_MB_TYPE,
};
use crate::types::{Macroblock, MacroblockType, MotionVector, PictureType};

/// The upper four coded-block-pattern bits get XOR'd with `0x3C` under
/// conditions that differ between inter and intra macroblocks (§4.5); see
/// the call sites for exactly when it applies.
const CBP_XOR_MASK: u8 = 0x3C;

/// Decode one macroblock (§4.5 for V1/V2, §4.6 for V3/W1).
///
/// `mb_x`/`mb_y` locate the macroblock for the [`NeighborPredictor`]
/// callbacks. Returns `Macroblock::skipped()` immediately, without reading
/// any further bits, when a P-picture macroblock is signaled as skipped.
pub fn decode_macroblock(
    reader: &mut BitReader,
    ctx: &mut Context,
    predictor: &mut dyn NeighborPredictor,
    mb_x: u32,
    mb_y: u32,
) -> Result<Macroblock> {
    if ctx.picture_type == PictureType::P && ctx.use_skip_mb_code && reader.read_flag()? {
        return Ok(Macroblock::skipped());
    }

    if ctx.version.is_v1_v2() {
        decode_mb_v1_v2(reader, ctx, predictor, mb_x, mb_y)
    } else {
        decode_mb_v3_w1(reader, ctx, predictor, mb_x, mb_y)
    }
}

fn decode_mb_v1_v2(
    reader: &mut BitReader,
    ctx: &mut Context,
    predictor: &mut dyn NeighborPredictor,
    mb_x: u32,
    mb_y: u32,
) -> Result<Macroblock> {
    let (mb_intra, cbp_low) = if ctx.picture_type == PictureType::I {
        let packed: u8 = if ctx.version.is_v2() {
            reader.read_vlc(&*V2_INTRA_CBPC, "v2_intra_cbpc")?
        } else {
            reader.read_vlc(&*H263_INTRA_MCBPC, "h263_intra_mcbpc")?
        };
        (true, packed)
    } else if ctx.version.is_v2() {
        let packed: u8 = reader.read_vlc(&*V2_MB_TYPE, "v2_mb_type")?;
        (packed & 0b100 != 0, packed & 0b011)
    } else {
        let packed: u8 = reader.read_vlc(&*H263_INTER_MCBPC, "h263_inter_mcbpc")?;
        (packed & 0b100 != 0, packed & 0b011)
    };

    let mb_type = if mb_intra {
        MacroblockType::Intra
    } else {
        MacroblockType::Inter
    };

    // `ac_pred` for V2 intra macroblocks is read unconditionally, ahead of
    // `cbpy`; V1 never predicts AC coefficients and never reads this bit.
    let ac_pred = mb_intra && ctx.version.is_v2() && reader.read_flag()?;

    let cbpy: u8 = reader.read_vlc(&*H263_CBPY, "h263_cbpy")?;
    let mut cbp = cbp_low | (cbpy << 2);
    if mb_intra {
        // V2 never reverses the coded-block pattern for intra macroblocks;
        // V1 does, but only inside a P-picture (an intra MB coded within an
        // otherwise inter-predicted picture).
        if !ctx.version.is_v2() && ctx.picture_type == PictureType::P {
            cbp ^= CBP_XOR_MASK;
        }
    } else if ctx.version.is_v1() || (cbp & 0b11) != 0b11 {
        cbp ^= CBP_XOR_MASK;
    }

    let mv = if mb_intra {
        MotionVector::zero()
    } else {
        let predicted = predictor.predict_mv_from_neighbors(mb_x, mb_y);
        decode_motion_vector(reader, ctx, predicted)?
    };

    decode_block_set(
        reader, ctx, predictor, mb_x, mb_y, mb_type, mv, cbp, ac_pred, None,
    )
}

fn decode_mb_v3_w1(
    reader: &mut BitReader,
    ctx: &mut Context,
    predictor: &mut dyn NeighborPredictor,
    mb_x: u32,
    mb_y: u32,
) -> Result<Macroblock> {
    let (mb_intra, cbp) = if ctx.picture_type == PictureType::I {
        let raw_cbp: u8 = reader.read_vlc(&*INTRA_MB_VLC, "intra_mb_vlc")?;
        // Coded-block-pattern prediction only ever applies to the four
        // luma bits; the two chroma bits pass through unpredicted (§4.6).
        let mut cbp = raw_cbp;
        for n in 0..4 {
            let predicted_bit = predictor.predict_cbp_bit(mb_x, mb_y, n);
            let bit = (cbp >> (5 - n)) & 1 != 0;
            let resolved = bit ^ predicted_bit;
            predictor.store_cbp_bit(mb_x, mb_y, n, resolved);
            cbp = (cbp & !(1 << (5 - n))) | ((resolved as u8) << (5 - n));
        }
        (true, cbp)
    } else {
        let packed: u8 = reader.read_vlc(default_mb_non_intra(), "mb_non_intra")?;
        let mb_intra = packed & 0b0100_0000 == 0;
        (mb_intra, packed & 0b0011_1111)
    };

    let mb_type = if mb_intra {
        MacroblockType::Intra
    } else {
        MacroblockType::Inter
    };

    // A per-macroblock RL table override is never a bitstream-signaled
    // choice of its own; it is simply read whenever `per_mb_rl_table` was
    // enabled by the picture header and this macroblock has any coded
    // block at all (§4.6). For inter macroblocks it is checked right here,
    // ahead of the motion vector; for intra macroblocks it is checked at
    // the end of the intra branch below, after `ac_pred`/`inter_intra_dir`.
    if !mb_intra && ctx.per_mb_rl_table && cbp != 0 {
        ctx.rl_table_index = reader.decode012()? as usize;
        ctx.rl_chroma_table_index = ctx.rl_table_index;
    }

    let (ac_pred, inter_intra_dir) = if mb_intra {
        let ac_pred = reader.read_flag()?;
        let inter_intra_dir = if ctx.inter_intra_pred {
            Some(reader.read_vlc(&*INTER_INTRA_DIR, "inter_intra_dir")?)
        } else {
            None
        };
        if ctx.per_mb_rl_table && cbp != 0 {
            ctx.rl_table_index = reader.decode012()? as usize;
            ctx.rl_chroma_table_index = ctx.rl_table_index;
        }
        (ac_pred, inter_intra_dir)
    } else {
        (false, None)
    };

    let mv = if mb_intra {
        MotionVector::zero()
    } else {
        let predicted = predictor.predict_mv_from_neighbors(mb_x, mb_y);
        decode_motion_vector(reader, ctx, predicted)?
    };

    decode_block_set(
        reader,
        ctx,
        predictor,
        mb_x,
        mb_y,
        mb_type,
        mv,
        cbp,
        ac_pred,
        inter_intra_dir,
    )
}

#[allow(clippy::too_many_arguments)]
fn decode_block_set(
    reader: &mut BitReader,
    ctx: &mut Context,
    predictor: &mut dyn NeighborPredictor,
    mb_x: u32,
    mb_y: u32,
    mb_type: MacroblockType,
    mv: MotionVector,
    cbp: u8,
    ac_pred: bool,
    inter_intra_dir: Option<u8>,
) -> Result<Macroblock> {
    if cbp > 0x3F {
        return Err(Error::CbpOutOfRange { code: cbp, max: 0x3F });
    }

    let mut mb = Macroblock {
        mb_intra: mb_type.is_intra(),
        skipped: false,
        cbp,
        ac_pred,
        mv,
        inter_intra_dir,
        dct: [[0; 64]; 6],
        last_index: [-1; 6],
    };

    for n in 0..6 {
        let dc = if mb_type.is_intra() {
            decode_dc(reader, ctx, predictor, mb_x, mb_y, n)?
        } else {
            0
        };

        if mb.is_block_coded(n) {
            let (coeffs, last) = decode_block(
                reader, ctx, predictor, mb_x, mb_y, n, mb_type, ac_pred, dc,
            )?;
            mb.dct[n] = coeffs;
            mb.last_index[n] = last;
        } else if mb_type.is_intra() {
            mb.dct[n][0] = dc;
            mb.last_index[n] = 0;
        }
    }

    Ok(mb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neighbors::NullPredictor;
    use crate::types::Version;

    #[test]
    fn skip_flag_short_circuits_p_picture_macroblocks() {
        let data = [0b1000_0000];
        let mut reader = BitReader::new(&data);
        let mut ctx = Context::new(Version::V2, 16, 16).unwrap();
        ctx.picture_type = PictureType::P;
        ctx.use_skip_mb_code = true;
        let mut predictor = NullPredictor;

        let mb = decode_macroblock(&mut reader, &mut ctx, &mut predictor, 0, 0).unwrap();
        assert!(mb.skipped);
        assert_eq!(mb.mv, MotionVector::zero());
    }

    #[test]
    fn cbp_out_of_range_is_rejected() {
        let mut ctx = Context::new(Version::V2, 16, 16).unwrap();
        let mut predictor = NullPredictor;
        let result = decode_block_set(
            &mut BitReader::new(&[0u8; 4]),
            &mut ctx,
            &mut predictor,
            0,
            0,
            MacroblockType::Intra,
            MotionVector::zero(),
            0xFF,
            false,
            None,
        );
        assert!(matches!(result, Err(Error::CbpOutOfRange { .. })));
    }

    #[test]
    fn cbp_xor_mask_matches_known_constant() {
        assert_eq!(CBP_XOR_MASK, 0x3C);
    }
}
