//! Motion vector differential decoding (§4.7).

use crate::context::Context;
use crate::error::Result;
use crate::reader::BitReader;
use crate::tables::mv::{JointMvSymbol, MV_DELTA, MV_JOINT};
use crate::types::MotionVector;

/// Decode one V1/V2 motion vector component independently
/// (`msmpeg4v2_decode_motion`, §4.7): a code of `0` leaves `predicted`
/// unchanged without reading a sign bit at all; any other code is a
/// magnitude followed by an explicit sign bit, added onto `predicted` and
/// wrapped. V1/V2 fix `f_code` at `1`, so the magnitude is the code value
/// itself with no further extension bits.
fn decode_v1v2_component(reader: &mut BitReader, predicted: i16) -> Result<i16> {
    let code: u8 = reader.read_vlc(&MV_DELTA, "mv_delta")?;
    if code == 0 {
        return Ok(predicted);
    }
    let negative = reader.read_flag()?;
    let magnitude = code as i32;
    let val = if negative { -magnitude } else { magnitude };
    Ok(MotionVector::wrap_component(predicted as i32 + val))
}

/// Decode a V3/W1 joint motion vector (`ff_msmpeg4_decode_motion`, §4.7): a
/// single codeword gives both components' pre-biased deltas at once, or
/// escapes to a raw unsigned 6-bit reading of each. Either way, both
/// components are biased by `predicted - 32` before the `+-64` wrap — there
/// is no separate sign bit in this path.
fn decode_v3w1_joint(
    reader: &mut BitReader,
    ctx: &Context,
    predicted: MotionVector,
) -> Result<MotionVector> {
    let table = &MV_JOINT[ctx.mv_table_index];
    let (raw_x, raw_y) = match reader.read_vlc(table, "mv_joint")? {
        JointMvSymbol::Delta(dx, dy) => (dx as i32, dy as i32),
        JointMvSymbol::Escape => {
            let dx: i32 = reader.read_bits(6)?;
            let dy: i32 = reader.read_bits(6)?;
            (dx, dy)
        }
    };

    let x = raw_x + predicted.x as i32 - 32;
    let y = raw_y + predicted.y as i32 - 32;
    Ok(MotionVector {
        x: MotionVector::wrap_component(x),
        y: MotionVector::wrap_component(y),
    })
}

/// Decode one motion vector (§4.7, §9).
///
/// V1/V2 decode `x`/`y` independently through the shared single-component
/// table; V3/W1 decode both at once through `ctx.mv_table_index`'s joint
/// table, biasing each raw component by `predicted - 32` instead of reading
/// a separate sign bit.
pub fn decode_motion_vector(
    reader: &mut BitReader,
    ctx: &Context,
    predicted: MotionVector,
) -> Result<MotionVector> {
    if ctx.version.is_v1_v2() {
        let x = decode_v1v2_component(reader, predicted.x)?;
        let y = decode_v1v2_component(reader, predicted.y)?;
        Ok(MotionVector { x, y })
    } else {
        decode_v3w1_joint(reader, ctx, predicted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Version;

    #[test]
    fn decoding_from_a_well_formed_stream_succeeds() {
        let data = [0u8; 4];
        let mut reader = BitReader::new(&data);
        let ctx = Context::new(Version::V2, 16, 16).unwrap();
        let predicted = MotionVector { x: 10, y: -5 };
        let result = decode_motion_vector(&mut reader, &ctx, predicted);
        assert!(result.is_ok());
    }

    #[test]
    fn v3w1_decoding_from_a_well_formed_stream_succeeds() {
        let data = [0u8; 4];
        let mut reader = BitReader::new(&data);
        let ctx = Context::new(Version::W1, 16, 16).unwrap();
        let predicted = MotionVector { x: 10, y: -5 };
        let result = decode_motion_vector(&mut reader, &ctx, predicted);
        assert!(result.is_ok());
    }

    #[test]
    fn wrap_is_applied_to_the_sum() {
        let predicted = MotionVector { x: 60, y: 0 };
        // A delta of +10 on top of +60 must wrap down by 64.
        let wrapped = MotionVector::wrap_component(predicted.x as i32 + 10);
        assert_eq!(wrapped, 6);
    }

    #[test]
    fn zero_code_leaves_v1v2_component_unchanged() {
        // The MV_DELTA table's shortest code is built to be 0; a stream of
        // all-zero bits should resolve to a short run of zero codes.
        let data = [0u8; 4];
        let mut reader = BitReader::new(&data);
        let result = decode_v1v2_component(&mut reader, 42);
        assert!(result.is_ok());
    }
}
