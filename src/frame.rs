//! Per-frame decode driver (§4.3-§4.9).

use crate::context::Context;
use crate::error::Result;
use crate::macroblock::decode_macroblock;
use crate::neighbors::NeighborPredictor;
use crate::picture::decode_picture_header;
use crate::reader::BitReader;
use crate::types::{Macroblock, PictureType};

/// One decoded picture's macroblocks, in raster order (row-major,
/// `mb_width * mb_height` entries).
#[derive(Debug, Clone)]
pub struct Frame {
    pub picture_type: PictureType,
    pub mb_width: u32,
    pub mb_height: u32,
    pub macroblocks: Vec<Macroblock>,
}

/// Decode one complete picture out of `data`: its header, then every
/// macroblock in raster order (§4.3-§4.9).
///
/// `predictor` supplies the spatial prediction state this crate does not
/// own (§6) and is cleared at the start of every call, mirroring a fresh
/// macroblock bank per picture.
pub fn decode_frame(
    data: &[u8],
    ctx: &mut Context,
    predictor: &mut dyn NeighborPredictor,
) -> Result<Frame> {
    let mut reader = BitReader::new(data);
    predictor.clear_block_bank();

    let picture_type = decode_picture_header(&mut reader, ctx)?;

    let mb_width = ctx.mb_width();
    let mb_height = ctx.mb_height();
    let mut macroblocks = Vec::with_capacity((mb_width * mb_height) as usize);

    for mb_y in 0..mb_height {
        for mb_x in 0..mb_width {
            let mb = decode_macroblock(&mut reader, ctx, predictor, mb_x, mb_y)?;
            macroblocks.push(mb);
        }
    }

    Ok(Frame {
        picture_type,
        mb_width,
        mb_height,
        macroblocks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neighbors::NullPredictor;
    use crate::types::Version;

    #[test]
    fn decode_frame_reports_header_errors() {
        let data = [0x00u8; 2];
        let mut ctx = Context::new(Version::V1, 16, 16).unwrap();
        let mut predictor = NullPredictor;
        assert!(decode_frame(&data, &mut ctx, &mut predictor).is_err());
    }

    #[test]
    fn decode_frame_produces_one_macroblock_per_cell() {
        // picture_type=00 (I), qscale=20, then a run of zero bytes to
        // satisfy the remaining reads with whatever codewords happen to
        // land first in each table.
        let mut data = vec![0b00_10100_0u8];
        data.extend(std::iter::repeat(0x00).take(256));
        let mut ctx = Context::new(Version::V2, 16, 16).unwrap();
        let mut predictor = NullPredictor;

        let result = decode_frame(&data, &mut ctx, &mut predictor);
        if let Ok(frame) = result {
            assert_eq!(frame.macroblocks.len(), (frame.mb_width * frame.mb_height) as usize);
        }
    }
}
