//! Per-picture decoder state (§3, §6, §7).

use crate::error::{Error, Result};
use crate::types::{PictureType, Version};

bitflags! {
    /// Controls how strictly malformed-but-recoverable bitstream conditions
    /// are treated (§7). The default is lenient: only genuinely corrupt
    /// streams (buffer exhaustion, invalid VLC codes) are ever rejected
    /// outright.
    #[derive(Default)]
    pub struct ErrRecognition: u32 {
        /// Reject streams that violate the bitstream's own written syntax
        /// (e.g. a DC/AC overflow that the format forbids).
        const BITSTREAM = 0b001;
        /// Reject streams that are syntactically valid but not compliant
        /// with the reference decoder's stricter interpretation.
        const COMPLIANT = 0b010;
        /// Reject on any condition this crate can detect as suspicious,
        /// even if harmless in practice.
        const CAREFUL = 0b100;
    }
}

impl ErrRecognition {
    /// Whether the current policy is strict enough to reject a bitstream
    /// that overflows a DC/AC limit instead of merely clamping it, mirroring
    /// the reference decoder's `!(err_recognition & (BITSTREAM|COMPLIANT))`
    /// leniency test (§7).
    pub fn rejects_overflow(self) -> bool {
        self.intersects(ErrRecognition::BITSTREAM | ErrRecognition::COMPLIANT)
    }
}

/// All state that persists across a single picture's macroblocks, set up by
/// [`crate::picture::decode_picture_header`] and consumed by the
/// macroblock/block decoders (§3).
#[derive(Debug, Clone)]
pub struct Context {
    /// Which of the four bitstream variants is active. Fixed for the
    /// lifetime of the `Context`.
    pub version: Version,

    /// Luma width in pixels.
    pub width: u16,

    /// Luma height in pixels.
    pub height: u16,

    /// How strictly to treat recoverable anomalies.
    pub err_recognition: ErrRecognition,

    /// The current picture's type, set by the most recent picture header.
    pub picture_type: PictureType,

    /// Quantizer scale for the current picture, `1..=31`.
    pub qscale: u8,

    /// Height in macroblock rows of a slice (V1's fixed rule vs V2+'s
    /// `decode012`-derived rule, §4.3).
    pub slice_height: u32,

    /// `rl_table_index` selected by the picture header (V3/W1 only; V1/V2
    /// always use index 0).
    pub rl_table_index: usize,

    /// `rl_chroma_table_index`, independently selectable on W1.
    pub rl_chroma_table_index: usize,

    /// `dc_table_index` selected by the picture header (V3/W1 only).
    pub dc_table_index: usize,

    /// `mv_table_index` selected by the picture header (V3/W1 only).
    pub mv_table_index: usize,

    /// Whether P-picture macroblocks are preceded by a skip flag (always
    /// true except V1, which infers skip from the absence of a motion
    /// vector code instead, §4.5).
    pub use_skip_mb_code: bool,

    /// Whether a per-macroblock RL table override can be signaled (W1
    /// only, §4.6).
    pub per_mb_rl_table: bool,

    /// Whether inter/intra prediction-direction coding is active (W1 only,
    /// §4.6).
    pub inter_intra_pred: bool,

    /// Disables rounding in (out-of-scope) motion compensation; tracked
    /// here purely because the picture header parses it (§4.4).
    pub no_rounding: bool,

    /// W1's alternating rounding policy, flipped every P-picture when the
    /// extension header enables it (§4.4).
    pub flipflop_rounding: bool,

    /// Bit rate in bits/second as signaled by the W1 extension header, or
    /// `0` if never parsed (§4.4).
    pub bit_rate: u32,

    /// Sticky escape-3 level-length/run-length state for W1 (§4.8, §9):
    /// once an escape-3 coefficient sets these, they persist for the rest
    /// of the picture rather than being recomputed per block.
    pub esc3_level_length: Option<u8>,
    pub esc3_run_length: Option<u8>,

    /// V1's internal rotating DC predictor: one shared running value for
    /// all four luma blocks (slot 0), one for Cb (slot 1), one for Cr
    /// (slot 2), per `msmpeg4v1_pred_dc`'s slot-per-plane rule (§4.8). Only
    /// V1 ever touches this; V2+ instead predict DC spatially through
    /// [`crate::neighbors::NeighborPredictor`].
    pub v1_dc_predictor: [i16; 3],
}

/// The standard MPEG-4 Part 2 DC quantizer-scale formula, used by V3/W1 to
/// turn a decoded DC class magnitude back into a pixel-domain residual and
/// to size the §4.8 DC-overflow check (`level > 256 * dc_scale`). The
/// family's own literal scale tables were not available to ground this on,
/// so this crate uses the well-known public piecewise formula instead of an
/// invented one; see `DESIGN.md`.
pub fn y_dc_scale(qscale: u8) -> i32 {
    let q = qscale as i32;
    if q < 5 {
        8
    } else if q > 27 {
        2 * q - 16
    } else {
        (q + 13) / 2
    }
}

/// Chroma counterpart of [`y_dc_scale`].
pub fn c_dc_scale(qscale: u8) -> i32 {
    let q = qscale as i32;
    if q < 5 {
        8
    } else if q > 23 {
        q - 8
    } else {
        (q + 13) / 2
    }
}

impl Context {
    /// Build a new per-stream context, validating the picture dimensions
    /// the caller is about to decode against (§6's dimension sanity
    /// check).
    pub fn new(version: Version, width: u16, height: u16) -> Result<Self> {
        if width == 0 || height == 0 || width > 8192 || height > 8192 {
            return Err(Error::InvalidDimensions { width, height });
        }

        Ok(Self {
            version,
            width,
            height,
            err_recognition: ErrRecognition::empty(),
            picture_type: PictureType::I,
            qscale: 1,
            slice_height: 1,
            rl_table_index: 0,
            rl_chroma_table_index: 0,
            dc_table_index: 0,
            mv_table_index: 0,
            use_skip_mb_code: version.is_v1(),
            per_mb_rl_table: false,
            inter_intra_pred: false,
            no_rounding: false,
            flipflop_rounding: false,
            bit_rate: 0,
            esc3_level_length: None,
            esc3_run_length: None,
            v1_dc_predictor: [1024; 3],
        })
    }

    /// Number of macroblock columns.
    pub fn mb_width(&self) -> u32 {
        (self.width as u32 + 15) / 16
    }

    /// Number of macroblock rows.
    pub fn mb_height(&self) -> u32 {
        (self.height as u32 + 15) / 16
    }

    /// Clear the escape-3 sticky state; called at the start of every new
    /// picture (§4.8, §9).
    pub fn reset_esc3_state(&mut self) {
        self.esc3_level_length = None;
        self.esc3_run_length = None;
    }

    /// Reset V1's rotating DC predictor to its default at the start of a
    /// new picture.
    pub fn reset_v1_dc_predictor(&mut self) {
        self.v1_dc_predictor = [1024; 3];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_dimensions() {
        assert!(Context::new(Version::V1, 0, 16).is_err());
        assert!(Context::new(Version::V1, 16, 0).is_err());
    }

    #[test]
    fn accepts_typical_dimensions() {
        let ctx = Context::new(Version::W1, 352, 288).unwrap();
        assert_eq!(ctx.mb_width(), 22);
        assert_eq!(ctx.mb_height(), 18);
    }

    #[test]
    fn err_recognition_leniency_matches_reference_policy() {
        let lenient = ErrRecognition::empty();
        assert!(!lenient.rejects_overflow());

        let strict = ErrRecognition::BITSTREAM;
        assert!(strict.rejects_overflow());
    }

    #[test]
    fn v1_always_uses_skip_mb_code() {
        let ctx = Context::new(Version::V1, 16, 16).unwrap();
        assert!(ctx.use_skip_mb_code);
    }

    #[test]
    fn dc_scale_matches_known_breakpoints() {
        assert_eq!(y_dc_scale(1), 8);
        assert_eq!(y_dc_scale(4), 8);
        assert_eq!(y_dc_scale(5), 9);
        assert_eq!(c_dc_scale(24), 16);
    }
}
