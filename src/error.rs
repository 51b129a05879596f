//! Decoder error taxonomy.

/// Errors the decoder core can yield.
///
/// All variants are fatal to the picture currently being decoded unless
/// documented otherwise. Decoder state for subsequent pictures is preserved:
/// predictors may be stale but are never left in a half-written state.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The V1 start code, picture type, qscale, or slice-height field failed
    /// validation.
    #[error("invalid picture header: {0}")]
    InvalidHeader(&'static str),

    /// A VLC lookup walked off the table without reaching an `End` entry, or
    /// reached one tagged as invalid.
    #[error("no VLC match for {table}")]
    InvalidVlc {
        /// Which table the failed lookup was reading from.
        table: &'static str,
    },

    /// A coded-block-pattern code exceeded its domain (> 7 for P, > 3 for I).
    #[error("cbpc code {code} out of range (max {max})")]
    CbpOutOfRange {
        /// The code as read from the bitstream.
        code: u8,
        /// The largest code value the current path accepts.
        max: u8,
    },

    /// A DC residual was out of range and not recoverable via
    /// `inter_intra_pred`.
    #[error("dc overflow in block {block} at qscale {qscale}")]
    DcOverflow {
        /// Which of the six blocks in the macroblock overflowed.
        block: usize,
        /// The picture's quantizer scale at the time of the overflow.
        qscale: u8,
    },

    /// The running AC coefficient index escaped `[0, 63]` outside the
    /// known-benign encoder pattern.
    #[error("ac coefficient index {index} out of range in block {block}")]
    AcOverflow {
        /// The offending (pre-clamp) coefficient index.
        index: i32,
        /// Which of the six blocks in the macroblock overflowed.
        block: usize,
    },

    /// The bit reader was drained mid-macroblock.
    #[error("buffer exhausted after {bits_consumed} bits")]
    BufferExhausted {
        /// How many bits had been consumed before the reader ran dry.
        bits_consumed: usize,
    },

    /// The picture payload is shorter than the density pre-check allows.
    #[error("bitstream too small: {bits_remaining} bits remain, need {bits_needed}")]
    BitstreamTooSmall {
        /// Bits left in the buffer.
        bits_remaining: usize,
        /// Bits the density pre-check requires.
        bits_needed: usize,
    },

    /// Width/height/version passed to [`crate::Context::new`] failed the
    /// sanity check.
    #[error("invalid picture dimensions {width}x{height}")]
    InvalidDimensions {
        /// The rejected width.
        width: u16,
        /// The rejected height.
        height: u16,
    },

    /// A request was made for more bits than a read primitive supports in a
    /// single call (see [`crate::reader::BitReader::peek_bits`]).
    #[error("requested {requested} bits, which exceeds the type width")]
    BitWidthExceeded {
        /// The number of bits requested.
        requested: u32,
    },
}

/// Non-fatal warning surfaced alongside a successfully decoded extension
/// header (see §4.4). Decoding continues with `flipflop_rounding = 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtHeaderAnomaly {
    /// Human-readable description of what was anomalous.
    pub reason: &'static str,
}

/// The result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;
