//! Bitstream parser and coefficient/motion decoder core for the MSMPEG4-family
//! (V1, V2, V3, W1) video codecs.
//!
//! This crate covers the entropy-decoding and prediction-inversion stages
//! only: given the compressed payload of one picture it reconstructs, per
//! 16x16 macroblock, six 8x8 coefficient blocks plus macroblock-level
//! metadata (intra/inter flag, motion vector, coded-block pattern, AC
//! prediction direction). The IDCT/dequantization pipeline, motion
//! compensation, pixel reconstruction, and spatial neighbor prediction are
//! external collaborators (see [`neighbors::NeighborPredictor`]) supplied by
//! the caller.

#[macro_use]
extern crate bitflags;

#[macro_use]
extern crate lazy_static;

mod block;
mod context;
mod error;
mod frame;
mod macroblock;
mod motion;
mod neighbors;
mod picture;
mod reader;
mod tables;
mod traits;
mod types;
mod vlc;

pub use block::{decode_block, decode_dc};
pub use context::{Context, ErrRecognition};
pub use error::{Error, Result};
pub use frame::{decode_frame, Frame};
pub use macroblock::decode_macroblock;
pub use motion::decode_motion_vector;
pub use neighbors::NeighborPredictor;
pub use picture::decode_picture_header;
pub use reader::BitReader;
pub use types::{CoefficientBlock, Macroblock, MacroblockType, MotionVector, PictureType, Version};

#[cfg(test)]
pub use neighbors::NullPredictor;
