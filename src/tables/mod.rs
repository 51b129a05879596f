//! VLC table modules: every concrete codeword table used by the decoder,
//! each built once behind `lazy_static` from a `(code, length, value)`
//! triple list produced by [`huffman::build_entries`] (§4.2, §5).

pub mod dc;
pub mod huffman;
pub mod mb;
pub mod mv;
pub mod rl;

pub use dc::DcSymbol;
pub use mb::DEFAULT_INTER_INDEX;
pub use mv::JointMvSymbol;
pub use rl::RlSymbol;
