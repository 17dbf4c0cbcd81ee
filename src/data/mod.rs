pub mod batch;
pub mod dictionary;
pub mod sample;

pub use batch::{collate, strip_pad, Batch, EncoderInput, NetInput};
pub use dictionary::{Dictionary, Token};
pub use sample::Sample;
