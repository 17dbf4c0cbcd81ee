pub mod matrix;
pub mod softmax;

pub use matrix::Matrix;
pub use softmax::log_softmax;
