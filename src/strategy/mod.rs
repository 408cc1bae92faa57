// Output strategies over the shared engine

pub mod chunked;
pub mod owned;
pub mod parallel;
pub mod streaming;
pub mod zero_copy;
