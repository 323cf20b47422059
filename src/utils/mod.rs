pub mod duration;
pub mod fs;

pub use duration::*;
