pub mod stage;
pub mod job;

pub use stage::*;
pub use job::*;
