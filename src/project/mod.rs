pub mod context;
pub mod config;
pub mod rc;

pub use context::*;
pub use config::*;
pub use rc::*;
