//! Wrappers over the external programs kship drives.

pub mod process;
pub mod kubectl;
pub mod git;
pub mod makefile;

pub use process::{Captured, Tool};
pub use kubectl::{DeleteOutcome, Kubectl};
