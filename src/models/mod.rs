// Core data models for kship
// These structs represent the persisted and derived pipeline entities

pub mod stage;
pub mod config;
pub mod job;
pub mod pod;
pub mod workload;

pub use stage::*;
pub use config::*;
pub use job::*;
pub use pod::*;
pub use workload::*;
