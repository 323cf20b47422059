//! kship - build, push and deploy container workloads to Kubernetes from templates
//!
//! This library provides the core functionality for kship, including:
//! - Project layout, `kship.json` config and user defaults
//! - Stage state (`.build.json`, `.push.json`, `.sync.json`) and the job tracker
//! - Manifest rendering and interactive-debug patching
//! - Wrappers over docker, kubectl, git, gcloud, make and kubetail
//! - The build / push / deploy / status / logs / events / undeploy pipeline
//!
//! # Example
//!
//! ```no_run
//! use kship::cli::run;
//!
//! fn main() {
//!     if let Err(e) = run() {
//!         eprintln!("Error: {}", e);
//!         std::process::exit(1);
//!     }
//! }
//! ```

pub mod cli;
pub mod manifest;
pub mod models;
pub mod pipeline;
pub mod project;
pub mod repo;
pub mod tools;
pub mod utils;
