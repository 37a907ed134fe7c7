//! Side-effecting adapters used by the pipeline stages and front ends.

pub mod config;
pub mod generator;
pub mod job_store;
pub mod packager;
pub mod process;
pub mod reviewer;
pub mod spec_file;
pub mod templates;
pub mod tester;
pub mod toolchain;
