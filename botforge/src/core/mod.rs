//! Deterministic logic shared by the factory pipeline.
//!
//! Core modules never touch the filesystem or spawn processes. They operate on
//! in-memory values and are tested in isolation.

pub mod job;
pub mod outcome;
pub mod planner;
pub mod resolve;
pub mod retriever;
pub mod review_rules;
pub mod spec;
pub mod stage;
