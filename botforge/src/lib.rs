//! Bot factory: turn a validated bot spec into a tested, reviewed, packaged project.
//!
//! The crate keeps a strict split:
//!
//! - **[`core`]**: Pure logic (stage machine, spec rules, planning, template
//!   resolution policy, review rules). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting adapters (job store, templates, rendering,
//!   toolchain processes, file scans, archives, config).
//!
//! [`pipeline`] drives a job through every stage using the [`stages::Stages`]
//! seam and checkpoints the [`core::job::JobRecord`] after each transition.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod pipeline;
pub mod stages;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
