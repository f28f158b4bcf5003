//! Runtime module — driver lifecycle: boot, run.

pub mod boot;
pub mod run;
