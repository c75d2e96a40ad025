//! The processing coordinator (C6) and worker loop (C7): the pieces that
//! turn the claim protocol and streaming pipeline into a long-running
//! service.

mod coordinator;
mod worker_loop;

pub use coordinator::{run_one, CycleOutcome};
pub use worker_loop::run;
