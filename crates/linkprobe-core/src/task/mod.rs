//! Task correlator.
//!
//! Tracks every link currently being resolved, the probe source the host
//! opened for it and the artifacts accepted so far. Probe events are routed
//! back to their task through the source id; a task completes once every
//! required kind has been collected (or earlier, on a malformed observation or
//! a failed allocation).

mod correlator;

pub use correlator::{
    Completion, CompletionReason, ReturnAddress, Task, TaskCorrelator, TaskHandle,
};

#[cfg(test)]
mod tests;
