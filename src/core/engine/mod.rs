//! Sequential step execution over one remote session.
//!
//! - `state` - pure lifecycle transitions
//! - `runner` - preload, connect, run, report
//! - `events` - progress events, sinks and stop requests
//! - `report` - the record of one run

mod events;
mod report;
mod runner;
mod state;

pub use events::{EventSink, ExecutionEvent, NullSink, StopHandle};
pub use report::{
    CommandOrigin, ExecutionReport, FailureDetail, PreloadFailure, PreloadReport, RunStatus,
    StepResult, StepStatus,
};
pub use runner::{spawn, Engine, RunHandle};
pub use state::{EngineState, FailureKind, Transition};
