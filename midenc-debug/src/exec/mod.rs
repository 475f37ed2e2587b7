mod executor;
mod host;
mod state;
mod trace;

pub use self::{
    executor::Executor,
    host::DebuggerHost,
    state::{DebugExecutor, MemoryChiplet},
    trace::{ExecutionTrace, TraceEvent, TraceHandler},
};
