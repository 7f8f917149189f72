mod classify;
mod command;
mod io_pump;
mod locate;
mod observe;
mod run;
mod runtime;
mod traits;
pub mod types;

pub use classify::{
    build_result, has_useful_output, is_benign_transport_error, select_output, timeout_result,
    BENIGN_STDERR_SIGNATURES, DEFAULT_USEFUL_OUTPUT_THRESHOLD,
};
pub use command::{build_args, compose_prompt};
pub use io_pump::{LineStream, PumpMsg};
pub use locate::ExecutableLocator;
pub use observe::{StreamObserver, StreamSummary};
pub use run::AgentRunner;
pub use runtime::{run_session_runtime, RuntimeLimits};
pub use traits::{RunnerPlugin, RunnerSession};
pub use types::{ExecutionResult, InvokeRequest, RunnerStartArgs, NO_EXIT_CODE};
