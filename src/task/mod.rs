// ABOUTME: One-off task runs on a cluster from a throwaway task definition revision.
// ABOUTME: Exports the run request, its errors and exit codes, and the runner.

mod error;
mod request;
mod runner;

pub use error::{CONTAINER_STOPPED_EXIT_CODE, LOGS_FAILED_EXIT_CODE, RunError, WAIT_FAILED_EXIT_CODE};
pub use request::{DEFAULT_STOP_TIMEOUT, STARTED_BY, TaskRunRequest};
pub use runner::{TaskRunOutcome, TaskRunner, exit_verdict};
