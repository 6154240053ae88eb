// mr-worker: the worker node's command handler and subprocess supervisor.
//
// Claims a job off its model's queue, fetches its input, runs the
// configured model command against it, and reports the outcome back to
// the primary. See `supervisor.rs` for the subprocess invoker design.

pub mod config;
pub mod handler;
pub mod supervisor;

pub use config::WorkerConfig;
pub use handler::WorkerHandler;
