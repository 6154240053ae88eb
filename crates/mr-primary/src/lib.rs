// mr-primary: the primary node's command handler and config.
//
// Accepts new jobs, routes kill requests to the right place depending on
// a job's current status, and pulls logs/output back from workers as
// they finish. The dispatcher shell around this handler lives in
// `mr-dispatch`; `modelrunner-primary` (src/bin) wires the two together.

pub mod config;
pub mod handler;

pub use config::PrimaryConfig;
pub use handler::{EnqueueSource, PrimaryHandler};
