// mr-dispatch: the per-node command dispatcher.
//
// One instance per node, owning a queue loop and a channel loop as two
// independent tokio tasks. Routing rule: handler table first, then the
// built-in shutdown table, both invoked if both match a command name.

pub mod dispatcher;
pub mod handler;

pub use dispatcher::{Dispatcher, DispatcherHandles};
pub use handler::CommandHandler;
