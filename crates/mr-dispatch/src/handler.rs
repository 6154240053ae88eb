use mr_proto::Command;

/// A node's command table: which verbs it knows, and what to do with them.
/// `handles` is the lookup half; `handle` is the invocation half.
#[async_trait::async_trait]
pub trait CommandHandler: Send + Sync {
    /// Whether this handler's dispatch table has an entry for `name`.
    fn handles(&self, name: &str) -> bool;

    /// Run the handler for `command`. Only called when `handles` returned
    /// true for `command.command`.
    async fn handle(&self, command: &Command);
}
