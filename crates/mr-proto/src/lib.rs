// mr-proto: the wire types shared by every ModelRunner node.
//
// Job and Node are the two entities kept in the broker's hash store.
// Command is the envelope carried on queues and channels. The `dated`
// module implements an ISO-8601-with-microseconds datetime round-trip
// for both typed fields and ad hoc command payloads.

pub mod command;
pub mod dated;
pub mod entity;
pub mod job;
pub mod node;

pub use command::{Command, CommandName};
pub use entity::Entity;
pub use job::{Job, JobStatus};
pub use node::{Node, NodeStatus, NodeType};
