//! `Node`: the transient heartbeat record a node writes about itself in
//! response to a broadcast `UPDATE_STATUS`.

use crate::entity::Entity;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeStatus {
    Waiting,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeType {
    Primary,
    Worker,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// `primary_url` for a primary; `{worker_url};{model}` for a worker.
    /// Uniquely identifies the record within `{prefix}:nodes`.
    pub name: String,
    pub node_url: String,
    pub status: NodeStatus,
    pub node_type: NodeType,
    pub version: String,
    /// Set for workers only.
    pub model: Option<String>,
}

impl Node {
    pub fn primary(primary_url: impl Into<String>, version: impl Into<String>, status: NodeStatus) -> Self {
        let primary_url = primary_url.into();
        Node {
            name: primary_url.clone(),
            node_url: primary_url,
            status,
            node_type: NodeType::Primary,
            version: version.into(),
            model: None,
        }
    }

    pub fn worker(
        worker_url: impl Into<String>,
        model: impl Into<String>,
        version: impl Into<String>,
        status: NodeStatus,
    ) -> Self {
        let worker_url = worker_url.into();
        let model = model.into();
        Node {
            name: format!("{};{}", worker_url, model),
            node_url: worker_url,
            status,
            node_type: NodeType::Worker,
            version: version.into(),
            model: Some(model),
        }
    }
}

impl Entity for Node {
    fn hash_name() -> &'static str {
        "nodes"
    }

    fn key(&self) -> String {
        self.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_name_disambiguates_by_model() {
        let a = Node::worker("http://host:9000", "sequencer", "1.0.0", NodeStatus::Waiting);
        let b = Node::worker("http://host:9000", "networker", "1.0.0", NodeStatus::Waiting);
        assert_ne!(a.name, b.name, "same worker_url but different model must not collide");
        assert_eq!(a.name, "http://host:9000;sequencer");
    }

    #[test]
    fn primary_name_is_its_own_url() {
        let node = Node::primary("http://primary.example", "1.0.0", NodeStatus::Waiting);
        assert_eq!(node.name, "http://primary.example");
        assert_eq!(node.node_type, NodeType::Primary);
    }

    #[test]
    fn node_round_trips_through_json() {
        let node = Node::worker("http://host:9000", "sequencer", "1.0.0", NodeStatus::Running);
        let encoded = serde_json::to_string(&node).unwrap();
        let decoded: Node = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.name, node.name);
        assert_eq!(decoded.status, NodeStatus::Running);
        assert_eq!(decoded.model.as_deref(), Some("sequencer"));
    }
}
