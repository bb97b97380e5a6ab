use crate::error::{ProtocolError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where the agency lives: the key prefix and the external endpoints of all
/// agents, in start order.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgencyInfo {
    pub agency_prefix: String,
    pub endpoints: Vec<String>,
}

/// Diagnostic options passed through unchanged to every started process.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub valgrind: String,
    pub valgrindopts: Vec<String>,
    pub valgrind_xml_file_base: String,
    pub valgrind_testname: String,
    pub valgrind_hosts: String,
    pub extreme_verbosity: bool,
}

/// Key/value tree handed to the agency at bootstrap.
///
/// Leaves are JSON-encoded strings, directories map key segments to
/// subtrees.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum AgencyNode {
    Leaf(String),
    Dir(BTreeMap<String, AgencyNode>),
}

impl Default for AgencyNode {
    fn default() -> Self {
        AgencyNode::Dir(BTreeMap::new())
    }
}

impl AgencyNode {
    pub fn dir() -> Self {
        Self::default()
    }

    pub fn leaf(value: impl Into<String>) -> Self {
        AgencyNode::Leaf(value.into())
    }

    /// Inserts `node` at the `/`-separated `path`, creating directories on
    /// the way. Replaces whatever was stored at the final segment.
    pub fn insert_path(&mut self, path: &str, node: AgencyNode) -> Result<()> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let Some((last, parents)) = segments.split_last() else {
            return Err(ProtocolError::EmptyPath);
        };

        let mut current = self;
        for segment in parents {
            current = match current {
                AgencyNode::Dir(children) => children
                    .entry(segment.to_string())
                    .or_insert_with(AgencyNode::dir),
                AgencyNode::Leaf(_) => {
                    return Err(ProtocolError::NotADirectory(path.to_string()));
                }
            };
        }

        match current {
            AgencyNode::Dir(children) => {
                children.insert(last.to_string(), node);
                Ok(())
            }
            AgencyNode::Leaf(_) => Err(ProtocolError::NotADirectory(path.to_string())),
        }
    }

    pub fn get_path(&self, path: &str) -> Option<&AgencyNode> {
        path.split('/')
            .filter(|s| !s.is_empty())
            .try_fold(self, |node, segment| match node {
                AgencyNode::Dir(children) => children.get(segment),
                AgencyNode::Leaf(_) => None,
            })
    }

    pub fn as_leaf(&self) -> Option<&str> {
        match self {
            AgencyNode::Leaf(value) => Some(value),
            AgencyNode::Dir(_) => None,
        }
    }

    pub fn children(&self) -> Option<&BTreeMap<String, AgencyNode>> {
        match self {
            AgencyNode::Dir(children) => Some(children),
            AgencyNode::Leaf(_) => None,
        }
    }
}
