//! Graph database access.
//!
//! [`GraphClient`] is the only thing the search chain knows about the
//! database: hand it query text plus named parameters, get rows back.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod neo4j;
pub mod snapshot;

/// A value bound to a named query parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryParam {
    Floats(Vec<f32>),
}

pub type QueryParams = BTreeMap<String, QueryParam>;

/// One relationship description returned by the similarity query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRow {
    pub result: String,
}

impl ResultRow {
    pub fn new(result: impl Into<String>) -> Self {
        Self {
            result: result.into(),
        }
    }
}

/// Human-readable identity of a node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub synonyms: Option<String>,
}

/// `name` when present, otherwise `synonyms`.
pub fn label_of(node: &GraphNode) -> Option<&str> {
    node.name.as_deref().or(node.synonyms.as_deref())
}

/// `"<source> <rel_type> <target>"`, or `None` if either end has no label.
pub fn describe_relationship(source: &GraphNode, rel_type: &str, target: &GraphNode) -> Option<String> {
    let source = label_of(source)?;
    let target = label_of(target)?;
    Some(format!("{} {} {}", source, rel_type, target))
}

#[async_trait]
pub trait GraphClient: Send + Sync {
    /// Run `cypher` with `params` bound and return the `result` column of every row.
    async fn query(&self, cypher: &str, params: QueryParams) -> Result<Vec<ResultRow>>;
}
