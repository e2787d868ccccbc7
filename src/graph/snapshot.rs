//! In-process graph loaded from a JSON snapshot.
//!
//! Answers [`VECTOR_SEARCH_QUERY`] the way the database does, so the chain can
//! run without a server. Rows with an unlabelled end count toward the row cap
//! and are dropped afterwards, as the Neo4j client drops their `null` results.
//!
//!
//! ```json
//! {
//!   "nodes": [{"id": "d", "name": "Diabetes", "embedding": [0.1, ...]}],
//!   "relationships": [{"source": "d", "target": "i", "type": "TREATED_BY"}]
//! }
//! ```

use crate::error::{Result, VecGraphError};
use crate::graph::{GraphClient, GraphNode, QueryParam, QueryParams, ResultRow, describe_relationship};
use crate::query::{EMBEDDING_DIMENSIONS, EMBEDDING_PARAM, MAX_CONTEXT_ROWS, TOP_MATCHES, VECTOR_SEARCH_QUERY};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotNode {
    pub id: String,
    #[serde(flatten)]
    pub node: GraphNode,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotRelation {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub rel_type: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub nodes: Vec<SnapshotNode>,
    #[serde(default)]
    pub relationships: Vec<SnapshotRelation>,
}

pub struct SnapshotGraph {
    nodes: Vec<SnapshotNode>,
    index: HashMap<String, usize>,
    relationships: Vec<SnapshotRelation>,
}

impl SnapshotGraph {
    pub fn new(snapshot: GraphSnapshot) -> Self {
        let index = snapshot
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();

        Self {
            nodes: snapshot.nodes,
            index,
            relationships: snapshot.relationships,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let snapshot: GraphSnapshot = serde_json::from_str(&content)?;
        Ok(Self::new(snapshot))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }

    fn node(&self, id: &str) -> Option<&SnapshotNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    /// Nodes with a full-length embedding, best match first, at most [`TOP_MATCHES`].
    fn top_matches(&self, query: &[f32]) -> Result<Vec<&SnapshotNode>> {
        let mut scored = Vec::new();
        for node in &self.nodes {
            let Some(embedding) = node
                .embedding
                .as_deref()
                .filter(|e| e.len() == EMBEDDING_DIMENSIONS)
            else {
                continue;
            };
            if query.len() != embedding.len() {
                return Err(VecGraphError::InvalidParameter {
                    name: EMBEDDING_PARAM.to_string(),
                    reason: format!(
                        "expected {} dimensions, got {}",
                        embedding.len(),
                        query.len()
                    ),
                });
            }
            scored.push((node, cosine_similarity(embedding, query)));
        }

        // sort_by is stable: equal scores keep snapshot order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(TOP_MATCHES);
        Ok(scored.into_iter().map(|(node, _)| node).collect())
    }

    /// Outgoing then incoming descriptions for one node, duplicates removed.
    /// `None` stands for a row whose subject or object has no label; like any
    /// other value it survives deduplication once.
    fn neighbourhood(&self, m: &SnapshotNode) -> Vec<Option<String>> {
        let outgoing = self
            .relationships
            .iter()
            .filter(|r| r.source == m.id)
            .filter_map(|r| {
                let target = self.node(&r.target)?;
                Some(describe_relationship(&m.node, &r.rel_type, &target.node))
            });

        let incoming = self
            .relationships
            .iter()
            .filter(|r| r.target == m.id)
            .filter_map(|r| {
                let source = self.node(&r.source)?;
                Some(describe_relationship(&source.node, &r.rel_type, &m.node))
            });

        let mut seen = HashSet::new();
        outgoing
            .chain(incoming)
            .filter(|row| seen.insert(row.clone()))
            .collect()
    }

    fn search(&self, query: &[f32]) -> Result<Vec<ResultRow>> {
        let mut rows = Vec::new();
        for m in self.top_matches(query)? {
            rows.extend(self.neighbourhood(m));
            if rows.len() >= MAX_CONTEXT_ROWS {
                break;
            }
        }
        rows.truncate(MAX_CONTEXT_ROWS);

        let unlabelled = rows.iter().filter(|row| row.is_none()).count();
        if unlabelled > 0 {
            debug!(rows = unlabelled, "Skipping rows without a label");
        }
        Ok(rows.into_iter().flatten().map(|result| ResultRow { result }).collect())
    }
}

#[async_trait]
impl GraphClient for SnapshotGraph {
    async fn query(&self, cypher: &str, params: QueryParams) -> Result<Vec<ResultRow>> {
        if cypher.trim() != VECTOR_SEARCH_QUERY.trim() {
            return Err(VecGraphError::UnsupportedQuery(
                "snapshot graphs only answer the vector search query".to_string(),
            ));
        }

        let embedding = match params.get(EMBEDDING_PARAM) {
            Some(QueryParam::Floats(values)) => values,
            None => {
                return Err(VecGraphError::InvalidParameter {
                    name: EMBEDDING_PARAM.to_string(),
                    reason: "parameter not bound".to_string(),
                });
            }
        };

        let rows = self.search(embedding)?;
        debug!(rows = rows.len(), nodes = self.node_count(), "Snapshot query finished");
        Ok(rows)
    }
}

/// Calculate cosine similarity between two vectors
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot_product / (magnitude_a * magnitude_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Unit vector along `axis`, blended toward axis 0 by `weight`.
    fn vector(axis: usize, weight: f32) -> Vec<f32> {
        let mut v = vec![0.0; EMBEDDING_DIMENSIONS];
        v[axis] = 1.0;
        v[0] += weight;
        v
    }

    fn node(id: &str, name: Option<&str>, synonyms: Option<&str>, embedding: Option<Vec<f32>>) -> SnapshotNode {
        SnapshotNode {
            id: id.to_string(),
            node: GraphNode {
                name: name.map(String::from),
                synonyms: synonyms.map(String::from),
            },
            embedding,
        }
    }

    fn rel(source: &str, rel_type: &str, target: &str) -> SnapshotRelation {
        SnapshotRelation {
            source: source.to_string(),
            target: target.to_string(),
            rel_type: rel_type.to_string(),
        }
    }

    fn params(embedding: Vec<f32>) -> QueryParams {
        let mut params = QueryParams::new();
        params.insert(EMBEDDING_PARAM.to_string(), QueryParam::Floats(embedding));
        params
    }

    fn results(rows: &[ResultRow]) -> Vec<&str> {
        rows.iter().map(|r| r.result.as_str()).collect()
    }

    #[tokio::test]
    async fn test_outgoing_and_incoming_rows() {
        let graph = SnapshotGraph::new(GraphSnapshot {
            nodes: vec![
                node("d", Some("Diabetes"), None, Some(vector(0, 0.0))),
                node("i", Some("Insulin"), None, None),
                node("o", Some("Obesity"), None, None),
            ],
            relationships: vec![rel("d", "TREATED_BY", "i"), rel("o", "RISK_FACTOR_FOR", "d")],
        });

        let rows = graph.query(VECTOR_SEARCH_QUERY, params(vector(0, 0.0))).await.unwrap();
        assert_eq!(
            results(&rows),
            vec!["Diabetes TREATED_BY Insulin", "Obesity RISK_FACTOR_FOR Diabetes"]
        );
    }

    #[tokio::test]
    async fn test_synonyms_substitute_missing_name() {
        let graph = SnapshotGraph::new(GraphSnapshot {
            nodes: vec![
                node("g", None, Some("glucose"), Some(vector(0, 0.0))),
                node("i", Some("Insulin"), None, None),
            ],
            relationships: vec![rel("i", "REGULATES", "g"), rel("g", "STORED_AS", "i")],
        });

        let rows = graph.query(VECTOR_SEARCH_QUERY, params(vector(0, 0.0))).await.unwrap();
        assert_eq!(
            results(&rows),
            vec!["glucose STORED_AS Insulin", "Insulin REGULATES glucose"]
        );
    }

    #[tokio::test]
    async fn test_only_top_five_nodes_are_expanded_in_similarity_order() {
        let mut nodes = vec![node("hub", Some("Hub"), None, None)];
        let mut relationships = Vec::new();
        // n1 is closest to the query (axis 0), n6 is farthest
        for i in 1..=6 {
            let id = format!("n{}", i);
            let weight = 1.0 - (i as f32) * 0.15;
            nodes.push(node(&id, Some(format!("Node{}", i).as_str()), None, Some(vector(i, weight))));
            relationships.push(rel(&id, "LINKS", "hub"));
        }
        let graph = SnapshotGraph::new(GraphSnapshot { nodes, relationships });

        let rows = graph.query(VECTOR_SEARCH_QUERY, params(vector(0, 0.0))).await.unwrap();
        assert_eq!(
            results(&rows),
            vec![
                "Node1 LINKS Hub",
                "Node2 LINKS Hub",
                "Node3 LINKS Hub",
                "Node4 LINKS Hub",
                "Node5 LINKS Hub",
            ]
        );
    }

    #[tokio::test]
    async fn test_rows_capped_at_one_hundred() {
        let mut nodes = vec![node("d", Some("Diabetes"), None, Some(vector(0, 0.0)))];
        let mut relationships = Vec::new();
        for i in 0..150 {
            let id = format!("t{}", i);
            nodes.push(node(&id, Some(format!("Target{}", i).as_str()), None, None));
            relationships.push(rel("d", "RELATED_TO", &id));
        }
        let graph = SnapshotGraph::new(GraphSnapshot { nodes, relationships });

        let rows = graph.query(VECTOR_SEARCH_QUERY, params(vector(0, 0.0))).await.unwrap();
        assert_eq!(rows.len(), MAX_CONTEXT_ROWS);
        assert_eq!(rows[0].result, "Diabetes RELATED_TO Target0");
        assert_eq!(rows[99].result, "Diabetes RELATED_TO Target99");
    }

    #[tokio::test]
    async fn test_row_cap_spans_matched_nodes() {
        // "a" fills the cap on its own, so "b" contributes nothing
        let mut nodes = vec![
            node("a", Some("Asthma"), None, Some(vector(0, 0.0))),
            node("b", Some("Bronchitis"), None, Some(vector(2, 0.1))),
            node("x", Some("Cough"), None, None),
        ];
        let mut relationships = vec![rel("b", "CAUSES", "x")];
        for i in 0..100 {
            let id = format!("t{}", i);
            nodes.push(node(&id, Some(format!("Trigger{}", i).as_str()), None, None));
            relationships.push(rel("a", "TRIGGERED_BY", &id));
        }
        let graph = SnapshotGraph::new(GraphSnapshot { nodes, relationships });

        let rows = graph.query(VECTOR_SEARCH_QUERY, params(vector(0, 0.0))).await.unwrap();
        assert_eq!(rows.len(), MAX_CONTEXT_ROWS);
        assert_eq!(rows[99].result, "Asthma TRIGGERED_BY Trigger99");
        assert!(rows.iter().all(|r| !r.result.starts_with("Bronchitis")));
    }

    #[tokio::test]
    async fn test_duplicate_rows_kept_across_matched_nodes() {
        let graph = SnapshotGraph::new(GraphSnapshot {
            nodes: vec![
                node("a", Some("Aspirin"), None, Some(vector(0, 0.0))),
                node("p", Some("Pain"), None, Some(vector(1, 0.5))),
            ],
            relationships: vec![rel("a", "TREATS", "p")],
        });

        let rows = graph.query(VECTOR_SEARCH_QUERY, params(vector(0, 0.0))).await.unwrap();
        assert_eq!(results(&rows), vec!["Aspirin TREATS Pain", "Aspirin TREATS Pain"]);
    }

    #[tokio::test]
    async fn test_unlabelled_row_counts_toward_cap() {
        let mut nodes = vec![
            node("d", Some("Diabetes"), None, Some(vector(0, 0.0))),
            node("u", None, None, None),
        ];
        let mut relationships = vec![rel("d", "RELATED_TO", "u")];
        for i in 0..100 {
            let id = format!("t{}", i);
            nodes.push(node(&id, Some(format!("Target{}", i).as_str()), None, None));
            relationships.push(rel("d", "RELATED_TO", &id));
        }
        let graph = SnapshotGraph::new(GraphSnapshot { nodes, relationships });

        let rows = graph.query(VECTOR_SEARCH_QUERY, params(vector(0, 0.0))).await.unwrap();
        assert_eq!(rows.len(), MAX_CONTEXT_ROWS - 1);
        assert_eq!(rows[0].result, "Diabetes RELATED_TO Target0");
        assert_eq!(rows[98].result, "Diabetes RELATED_TO Target98");
    }

    #[tokio::test]
    async fn test_duplicate_rows_removed_within_a_node() {
        let graph = SnapshotGraph::new(GraphSnapshot {
            nodes: vec![
                node("a", Some("Aspirin"), None, Some(vector(0, 0.0))),
                node("b", Some("Pain"), None, None),
            ],
            relationships: vec![rel("a", "TREATS", "b"), rel("a", "TREATS", "b")],
        });

        let rows = graph.query(VECTOR_SEARCH_QUERY, params(vector(0, 0.0))).await.unwrap();
        assert_eq!(results(&rows), vec!["Aspirin TREATS Pain"]);
    }

    #[tokio::test]
    async fn test_nodes_without_full_embedding_are_ignored() {
        let graph = SnapshotGraph::new(GraphSnapshot {
            nodes: vec![
                node("short", Some("Short"), None, Some(vec![1.0, 0.0])),
                node("none", Some("None"), None, None),
                node("x", Some("X"), None, None),
            ],
            relationships: vec![rel("short", "LINKS", "x"), rel("none", "LINKS", "x")],
        });

        let rows = graph.query(VECTOR_SEARCH_QUERY, params(vector(0, 0.0))).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_other_queries_rejected() {
        let graph = SnapshotGraph::new(GraphSnapshot::default());
        let result = graph.query("MATCH (n) RETURN n", params(vector(0, 0.0))).await;
        assert!(matches!(result, Err(VecGraphError::UnsupportedQuery(_))));
    }

    #[tokio::test]
    async fn test_missing_embedding_parameter_rejected() {
        let graph = SnapshotGraph::new(GraphSnapshot::default());
        let result = graph.query(VECTOR_SEARCH_QUERY, QueryParams::new()).await;
        assert!(matches!(result, Err(VecGraphError::InvalidParameter { .. })));
    }

    #[tokio::test]
    async fn test_mismatched_question_embedding_rejected() {
        let graph = SnapshotGraph::new(GraphSnapshot {
            nodes: vec![node("d", Some("Diabetes"), None, Some(vector(0, 0.0)))],
            relationships: vec![],
        });
        let result = graph.query(VECTOR_SEARCH_QUERY, params(vec![1.0, 0.0])).await;
        assert!(matches!(result, Err(VecGraphError::InvalidParameter { .. })));
    }

    #[test]
    fn test_load_from_file() {
        let snapshot = GraphSnapshot {
            nodes: vec![
                node("d", Some("Diabetes"), None, Some(vector(0, 0.0))),
                node("g", None, Some("glucose"), None),
            ],
            relationships: vec![rel("d", "ELEVATES", "g")],
        };
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(&snapshot).unwrap().as_bytes()).unwrap();
        file.flush().unwrap();

        let graph = SnapshotGraph::load(file.path()).unwrap();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.relationship_count(), 1);
        assert_eq!(graph.node("g").unwrap().node.synonyms.as_deref(), Some("glucose"));
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
