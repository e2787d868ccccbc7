//! The similarity query sent to the graph database.
//!
//! The database does all the work: it scans nodes that carry an embedding,
//! ranks them by cosine similarity to the question embedding, keeps the best
//! five and describes every relationship one hop away in either direction.

/// Length of the vectors stored on graph nodes and produced for questions.
pub const EMBEDDING_DIMENSIONS: usize = 1536;

/// Number of best matching nodes whose neighbourhood is described.
pub const TOP_MATCHES: usize = 5;

/// Cap on the number of rows returned across all matched nodes.
pub const MAX_CONTEXT_ROWS: usize = 100;

/// Name of the query parameter carrying the question embedding.
pub const EMBEDDING_PARAM: &str = "embedding";

/// Column holding the relationship description in every returned row.
pub const RESULT_FIELD: &str = "result";

pub const VECTOR_SEARCH_QUERY: &str = r#"
WITH $embedding AS e
MATCH (m)
WHERE m.embedding IS NOT NULL AND size(m.embedding) = 1536
WITH m, gds.similarity.cosine(m.embedding, e) AS similarity
ORDER BY similarity DESC LIMIT 5
CALL {
  WITH m
  MATCH (m)-[r]->(target)
  RETURN coalesce(m.name, m.synonyms) + " " + type(r) + " " + coalesce(target.name, target.synonyms) AS result
  UNION
  WITH m
  MATCH (m)<-[r]-(target)
  RETURN coalesce(target.name, target.synonyms) + " " + type(r) + " " + coalesce(m.name, m.synonyms) AS result
}
RETURN result LIMIT 100
"#;
