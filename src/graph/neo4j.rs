use crate::config::Neo4jConfig;
use crate::error::{Result, VecGraphError};
use crate::graph::{GraphClient, QueryParam, QueryParams, ResultRow};
use crate::query::RESULT_FIELD;
use async_trait::async_trait;
use neo4rs::{Graph, Query};
use tracing::debug;

/// [`GraphClient`] backed by a Neo4j server over Bolt.
pub struct Neo4jGraph {
    graph: Graph,
}

impl Neo4jGraph {
    /// Open a connection pool. Unset settings are handed to the driver as
    /// empty strings; it reports whatever is wrong with them.
    pub async fn connect(config: &Neo4jConfig) -> Result<Self> {
        let uri = config.url.clone().unwrap_or_default();
        let user = config.user.clone().unwrap_or_default();
        let password = config.password.clone().unwrap_or_default();

        debug!(uri = %uri, user = %user, "Connecting to Neo4j");
        let graph = Graph::new(uri, user, password).await?;
        Ok(Self { graph })
    }
}

fn build_query(cypher: &str, params: QueryParams) -> Query {
    params
        .into_iter()
        .fold(neo4rs::query(cypher), |query, (name, value)| match value {
            QueryParam::Floats(values) => {
                let values: Vec<f64> = values.into_iter().map(f64::from).collect();
                query.param(&name, values)
            }
        })
}

#[async_trait]
impl GraphClient for Neo4jGraph {
    async fn query(&self, cypher: &str, params: QueryParams) -> Result<Vec<ResultRow>> {
        let mut stream = self.graph.execute(build_query(cypher, params)).await?;

        let mut rows = Vec::new();
        while let Some(row) = stream.next().await? {
            let value: Option<String> = row
                .get(RESULT_FIELD)
                .map_err(|e| VecGraphError::RowDecode(e.to_string()))?;
            match value {
                Some(result) => rows.push(ResultRow { result }),
                None => debug!("Skipping row with null result"),
            }
        }

        debug!(rows = rows.len(), "Graph query finished");
        Ok(rows)
    }
}
