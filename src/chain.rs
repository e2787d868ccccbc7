//! Vector search chain: question in, graph context out.
//!
//! One call embeds the question, binds the vector to [`VECTOR_SEARCH_QUERY`]
//! and returns whatever rows the graph hands back. Nothing is retried,
//! cached or ranked here; errors from either collaborator are returned as-is.

use crate::error::Result;
use crate::graph::{GraphClient, QueryParam, QueryParams, ResultRow};
use crate::providers::EmbeddingProvider;
use crate::query::{EMBEDDING_PARAM, RESULT_FIELD, VECTOR_SEARCH_QUERY};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

pub const INPUT_KEY: &str = "query";
pub const OUTPUT_KEY: &str = RESULT_FIELD;

/// Number of embedding values echoed in verbose mode.
const EMBEDDING_PREVIEW: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainInput {
    pub query: String,
}

/// The context set for one question, in database order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainOutput {
    pub result: Vec<ResultRow>,
}

impl ChainOutput {
    pub fn rows(&self) -> &[ResultRow] {
        &self.result
    }

    pub fn is_empty(&self) -> bool {
        self.result.is_empty()
    }

    /// Row texts as plain strings.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.result.iter().map(|r| r.result.as_str())
    }
}

pub struct VectorSearchChain {
    graph: Arc<dyn GraphClient>,
    embeddings: Arc<dyn EmbeddingProvider>,
    verbose: bool,
}

impl VectorSearchChain {
    pub fn new(graph: Arc<dyn GraphClient>, embeddings: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            graph,
            embeddings,
            verbose: false,
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn input_keys(&self) -> Vec<&'static str> {
        vec![INPUT_KEY]
    }

    pub fn output_keys(&self) -> Vec<&'static str> {
        vec![OUTPUT_KEY]
    }

    /// Embed a question and do vector search.
    pub async fn call(&self, input: &ChainInput) -> Result<ChainOutput> {
        let question = &input.query;
        debug!(question = %question, "Vector search input");

        let embedding = self.embeddings.embed(question).await?;
        if self.verbose {
            info!(preview = ?embedding.preview(EMBEDDING_PREVIEW), "Vector search embeddings");
        }

        let mut params = QueryParams::new();
        params.insert(EMBEDDING_PARAM.to_string(), QueryParam::Floats(embedding.values));

        let result = self.graph.query(VECTOR_SEARCH_QUERY, params).await?;
        debug!(rows = result.len(), "Vector search context");
        Ok(ChainOutput { result })
    }

    pub async fn run(&self, question: &str) -> Result<ChainOutput> {
        self.call(&ChainInput {
            query: question.to_string(),
        })
        .await
    }
}
