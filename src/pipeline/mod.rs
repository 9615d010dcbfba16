//! The three linear agent graphs: search, summarize and Q&A.
//!
//! Each graph is a [`Pipeline`] of [`Node`]s that take ownership of a state
//! value, update it and pass it on. Nodes run strictly one after another.

pub mod enrich;
pub mod normalize;
pub mod qna;
pub mod search;
pub mod structured;
pub mod summarize;

use async_trait::async_trait;
use log::debug;
use std::time::Instant;
use thiserror::Error;

pub use structured::StructuredOutputError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("could not normalize search results: {0}")]
    Normalization(#[source] StructuredOutputError),
    #[error("model call failed during {stage}: {message}")]
    Model { stage: &'static str, message: String },
    #[error("retrieval failed: {0}")]
    Retrieval(String),
}

#[async_trait]
pub trait Node<S: Send>: Send + Sync {
    fn name(&self) -> &'static str;
    async fn run(&self, state: S) -> Result<S, PipelineError>;
}

pub struct Pipeline<S: Send> {
    name: &'static str,
    nodes: Vec<Box<dyn Node<S>>>,
}

impl<S: Send> Pipeline<S> {
    pub fn new(name: &'static str) -> Self {
        Self { name, nodes: Vec::new() }
    }

    pub fn then(mut self, node: impl Node<S> + 'static) -> Self {
        self.nodes.push(Box::new(node));
        self
    }

    pub async fn invoke(&self, mut state: S) -> Result<S, PipelineError> {
        for node in &self.nodes {
            let started = Instant::now();
            state = node.run(state).await?;
            debug!("[{}] node '{}' finished in {:?}", self.name, node.name(), started.elapsed());
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Append(&'static str);

    #[async_trait]
    impl Node<Vec<&'static str>> for Append {
        fn name(&self) -> &'static str {
            self.0
        }

        async fn run(&self, mut state: Vec<&'static str>) -> Result<Vec<&'static str>, PipelineError> {
            state.push(self.0);
            Ok(state)
        }
    }

    struct Fail;

    #[async_trait]
    impl Node<Vec<&'static str>> for Fail {
        fn name(&self) -> &'static str {
            "fail"
        }

        async fn run(&self, _state: Vec<&'static str>) -> Result<Vec<&'static str>, PipelineError> {
            Err(PipelineError::Retrieval("boom".into()))
        }
    }

    #[tokio::test]
    async fn nodes_run_in_order() {
        let pipeline = Pipeline::new("test").then(Append("scrape")).then(Append("clean"));
        let state = pipeline.invoke(Vec::new()).await.unwrap();
        assert_eq!(state, vec!["scrape", "clean"]);
    }

    #[tokio::test]
    async fn failing_node_stops_the_chain() {
        let pipeline = Pipeline::new("test").then(Append("a")).then(Fail).then(Append("b"));
        let err = pipeline.invoke(Vec::new()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Retrieval(_)));
    }
}
