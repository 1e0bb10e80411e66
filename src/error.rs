//! Error taxonomy for the insight pipeline.
//!
//! Producers report `ProducerError`; the rule engine reports `EngineError`
//! when handed a record that breaks its preconditions; everything that reaches
//! a pipeline subscriber is wrapped in `PipelineError`.
use crate::snapshot::Domain;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProducerError {
    /// The platform source cannot be read (missing permission, unsupported
    /// API level). Producers answer this with a degraded snapshot.
    #[error("{domain} producer unavailable: {reason}")]
    Unavailable { domain: Domain, reason: String },

    /// The producer's stream failed and will not produce further values.
    #[error("{domain} producer failed: {reason}")]
    Failed { domain: Domain, reason: String },

    /// The producer's state holder was dropped.
    #[error("{domain} producer closed")]
    Closed { domain: Domain },
}

impl ProducerError {
    pub fn domain(&self) -> Domain {
        match self {
            Self::Unavailable { domain, .. } => *domain,
            Self::Failed { domain, .. }      => *domain,
            Self::Closed { domain }          => *domain,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("malformed combined record: {field} {problem}")]
    MalformedRecord { field: &'static str, problem: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Producer(#[from] ProducerError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("pipeline cancelled")]
    Cancelled,
}
