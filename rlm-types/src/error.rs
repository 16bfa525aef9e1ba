//! Error taxonomy, organized by kind rather than by type (spec §7).

/// Errors from the LLM transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Network-level failure (connection reset, DNS failure, etc).
    #[error("network error: {0}")]
    Network(String),
    /// Rate limited by the provider.
    #[error("rate limited")]
    RateLimited,
    /// Request timed out.
    #[error("timeout after {0:?}")]
    Timeout(std::time::Duration),
    /// Authentication/authorization failure.
    #[error("authentication failed: {0}")]
    Authentication(String),
    /// Retries exhausted; carries the last underlying error.
    #[error("retries exhausted: {0}")]
    RetriesExhausted(String),
    /// Any other transport error.
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Whether this error is likely transient and the request can be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::RateLimited | Self::Timeout(_))
    }

    /// A caller-facing remediation hint for errors that match a known
    /// API-key failure pattern, per spec §7.
    pub fn remediation(&self) -> Option<&'static str> {
        let msg = self.to_string().to_lowercase();
        if msg.contains("invalid api key")
            || msg.contains("unauthorized")
            || msg.contains("no connected db")
        {
            Some("check that the configured api_key and base_url are correct")
        } else {
            None
        }
    }
}

/// Errors from the Durable Knowledge Store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Write to the snapshot file failed; the dirty flag remains set.
    #[error("flush failed: {0}")]
    FlushFailed(String),
    /// Snapshot file could not be parsed; the store starts empty.
    #[error("snapshot parse failed: {0}")]
    SnapshotParseFailed(String),
    /// An image blob exceeded the configured size cap.
    #[error("image exceeds max size of {max_bytes} bytes")]
    ImageTooLarge {
        /// The configured cap.
        max_bytes: usize,
    },
    /// A relationship referenced an entity id that does not exist.
    #[error("unresolved entity reference: {0}")]
    UnresolvedEntity(String),
    /// I/O failure creating or reading the backing directory.
    #[error("io error: {0}")]
    Io(String),
}

/// Errors from the sandboxed evaluator.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    /// The snippet raised an exception during evaluation.
    #[error("{0}")]
    Evaluation(String),
    /// The snippet exceeded its wall-clock deadline.
    #[error("timeout")]
    Timeout,
    /// The snippet attempted a denied construct (module load, eval, I/O).
    #[error("denied construct: {0}")]
    Denied(String),
}

/// Errors from tool bindings.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// No tool registered under this name.
    #[error("tool not found: {0}")]
    NotFound(String),
    /// Invalid input for the tool.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Tool execution failed.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
    /// Recursion depth cap reached; returned as a value, never thrown,
    /// per spec §7 ("Recursion errors... returned as a fixed
    /// string/record from the tool itself").
    #[error("recursion depth cap reached")]
    DepthExceeded,
}

/// Errors from the Iteration Engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The transport call failed (surfaced to the caller of `query!`, not
    /// recovered locally, per spec §7).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    /// The store failed in a way that must abort the query (persistence
    /// write failures are instead logged and retried, per spec §7).
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    /// Caller passed invalid configuration (e.g. `max_iterations == 0`).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Errors from the refinement pipeline.
#[derive(Debug, thiserror::Error)]
pub enum RefinementError {
    /// The transport call for a refinement phase failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    /// The model's structured response for a phase did not parse.
    #[error("malformed phase response: {0}")]
    MalformedResponse(String),
}

/// Errors from the ingestion pipeline.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The input document did not match the expected shape.
    #[error("invalid document: {0}")]
    InvalidDocument(String),
    /// The store rejected a write during ingestion.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    /// The extraction transport call failed.
    #[error("extraction failed: {0}")]
    ExtractionFailed(#[from] TransportError),
}

/// Errors from the Environment Facade (`create-env`/`register-fn!`/
/// `register-def!`/`ingest!`/`query!`/`dispose!`), surfaced synchronously
/// at the call site rather than returned from within the loop (spec §7).
#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    /// `create-env` was called with a blank api-key, base-url, or
    /// default-model.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// `register-fn!`/`register-def!` was called with a blank or
    /// otherwise invalid symbol name.
    #[error("invalid symbol: {0}")]
    InvalidSymbol(String),
    /// `register-fn!`/`register-def!` was called with a blank doc string.
    #[error("invalid doc string: {0}")]
    InvalidDoc(String),
    /// The iteration engine failed in a way that aborts the query.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    /// The refinement pipeline failed in a way that aborts the query.
    #[error("refinement error: {0}")]
    Refinement(#[from] RefinementError),
    /// The ingestion pipeline failed in a way that aborts the ingest.
    #[error("ingest error: {0}")]
    Ingest(#[from] IngestError),
    /// The store failed outside of a query/ingest call (e.g. on dispose).
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_retryable_split() {
        assert!(TransportError::RateLimited.is_retryable());
        assert!(!TransportError::Authentication("x".into()).is_retryable());
    }

    #[test]
    fn transport_error_remediation_matches_known_patterns() {
        let err = TransportError::Authentication("Invalid API Key provided".into());
        assert!(err.remediation().is_some());
        let err = TransportError::Other("some unrelated failure".into());
        assert!(err.remediation().is_none());
    }
}
