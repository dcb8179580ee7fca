//! Mapping Neo4j failures onto the graph error taxonomy

use propgraph_core::GraphError;

pub(crate) fn classify(error: neo4rs::Error) -> GraphError {
    classify_message(&error.to_string())
}

/// Classify a Neo4j driver error by its rendered message
///
/// Server failures carry a status code such as
/// `Neo.TransientError.Transaction.DeadlockDetected`; driver failures
/// (I/O, pool exhaustion) only have free text.
pub fn classify_message(message: &str) -> GraphError {
    let lower = message.to_ascii_lowercase();

    if message.contains("Neo.TransientError") {
        return GraphError::Transient(message.to_string());
    }
    if message.contains("Neo.ClientError.Schema.ConstraintValidationFailed")
        || lower.contains("already exists with label")
    {
        return GraphError::Constraint(message.to_string());
    }
    if message.contains("Neo.ClientError.Schema") {
        return GraphError::Schema(message.to_string());
    }
    if message.contains("Neo.ClientError") {
        return GraphError::Query(message.to_string());
    }
    if message.contains("SessionExpired") || lower.contains("session expired") {
        return GraphError::SessionExpired(message.to_string());
    }
    if message.contains("ServiceUnavailable")
        || lower.contains("connection")
        || lower.contains("io error")
        || lower.contains("broken pipe")
        || lower.contains("timed out")
        || lower.contains("pool")
    {
        return GraphError::Connection(message.to_string());
    }

    GraphError::Internal(message.to_string())
}
