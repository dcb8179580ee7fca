//! Mapping SurrealDB failures onto the graph error taxonomy

use propgraph_core::GraphError;

/// Classify a SurrealDB error by its message
///
/// The SDK exposes many nested error enums that change between releases, so
/// classification keys off the rendered message.
pub fn classify_error(error: surrealdb::Error) -> GraphError {
    classify_message(&error.to_string())
}

pub(crate) fn classify_message(message: &str) -> GraphError {
    let lower = message.to_ascii_lowercase();

    if lower.contains("already contains") || lower.contains("unique") {
        GraphError::Constraint(message.to_string())
    } else if lower.contains("read or write conflict")
        || lower.contains("transaction conflict")
        || lower.contains("resource busy")
        || lower.contains("can be retried")
    {
        GraphError::Transient(message.to_string())
    } else if lower.contains("connection") || lower.contains("not connected") {
        GraphError::Connection(message.to_string())
    } else if lower.contains("parse error") || lower.contains("failed to parse") {
        GraphError::Query(message.to_string())
    } else if lower.contains("index") || (lower.contains("table") && lower.contains("define")) {
        GraphError::Schema(message.to_string())
    } else {
        GraphError::Internal(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_messages() {
        assert!(matches!(
            classify_message("Database index `property_zpid` already contains 42"),
            GraphError::Constraint(_)
        ));
        assert!(classify_message(
            "Failed to commit transaction due to a read or write conflict. This transaction can be retried"
        )
        .is_retryable());
        assert!(classify_message("Connection closed unexpectedly").is_retryable());
        assert!(matches!(
            classify_message("Parse error: Unexpected token `)`"),
            GraphError::Query(_)
        ));
        assert!(!classify_message("Something unexpected").is_retryable());
    }
}
