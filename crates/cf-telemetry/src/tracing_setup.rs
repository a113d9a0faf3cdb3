use uuid::Uuid;

/// Generate an OpenTelemetry-compatible trace ID (32 hex characters).
pub fn generate_trace_id() -> String {
    // A UUID without hyphens is exactly 32 hex chars.
    Uuid::new_v4().as_simple().to_string()
}

/// Create a named span for one operation, returning the span and its
/// trace ID for logging correlation.
pub fn create_operation_span(operation: &str) -> (tracing::Span, String) {
    let trace_id = generate_trace_id();
    let span = tracing::info_span!(
        "operation",
        trace_id = %trace_id,
        operation = %operation,
    );
    (span, trace_id)
}
