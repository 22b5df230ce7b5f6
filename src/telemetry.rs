use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Initialize structured logging. JSON output with span context so audit
/// and workflow lines can be correlated downstream.
pub fn init_telemetry() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true),
        )
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Shipshape telemetry initialized with structured logging");
    Ok(())
}

/// Generate a correlation ID for linking related operations
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Create a span with common workflow attributes
pub fn create_workflow_span(
    operation: &str,
    request_number: &str,
    actor_id: &str,
    correlation_id: &str,
) -> tracing::Span {
    tracing::info_span!(
        "workflow_transition",
        operation = operation,
        request.number = request_number,
        actor.id = actor_id,
        correlation.id = correlation_id,
    )
}

/// Shutdown telemetry gracefully
pub fn shutdown_telemetry() {
    tracing::info!("Shipshape telemetry shutdown complete");
}
