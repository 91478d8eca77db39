/*!
 * Session Tracing
 * Structured tracing for roles and sessions using the tracing crate
 *
 * Features:
 * - Role-tagged spans so every line carries `[PARENT]` or `[CHILD]`
 * - JSON-formatted logs for structured parsing
 * - Session duration and outcome recorded when the span closes
 */

use std::time::Instant;
use tracing::{debug, span, Level, Span};
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - IPC_TRACE_JSON: Enable JSON output (default: false)
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var("IPC_TRACE_JSON")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_thread_names(true)
                    .compact(),
            )
            .try_init()
    };

    if installed.is_ok() {
        debug!(json = use_json, "Structured tracing initialized");
    }
}

/// `session` span for one role, tagged with its console prefix in the `role` field
pub struct SessionSpan {
    span: Span,
    start: Instant,
    prefix: &'static str,
}

impl SessionSpan {
    pub fn new(prefix: &'static str, program: &str) -> Self {
        let span = span!(
            Level::INFO,
            "session",
            role = prefix,
            program = program,
            duration_ms = tracing::field::Empty,
            status = tracing::field::Empty,
        );
        Self {
            span,
            start: Instant::now(),
            prefix,
        }
    }

    /// Enter the span on the current thread
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }

    /// Record the raw status the session ended with
    pub fn record_status(&self, status: i32) {
        self.span.record("status", status);
    }
}

impl Drop for SessionSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        let _entered = self.span.enter();
        self.span.record("duration_ms", duration.as_millis() as u64);

        debug!(
            role = self.prefix,
            duration_ms = duration.as_millis() as u64,
            "Session finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_span_carries_role_prefix() {
        tracing::subscriber::with_default(tracing_subscriber::registry(), || {
            let session = SessionSpan::new("[CHILD]", "fifo");
            let metadata = session.span.metadata().unwrap();
            assert_eq!(metadata.name(), "session");
            assert!(metadata.fields().field("role").is_some());
            assert!(metadata.fields().field("status").is_some());
            session.record_status(0);
        });
    }
}
