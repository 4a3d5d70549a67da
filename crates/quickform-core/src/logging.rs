//! Logging integration for quickform.
//!
//! Provides a helper for configuring [`tracing`]-based logging and a span
//! constructor for scoping log output to a single form's processing.

/// Sets up the global tracing subscriber with the given filter directive
/// (e.g. `"debug"`, `"quickform_forms=trace"`).
///
/// Safe to call more than once; later calls are ignored if a subscriber is
/// already installed.
pub fn setup_logging(directive: &str) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"));

    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .ok();
}

/// Creates a tracing span covering one form's bind/validate lifecycle.
///
/// # Examples
///
/// ```
/// use quickform_core::logging::form_span;
///
/// let span = form_span("login");
/// let _guard = span.enter();
/// tracing::debug!("validating");
/// ```
pub fn form_span(form_name: &str) -> tracing::Span {
    tracing::debug_span!("form", name = form_name)
}
