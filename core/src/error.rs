//! Error domain for the control plane.
//!
//! Data-plane errors (resource exhaustion, transient parse failures) never
//! flow through here — per spec.md §7 they are absorbed locally as counters
//! and rate-limited log lines (see [`crate::observability`]). This module
//! only covers `configure`/`initialize` failures and handler-write failures,
//! which the source accumulates through an `ErrorHandler*` parameter instead
//! of a bare `Result` so that earlier warnings survive a later fatal error.

use std::fmt;

/// Severity of one message accumulated in an [`ErrorHandler`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
    Fatal,
}

/// A stable-coded, owned control-plane error.
#[derive(Debug)]
pub struct FrameworkError {
    code: &'static str,
    message: String,
    cause: Option<Box<FrameworkError>>,
}

impl FrameworkError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        FrameworkError {
            code,
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: FrameworkError) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> Option<&FrameworkError> {
        self.cause.as_deref()
    }
}

impl fmt::Display for FrameworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(cause) = &self.cause {
            write!(f, ": {cause}")?;
        }
        Ok(())
    }
}

impl std::error::Error for FrameworkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause.as_deref().map(|c| c as &(dyn std::error::Error))
    }
}

/// Stable error codes. Grouped the way spec.md §7 groups error kinds.
pub mod codes {
    // Configuration errors (fatal, reported from configure/initialize).
    pub const CONFIG_BAD_ARGUMENT: &str = "config.bad_argument";
    pub const CONFIG_MISSING_PEER: &str = "config.missing_peer";
    pub const CONFIG_PORT_ARITY: &str = "config.port_arity_mismatch";
    pub const CONFIG_PORT_UNBOUND: &str = "config.port_unbound";
    pub const CONFIG_CROSS_THREAD: &str = "config.cross_thread_without_handoff";
    pub const CONFIG_UNKNOWN_CLASS: &str = "config.unknown_element_class";

    // Flow-level errors (torn down via the release-callback chain).
    pub const FLOW_REORDER_OVERFLOW: &str = "flow.reorder_buffer_overflow";
    pub const FLOW_RANGE_NOT_BUFFERED: &str = "flow.range_not_buffered";

    // Handler (control-plane) write errors.
    pub const HANDLER_NOT_FOUND: &str = "handler.not_found";
    pub const HANDLER_READ_ONLY: &str = "handler.read_only";
    pub const HANDLER_BAD_VALUE: &str = "handler.bad_value";
}

/// Accumulates control-plane messages with severity, in order, the way
/// FastClick's `ErrorHandler*` accumulates `errh->error(...)`/`errh->warning(...)`
/// calls across a whole `configure`/`initialize` pass.
#[derive(Debug, Default)]
pub struct ErrorHandler {
    messages: Vec<(Severity, FrameworkError)>,
}

impl ErrorHandler {
    pub fn new() -> Self {
        ErrorHandler::default()
    }

    pub fn warning(&mut self, error: FrameworkError) {
        self.messages.push((Severity::Warning, error));
    }

    pub fn error(&mut self, error: FrameworkError) {
        self.messages.push((Severity::Error, error));
    }

    pub fn fatal(&mut self, error: FrameworkError) {
        self.messages.push((Severity::Fatal, error));
    }

    /// True once any message at or above [`Severity::Error`] was recorded —
    /// the graph must not start (spec.md §7: "refuses to start").
    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(|(sev, _)| *sev >= Severity::Error)
    }

    pub fn messages(&self) -> &[(Severity, FrameworkError)] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<(Severity, FrameworkError)> {
        self.messages
    }

    /// Renders all accumulated messages as a single human-readable report,
    /// one line per message, in the order they were recorded.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (sev, err) in &self.messages {
            let tag = match sev {
                Severity::Warning => "warning",
                Severity::Error => "error",
                Severity::Fatal => "fatal",
            };
            out.push_str(tag);
            out.push_str(": ");
            out.push_str(&err.to_string());
            out.push('\n');
        }
        out
    }
}
