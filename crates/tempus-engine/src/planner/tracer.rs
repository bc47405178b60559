//! Human-readable plan tracing.
//!
//! A tracer is an optional write sink receiving one line per plan step.
//! Messages are built lazily so a disabled tracer costs nothing, and
//! write failures are swallowed: tracing must never affect semantics.

use std::io::Write;

/// Optional tracing sink carried by plans.
pub type Tracer = Option<Box<dyn Write + Send>>;

/// Writes the lazily-built messages to the tracer, if one is installed.
pub(crate) fn trace<F>(tracer: &mut Tracer, messages: F)
where
    F: FnOnce() -> Vec<String>,
{
    if let Some(sink) = tracer.as_mut() {
        for message in messages() {
            let _ = writeln!(sink, "[plan] {message}");
        }
    }
}
