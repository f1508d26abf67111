//! Error listener registered by the host application

use crate::Error;

/// Receives every failure the bridge reports
pub trait ErrorListener: Send + Sync {
    /// `debug` carries the offending payload when one is available
    fn on_error(&self, description: &str, error: &Error, debug: Option<&str>);
}

impl<F> ErrorListener for F
where
    F: Fn(&str, &Error, Option<&str>) + Send + Sync,
{
    fn on_error(&self, description: &str, error: &Error, debug: Option<&str>) {
        self(description, error, debug)
    }
}

/// A failure raised while handling one event
#[derive(Debug, Clone, PartialEq)]
pub struct EventFailure {
    pub description: String,
    pub error: Error,
    pub debug: Option<String>,
}

impl EventFailure {
    pub fn new(description: impl Into<String>, error: Error) -> Self {
        Self {
            description: description.into(),
            error,
            debug: None,
        }
    }

    pub fn with_debug(mut self, debug: Option<&str>) -> Self {
        self.debug = debug.map(str::to_string);
        self
    }
}

impl std::fmt::Display for EventFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.description, self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_closure_listener() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let listener = move |description: &str, error: &Error, debug: Option<&str>| {
            sink.lock().unwrap().push((
                description.to_string(),
                error.error_code(),
                debug.map(str::to_string),
            ));
        };

        let failure = EventFailure::new("Incorrect Position", Error::InvalidPosition("x".into()))
            .with_debug(Some("payload"));
        listener.on_error(&failure.description, &failure.error, failure.debug.as_deref());

        let seen = seen.lock().unwrap();
        assert_eq!(
            seen[0],
            (
                "Incorrect Position".to_string(),
                "INVALID_POSITION",
                Some("payload".to_string())
            )
        );
    }
}
