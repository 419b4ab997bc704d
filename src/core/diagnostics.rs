//! Caller-visible diagnostics sink
//!
//! Clients and loaders report lifecycle events (load failures, ignored
//! misuse) through a [`Diagnostics`] value. When the caller configured a
//! [`ClientLogger`] the messages go there; otherwise they go to the `log`
//! facade under the `gtm_client` target.

use std::fmt;
use std::sync::Arc;

/// Destination for client diagnostics supplied by the embedding application
pub trait ClientLogger: Send + Sync {
    fn log(&self, level: log::Level, message: &str);
}

impl<F> ClientLogger for F
where
    F: Fn(log::Level, &str) + Send + Sync,
{
    fn log(&self, level: log::Level, message: &str) {
        self(level, message)
    }
}

#[derive(Clone, Default)]
pub struct Diagnostics {
    sink: Option<Arc<dyn ClientLogger>>,
}

impl Diagnostics {
    pub fn new(sink: Option<Arc<dyn ClientLogger>>) -> Self {
        Self { sink }
    }

    pub fn emit(&self, level: log::Level, args: fmt::Arguments<'_>) {
        match &self.sink {
            Some(sink) => sink.log(level, &args.to_string()),
            None => log::log!(target: "gtm_client", level, "{}", args),
        }
    }

    pub fn debug(&self, args: fmt::Arguments<'_>) {
        self.emit(log::Level::Debug, args)
    }

    pub fn info(&self, args: fmt::Arguments<'_>) {
        self.emit(log::Level::Info, args)
    }

    pub fn warn(&self, args: fmt::Arguments<'_>) {
        self.emit(log::Level::Warn, args)
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("custom_sink", &self.sink.is_some())
            .finish()
    }
}
