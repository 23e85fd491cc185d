//! Named control-plane read/write endpoints (spec.md §4.9, §6).
//!
//! Handlers are out-of-band: invoked from any thread, never from the packet
//! hot path. Element authors own their own thread-safety, typically via
//! [`crate::observability::Counter`] or per-thread shards folded at read
//! time (spec.md §4.9, §5 "Handler reads of counters: lockless").

use std::fmt;

bitflags::bitflags! {
    /// Modifiers on a handler's behaviour (spec.md §4.9).
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct HandlerFlags: u8 {
        const CALM = 0b0001;
        const BUTTON = 0b0010;
        const EXPENSIVE = 0b0100;
        const DEPRECATED = 0b1000;
    }
}

/// The read side of a handler: produces the whole text value (spec.md §6:
/// "Reads return the whole value").
pub trait HandlerRead: Send + Sync {
    fn read(&self) -> String;
}

/// The write side: consumes the whole text value, returns a status (0 =
/// success, negative = error, per spec.md §6).
pub trait HandlerWrite: Send + Sync {
    fn write(&self, value: &str) -> Result<(), String>;
}

enum Endpoint {
    Read(Box<dyn HandlerRead>),
    Write(Box<dyn HandlerWrite>),
    ReadWrite(Box<dyn HandlerRead>, Box<dyn HandlerWrite>),
}

struct HandlerEntry {
    flags: HandlerFlags,
    endpoint: Endpoint,
}

/// One element's set of registered handlers, populated from
/// [`crate::element::Element::add_handlers`].
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: std::collections::HashMap<String, HandlerEntry>,
}

/// Errors surfaced by [`HandlerRegistry::invoke_read`]/[`HandlerRegistry::invoke_write`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandlerError {
    #[error("handler not found")]
    NotFound,
    #[error("handler is read-only")]
    ReadOnly,
    #[error("handler is write-only")]
    WriteOnly,
    #[error("bad value: {0}")]
    BadValue(String),
}

impl HandlerRegistry {
    pub fn new() -> Self {
        HandlerRegistry::default()
    }

    pub fn add_read(&mut self, name: impl Into<String>, flags: HandlerFlags, read: impl HandlerRead + 'static) {
        self.handlers.insert(
            name.into(),
            HandlerEntry {
                flags,
                endpoint: Endpoint::Read(Box::new(read)),
            },
        );
    }

    pub fn add_write(&mut self, name: impl Into<String>, flags: HandlerFlags, write: impl HandlerWrite + 'static) {
        self.handlers.insert(
            name.into(),
            HandlerEntry {
                flags,
                endpoint: Endpoint::Write(Box::new(write)),
            },
        );
    }

    pub fn add_read_write(
        &mut self,
        name: impl Into<String>,
        flags: HandlerFlags,
        read: impl HandlerRead + 'static,
        write: impl HandlerWrite + 'static,
    ) {
        self.handlers.insert(
            name.into(),
            HandlerEntry {
                flags,
                endpoint: Endpoint::ReadWrite(Box::new(read), Box::new(write)),
            },
        );
    }

    pub fn flags(&self, name: &str) -> Option<HandlerFlags> {
        self.handlers.get(name).map(|entry| entry.flags)
    }

    pub fn invoke_read(&self, name: &str) -> Result<String, HandlerError> {
        let entry = self.handlers.get(name).ok_or(HandlerError::NotFound)?;
        match &entry.endpoint {
            Endpoint::Read(r) => Ok(r.read()),
            Endpoint::ReadWrite(r, _) => Ok(r.read()),
            Endpoint::Write(_) => Err(HandlerError::WriteOnly),
        }
    }

    pub fn invoke_write(&self, name: &str, value: &str) -> Result<(), HandlerError> {
        let entry = self.handlers.get(name).ok_or(HandlerError::NotFound)?;
        match &entry.endpoint {
            Endpoint::Write(w) => w.write(value).map_err(HandlerError::BadValue),
            Endpoint::ReadWrite(_, w) => w.write(value).map_err(HandlerError::BadValue),
            Endpoint::Read(_) => Err(HandlerError::ReadOnly),
        }
    }
}

/// Globally addresses one handler as `"<element>/<handler>"` (spec.md §4.9).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HandlerAddress {
    pub element: String,
    pub handler: String,
}

impl fmt::Display for HandlerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.element, self.handler)
    }
}

impl HandlerAddress {
    /// Parses `"<element>/<handler>"`, splitting on the first `/`.
    pub fn parse(address: &str) -> Option<Self> {
        let (element, handler) = address.split_once('/')?;
        Some(HandlerAddress {
            element: element.to_string(),
            handler: handler.to_string(),
        })
    }
}
