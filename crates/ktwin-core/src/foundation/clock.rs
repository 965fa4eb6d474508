//! Injectable time and id sources.
//!
//! The codec never reads the system clock or generates ids directly, so tests
//! can pin both and compare whole wire messages.

use std::fmt::Debug;

use chrono::{DateTime, Utc};

/// Source of the current time.
pub trait Clock: Debug + Send + Sync {
    /// Returns the current UTC time.
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Source of event ids.
pub trait IdSource: Debug + Send + Sync {
    /// Returns a fresh event id.
    fn next_id(&self) -> String;
}

/// Random UUID v4 ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidSource;

impl IdSource for UuidSource {
    fn next_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Always returns the same id.
#[derive(Debug, Clone)]
pub struct FixedId(pub String);

impl IdSource for FixedId {
    fn next_id(&self) -> String {
        self.0.clone()
    }
}
