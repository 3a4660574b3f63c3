//! Dialect detection and the per-session dialect state machine.

use std::fmt;

use serde_json::Value;
use tracing::info;

use crate::element::{JWP_ELEMENT_KEY, W3C_ELEMENT_KEY};

/// Tracing target for dialect changes.
pub(crate) const DIALECT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dialect");

/// WebDriver wire-protocol flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// Legacy JSON Wire Protocol: `{status, value}` envelopes.
    Jwp,
    /// W3C WebDriver: `{value}` envelopes with string error codes.
    W3c,
}

impl Dialect {
    /// Guesses the dialect of a response body.
    ///
    /// A non-null `status` field means JWP; otherwise a non-null `value` field
    /// means W3C. Anything else is undecided.
    #[must_use]
    pub fn detect(body: &Value) -> Option<Self> {
        let field = |name: &str| body.get(name).filter(|value| !value.is_null());
        if field("status").is_some() {
            Some(Self::Jwp)
        } else if field("value").is_some() {
            Some(Self::W3c)
        } else {
            None
        }
    }

    /// Key under which this dialect stores element references.
    #[must_use]
    pub const fn element_key(self) -> &'static str {
        match self {
            Self::Jwp => JWP_ELEMENT_KEY,
            Self::W3c => W3C_ELEMENT_KEY,
        }
    }

    /// Canonical name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Jwp => "JSONWP",
            Self::W3c => "W3C",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Effect of feeding a response to a [`DialectTracker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialectUpdate {
    /// The tracked dialect did not change.
    Unchanged,
    /// The dialect became known for the first time.
    Determined(Dialect),
    /// A session-creation response overrode an earlier guess.
    Corrected {
        /// Dialect before the response.
        from: Dialect,
        /// Dialect after the response.
        to: Dialect,
    },
}

/// Sticky dialect state for one session or one downstream connection.
///
/// The dialect starts unknown and becomes known from the first response that
/// reveals it. A session-creation response may overwrite it once; after that
/// it is frozen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DialectTracker {
    current: Option<Dialect>,
    settled: bool,
}

impl DialectTracker {
    /// Tracker with an unknown dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            current: None,
            settled: false,
        }
    }

    /// Tracker already pinned to `dialect`.
    #[must_use]
    pub const fn settled(dialect: Dialect) -> Self {
        Self {
            current: Some(dialect),
            settled: true,
        }
    }

    /// Dialect currently in force.
    #[must_use]
    pub const fn current(&self) -> Option<Dialect> {
        self.current
    }

    /// Whether the dialect can no longer change.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        self.settled
    }

    /// Refreshes the dialect from a response body.
    pub fn observe(&mut self, body: &Value, session_creation: bool) -> DialectUpdate {
        let detected = Dialect::detect(body);
        if session_creation {
            self.settle(detected)
        } else {
            detected.map_or(DialectUpdate::Unchanged, |dialect| self.adopt(dialect))
        }
    }

    /// Records a session-creation verdict and freezes the tracker.
    ///
    /// An undecided verdict keeps whatever was known before.
    pub fn settle(&mut self, dialect: Option<Dialect>) -> DialectUpdate {
        if self.settled {
            return DialectUpdate::Unchanged;
        }
        let update = match (self.current, dialect) {
            (_, None) => DialectUpdate::Unchanged,
            (None, Some(to)) => DialectUpdate::Determined(to),
            (Some(from), Some(to)) if from != to => DialectUpdate::Corrected { from, to },
            (Some(_), Some(_)) => DialectUpdate::Unchanged,
        };
        if dialect.is_some() {
            self.current = dialect;
        }
        self.settled = self.current.is_some();
        log_update(update);
        update
    }

    /// Takes `dialect` only while the dialect is still unknown.
    pub fn adopt(&mut self, dialect: Dialect) -> DialectUpdate {
        if self.current.is_some() {
            return DialectUpdate::Unchanged;
        }
        self.current = Some(dialect);
        let update = DialectUpdate::Determined(dialect);
        log_update(update);
        update
    }
}

fn log_update(update: DialectUpdate) {
    match update {
        DialectUpdate::Unchanged => {}
        DialectUpdate::Determined(dialect) => {
            info!(target: DIALECT_TARGET, dialect = %dialect, "determined session dialect");
        }
        DialectUpdate::Corrected { from, to } => {
            info!(
                target: DIALECT_TARGET,
                from = %from,
                to = %to,
                "session creation changed the dialect"
            );
        }
    }
}
