//! # Lifecycle & Snapshots
//!
//! The engine's operational state is a closed, hierarchical enum. Callers query it
//! with dotted paths (`"busy"`, `"busy.fetching"`, `"fail"`) through
//! [`Lifecycle::matches`], which compares path segments as a prefix of the
//! current state:
//!
//! ```text
//! idle ── snapshot | template
//! busy ── fetching | creating | updating | deleting
//! fail ── transport | rejected | decode
//! ```
//!
//! ```rust
//! use resource_engine::{Busy, Lifecycle};
//!
//! let state = Lifecycle::Busy(Busy::Fetching);
//! assert!(state.matches("busy"));
//! assert!(state.matches("busy.fetching"));
//! assert!(!state.matches("busy.fetching.more"));
//! assert!(!state.matches("busy.fetch"));
//! assert!(!state.matches(""));
//! ```

use std::fmt;

/// Idle sub-states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Idle {
    /// `data` holds a confirmed server representation.
    Snapshot,
    /// No identity: the draft is seeded from the template.
    Template,
}

/// Network operations in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Busy {
    Fetching,
    Creating,
    Updating,
    Deleting,
}

/// Why the last operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailCause {
    /// Network error, timeout, cancelled offer, or an unrecognized non-2xx.
    Transport,
    /// Non-2xx translated into `error:<code>` tokens.
    Rejected,
    /// 2xx the entity type could not read, or a create without identity.
    Decode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    Idle(Idle),
    Busy(Busy),
    Fail(FailCause),
}

impl Default for Lifecycle {
    fn default() -> Self {
        Lifecycle::Idle(Idle::Template)
    }
}

impl Lifecycle {
    /// The state as path segments, e.g. `["busy", "fetching"]`.
    pub fn segments(&self) -> [&'static str; 2] {
        match self {
            Lifecycle::Idle(idle) => [
                "idle",
                match idle {
                    Idle::Snapshot => "snapshot",
                    Idle::Template => "template",
                },
            ],
            Lifecycle::Busy(busy) => [
                "busy",
                match busy {
                    Busy::Fetching => "fetching",
                    Busy::Creating => "creating",
                    Busy::Updating => "updating",
                    Busy::Deleting => "deleting",
                },
            ],
            Lifecycle::Fail(cause) => [
                "fail",
                match cause {
                    FailCause::Transport => "transport",
                    FailCause::Rejected => "rejected",
                    FailCause::Decode => "decode",
                },
            ],
        }
    }

    /// Segment-wise prefix match of a dotted path.
    pub fn matches(&self, path: &str) -> bool {
        if path.is_empty() {
            return false;
        }
        let segments = self.segments();
        path.split('.')
            .enumerate()
            .all(|(index, part)| segments.get(index) == Some(&part))
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Lifecycle::Idle(_))
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, Lifecycle::Busy(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Lifecycle::Fail(_))
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [parent, child] = self.segments();
        write!(f, "{parent}.{child}")
    }
}

/// Immutable view of an engine, published after every transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    pub href: Option<String>,
    pub parent: Option<String>,
    pub data: Option<T>,
    pub form: T,
    pub lifecycle: Lifecycle,
    pub errors: Vec<String>,
}

impl<T> Snapshot<T> {
    pub fn is_in(&self, path: &str) -> bool {
        self.lifecycle.matches(path)
    }
}
