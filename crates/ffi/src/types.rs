//! Scalar wire types: booleans, handles and timestamps
//!
//! Every handle kind is a `#[repr(transparent)]` newtype over `u64`, so the
//! wire representation stays a bare integer while the type system keeps a
//! `SuiteId` from being passed where a `TestId` is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Single-byte boolean used on the wire (0 = false, anything else = true).
pub type Bool = u8;

/// Wire `true`.
pub const TRUE: Bool = 1;
/// Wire `false`.
pub const FALSE: Bool = 0;

/// Convert a wire boolean into a Rust `bool`.
#[inline]
pub const fn as_bool(value: Bool) -> bool {
    value != FALSE
}

/// Convert a Rust `bool` into a wire boolean.
#[inline]
pub const fn from_bool(value: bool) -> Bool {
    if value {
        TRUE
    } else {
        FALSE
    }
}

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[repr(transparent)]
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[derive(Serialize, Deserialize)]
        pub struct $name(u64);

        impl $name {
            /// Wrap a raw engine handle.
            #[inline]
            pub const fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            /// The raw engine handle.
            #[inline]
            pub const fn as_raw(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$name> for EntityId {
            #[inline]
            fn from(id: $name) -> Self {
                EntityId(id.0)
            }
        }
    };
}

handle!(
    /// Handle of a test session.
    SessionId
);
handle!(
    /// Handle of a test module.
    ModuleId
);
handle!(
    /// Handle of a test suite.
    SuiteId
);
handle!(
    /// Handle of a single test.
    TestId
);
handle!(
    /// Handle of a custom span.
    SpanId
);

/// Type-erased handle accepted wherever the engine takes "any" entity.
///
/// Spans can be parented off a session, module, suite, test or another span,
/// so span creation takes an `EntityId`. Every typed handle converts into an
/// `EntityId`; there is no conversion back.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Wrap a raw engine handle.
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw engine handle.
    #[inline]
    pub const fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Wire status of a finished test.
pub type TestStatusCode = u8;

/// Test passed.
pub const TEST_STATUS_PASS: TestStatusCode = 0;
/// Test failed.
pub const TEST_STATUS_FAIL: TestStatusCode = 1;
/// Test was skipped.
pub const TEST_STATUS_SKIP: TestStatusCode = 2;

/// Absolute instant as seconds plus nanoseconds since the Unix epoch.
///
/// Always captured by the client at the moment of the call that needs it.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnixTime {
    /// Whole seconds since the epoch.
    pub sec: u64,
    /// Nanoseconds within the second.
    pub nsec: u64,
}

impl UnixTime {
    /// The Unix epoch.
    pub const EPOCH: UnixTime = UnixTime { sec: 0, nsec: 0 };

    /// Current wall-clock time.
    ///
    /// Returns the epoch if the system clock is set before 1970.
    pub fn now() -> Self {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self::from_duration(elapsed)
    }

    /// Build from a duration since the epoch.
    pub const fn from_duration(elapsed: Duration) -> Self {
        UnixTime {
            sec: elapsed.as_secs(),
            nsec: elapsed.subsec_nanos() as u64,
        }
    }

    /// Convert to a `SystemTime`.
    ///
    /// Nanoseconds beyond one second carry into the seconds field.
    pub fn to_system_time(self) -> SystemTime {
        let carry = self.nsec / 1_000_000_000;
        let nanos = (self.nsec % 1_000_000_000) as u32;
        UNIX_EPOCH + Duration::new(self.sec.saturating_add(carry), nanos)
    }
}

impl From<SystemTime> for UnixTime {
    fn from(time: SystemTime) -> Self {
        Self::from_duration(time.duration_since(UNIX_EPOCH).unwrap_or_default())
    }
}
