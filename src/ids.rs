//! Call identifiers.
//!
//! Every call carries a [`CallId`]. A transport that already assigned one
//! passes it in the `x-request-id` header; otherwise the router mints a fresh
//! ULID, so ids sort by arrival time either way.

use std::fmt;

use ulid::Ulid;

use crate::call::CallResourceRequest;

/// Header a transport may use to propagate a call identifier.
pub const CALL_ID_HEADER: &str = "x-request-id";

/// How a call obtained its id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallIdOrigin {
    /// Taken from the caller's `x-request-id` header.
    Propagated,
    /// Minted locally.
    Generated,
}

impl CallIdOrigin {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Propagated => "propagated",
            Self::Generated => "generated",
        }
    }
}

/// Identifier of one call through the router.
///
/// Equality compares the ULID only; the origin is bookkeeping.
#[derive(Clone, Copy, Debug)]
pub struct CallId {
    ulid: Ulid,
    origin: CallIdOrigin,
}

impl CallId {
    /// A freshly minted id.
    #[must_use]
    pub fn generate() -> Self {
        Self {
            ulid: Ulid::new(),
            origin: CallIdOrigin::Generated,
        }
    }

    /// The id `req` carries in its headers, or a generated one when the
    /// header is absent or not a ULID.
    #[must_use]
    pub fn for_call(req: &CallResourceRequest) -> Self {
        req.headers
            .get(CALL_ID_HEADER)
            .and_then(|value| Ulid::from_string(value.trim()).ok())
            .map_or_else(Self::generate, |ulid| Self {
                ulid,
                origin: CallIdOrigin::Propagated,
            })
    }

    #[must_use]
    pub fn origin(&self) -> CallIdOrigin {
        self.origin
    }

    #[must_use]
    pub fn ulid(&self) -> Ulid {
        self.ulid
    }
}

impl PartialEq for CallId {
    fn eq(&self, other: &Self) -> bool {
        self.ulid == other.ulid
    }
}

impl Eq for CallId {}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.ulid, f)
    }
}
