// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error taxonomy for the bridge.
//!
//! Every failure that can be observed from the other side of the boundary is
//! a value of [`BridgeError`]. Nothing in this crate unwinds across a caller
//! boundary: the invocation engine converts panics raised by bound methods
//! into [`BridgeError::Panicked`].
//!
//! # Status code ranges
//!
//! - **0**: Success (only used by the C surface)
//! - **1-9**: Generic argument errors
//! - **10-19**: Registry errors (types, members, instances)
//! - **20-29**: Invocation errors
//! - **30-39**: Shared future errors

use crate::member::MemberKind;
use std::fmt;

/// Errors returned by registry, accessor and invocation operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// A type name was registered twice with different native types.
    TypeConflict {
        name: String,
        existing_hash: u64,
        new_hash: u64,
    },
    /// No type is registered under this name (or hash).
    UnknownType(String),
    /// The type has no member with this name.
    UnknownMember { type_name: String, member: String },
    /// The runtime type of a value disagrees with the descriptor used to
    /// interpret it.
    TypeMismatch { expected: String, found: String },
    /// Wrong number of argument pointers for a member function.
    ArityMismatch {
        member: String,
        expected: usize,
        got: usize,
    },
    /// A data member was used as a function, or the reverse.
    WrongMemberKind { member: String, expected: MemberKind },
    /// Null pointer, bad UTF-8 or otherwise unusable argument.
    InvalidArgument(String),
    /// Caller-provided buffer cannot hold the value.
    BufferTooSmall { required: usize, provided: usize },
    /// The bound member function panicked; the panic was contained.
    Panicked { member: String, message: String },
    /// `future_get` gave up before the value became available.
    FutureTimeout,
    /// The future has no shared state (default-constructed).
    FutureInvalid,
    /// The producing side went away without setting a value.
    FutureBroken,
}

impl BridgeError {
    /// Stable numeric status code, shared with the C surface.
    #[must_use]
    pub const fn code(&self) -> u32 {
        match self {
            Self::InvalidArgument(_) => 1,
            Self::BufferTooSmall { .. } => 2,
            Self::TypeConflict { .. } => 10,
            Self::UnknownType(_) => 11,
            Self::UnknownMember { .. } => 12,
            Self::TypeMismatch { .. } => 13,
            Self::ArityMismatch { .. } => 20,
            Self::WrongMemberKind { .. } => 21,
            Self::Panicked { .. } => 22,
            Self::FutureTimeout => 30,
            Self::FutureInvalid => 31,
            Self::FutureBroken => 32,
        }
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidArgument(reason.into())
    }

    pub(crate) fn mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeConflict {
                name,
                existing_hash,
                new_hash,
            } => write!(
                f,
                "Type conflict: '{}' already registered with hash {:#018x}, got {:#018x}",
                name, existing_hash, new_hash
            ),
            Self::UnknownType(name) => write!(f, "Unknown type: {}", name),
            Self::UnknownMember { type_name, member } => {
                write!(f, "Unknown member: {}::{}", type_name, member)
            }
            Self::TypeMismatch { expected, found } => {
                write!(f, "Type mismatch: expected {}, found {}", expected, found)
            }
            Self::ArityMismatch {
                member,
                expected,
                got,
            } => write!(
                f,
                "Arity mismatch calling '{}': expected {} argument(s), got {}",
                member, expected, got
            ),
            Self::WrongMemberKind { member, expected } => {
                write!(f, "Member '{}' is not a {} member", member, expected)
            }
            Self::InvalidArgument(reason) => write!(f, "Invalid argument: {}", reason),
            Self::BufferTooSmall { required, provided } => write!(
                f,
                "Buffer too small: {} byte(s) required, {} provided",
                required, provided
            ),
            Self::Panicked { member, message } => {
                write!(f, "Member function '{}' panicked: {}", member, message)
            }
            Self::FutureTimeout => write!(f, "Timed out waiting for shared future"),
            Self::FutureInvalid => write!(f, "Shared future has no associated state"),
            Self::FutureBroken => write!(f, "Shared future producer dropped without a value"),
        }
    }
}

impl std::error::Error for BridgeError {}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, BridgeError>;
