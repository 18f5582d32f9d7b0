// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::borrow::Borrow;
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use smol_str::SmolStr;

pub const MAX_ID_LEN: usize = 96;

/// A stable textual identifier used across the model and protocol surfaces.
///
/// Ids arrive from untrusted peers, so construction validates them: non-empty,
/// at most [`MAX_ID_LEN`] bytes, printable ASCII with no whitespace. Node-kind
/// ids like `math.add` and session ids like `s17` both fit this shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id<T> {
    value: SmolStr,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Id<T> {
    pub fn new(value: impl AsRef<str>) -> Result<Self, IdError> {
        let value = value.as_ref();
        validate_id(value)?;
        Ok(Self {
            value: SmolStr::new(value),
            _marker: PhantomData,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl<T> AsRef<str> for Id<T> {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl<T> Borrow<str> for Id<T> {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl<T> FromStr for Id<T> {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("id must not be empty")]
    Empty,
    #[error("id exceeds {MAX_ID_LEN} bytes")]
    TooLong,
    #[error("id contains a non-printable or whitespace character")]
    InvalidCharacter,
}

fn validate_id(value: &str) -> Result<(), IdError> {
    if value.is_empty() {
        return Err(IdError::Empty);
    }
    if value.len() > MAX_ID_LEN {
        return Err(IdError::TooLong);
    }
    if value.bytes().any(|b| !b.is_ascii_graphic()) {
        return Err(IdError::InvalidCharacter);
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SessionIdTag {}
pub type SessionId = Id<SessionIdTag>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KindIdTag {}
pub type KindId = Id<KindIdTag>;

/// A caller-chosen node handle, unique within one working graph.
///
/// The wire carries plain integers for node handles, so this is numeric rather
/// than textual; links and literal overrides address nodes through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u32);

impl InstanceId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u32> for InstanceId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::{Id, IdError, InstanceId, MAX_ID_LEN};

    #[test]
    fn id_rejects_empty() {
        let result: Result<Id<()>, _> = Id::new("");
        assert_eq!(result, Err(IdError::Empty));
    }

    #[test]
    fn id_rejects_whitespace_and_control_bytes() {
        let result: Result<Id<()>, _> = Id::new("a b");
        assert_eq!(result, Err(IdError::InvalidCharacter));

        let result: Result<Id<()>, _> = Id::new("a\nb");
        assert_eq!(result, Err(IdError::InvalidCharacter));
    }

    #[test]
    fn id_rejects_overlong_values() {
        let raw = "k".repeat(MAX_ID_LEN + 1);
        let result: Result<Id<()>, _> = Id::new(raw);
        assert_eq!(result, Err(IdError::TooLong));
    }

    #[test]
    fn id_accepts_dotted_kind_names() {
        let id: Id<()> = Id::new("math.add").expect("kind id");
        assert_eq!(id.as_str(), "math.add");
    }

    #[test]
    fn instance_id_displays_with_hash_prefix() {
        assert_eq!(InstanceId::new(7).to_string(), "#7");
    }
}
