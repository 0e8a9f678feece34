//! Application-scoped key tag

use std::borrow::Cow;
use std::fmt;
use thiserror::Error;

/// Stable identifier addressing the single identity of an application.
///
/// Keys generated by earlier runs are only found again if the tag is the
/// same, so applications should declare it as a constant with
/// [`KeyTag::from_static`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct KeyTag(Cow<'static, str>);

impl KeyTag {
    pub const MAX_LENGTH: usize = 64;

    /// Tag from a compile-time constant. The caller guarantees the tag is
    /// non-empty printable text of at most [`KeyTag::MAX_LENGTH`] bytes.
    pub const fn from_static(tag: &'static str) -> Self {
        Self(Cow::Borrowed(tag))
    }

    pub fn new(tag: impl Into<String>) -> Result<Self, TagError> {
        let tag = tag.into();
        if tag.is_empty() {
            return Err(TagError::Empty);
        }
        if tag.len() > Self::MAX_LENGTH {
            return Err(TagError::TooLong { length: tag.len() });
        }
        if tag.chars().any(char::is_control) {
            return Err(TagError::ControlCharacter);
        }
        Ok(Self(Cow::Owned(tag)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for KeyTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyTag({:?})", self.as_str())
    }
}

impl fmt::Display for KeyTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for KeyTag {
    type Err = TagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagError {
    #[error("key tag must not be empty")]
    Empty,

    #[error("key tag is {length} bytes, at most {max} allowed", max = KeyTag::MAX_LENGTH)]
    TooLong { length: usize },

    #[error("key tag must not contain control characters")]
    ControlCharacter,
}
