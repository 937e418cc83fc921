//! Secret material
//!
//! Password bytes live in a [`Secret`] with exactly one owner. The buffer is
//! overwritten with zeroes when it is wiped or dropped, whichever comes first.

use std::fmt;
use zeroize::Zeroize;

/// An owned secret buffer. Not `Clone`: wiping needs exclusive access.
pub struct Secret {
    bytes: Vec<u8>,
}

impl Secret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn expose(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Overwrite the contents with zeroes, keeping the length
    pub fn wipe(&mut self) {
        self.bytes.as_mut_slice().zeroize();
    }

    pub fn is_wiped(&self) -> bool {
        self.bytes.iter().all(|b| *b == 0)
    }
}

impl From<&str> for Secret {
    fn from(s: &str) -> Self {
        Self::new(s.as_bytes())
    }
}

impl From<String> for Secret {
    fn from(s: String) -> Self {
        Self::new(s.into_bytes())
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret(<{} bytes redacted>)", self.bytes.len())
    }
}

/// Holder of an entity's pending secret.
///
/// A transmitted secret is wiped in place and kept as `Spent` until the
/// slot is refilled or dropped, so the zeroed buffer can still be inspected.
#[derive(Debug, Default)]
pub(crate) enum SecretSlot {
    #[default]
    Empty,
    Pending(Secret),
    Spent(Secret),
}

impl SecretSlot {
    /// Store a new pending secret, wiping whatever was held before
    pub fn replace(&mut self, secret: Secret) {
        self.wipe_held();
        *self = Self::Pending(secret);
    }

    pub fn pending(&self) -> Option<&Secret> {
        match self {
            Self::Pending(secret) => Some(secret),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    /// Wipe the pending secret after it was transmitted
    pub fn erase(&mut self) {
        if let Self::Pending(mut secret) = std::mem::take(self) {
            secret.wipe();
            *self = Self::Spent(secret);
        }
    }

    /// The wiped buffer of the last transmitted secret
    #[cfg(test)]
    pub fn spent(&self) -> Option<&Secret> {
        match self {
            Self::Spent(secret) => Some(secret),
            _ => None,
        }
    }

    fn wipe_held(&mut self) {
        match self {
            Self::Pending(secret) | Self::Spent(secret) => secret.wipe(),
            Self::Empty => {}
        }
    }
}
