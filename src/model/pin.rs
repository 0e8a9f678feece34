//! PIV PIN used by the YubiKey backend to satisfy the "device unlocked" policy

use std::fmt;
use thiserror::Error;

#[derive(Clone, PartialEq, Eq)]
pub struct Pin(Vec<u8>);

impl Pin {
    pub const MIN_LENGTH: usize = 6;

    pub const MAX_LENGTH: usize = 8;

    pub fn new(pin: Vec<u8>) -> Result<Self, PinError> {
        if pin.len() < Self::MIN_LENGTH {
            return Err(PinError::TooShort);
        }
        if pin.len() > Self::MAX_LENGTH {
            return Err(PinError::TooLong);
        }
        Ok(Self(pin))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::str::FromStr for Pin {
    type Err = PinError;

    fn from_str(pin: &str) -> Result<Self, Self::Err> {
        Self::new(pin.as_bytes().to_vec())
    }
}

impl fmt::Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pin([REDACTED])")
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinError {
    #[error("PIN must be at least {min} characters", min = Pin::MIN_LENGTH)]
    TooShort,

    #[error("PIN must be at most {max} characters", max = Pin::MAX_LENGTH)]
    TooLong,
}
