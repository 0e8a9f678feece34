use thiserror::Error;

/// PIV key slot a tag can be bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Authentication,
    Signature,
    KeyManagement,
    CardAuthentication,
}

impl Slot {
    pub fn default_signing() -> Self {
        Self::Signature
    }

    #[cfg(feature = "piv")]
    pub fn to_yubikey_slot_id(self) -> yubikey::piv::SlotId {
        match self {
            Slot::Authentication => yubikey::piv::SlotId::Authentication,
            Slot::Signature => yubikey::piv::SlotId::Signature,
            Slot::KeyManagement => yubikey::piv::SlotId::KeyManagement,
            Slot::CardAuthentication => yubikey::piv::SlotId::CardAuthentication,
        }
    }
}

impl std::str::FromStr for Slot {
    type Err = SlotError;

    /// Accepts slot names or their PIV hex identifiers (`9a`, `9c`, `9d`, `9e`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "authentication" | "9a" => Ok(Slot::Authentication),
            "signature" | "9c" => Ok(Slot::Signature),
            "key-management" | "9d" => Ok(Slot::KeyManagement),
            "card-authentication" | "9e" => Ok(Slot::CardAuthentication),
            _ => Err(SlotError::Unsupported {
                slot: s.to_string(),
            }),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlotError {
    #[error("Slot not supported: {slot}")]
    Unsupported { slot: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "piv")]
    #[test]
    fn test_slot_conversion() {
        let slot = Slot::Signature;
        assert_eq!(slot.to_yubikey_slot_id(), yubikey::piv::SlotId::Signature);
    }

    #[test]
    fn test_slot_from_str() {
        assert_eq!("9c".parse::<Slot>().unwrap(), Slot::Signature);
        assert_eq!("Authentication".parse::<Slot>().unwrap(), Slot::Authentication);
    }

    #[test]
    fn test_default_signing_slot() {
        assert_eq!(Slot::default_signing(), Slot::Signature);
    }

    #[test]
    fn test_slot_error_display() {
        let err = "retired-1".parse::<Slot>().unwrap_err();
        assert!(err.to_string().contains("not supported"));
    }
}
