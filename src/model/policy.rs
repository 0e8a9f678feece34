/// Conditions under which the hardware lets a private key be used.
///
/// Attached once at generation and evaluated by the key store on every
/// signing attempt; never re-checked or relaxed by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AccessPolicy {
    /// Usable only while the device is unlocked
    #[default]
    UnlockedDevice,
    /// Usable only while unlocked and after the currently enrolled
    /// user-presence set (biometry, touch) confirms the operation
    UnlockedDeviceWithPresence,
}

impl AccessPolicy {
    pub fn requires_user_presence(self) -> bool {
        matches!(self, AccessPolicy::UnlockedDeviceWithPresence)
    }

    #[cfg(feature = "piv")]
    pub fn to_yubikey_pin_policy(self) -> yubikey::PinPolicy {
        yubikey::PinPolicy::Once
    }

    #[cfg(feature = "piv")]
    pub fn to_yubikey_touch_policy(self) -> yubikey::TouchPolicy {
        match self {
            AccessPolicy::UnlockedDevice => yubikey::TouchPolicy::Never,
            AccessPolicy::UnlockedDeviceWithPresence => yubikey::TouchPolicy::Always,
        }
    }
}
