use crate::error::PolicyError;

/// User-presence check (biometric prompt, touch) performed before a key
/// guarded by [`AccessPolicy::UnlockedDeviceWithPresence`] is used.
///
/// Blocks until the user or the platform decides.
///
/// [`AccessPolicy::UnlockedDeviceWithPresence`]: crate::model::AccessPolicy::UnlockedDeviceWithPresence
pub trait PresenceVerifier: Send + Sync {
    fn confirm_presence(&self, reason: &str) -> Result<(), PolicyError>;
}

impl<F> PresenceVerifier for F
where
    F: Fn(&str) -> Result<(), PolicyError> + Send + Sync,
{
    fn confirm_presence(&self, reason: &str) -> Result<(), PolicyError> {
        self(reason)
    }
}

/// Confirms every request
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfirmPresence;

impl PresenceVerifier for ConfirmPresence {
    fn confirm_presence(&self, _reason: &str) -> Result<(), PolicyError> {
        Ok(())
    }
}
