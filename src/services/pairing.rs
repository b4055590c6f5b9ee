//! Pairing-code issuance and the device claim protocol.
//!
//! Codes are five zero-padded digits. A code only has to be unique among
//! controllers that nobody has claimed yet; once a controller is claimed
//! its code returns to the pool for new registrations.

use rand::Rng;
use thiserror::Error;

use crate::db::Store;
use crate::entities::{controllers, user_controllers};

pub const CODE_LENGTH: usize = 5;

const CODE_SPACE: u32 = 100_000;
const MAX_GENERATION_ATTEMPTS: u32 = 20;

/// Errors specific to claiming a controller.
#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("Pairing code must be exactly {CODE_LENGTH} digits")]
    MalformedCode,

    #[error("No controller matches that pairing code")]
    UnknownCode,

    #[error("Controller is already claimed by this account")]
    AlreadyClaimed,

    #[error("Database error: {0}")]
    Database(String),
}

impl From<anyhow::Error> for ClaimError {
    fn from(err: anyhow::Error) -> Self {
        // The unique (user_id, controller_id) index is the final arbiter
        // when two claims race past the application-level check.
        if format!("{err:#}").contains("UNIQUE constraint") {
            Self::AlreadyClaimed
        } else {
            Self::Database(err.to_string())
        }
    }
}

/// True iff `code` is exactly five ASCII digits.
#[must_use]
pub fn is_valid_code(code: &str) -> bool {
    code.len() == CODE_LENGTH && code.bytes().all(|b| b.is_ascii_digit())
}

pub struct PairingService {
    store: Store,
}

impl PairingService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    /// Issues a code not currently held by any unclaimed controller.
    ///
    /// The in-use check is a fast path, not a guarantee; the retry cap
    /// keeps a pathologically full codespace from looping forever.
    pub async fn generate_code(&self) -> anyhow::Result<String> {
        for _ in 0..MAX_GENERATION_ATTEMPTS {
            let candidate = format!("{:05}", rand::rng().random_range(0..CODE_SPACE));
            if !self.store.pairing_code_in_use(&candidate).await? {
                return Ok(candidate);
            }
        }

        anyhow::bail!(
            "Could not find a free pairing code after {} attempts",
            MAX_GENERATION_ATTEMPTS
        )
    }

    /// Redeems `code` for `user_id`, creating an ownership assignment.
    ///
    /// Format is checked before any lookup so malformed input never
    /// touches the store. Unknown codes report not-found uniformly.
    /// Several distinct users may claim the same controller; a repeat
    /// claim by the same user is a conflict.
    pub async fn claim(
        &self,
        user_id: i32,
        code: &str,
        label: Option<&str>,
    ) -> Result<(controllers::Model, user_controllers::Model), ClaimError> {
        if !is_valid_code(code) {
            return Err(ClaimError::MalformedCode);
        }

        let matches = self.store.find_controllers_by_code(code).await?;

        // Unclaimed controllers sort first, so a recycled code on a fresh
        // registration wins over a re-claim of an already shared device.
        let Some((controller, _claimed)) = matches.into_iter().next() else {
            return Err(ClaimError::UnknownCode);
        };

        let assignment = self
            .store
            .assign_controller(user_id, controller.id, label)
            .await?;

        Ok((controller, assignment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_codes() {
        assert!(is_valid_code("00000"));
        assert!(is_valid_code("12345"));
        assert!(is_valid_code("99999"));
    }

    #[test]
    fn test_invalid_codes() {
        assert!(!is_valid_code(""));
        assert!(!is_valid_code("12"));
        assert!(!is_valid_code("123456"));
        assert!(!is_valid_code("abcde"));
        assert!(!is_valid_code("1234a"));
        assert!(!is_valid_code(" 1234"));
        assert!(!is_valid_code("１２３４５"));
    }
}
