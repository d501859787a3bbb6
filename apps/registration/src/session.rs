//! Scripted registration sessions.
//!
//! A session script is a JSON list of interactions replayed against a
//! [`RegistrationStore`](crate::RegistrationStore):
//!
//! ```json
//! {
//!   "steps": [
//!     { "fullName": "Ada Lovelace" },
//!     { "email": "ada@example.com" },
//!     { "tier": "$75 - Regular" },
//!     { "quantity": 3 },
//!     { "avatar": "ada.png" },
//!     "submit"
//!   ]
//! }
//! ```
//!
//! Avatar paths are resolved relative to the script's directory.

use crate::avatar::SelectedFile;
use crate::state::RegistrationAction;
use crate::types::{FieldUpdate, PriceTier, TicketQuantity};
use crate::RegistrationStore;
use confpass_runtime::StoreError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A 1×1 PNG used as the built-in scenario's avatar
const SAMPLE_AVATAR_PNG: [u8; 70] = [
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f,
    0x15, 0xc4, 0x89, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x44, 0x41, 0x54, 0x78, 0xda, 0x63, 0x64,
    0x60, 0xf8, 0x5f, 0x0f, 0x00, 0x02, 0x87, 0x01, 0x80, 0xeb, 0x47, 0xba, 0x92, 0x00, 0x00,
    0x00, 0x00, 0x49, 0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

/// Failures loading or replaying a session
#[derive(Error, Debug)]
pub enum SessionError {
    /// The script or an avatar file could not be read
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// File being read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The script is not valid JSON for a session
    #[error("invalid session script: {0}")]
    Parse(#[from] serde_json::Error),

    /// The store stopped accepting actions
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One user interaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionStep {
    /// Type into the full name field
    FullName(String),
    /// Type into the email field
    Email(String),
    /// Click a tier button
    Tier(PriceTier),
    /// Pick a quantity
    Quantity(TicketQuantity),
    /// Choose an avatar file; `null` dismisses the picker
    Avatar(Option<PathBuf>),
    /// Submit the form
    Submit,
    /// Acknowledge the alert
    DismissAlert,
}

/// A sequence of interactions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionScript {
    /// Interactions in order
    pub steps: Vec<SessionStep>,
}

impl SessionScript {
    /// Parses a script from JSON text
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Parse`] for malformed scripts, including unknown
    /// tiers and quantities outside 1..=10.
    pub fn from_json(json: &str) -> Result<Self, SessionError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a script file
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> Result<Self, SessionError> {
        let json = std::fs::read_to_string(path).map_err(|source| SessionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Converts the steps to actions, reading avatar files relative to `base_dir`
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`] if an avatar file cannot be read.
    pub fn actions(&self, base_dir: &Path) -> Result<Vec<RegistrationAction>, SessionError> {
        self.steps
            .iter()
            .map(|step| step.to_action(base_dir))
            .collect()
    }
}

impl SessionStep {
    fn to_action(&self, base_dir: &Path) -> Result<RegistrationAction, SessionError> {
        Ok(match self {
            Self::FullName(name) => {
                RegistrationAction::FieldChanged(FieldUpdate::FullName(name.clone()))
            },
            Self::Email(email) => RegistrationAction::FieldChanged(FieldUpdate::Email(email.clone())),
            Self::Tier(tier) => RegistrationAction::TierSelected(*tier),
            Self::Quantity(quantity) => {
                RegistrationAction::FieldChanged(FieldUpdate::TicketQuantity(*quantity))
            },
            Self::Avatar(None) => RegistrationAction::AvatarSelected(None),
            Self::Avatar(Some(path)) => {
                let path = base_dir.join(path);
                let file = SelectedFile::from_path(&path)
                    .map_err(|source| SessionError::Io { path, source })?;
                RegistrationAction::AvatarSelected(Some(file))
            },
            Self::Submit => RegistrationAction::Submit,
            Self::DismissAlert => RegistrationAction::AlertDismissed,
        })
    }
}

/// The Ada Lovelace scenario: a complete, valid registration
#[must_use]
pub fn builtin_scenario() -> Vec<RegistrationAction> {
    vec![
        RegistrationAction::FieldChanged(FieldUpdate::FullName("Ada Lovelace".to_string())),
        RegistrationAction::FieldChanged(FieldUpdate::Email("ada@example.com".to_string())),
        RegistrationAction::TierSelected(PriceTier::Regular),
        RegistrationAction::FieldChanged(FieldUpdate::TicketQuantity(TicketQuantity::saturating(3))),
        RegistrationAction::AvatarSelected(Some(SelectedFile::new(
            "ada.png",
            "image/png",
            SAMPLE_AVATAR_PNG.to_vec(),
        ))),
        RegistrationAction::Submit,
    ]
}

/// Mounts the page, then sends `actions` in order
///
/// # Errors
///
/// Returns [`SessionError::Store`] if the store was closed.
#[tracing::instrument(skip_all, fields(actions = actions.len()))]
pub async fn replay(
    store: &RegistrationStore,
    actions: Vec<RegistrationAction>,
) -> Result<(), SessionError> {
    store.send(RegistrationAction::Mounted).await?;
    for action in actions {
        store.send(action).await?;
    }
    tracing::debug!("Session replayed");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use std::io::Write;

    #[test]
    fn parses_script() {
        let script = SessionScript::from_json(
            r#"{"steps": [
                {"fullName": "Ada Lovelace"},
                {"email": "ada@example.com"},
                {"tier": "$100 - VIP"},
                {"quantity": 2},
                {"avatar": null},
                "submit",
                "dismissAlert"
            ]}"#,
        )
        .unwrap();

        assert_eq!(
            script.steps,
            vec![
                SessionStep::FullName("Ada Lovelace".into()),
                SessionStep::Email("ada@example.com".into()),
                SessionStep::Tier(PriceTier::Vip),
                SessionStep::Quantity(TicketQuantity::new(2).unwrap()),
                SessionStep::Avatar(None),
                SessionStep::Submit,
                SessionStep::DismissAlert,
            ]
        );
    }

    #[test]
    fn rejects_out_of_range_quantity() {
        let err = SessionScript::from_json(r#"{"steps": [{"quantity": 11}]}"#).unwrap_err();
        assert!(matches!(err, SessionError::Parse(_)));
    }

    #[test]
    fn rejects_unknown_tier() {
        let err = SessionScript::from_json(r#"{"steps": [{"tier": "$5 - Student"}]}"#).unwrap_err();
        assert!(matches!(err, SessionError::Parse(_)));
    }

    #[test]
    fn reads_avatar_relative_to_script() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut file = std::fs::File::create(dir.path().join("me.png")).expect("create");
        file.write_all(&SAMPLE_AVATAR_PNG).expect("write");

        let script = SessionScript {
            steps: vec![SessionStep::Avatar(Some(PathBuf::from("me.png")))],
        };
        let actions = script.actions(dir.path()).unwrap();

        let RegistrationAction::AvatarSelected(Some(selected)) = &actions[0] else {
            panic!("expected an avatar selection, got {actions:?}");
        };
        assert_eq!(selected.content_type, "image/png");
        assert_eq!(selected.bytes.len(), SAMPLE_AVATAR_PNG.len());
    }

    #[test]
    fn missing_avatar_file_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let script = SessionScript {
            steps: vec![SessionStep::Avatar(Some(PathBuf::from("nope.png")))],
        };
        assert!(matches!(
            script.actions(dir.path()),
            Err(SessionError::Io { .. })
        ));
    }

    #[test]
    fn builtin_scenario_ends_with_submit() {
        let actions = builtin_scenario();
        assert_eq!(actions.len(), 6);
        assert!(matches!(actions.last(), Some(RegistrationAction::Submit)));
    }
}
