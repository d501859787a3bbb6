//! Conference ticket registration
//!
//! A single-page registration flow built on the confpass reducer runtime:
//!
//! - **Draft Store**: autosaves the in-progress form under one storage key
//!   and restores it on mount
//! - **Validator**: declarative per-field rules checked on submit
//! - **Avatar Loader**: turns a picked image into a revocable handle
//! - **Ticket Generator**: issues an immutable ticket with a random 12-digit identifier
//! - **Barcode Renderer**: draws the identifier as a Code 128 SVG
//! - **View Controller**: the [`RegistrationReducer`], moving Form → Ticket
//!
//! # Architecture
//!
//! ```text
//!  FieldChanged ─┬─► draft ──► autosave effect ──► KeyValueStorage
//!                │
//!  AvatarSelected ─► AvatarLoader ──► AvatarHandle
//!                │
//!  Submit ───────┴─► Validator ─► TicketGenerator ─► BarcodeRenderer ─► Ticket view
//! ```
//!
//! The Ticket view is terminal for the session. There is no way back to
//! the form short of remounting.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod avatar;
pub mod barcode;
pub mod config;
pub mod draft_store;
pub mod mocks;
pub mod reducer;
pub mod session;
pub mod state;
pub mod ticket;
pub mod types;
pub mod validation;
pub mod view;

pub use avatar::{AvatarError, AvatarHandle, AvatarLoader, AvatarRegistry, SelectedFile};
pub use barcode::{BarcodeError, BarcodeRenderer, BarcodeStyle, Code128, SvgSurface};
pub use config::{Config, ConfigError};
pub use draft_store::{DraftStore, FileStorage, KeyValueStorage, MemoryStorage, StorageError};
pub use reducer::{RegistrationEnvironment, RegistrationReducer};
pub use session::{SessionError, SessionScript};
pub use state::{RegistrationAction, RegistrationState, View};
pub use ticket::{BarcodeSource, BarcodeValue, RandomBarcodeSource, Ticket, TicketError, TicketGenerator};
pub use types::{AvatarValue, FieldName, FieldUpdate, FormDraft, PriceTier, TicketQuantity};
pub use validation::{ValidationErrors, Validator};

/// The registration page's store
pub type RegistrationStore = confpass_runtime::Store<
    RegistrationState,
    RegistrationAction,
    RegistrationEnvironment,
    RegistrationReducer,
>;

/// Creates a store showing the empty form
#[must_use]
pub fn registration_store(environment: RegistrationEnvironment) -> RegistrationStore {
    confpass_runtime::Store::new(RegistrationState::new(), RegistrationReducer::new(), environment)
}
