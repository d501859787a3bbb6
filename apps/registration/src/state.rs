//! View-controller state and actions.

use crate::avatar::SelectedFile;
use crate::barcode::SvgSurface;
use crate::ticket::Ticket;
use crate::types::{FieldUpdate, FormDraft, PriceTier};
use crate::validation::ValidationErrors;

/// Which of the two mutually exclusive views is showing
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum View {
    /// The registration form (initial)
    #[default]
    Form,
    /// The issued ticket (terminal for the session)
    Ticket,
}

/// State of the registration page
#[derive(Clone, Debug, Default)]
pub struct RegistrationState {
    /// Current view
    pub view: View,
    /// Field values, mirrored into the draft store
    pub draft: FormDraft,
    /// Errors from the last validation pass
    pub errors: ValidationErrors,
    /// Blocking alert waiting to be dismissed
    pub alert: Option<String>,
    /// Issued ticket, once the view is `Ticket`
    pub ticket: Option<Ticket>,
    /// Barcode drawing surface, attached while the ticket view is mounted
    pub barcode: Option<SvgSurface>,
    /// Set after the first submit; field edits re-validate from then on
    pub submitted: bool,
    /// Whether a saved draft was restored on mount
    pub restored: bool,
}

impl RegistrationState {
    /// Initial state: empty form
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True while the form is showing
    #[must_use]
    pub fn is_form(&self) -> bool {
        self.view == View::Form
    }

    /// Rendered barcode SVG, if any
    #[must_use]
    pub fn barcode_markup(&self) -> Option<&str> {
        self.barcode.as_ref().and_then(SvgSurface::markup)
    }
}

/// Everything that can happen on the registration page
#[derive(Clone, Debug)]
pub enum RegistrationAction {
    /// The page mounted; restore any saved draft
    Mounted,

    /// Result of the restore started by `Mounted`
    DraftRestored {
        /// Saved draft, `None` if there was none or it was unreadable
        draft: Option<FormDraft>,
    },

    /// A text or select field changed
    FieldChanged(FieldUpdate),

    /// A tier button was clicked
    TierSelected(PriceTier),

    /// The avatar picker changed; `None` when dismissed without a file
    AvatarSelected(Option<SelectedFile>),

    /// The form was submitted
    Submit,

    /// The alert was acknowledged
    AlertDismissed,

    /// The page is being torn down; release held resources
    Unmounted,
}
