//! Reducer for the registration page.
//!
//! Two views: `Form` (initial) and `Ticket` (terminal). The only way from
//! one to the other is a submit that passes validation and has a live
//! avatar handle. Every field edit in the form returns an autosave effect.

use crate::avatar::AvatarLoader;
use crate::barcode::{BarcodeRenderer, SvgSurface};
use crate::draft_store::{DraftStore, KeyValueStorage};
use crate::state::{RegistrationAction, RegistrationState, View};
use crate::ticket::{BarcodeSource, RandomBarcodeSource, TicketError, TicketGenerator};
use crate::types::{AvatarValue, FieldName};
use crate::validation::{FieldError, Validator};
use confpass_core::{
    effect::Effect,
    environment::{Clock, SystemClock},
    reducer::Reducer,
    smallvec, SmallVec,
};
use std::sync::Arc;

/// Environment dependencies for the registration reducer
#[derive(Clone)]
pub struct RegistrationEnvironment {
    /// Autosaved draft slot
    pub drafts: DraftStore,
    /// Avatar picker handling
    pub avatars: AvatarLoader,
    /// Ticket identifiers
    pub barcodes: Arc<dyn BarcodeSource>,
    /// Draws the ticket barcode
    pub renderer: BarcodeRenderer,
    /// Form rules
    pub validator: Validator,
    /// Timestamps for issued tickets
    pub clock: Arc<dyn Clock>,
}

impl RegistrationEnvironment {
    /// Creates an environment from its injected parts
    #[must_use]
    pub fn new(
        storage: Arc<dyn KeyValueStorage>,
        barcodes: Arc<dyn BarcodeSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            drafts: DraftStore::new(storage),
            avatars: AvatarLoader::default(),
            barcodes,
            renderer: BarcodeRenderer::default(),
            validator: Validator::registration(),
            clock,
        }
    }

    /// Random identifiers and wall-clock time over `storage`
    #[must_use]
    pub fn production(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self::new(storage, Arc::new(RandomBarcodeSource), Arc::new(SystemClock))
    }

    /// Replaces the avatar loader, e.g. to share a registry with a test
    #[must_use]
    pub fn with_avatars(mut self, avatars: AvatarLoader) -> Self {
        self.avatars = avatars;
        self
    }
}

/// Reducer for the registration page
#[derive(Clone, Debug, Default)]
pub struct RegistrationReducer;

type Effects = SmallVec<[Effect<RegistrationAction>; 4]>;

impl RegistrationReducer {
    /// Creates a new `RegistrationReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Persists a snapshot of the current draft
    fn autosave(state: &RegistrationState, env: &RegistrationEnvironment) -> Effect<RegistrationAction> {
        let drafts = env.drafts.clone();
        let snapshot = state.draft.clone();
        Effect::future(async move {
            drafts.save(&snapshot);
            None
        })
    }

    /// Re-runs the rules for one field and updates its error
    fn revalidate(state: &mut RegistrationState, env: &RegistrationEnvironment, field: FieldName) {
        match env.validator.validate_field(&state.draft, field) {
            Some(error) => state.errors.insert(field, error),
            None => {
                state.errors.remove(field);
            },
        }
    }

    fn submit(state: &mut RegistrationState, env: &RegistrationEnvironment) {
        state.submitted = true;
        state.alert = None;

        let handle = state.draft.avatar.handle().cloned();

        if let Err(errors) = env.validator.validate(&state.draft) {
            state.errors = errors;
            if handle.is_none() {
                state.alert = Some(TicketError::MissingAvatar.to_string());
            }
            return;
        }
        state.errors.clear();

        let ticket = match TicketGenerator::generate(
            &state.draft,
            handle.as_ref(),
            env.barcodes.as_ref(),
            env.clock.now(),
        ) {
            Ok(ticket) => ticket,
            Err(error @ TicketError::MissingAvatar) => {
                tracing::info!("Submit blocked: avatar only restored from a previous session");
                state.alert = Some(error.to_string());
                return;
            },
            Err(error) => {
                tracing::warn!(%error, "Ticket generation failed after validation passed");
                return;
            },
        };

        // The ticket view mounts here, so its surface is attached
        let mut surface = SvgSurface::attached();
        if let Err(error) = env.renderer.render(ticket.barcode().as_str(), Some(&mut surface)) {
            tracing::warn!(%error, "Barcode could not be rendered");
        }

        state.barcode = Some(surface);
        state.ticket = Some(ticket);
        state.view = View::Ticket;
    }

    fn unmount(state: &mut RegistrationState) {
        // A reload would restore the avatar only as its reference string
        if let AvatarValue::Bound(handle) = &state.draft.avatar {
            state.draft.avatar = AvatarValue::Placeholder(handle.reference().to_string());
        }
        if let Some(surface) = state.barcode.as_mut() {
            surface.detach();
        }
        state.barcode = None;
        state.ticket = None;
        state.alert = None;
        state.errors.clear();
        state.submitted = false;
        state.view = View::Form;
        tracing::debug!("Registration page unmounted, avatar released");
    }
}

impl Reducer for RegistrationReducer {
    type State = RegistrationState;
    type Action = RegistrationAction;
    type Environment = RegistrationEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Effects {
        // The ticket view is terminal: form input is ignored there
        if state.view == View::Ticket
            && matches!(
                action,
                RegistrationAction::Mounted
                    | RegistrationAction::DraftRestored { .. }
                    | RegistrationAction::FieldChanged(_)
                    | RegistrationAction::TierSelected(_)
                    | RegistrationAction::AvatarSelected(_)
                    | RegistrationAction::Submit
            )
        {
            tracing::debug!(?action, "Ignoring form action on the ticket view");
            return SmallVec::new();
        }

        match action {
            RegistrationAction::Mounted => {
                let drafts = env.drafts.clone();
                smallvec![Effect::future(async move {
                    Some(RegistrationAction::DraftRestored {
                        draft: drafts.load(),
                    })
                })]
            },

            RegistrationAction::DraftRestored { draft } => {
                if let Some(draft) = draft {
                    tracing::info!("Restored saved draft");
                    state.draft = draft;
                    state.restored = true;
                }
                SmallVec::new()
            },

            RegistrationAction::FieldChanged(update) => {
                let field = update.field();
                state.draft.apply(update);
                if state.submitted {
                    Self::revalidate(state, env, field);
                }
                smallvec![Self::autosave(state, env)]
            },

            RegistrationAction::TierSelected(tier) => {
                state.draft.ticket_price = Some(tier);
                Self::revalidate(state, env, FieldName::TicketPrice);
                smallvec![Self::autosave(state, env)]
            },

            RegistrationAction::AvatarSelected(file) => match env.avatars.load(file) {
                Ok(None) => SmallVec::new(),
                Ok(Some(handle)) => {
                    // Dropping the previous handle revokes it
                    state.draft.avatar = AvatarValue::Bound(handle);
                    Self::revalidate(state, env, FieldName::Avatar);
                    smallvec![Self::autosave(state, env)]
                },
                Err(error) => {
                    tracing::warn!(%error, "Avatar rejected");
                    state
                        .errors
                        .insert(FieldName::Avatar, FieldError::invalid_format(error.to_string()));
                    SmallVec::new()
                },
            },

            RegistrationAction::Submit => {
                Self::submit(state, env);
                SmallVec::new()
            },

            RegistrationAction::AlertDismissed => {
                state.alert = None;
                SmallVec::new()
            },

            RegistrationAction::Unmounted => {
                Self::unmount(state);
                SmallVec::new()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::avatar::{AvatarRegistry, SelectedFile};
    use crate::draft_store::MemoryStorage;
    use crate::mocks::FixedBarcodeSource;
    use crate::ticket::BarcodeValue;
    use crate::types::{FieldUpdate, FormDraft, PriceTier, TicketQuantity};
    use crate::validation::ErrorKind;
    use confpass_testing::{assertions, test_clock, ReducerTest};

    fn test_env() -> RegistrationEnvironment {
        RegistrationEnvironment::new(
            Arc::new(MemoryStorage::new()),
            Arc::new(FixedBarcodeSource::new(
                BarcodeValue::from_number(123_456_789_012).unwrap(),
            )),
            Arc::new(test_clock()),
        )
    }

    fn env_with_registry(registry: &AvatarRegistry) -> RegistrationEnvironment {
        test_env().with_avatars(AvatarLoader::new(registry.clone()))
    }

    fn portrait() -> SelectedFile {
        SelectedFile::new("ada.png", "image/png", vec![0x89, b'P', b'N', b'G'])
    }

    fn fill_fields() -> Vec<RegistrationAction> {
        vec![
            RegistrationAction::FieldChanged(FieldUpdate::FullName("Ada Lovelace".into())),
            RegistrationAction::FieldChanged(FieldUpdate::Email("ada@example.com".into())),
            RegistrationAction::TierSelected(PriceTier::Regular),
            RegistrationAction::FieldChanged(FieldUpdate::TicketQuantity(
                TicketQuantity::new(3).unwrap(),
            )),
        ]
    }

    fn fill_all() -> Vec<RegistrationAction> {
        let mut actions = fill_fields();
        actions.push(RegistrationAction::AvatarSelected(Some(portrait())));
        actions
    }

    #[test]
    fn mounted_requests_restore() {
        ReducerTest::new(RegistrationReducer::new())
            .with_env(test_env())
            .given_state(RegistrationState::new())
            .when_action(RegistrationAction::Mounted)
            .then_state(|state| assert!(state.is_form()))
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn restored_draft_replaces_fields() {
        let mut saved = FormDraft::new();
        saved.apply(FieldUpdate::FullName("Ada Lovelace".into()));
        saved.avatar = AvatarValue::Placeholder("blob:confpass/old".into());

        ReducerTest::new(RegistrationReducer::new())
            .with_env(test_env())
            .given_state(RegistrationState::new())
            .when_action(RegistrationAction::DraftRestored {
                draft: Some(saved.clone()),
            })
            .then_state(move |state| {
                assert_eq!(state.draft, saved);
                assert!(state.restored);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn missing_draft_keeps_empty_form() {
        ReducerTest::new(RegistrationReducer::new())
            .with_env(test_env())
            .given_state(RegistrationState::new())
            .when_action(RegistrationAction::DraftRestored { draft: None })
            .then_state(|state| {
                assert!(state.draft.is_blank());
                assert!(!state.restored);
            })
            .run();
    }

    #[test]
    fn field_change_autosaves() {
        ReducerTest::new(RegistrationReducer::new())
            .with_env(test_env())
            .given_state(RegistrationState::new())
            .when_action(RegistrationAction::FieldChanged(FieldUpdate::Email(
                "ada@example.com".into(),
            )))
            .then_state(|state| {
                assert_eq!(state.draft.email, "ada@example.com");
                assert!(state.errors.is_empty());
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn edits_revalidate_after_first_submit() {
        ReducerTest::new(RegistrationReducer::new())
            .with_env(test_env())
            .given_state(RegistrationState::new())
            .given_actions([RegistrationAction::Submit])
            .when_action(RegistrationAction::FieldChanged(FieldUpdate::Email(
                "not-an-email".into(),
            )))
            .then_state(|state| {
                let error = state.errors.get(FieldName::Email).unwrap();
                assert_eq!(error.kind, ErrorKind::InvalidFormat);
                // Untouched fields keep their errors from the submit
                assert!(state.errors.contains(FieldName::FullName));
            })
            .run();
    }

    #[test]
    fn tier_selection_clears_its_error() {
        ReducerTest::new(RegistrationReducer::new())
            .with_env(test_env())
            .given_state(RegistrationState::new())
            .given_actions([RegistrationAction::Submit])
            .when_action(RegistrationAction::TierSelected(PriceTier::Vip))
            .then_state(|state| {
                assert_eq!(state.draft.ticket_price, Some(PriceTier::Vip));
                assert!(!state.errors.contains(FieldName::TicketPrice));
            })
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }

    #[test]
    fn dismissed_picker_changes_nothing() {
        ReducerTest::new(RegistrationReducer::new())
            .with_env(test_env())
            .given_state(RegistrationState::new())
            .given_actions([RegistrationAction::AvatarSelected(Some(portrait()))])
            .when_action(RegistrationAction::AvatarSelected(None))
            .then_state(|state| assert!(state.draft.avatar.handle().is_some()))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn replacing_avatar_revokes_previous_handle() {
        let registry = AvatarRegistry::new();
        let observed = registry.clone();

        ReducerTest::new(RegistrationReducer::new())
            .with_env(env_with_registry(&registry))
            .given_state(RegistrationState::new())
            .given_actions([RegistrationAction::AvatarSelected(Some(portrait()))])
            .when_action(RegistrationAction::AvatarSelected(Some(portrait())))
            .then_state(move |state| {
                let handle = state.draft.avatar.handle().unwrap();
                assert!(observed.is_live(handle.reference()));
                assert_eq!(observed.live_count(), 1);
            })
            .run();
    }

    #[test]
    fn non_image_avatar_is_reported() {
        ReducerTest::new(RegistrationReducer::new())
            .with_env(test_env())
            .given_state(RegistrationState::new())
            .when_action(RegistrationAction::AvatarSelected(Some(SelectedFile::new(
                "notes.txt",
                "text/plain",
                vec![b'x'],
            ))))
            .then_state(|state| {
                assert_eq!(state.draft.avatar, AvatarValue::None);
                let error = state.errors.get(FieldName::Avatar).unwrap();
                assert_eq!(error.kind, ErrorKind::InvalidFormat);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn empty_submit_reports_every_field() {
        ReducerTest::new(RegistrationReducer::new())
            .with_env(test_env())
            .given_state(RegistrationState::new())
            .when_action(RegistrationAction::Submit)
            .then_state(|state| {
                assert!(state.is_form());
                assert!(state.ticket.is_none());
                assert_eq!(
                    state.errors.fields().collect::<Vec<_>>(),
                    FieldName::ALL.to_vec()
                );
                assert_eq!(state.alert.as_deref(), Some("Please upload an avatar."));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn missing_name_blocks_only_that_field() {
        let mut actions = fill_all();
        actions.remove(0);

        ReducerTest::new(RegistrationReducer::new())
            .with_env(test_env())
            .given_state(RegistrationState::new())
            .given_actions(actions)
            .when_action(RegistrationAction::Submit)
            .then_state(|state| {
                assert!(state.is_form());
                assert_eq!(
                    state.errors.fields().collect::<Vec<_>>(),
                    vec![FieldName::FullName]
                );
                assert!(state.alert.is_none());
            })
            .run();
    }

    #[test]
    fn valid_submit_issues_ticket() {
        ReducerTest::new(RegistrationReducer::new())
            .with_env(test_env())
            .given_state(RegistrationState::new())
            .given_actions(fill_all())
            .when_action(RegistrationAction::Submit)
            .then_state(|state| {
                assert_eq!(state.view, View::Ticket);
                assert!(state.errors.is_empty());
                assert!(state.alert.is_none());

                let ticket = state.ticket.as_ref().unwrap();
                assert_eq!(ticket.full_name(), "Ada Lovelace");
                assert_eq!(ticket.email(), "ada@example.com");
                assert_eq!(ticket.tier(), PriceTier::Regular);
                assert_eq!(ticket.quantity().get(), 3);
                assert_eq!(ticket.barcode().as_str(), "123456789012");
                assert_eq!(ticket.issued_at(), test_clock().now());

                let svg = state.barcode_markup().unwrap();
                assert!(svg.contains(r#"data-format="CODE128""#));
                assert!(svg.contains(">123456789012</text>"));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn restored_placeholder_alone_triggers_alert() {
        let mut actions = fill_fields();
        actions.insert(
            0,
            RegistrationAction::DraftRestored {
                draft: Some(FormDraft {
                    avatar: AvatarValue::Placeholder("blob:confpass/old".into()),
                    ..FormDraft::default()
                }),
            },
        );

        ReducerTest::new(RegistrationReducer::new())
            .with_env(test_env())
            .given_state(RegistrationState::new())
            .given_actions(actions)
            .when_action(RegistrationAction::Submit)
            .then_state(|state| {
                assert!(state.is_form());
                assert!(state.ticket.is_none());
                assert!(state.errors.is_empty());
                assert_eq!(state.alert.as_deref(), Some("Please upload an avatar."));
            })
            .run();
    }

    #[test]
    fn ticket_view_ignores_form_input() {
        let mut actions = fill_all();
        actions.push(RegistrationAction::Submit);

        ReducerTest::new(RegistrationReducer::new())
            .with_env(test_env())
            .given_state(RegistrationState::new())
            .given_actions(actions)
            .when_action(RegistrationAction::FieldChanged(FieldUpdate::FullName(
                "Someone Else".into(),
            )))
            .then_state(|state| {
                assert_eq!(state.view, View::Ticket);
                assert_eq!(state.draft.full_name, "Ada Lovelace");
                assert_eq!(state.ticket.as_ref().unwrap().full_name(), "Ada Lovelace");
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn second_submit_keeps_first_ticket() {
        let mut actions = fill_all();
        actions.push(RegistrationAction::Submit);

        ReducerTest::new(RegistrationReducer::new())
            .with_env(test_env())
            .given_state(RegistrationState::new())
            .given_actions(actions)
            .when_action(RegistrationAction::Submit)
            .then_state(|state| {
                assert_eq!(state.view, View::Ticket);
                assert!(state.ticket.is_some());
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn alert_can_be_dismissed() {
        ReducerTest::new(RegistrationReducer::new())
            .with_env(test_env())
            .given_state(RegistrationState::new())
            .given_actions([RegistrationAction::Submit])
            .when_action(RegistrationAction::AlertDismissed)
            .then_state(|state| {
                assert!(state.alert.is_none());
                assert!(!state.errors.is_empty());
            })
            .run();
    }

    #[test]
    fn unmount_releases_avatar() {
        let registry = AvatarRegistry::new();
        let observed = registry.clone();
        let mut actions = fill_all();
        actions.push(RegistrationAction::Submit);

        ReducerTest::new(RegistrationReducer::new())
            .with_env(env_with_registry(&registry))
            .given_state(RegistrationState::new())
            .given_actions(actions)
            .when_action(RegistrationAction::Unmounted)
            .then_state(move |state| {
                assert_eq!(observed.live_count(), 0);
                assert!(state.ticket.is_none());
                assert!(state.barcode.is_none());
                assert!(matches!(state.draft.avatar, AvatarValue::Placeholder(_)));
            })
            .run();
    }
}
