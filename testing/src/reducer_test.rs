//! Given-When-Then harness for reducers
//!
//! A test names a starting state and optional history (Given), the one
//! action under test (When), and checks on what it produced (Then).
//! Reducers are pure, so no runtime is involved.

#![allow(clippy::module_name_repetitions)]

use confpass_core::{effect::Effect, reducer::Reducer, SmallVec};

type StateCheck<S> = Box<dyn FnOnce(&S)>;
type EffectCheck<A> = Box<dyn FnOnce(&[Effect<A>])>;

/// Builder for a single reducer scenario
///
/// Effects returned while replaying `given_actions` are dropped; only the
/// `when_action` effects are handed to `then_effects`.
pub struct ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    reducer: R,
    env: Option<E>,
    state: Option<S>,
    history: Vec<A>,
    action: Option<A>,
    state_checks: Vec<StateCheck<S>>,
    effect_checks: Vec<EffectCheck<A>>,
}

impl<R, S, A, E> ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    /// Starts a scenario for `reducer`
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            env: None,
            state: None,
            history: Vec::new(),
            action: None,
            state_checks: Vec::new(),
            effect_checks: Vec::new(),
        }
    }

    /// Environment handed to every reduce call
    #[must_use]
    pub fn with_env(self, env: E) -> Self {
        Self { env: Some(env), ..self }
    }

    /// Given: the state before any action
    #[must_use]
    pub fn given_state(self, state: S) -> Self {
        Self { state: Some(state), ..self }
    }

    /// Given: actions replayed in order before the one under test
    #[must_use]
    pub fn given_actions(mut self, actions: impl IntoIterator<Item = A>) -> Self {
        self.history.extend(actions);
        self
    }

    /// When: the action under test
    #[must_use]
    pub fn when_action(self, action: A) -> Self {
        Self { action: Some(action), ..self }
    }

    /// Then: a check on the final state
    #[must_use]
    pub fn then_state(mut self, check: impl FnOnce(&S) + 'static) -> Self {
        self.state_checks.push(Box::new(check));
        self
    }

    /// Then: a check on the effects of the action under test
    #[must_use]
    pub fn then_effects(mut self, check: impl FnOnce(&[Effect<A>]) + 'static) -> Self {
        self.effect_checks.push(Box::new(check));
        self
    }

    /// Replays the history, reduces the action and runs every check
    ///
    /// # Panics
    ///
    /// Panics when `given_state`, `with_env` or `when_action` was skipped,
    /// or when a check fails.
    #[allow(clippy::panic)]
    pub fn run(self) {
        let Self {
            reducer,
            env,
            state,
            history,
            action,
            state_checks,
            effect_checks,
        } = self;

        let (Some(mut state), Some(env), Some(action)) = (state, env, action) else {
            panic!("a scenario needs given_state, with_env and when_action");
        };

        for earlier in history {
            let _ = reducer.reduce(&mut state, earlier, &env);
        }
        let effects: SmallVec<[Effect<A>; 4]> = reducer.reduce(&mut state, action, &env);

        state_checks.into_iter().for_each(|check| check(&state));
        effect_checks.into_iter().for_each(|check| check(&effects));
    }
}

/// Checks for use with `then_effects`
pub mod assertions {
    use confpass_core::effect::Effect;

    /// Nothing to run: an empty list or a lone `Effect::None`
    ///
    /// # Panics
    ///
    /// Panics when any real effect was returned.
    pub fn assert_no_effects<A: std::fmt::Debug>(effects: &[Effect<A>]) {
        let idle = matches!(effects, [] | [Effect::None]);
        assert!(idle, "expected no effects, got {effects:?}");
    }

    /// Exactly `expected` effects
    ///
    /// # Panics
    ///
    /// Panics on any other count.
    pub fn assert_effects_count<A>(effects: &[Effect<A>], expected: usize) {
        assert_eq!(effects.len(), expected, "wrong number of effects");
    }

    /// At least one top-level `Effect::Future`
    ///
    /// # Panics
    ///
    /// Panics when none of the effects is a future.
    pub fn assert_has_future_effect<A>(effects: &[Effect<A>]) {
        let found = effects.iter().any(|effect| matches!(effect, Effect::Future(_)));
        assert!(found, "expected a future effect");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use confpass_core::smallvec;

    #[derive(Debug, Default)]
    struct Draft {
        text: String,
        saved: bool,
    }

    #[derive(Debug)]
    enum Edit {
        Type(char),
        Backspace,
        Save,
    }

    struct Editor;

    impl Reducer for Editor {
        type State = Draft;
        type Action = Edit;
        type Environment = ();

        fn reduce(&self, draft: &mut Draft, edit: Edit, _env: &()) -> SmallVec<[Effect<Edit>; 4]> {
            match edit {
                Edit::Type(c) => {
                    draft.text.push(c);
                    SmallVec::new()
                },
                Edit::Backspace => {
                    draft.text.pop();
                    smallvec![Effect::None]
                },
                Edit::Save => {
                    draft.saved = true;
                    smallvec![Effect::future(async { None })]
                },
            }
        }
    }

    #[test]
    fn typing_updates_state_without_effects() {
        ReducerTest::new(Editor)
            .with_env(())
            .given_state(Draft::default())
            .when_action(Edit::Type('a'))
            .then_state(|draft| assert_eq!(draft.text, "a"))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn history_is_replayed_before_the_action() {
        ReducerTest::new(Editor)
            .with_env(())
            .given_state(Draft::default())
            .given_actions([Edit::Type('o'), Edit::Type('k'), Edit::Save])
            .when_action(Edit::Backspace)
            .then_state(|draft| {
                assert_eq!(draft.text, "o");
                assert!(draft.saved);
            })
            // the Save future from the history is not reported
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn save_returns_one_future() {
        ReducerTest::new(Editor)
            .with_env(())
            .given_state(Draft::default())
            .when_action(Edit::Save)
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    #[should_panic(expected = "needs given_state")]
    fn missing_action_panics() {
        ReducerTest::new(Editor).with_env(()).given_state(Draft::default()).run();
    }
}
