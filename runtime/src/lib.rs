//! # confpass runtime
//!
//! The [`Store`](store::Store) owns the state, runs the reducer and executes
//! the effects it returns.
//!
//! Event handling is serialized: `send` holds the dispatch lock until the
//! action, every effect it produced and every action fed back by those
//! effects have been processed. A draft autosave therefore completes before
//! the next keystroke is reduced.
//!
//! ## Example
//!
//! ```ignore
//! use confpass_runtime::Store;
//!
//! let store = Store::new(initial_state, my_reducer, environment);
//! store.send(Action::DoSomething).await?;
//! let value = store.state(|s| s.some_field.clone()).await;
//! ```

use confpass_core::{effect::Effect, reducer::Reducer};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

pub use error::StoreError;
pub use store::Store;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum StoreError {
        /// Store was closed and no longer accepts actions
        ///
        /// Returned by `send()` after `close()` has been called.
        #[error("Store is closed")]
        Closed,
    }
}

/// Store module - the runtime for reducers
pub mod store {
    use super::{
        Arc, AtomicBool, BoxFuture, Effect, Mutex, Ordering, Reducer, RwLock, StoreError,
    };
    use tokio::sync::broadcast;

    /// Default number of buffered actions on the observer channel
    const DEFAULT_BROADCAST_CAPACITY: usize = 64;

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock` so readers can inspect it between actions)
    /// 2. Reducer (business logic)
    /// 3. Environment (injected dependencies)
    /// 4. Effect execution, in order, with feedback into the reducer
    ///
    /// # Type Parameters
    ///
    /// - `S`: State type
    /// - `A`: Action type
    /// - `E`: Environment type
    /// - `R`: Reducer implementation
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: R,
        environment: E,
        dispatch: Mutex<()>,
        closed: AtomicBool,
        /// Actions produced by effects are published here for observers.
        action_broadcast: broadcast::Sender<A>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync,
        A: Send + Clone + std::fmt::Debug + 'static,
        S: Send + Sync,
        E: Send + Sync,
    {
        /// Create a new store with initial state, reducer, and environment
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_broadcast_capacity(
                initial_state,
                reducer,
                environment,
                DEFAULT_BROADCAST_CAPACITY,
            )
        }

        /// Create a new Store with custom action broadcast capacity
        ///
        /// Observers that lag further than `capacity` actions behind miss the
        /// oldest ones.
        #[must_use]
        pub fn with_broadcast_capacity(
            initial_state: S,
            reducer: R,
            environment: E,
            capacity: usize,
        ) -> Self {
            let (action_broadcast, _) = broadcast::channel(capacity.max(1));

            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer,
                environment,
                dispatch: Mutex::new(()),
                closed: AtomicBool::new(false),
                action_broadcast,
            }
        }

        /// Send an action to the store
        ///
        /// Returns once the action, its effects and all feedback actions
        /// have been processed.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::Closed`] if the store has been closed.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<(), StoreError> {
            if self.closed.load(Ordering::Acquire) {
                tracing::warn!(?action, "Rejected action: store is closed");
                metrics::counter!("store.closed.rejected_actions").increment(1);
                return Err(StoreError::Closed);
            }

            let _serial = self.dispatch.lock().await;
            self.process(action).await;
            Ok(())
        }

        /// Stop accepting actions
        ///
        /// Actions already being processed run to completion.
        pub fn close(&self) {
            self.closed.store(true, Ordering::Release);
            tracing::debug!("Store closed");
        }

        /// Whether [`close`](Self::close) has been called
        #[must_use]
        pub fn is_closed(&self) -> bool {
            self.closed.load(Ordering::Acquire)
        }

        /// Subscribe to actions produced by effects
        ///
        /// Only feedback actions are broadcast, not the ones passed to
        /// [`send`](Self::send).
        #[must_use]
        pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
            self.action_broadcast.subscribe()
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let view = store.state(|s| s.view).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&*state)
        }

        /// Reduce one action and run its effects
        fn process(&self, action: A) -> BoxFuture<'_, ()> {
            Box::pin(async move {
                metrics::counter!("store.actions.total").increment(1);
                tracing::trace!(?action, "Processing action");

                let effects = {
                    let mut state = self.state.write().await;
                    let span = tracing::debug_span!("reducer_execution");
                    let _enter = span.enter();
                    self.reducer.reduce(&mut *state, action, &self.environment)
                };

                tracing::trace!("Reducer returned {} effects", effects.len());
                for effect in effects {
                    self.execute_effect(effect).await;
                }
            })
        }

        /// Execute an effect, feeding any produced action back in
        fn execute_effect(&self, effect: Effect<A>) -> BoxFuture<'_, ()> {
            Box::pin(async move {
                match effect {
                    Effect::None => {
                        metrics::counter!("store.effects.executed", "type" => "none").increment(1);
                    },
                    Effect::Future(fut) => {
                        metrics::counter!("store.effects.executed", "type" => "future")
                            .increment(1);
                        if let Some(action) = fut.await {
                            tracing::trace!("Effect::Future produced an action, feeding back");
                            // No receivers is fine: observers are optional
                            let _ = self.action_broadcast.send(action.clone());
                            self.process(action).await;
                        }
                    },
                    Effect::Parallel(effects) => {
                        metrics::counter!("store.effects.executed", "type" => "parallel")
                            .increment(1);
                        for effect in effects {
                            self.execute_effect(effect).await;
                        }
                    },
                    Effect::Sequential(effects) => {
                        metrics::counter!("store.effects.executed", "type" => "sequential")
                            .increment(1);
                        for effect in effects {
                            self.execute_effect(effect).await;
                        }
                    },
                }
            })
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect

    use super::*;
    use confpass_core::{smallvec, SmallVec};

    #[derive(Debug, Clone, PartialEq)]
    enum TestAction {
        Increment,
        IncrementTwiceViaEffect,
        Incremented,
    }

    #[derive(Debug, Default)]
    struct TestState {
        count: u32,
        log: Vec<&'static str>,
    }

    struct TestReducer;

    impl Reducer for TestReducer {
        type State = TestState;
        type Action = TestAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut TestState,
            action: TestAction,
            _env: &(),
        ) -> SmallVec<[Effect<TestAction>; 4]> {
            match action {
                TestAction::Increment => {
                    state.count += 1;
                    state.log.push("increment");
                    SmallVec::new()
                },
                TestAction::IncrementTwiceViaEffect => {
                    state.log.push("request");
                    smallvec![Effect::chain(vec![
                        Effect::future(async { Some(TestAction::Incremented) }),
                        Effect::future(async { Some(TestAction::Incremented) }),
                    ])]
                },
                TestAction::Incremented => {
                    state.count += 1;
                    state.log.push("incremented");
                    SmallVec::new()
                },
            }
        }
    }

    #[tokio::test]
    async fn send_applies_action() {
        let store = Store::new(TestState::default(), TestReducer, ());
        store.send(TestAction::Increment).await.unwrap();
        assert_eq!(store.state(|s| s.count).await, 1);
    }

    #[tokio::test]
    async fn feedback_actions_complete_before_send_returns() {
        let store = Store::new(TestState::default(), TestReducer, ());
        store.send(TestAction::IncrementTwiceViaEffect).await.unwrap();

        assert_eq!(store.state(|s| s.count).await, 2);
        assert_eq!(
            store.state(|s| s.log.clone()).await,
            vec!["request", "incremented", "incremented"]
        );
    }

    #[tokio::test]
    async fn feedback_actions_are_broadcast() {
        let store = Store::new(TestState::default(), TestReducer, ());
        let mut rx = store.subscribe_actions();

        store.send(TestAction::IncrementTwiceViaEffect).await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), TestAction::Incremented);
        assert_eq!(rx.recv().await.unwrap(), TestAction::Incremented);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn closed_store_rejects_actions() {
        let store = Store::new(TestState::default(), TestReducer, ());
        store.close();

        assert!(store.is_closed());
        assert_eq!(store.send(TestAction::Increment).await, Err(StoreError::Closed));
        assert_eq!(store.state(|s| s.count).await, 0);
    }
}
