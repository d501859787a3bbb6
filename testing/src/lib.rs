//! # confpass testing
//!
//! Testing utilities for reducers built on `confpass-core`:
//! - [`ReducerTest`], a Given-When-Then harness
//! - [`assertions`] over returned effects
//! - [`mocks`] for environment traits
//!
//! ## Example
//!
//! ```ignore
//! use confpass_testing::{assertions, ReducerTest};
//!
//! ReducerTest::new(RegistrationReducer::new())
//!     .with_env(test_environment())
//!     .given_state(RegistrationState::new())
//!     .when_action(RegistrationAction::Submit)
//!     .then_state(|state| assert!(!state.errors.is_empty()))
//!     .then_effects(assertions::assert_no_effects)
//!     .run();
//! ```

use chrono::{DateTime, Utc};
use confpass_core::environment::Clock;

/// Fluent Given-When-Then reducer tests
pub mod reducer_test;

/// Mock implementations of environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// # Example
    ///
    /// ```
    /// use confpass_testing::mocks::FixedClock;
    /// use confpass_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Fixed clock at 2025-01-01 00:00:00 UTC
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::seconds(1_735_689_600))
    }
}

pub use mocks::{test_clock, FixedClock};
pub use reducer_test::{assertions, ReducerTest};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_is_new_year_2025() {
        let clock = test_clock();
        assert_eq!(clock.now().to_rfc3339(), "2025-01-01T00:00:00+00:00");
        assert_eq!(clock.now(), clock.now());
    }
}
