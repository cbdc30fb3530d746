//! Implements a struct that holds the state of the REST server.

use rand::{SeedableRng, rngs::StdRng};
use time::{Time, macros::time};

use crate::timezone::LocalTimezone;

/// The local time used when a request does not specify one.
pub const DEFAULT_MORNING_TIME: Time = time!(07:30);

/// The state of the REST server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    /// The time of day to search for when a request does not specify one.
    pub default_time: Time,

    /// The timezone that local times of day are converted from.
    pub local_timezone: LocalTimezone,

    /// The seed used for picking a random location.
    ///
    /// If `None`, each request picks from an entropy-seeded generator,
    /// otherwise each request picks from a generator seeded with this value.
    pub selection_seed: Option<u64>,
}

impl AppState {
    /// Create a new [AppState].
    pub fn new(
        default_time: Time,
        local_timezone: LocalTimezone,
        selection_seed: Option<u64>,
    ) -> Self {
        Self {
            default_time,
            local_timezone,
            selection_seed,
        }
    }

    /// Create a random number generator for a single request.
    pub fn selection_rng(&self) -> StdRng {
        match self.selection_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(DEFAULT_MORNING_TIME, LocalTimezone::System, None)
    }
}
