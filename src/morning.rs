//! Route handlers for finding where in the world it is currently morning.

use axum::{
    Json,
    extract::{Query, State},
};
use rand::{Rng, seq::IndexedRandom};
use serde::{Deserialize, Serialize};
use time::{
    OffsetDateTime, Time, format_description::BorrowedFormatItem, macros::format_description,
};

use crate::{
    AppState, Error,
    timezone::{NearestTimezones, find_nearest_timezones},
};

const HOUR_MINUTE_FORMAT: &[BorrowedFormatItem<'_>] = format_description!("[hour]:[minute]");
const HOUR_MINUTE_SECOND_FORMAT: &[BorrowedFormatItem<'_>] =
    format_description!("[hour]:[minute]:[second]");

/// The query parameters accepted by the morning routes.
#[derive(Debug, Default, Deserialize)]
pub struct MorningQuery {
    /// The local time to search for as an ISO time string, e.g. "07:30".
    pub t: Option<String>,
}

/// The timezones where it is currently closest to the requested time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimezonesResponse {
    /// The current time in the matched timezones as "HH:MM".
    pub time: String,
    /// The UTC offset of the matched timezones in seconds.
    pub utc_offset: i64,
    /// The `Region/Location` names of the matched timezones.
    pub timezones: Vec<String>,
}

/// A single location where it is currently closest to the requested time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationResponse {
    /// The current time at the location as "HH:MM".
    pub time: String,
    /// The location part of a `Region/Location` timezone name, e.g. "Oslo".
    pub location: String,
}

/// Parse an ISO time of day such as "07:30" or "07:30:15".
///
/// # Errors
/// Returns [Error::InvalidTime] if `text` is not a valid time of day.
pub fn parse_iso_time(text: &str) -> Result<Time, Error> {
    Time::parse(text, HOUR_MINUTE_FORMAT)
        .or_else(|_| Time::parse(text, HOUR_MINUTE_SECOND_FORMAT))
        .map_err(|_| Error::InvalidTime(text.to_owned()))
}

fn format_hour_minute(time: Time) -> Result<String, Error> {
    time.format(HOUR_MINUTE_FORMAT)
        .map_err(|error| Error::TimeFormat(error.to_string()))
}

impl MorningQuery {
    /// The requested time, or `default_time` if no time was given.
    pub fn target_time(&self, default_time: Time) -> Result<Time, Error> {
        match &self.t {
            Some(text) => parse_iso_time(text),
            None => Ok(default_time),
        }
    }
}

/// Get the timezones where it is closest to `target` at the instant `now`.
pub fn timezones_at(
    target: Time,
    state: &AppState,
    now: OffsetDateTime,
) -> Result<TimezonesResponse, Error> {
    let NearestTimezones {
        offset,
        timezones,
        local_time,
    } = find_nearest_timezones(target, &state.local_timezone, now)?;

    Ok(TimezonesResponse {
        time: format_hour_minute(local_time)?,
        utc_offset: offset.whole_seconds(),
        timezones,
    })
}

/// Pick a location uniformly at random from the timezones where it is
/// closest to `target` at the instant `now`.
pub fn random_location_at(
    target: Time,
    state: &AppState,
    now: OffsetDateTime,
    rng: &mut impl Rng,
) -> Result<LocationResponse, Error> {
    let TimezonesResponse {
        time, timezones, ..
    } = timezones_at(target, state, now)?;

    // Offset map entries always hold at least one name.
    let timezone_name = timezones.choose(rng).ok_or(Error::EmptyOffsetMap)?;
    let location = match timezone_name.split_once('/') {
        Some((_, location)) => location,
        None => timezone_name.as_str(),
    };

    Ok(LocationResponse {
        time,
        location: location.to_owned(),
    })
}

/// Get the timezones and the current time where it is closest to the
/// requested time, which defaults to the configured morning time.
pub async fn get_timezones(
    State(state): State<AppState>,
    Query(query): Query<MorningQuery>,
) -> Result<Json<TimezonesResponse>, Error> {
    let target = query.target_time(state.default_time)?;

    timezones_at(target, &state, OffsetDateTime::now_utc()).map(Json)
}

/// Get a random location and the current time where it is closest to the
/// requested time, which defaults to the configured morning time.
pub async fn get_location(
    State(state): State<AppState>,
    Query(query): Query<MorningQuery>,
) -> Result<Json<LocationResponse>, Error> {
    let target = query.target_time(state.default_time)?;
    let mut rng = state.selection_rng();

    random_location_at(target, &state, OffsetDateTime::now_utc(), &mut rng).map(Json)
}

/// Greet the client good morning, wherever they may be.
pub async fn get_greeting(State(state): State<AppState>) -> Result<String, Error> {
    let mut rng = state.selection_rng();
    let LocationResponse { time, location } = random_location_at(
        state.default_time,
        &state,
        OffsetDateTime::now_utc(),
        &mut rng,
    )?;

    Ok(format!(
        "It is currently {time} in {location}. Good morning, wherever you are! 🌞"
    ))
}


#[cfg(test)]
mod morning_tests {
    use rand::{SeedableRng, rngs::StdRng};
    use time::{
        Duration,
        macros::{datetime, time},
    };

    use crate::{
        AppState,
        morning::{random_location_at, timezones_at},
        timezone::LocalTimezone,
    };

    fn get_test_state() -> AppState {
        AppState::new(
            time!(07:30),
            LocalTimezone::Named("Europe/London".to_owned()),
            Some(42),
        )
    }

    #[test]
    fn timezones_response_matches_nearest_offset() {
        let state = get_test_state();
        let now = datetime!(2025-01-15 12:00 UTC);

        let response = timezones_at(time!(07:00), &state, now).expect("Could not get timezones");

        assert_eq!(response.time, "07:00");
        assert_eq!(response.utc_offset, Duration::hours(-5).whole_seconds());
        assert!(response.timezones.contains(&"America/Toronto".to_owned()));
    }

    #[test]
    fn time_is_zero_padded() {
        let state = get_test_state();
        let now = datetime!(2025-01-15 14:05 UTC);

        let response = timezones_at(time!(09:05), &state, now).expect("Could not get timezones");

        assert_eq!(response.time, "09:05");
    }

    #[test]
    fn location_is_from_matched_timezones() {
        let state = get_test_state();
        let now = datetime!(2025-07-01 20:45:10 UTC);
        let timezones = timezones_at(time!(07:30), &state, now).expect("Could not get timezones");

        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);

            let location = random_location_at(time!(07:30), &state, now, &mut rng)
                .expect("Could not get location");

            assert_eq!(location.time, timezones.time);
            assert!(
                timezones
                    .timezones
                    .iter()
                    .any(|name| name.split_once('/').map(|(_, loc)| loc)
                        == Some(location.location.as_str())),
                "{} is not in {:?}",
                location.location,
                timezones.timezones
            );
        }
    }

    #[test]
    fn seeded_selection_is_deterministic() {
        let state = get_test_state();
        let now = datetime!(2025-07-01 20:45:10 UTC);

        let first = random_location_at(time!(07:30), &state, now, &mut state.selection_rng())
            .expect("Could not get location");
        let second = random_location_at(time!(07:30), &state, now, &mut state.selection_rng())
            .expect("Could not get location");

        assert_eq!(first, second);
    }
}
