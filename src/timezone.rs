//! Resolves which timezones currently have a given local time.
//!
//! The resolver works in three steps:
//! 1. [compute_target_offset] turns a local time of day into the UTC offset a
//!    timezone would need *right now* for its wall clock to show that time.
//! 2. [build_offset_map] groups every `Region/Location` timezone by its current
//!    UTC offset.
//! 3. [nearest_to_offset] picks the map entry closest to the target offset.
//!
//! Nothing is cached between calls since offsets change with daylight saving.

use std::collections::BTreeMap;

use time::{Duration, OffsetDateTime, Time, UtcOffset};
use time_tz::{Offset, OffsetDateTimeExt, TimeZone, Tz};

use crate::Error;

/// Substrings that mark a timezone name as an alias rather than a real place.
pub const EXCLUDED_TIMEZONE_NAMES: [&str; 4] = ["GMT", "UTC", "UCT", "Universal"];

/// Current UTC offsets mapped to the names of the timezones observing them.
///
/// Keys iterate in ascending order, names keep the timezone database's order.
pub type OffsetMap = BTreeMap<Duration, Vec<String>>;

/// The timezone used as the reference point for converting a local time of
/// day into a UTC offset.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LocalTimezone {
    /// The timezone configured on the host machine.
    #[default]
    System,
    /// A canonical timezone name, e.g. "Pacific/Auckland".
    Named(String),
}

impl LocalTimezone {
    /// Look up the timezone in the timezone database.
    ///
    /// # Errors
    /// Returns [Error::Resolution] if the host has no usable timezone
    /// configuration or the name is not a known timezone.
    pub fn resolve(&self) -> Result<&'static Tz, Error> {
        match self {
            LocalTimezone::System => time_tz::system::get_timezone().map_err(|error| {
                Error::Resolution(format!("could not get the system timezone: {error}"))
            }),
            LocalTimezone::Named(name) => time_tz::timezones::get_by_name(name)
                .ok_or_else(|| Error::Resolution(format!("unknown timezone \"{name}\""))),
        }
    }

    /// The current date and time in this timezone.
    pub fn now(&self) -> Result<OffsetDateTime, Error> {
        let timezone = self.resolve()?;

        Ok(OffsetDateTime::now_utc().to_timezone(timezone))
    }
}

/// The nearest offset entry found for a local time, along with the time it
/// currently is under that offset.
#[derive(Debug, Clone, PartialEq)]
pub struct NearestTimezones {
    /// The UTC offset of the matched timezones.
    pub offset: Duration,
    /// The `Region/Location` names of every timezone at `offset`.
    pub timezones: Vec<String>,
    /// The wall clock time under `offset`, which may differ slightly from the
    /// requested time since matching is by nearest offset.
    pub local_time: Time,
}

/// Get the current UTC offset of the timezone called `canonical_timezone` at
/// the instant `at`.
///
/// Returns `None` if `canonical_timezone` is not in the timezone database.
pub fn get_offset_at(canonical_timezone: &str, at: OffsetDateTime) -> Option<UtcOffset> {
    time_tz::timezones::get_by_name(canonical_timezone).map(|tz| tz.get_offset_utc(&at).to_utc())
}

/// Get the UTC offset towards `target` for a timezone whose wall clock would
/// show `target` right now.
///
/// # Errors
/// Returns [Error::Resolution] if the local timezone cannot be determined.
pub fn compute_target_offset(
    target: Time,
    local_timezone: &LocalTimezone,
) -> Result<Duration, Error> {
    let local_now = local_timezone.now()?;

    Ok(offset_towards(target, local_now))
}

/// Get the UTC offset towards `target`, measured from `local_now`.
///
/// The result is `target` on today's date minus `local_now`, plus the offset of
/// `local_now`. Targets earlier in the day than `local_now` are not wrapped
/// around midnight, so the result may fall outside of real-world offsets.
pub fn offset_towards(target: Time, local_now: OffsetDateTime) -> Duration {
    let local_target = local_now.replace_time(target);
    let local_offset = Duration::seconds(local_now.offset().whole_seconds().into());

    local_target - local_now + local_offset
}

/// Whether `timezone_name` has the form `Region/Location` where `Location` is
/// purely alphabetic, e.g., "Europe/Oslo" but not "Etc/GMT+0".
pub fn is_locational_name(timezone_name: &str) -> bool {
    let mut parts = timezone_name.split('/');

    match (parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(location), None) => {
            !location.is_empty() && location.chars().all(char::is_alphabetic)
        }
        _ => false,
    }
}

/// Whether `timezone_name` contains any of [EXCLUDED_TIMEZONE_NAMES].
pub fn is_excluded_name(timezone_name: &str) -> bool {
    EXCLUDED_TIMEZONE_NAMES
        .iter()
        .any(|excluded| timezone_name.contains(excluded))
}

/// Get the names of all timezones in the database that are locational names
/// and are not excluded.
pub fn timezone_names() -> Vec<&'static str> {
    time_tz::timezones::iter()
        .map(|tz| tz.name())
        .filter(|name| is_locational_name(name) && !is_excluded_name(name))
        .collect()
}

/// Construct a look-up table mapping the current UTC offset of every
/// `Region/Location` timezone to the timezones having that offset.
///
/// # Errors
/// Returns [Error::Resolution] if the offset of any timezone cannot be
/// determined. No partial map is returned.
pub fn build_offset_map() -> Result<OffsetMap, Error> {
    build_offset_map_at(OffsetDateTime::now_utc())
}

/// Construct the offset map for the instant `now`.
///
/// See [build_offset_map].
pub fn build_offset_map_at(now: OffsetDateTime) -> Result<OffsetMap, Error> {
    group_by_offset(timezone_names(), |name| get_offset_at(name, now))
}

/// Group `timezone_names` by the UTC offset `lookup` gives for each name.
///
/// # Errors
/// Returns [Error::Resolution] for the first name that `lookup` returns `None`.
pub fn group_by_offset<'a>(
    timezone_names: impl IntoIterator<Item = &'a str>,
    lookup: impl Fn(&str) -> Option<UtcOffset>,
) -> Result<OffsetMap, Error> {
    let mut offset_map = OffsetMap::new();

    for name in timezone_names {
        let offset = lookup(name).ok_or_else(|| {
            Error::Resolution(format!("could not get current UTC offset for {name}"))
        })?;

        offset_map
            .entry(Duration::seconds(offset.whole_seconds().into()))
            .or_default()
            .push(name.to_owned());
    }

    Ok(offset_map)
}

/// Return the offset in `offset_map` nearest to `offset` along with the
/// timezones at that offset.
///
/// When keys are equally near, the smallest (most negative) key is chosen.
///
/// # Errors
/// Returns [Error::EmptyOffsetMap] if `offset_map` has no entries.
pub fn nearest_to_offset(
    offset_map: OffsetMap,
    offset: Duration,
) -> Result<(Duration, Vec<String>), Error> {
    offset_map
        .into_iter()
        .min_by_key(|(key, _)| (*key - offset).abs())
        .ok_or(Error::EmptyOffsetMap)
}

/// Find the timezones where it is currently closest to `target` o'clock.
///
/// `now` is the current instant; the local time of the result is derived from it.
///
/// # Errors
/// Returns an error if the local timezone or any timezone's offset cannot be
/// resolved.
pub fn find_nearest_timezones(
    target: Time,
    local_timezone: &LocalTimezone,
    now: OffsetDateTime,
) -> Result<NearestTimezones, Error> {
    let local_now = now.to_timezone(local_timezone.resolve()?);
    let target_offset = offset_towards(target, local_now);
    let offset_map = build_offset_map_at(now)?;
    let (offset, timezones) = nearest_to_offset(offset_map, target_offset)?;
    tracing::debug!(
        "Target offset {target_offset} matched {offset} with {} timezones",
        timezones.len()
    );

    let local_time = (now.to_offset(UtcOffset::UTC) + offset).time();

    Ok(NearestTimezones {
        offset,
        timezones,
        local_time,
    })
}



#[cfg(test)]
mod timezone_name_tests {
    use crate::timezone::{is_excluded_name, is_locational_name, timezone_names};

    #[test]
    fn accepts_region_location_names() {
        assert!(is_locational_name("Europe/Oslo"));
        assert!(is_locational_name("Pacific/Auckland"));
    }

    #[test]
    fn rejects_non_locational_names() {
        assert!(!is_locational_name("UTC"));
        assert!(!is_locational_name("Etc/GMT+0"));
        assert!(!is_locational_name("America/New_York"));
        assert!(!is_locational_name("America/Argentina/Salta"));
        assert!(!is_locational_name("Europe/"));
    }

    #[test]
    fn excludes_aliases() {
        assert!(is_excluded_name("Etc/UTC"));
        assert!(is_excluded_name("Etc/Universal"));
        assert!(is_excluded_name("Etc/UCT"));
        assert!(is_excluded_name("Etc/GMT"));
        assert!(!is_excluded_name("Europe/London"));
    }

    #[test]
    fn database_names_are_filtered() {
        let names = timezone_names();

        assert!(!names.is_empty());
        assert!(names.contains(&"Europe/London"));
        for name in names {
            assert!(is_locational_name(name), "{name} is not a locational name");
            assert!(!is_excluded_name(name), "{name} should have been excluded");
        }
    }
}


#[cfg(test)]
mod nearest_to_offset_tests {
    use time::Duration;

    use crate::{
        Error,
        timezone::{OffsetMap, nearest_to_offset},
    };

    fn london_paris_map() -> OffsetMap {
        OffsetMap::from([
            (Duration::ZERO, vec!["Europe/London".to_owned()]),
            (Duration::hours(1), vec!["Europe/Paris".to_owned()]),
        ])
    }

    #[test]
    fn selects_nearest_entry() {
        let (offset, timezones) = nearest_to_offset(london_paris_map(), Duration::seconds(3700))
            .expect("Could not find nearest offset");

        assert_eq!(offset, Duration::hours(1));
        assert_eq!(timezones, vec!["Europe/Paris".to_owned()]);
    }

    #[test]
    fn selects_exact_match() {
        let (offset, _) = nearest_to_offset(london_paris_map(), Duration::ZERO)
            .expect("Could not find nearest offset");

        assert_eq!(offset, Duration::ZERO);
    }

    #[test]
    fn query_far_outside_real_offsets_selects_extreme_key() {
        let (offset, _) = nearest_to_offset(london_paris_map(), Duration::hours(-30))
            .expect("Could not find nearest offset");

        assert_eq!(offset, Duration::ZERO);
    }

    #[test]
    fn ties_select_smallest_offset() {
        let (offset, timezones) = nearest_to_offset(london_paris_map(), Duration::minutes(30))
            .expect("Could not find nearest offset");

        assert_eq!(offset, Duration::ZERO);
        assert_eq!(timezones, vec!["Europe/London".to_owned()]);
    }

    #[test]
    fn nearest_key_is_never_further_than_other_keys() {
        let offset_map = OffsetMap::from([
            (Duration::hours(-10), vec!["Pacific/Honolulu".to_owned()]),
            (Duration::hours(5) + Duration::minutes(45), vec!["Asia/Kathmandu".to_owned()]),
            (Duration::hours(9), vec!["Asia/Tokyo".to_owned()]),
            (Duration::hours(13), vec!["Pacific/Auckland".to_owned()]),
        ]);

        for query in (-40..=40).map(|half_hours| Duration::minutes(half_hours * 30 + 7)) {
            let (nearest, _) = nearest_to_offset(offset_map.clone(), query)
                .expect("Could not find nearest offset");

            assert!(offset_map.contains_key(&nearest));
            for key in offset_map.keys() {
                assert!((nearest - query).abs() <= (*key - query).abs());
            }
        }
    }

    #[test]
    fn empty_map_fails() {
        let result = nearest_to_offset(OffsetMap::new(), Duration::ZERO);

        assert_eq!(result, Err(Error::EmptyOffsetMap));
    }
}
