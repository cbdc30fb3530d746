//! The API endpoints URIs.

/// The root route which greets the client with a random morning location.
pub const ROOT: &str = "/";
/// The route for a random location where it is currently morning.
pub const LOCATION: &str = "/location";
/// The route for all timezones where it is currently morning.
pub const TIMEZONES: &str = "/timezones";
