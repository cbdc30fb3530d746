//! Application router configuration.

use axum::{Router, routing::get};

use crate::{
    AppState, endpoints,
    morning::{get_greeting, get_location, get_timezones},
    not_found::get_404_not_found,
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(endpoints::ROOT, get(get_greeting))
        .route(endpoints::LOCATION, get(get_location))
        .route(endpoints::TIMEZONES, get(get_timezones))
        .fallback(get_404_not_found)
        .with_state(state)
}
