pub mod attendance;
pub mod dashboard;
pub mod reports;
pub mod students;
pub mod sync;

use std::sync::Arc;

use chrono::{Local, NaiveDate, NaiveTime};

use crate::{
    auth::auth::AuthUser,
    coordinator::{Coordinator, Session},
    error::ApiError,
};

/// Session behind a verified token. Sessions live in memory, so a restart
/// or expiry asks the user to sign in again.
pub fn current_session(coordinator: &Coordinator, auth: &AuthUser) -> Result<Arc<Session>, ApiError> {
    coordinator
        .session(&auth.session_id)?
        .filter(|s| s.profile.id == auth.user_id)
        .ok_or_else(|| ApiError::Unauthorized("Session expired, please login again".to_string()))
}

/// Local calendar date, used when a request leaves the date out.
pub(crate) fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub(crate) fn wall_clock() -> NaiveTime {
    Local::now().time()
}
