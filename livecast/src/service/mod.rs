pub mod database;
pub mod listeners;
pub mod podcasts;

use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;

pub(crate) fn now() -> DateTimeWithTimeZone {
    Utc::now().into()
}
