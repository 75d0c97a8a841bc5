//! UTC timestamp helpers shared across the workspace.

use chrono::{DateTime, Utc};

/// The current UTC instant, millisecond resolution (the spec's data model
/// defines all timestamps this way).
#[must_use]
pub fn now() -> DateTime<Utc> {
    Utc::now()
}
