// User directory entity
//
// The user directory is owned by the surrounding system. Only the fields
// needed for existence checks and dev seeding are modeled here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::notification::UserId;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// A user known to the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}
