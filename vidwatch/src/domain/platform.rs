//! Supported content platforms.

use serde::{Deserialize, Serialize};

/// A platform an account can be tracked on.
///
/// The set is closed: account creation parses the tag into this enum, so an
/// unknown tag never reaches the account store through the normal add path.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    YouTube,
    TikTok,
    Instagram,
    Facebook,
}

impl Platform {
    /// Stable tag stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::YouTube => "youtube",
            Self::TikTok => "tiktok",
            Self::Instagram => "instagram",
            Self::Facebook => "facebook",
        }
    }
}
