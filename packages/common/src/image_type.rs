#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Category an uploaded image belongs to.
///
/// The category is part of the storage path and never changes once a record
/// exists. When the `sea-orm` feature is enabled, this enum can be used
/// directly in SeaORM entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "lowercase")]
pub enum ImageType {
    /// Image uploaded through the page gallery.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "gallery"))]
    Gallery,
    /// PNG export of a diagrams.net drawing.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "drawio"))]
    Drawio,
    /// Book or shelf cover image.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "cover"))]
    Cover,
    /// User avatar.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "user"))]
    User,
    /// Application-level image such as a logo.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "system"))]
    System,
}

impl ImageType {
    pub const ALL: &'static [ImageType] = &[
        Self::Gallery,
        Self::Drawio,
        Self::Cover,
        Self::User,
        Self::System,
    ];

    /// Returns the lowercase string stored in the database and used as a path segment.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gallery => "gallery",
            Self::Drawio => "drawio",
            Self::Cover => "cover",
            Self::User => "user",
            Self::System => "system",
        }
    }

    /// Stem used when a filename has to be generated, e.g. for base64 uploads.
    pub fn generated_stem(&self) -> &'static str {
        match self {
            Self::Drawio => "drawing",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for ImageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error when parsing an unknown image type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseImageTypeError {
    invalid: String,
}

impl fmt::Display for ParseImageTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid image type '{}'. Valid values: {}",
            self.invalid,
            ImageType::ALL
                .iter()
                .map(|t| t.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl std::error::Error for ParseImageTypeError {}

impl FromStr for ImageType {
    type Err = ParseImageTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gallery" => Ok(Self::Gallery),
            "drawio" => Ok(Self::Drawio),
            "cover" => Ok(Self::Cover),
            "user" => Ok(Self::User),
            "system" => Ok(Self::System),
            _ => Err(ParseImageTypeError {
                invalid: s.to_string(),
            }),
        }
    }
}
