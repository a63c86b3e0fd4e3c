use common::ImageType;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Metadata row for an uploaded image. The bytes live in blob storage at `path`.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "image")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Original upload filename.
    pub name: String,

    /// Public URL derived from `path`.
    #[sea_orm(column_type = "Text")]
    pub url: String,

    /// Storage-relative blob path. Fixed at creation.
    #[sea_orm(unique)]
    pub path: String,

    #[sea_orm(column_name = "type", indexed)]
    pub image_type: ImageType,

    /// Owning content unit, `0` when unattached.
    #[sea_orm(indexed)]
    pub uploaded_to: i32,

    pub created_by: i32,

    pub updated_by: i32,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
