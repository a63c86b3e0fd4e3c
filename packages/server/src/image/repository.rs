use async_trait::async_trait;
use chrono::Utc;
use common::ImageType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};

use crate::entity::image;

/// Fields needed to insert a new image record.
#[derive(Debug, Clone)]
pub struct NewImageRecord {
    pub name: String,
    pub url: String,
    pub path: String,
    pub image_type: ImageType,
    pub uploaded_to: i32,
    pub actor: i32,
}

/// Changes applied by [`ImageRecordRepository::update`].
///
/// `updated_by` and `updated_at` are always written.
#[derive(Debug, Clone)]
pub struct ImageUpdate {
    pub name: Option<String>,
    pub updated_by: i32,
}

/// Filter for [`ImageRecordRepository::list`].
#[derive(Debug, Clone, Default)]
pub struct ImageFilter {
    pub image_type: Option<ImageType>,
    pub uploaded_to: Option<i32>,
}

/// Storage of image metadata rows.
#[async_trait]
pub trait ImageRecordRepository: Send + Sync {
    /// Insert a record, setting both creation and update stamps.
    async fn create(&self, record: NewImageRecord) -> Result<image::Model, DbErr>;

    async fn find_by_id(&self, id: i32) -> Result<Option<image::Model>, DbErr>;

    /// Oldest record of the given type.
    async fn find_first_by_type(&self, image_type: ImageType)
    -> Result<Option<image::Model>, DbErr>;

    /// Whether any record already claims `path`.
    async fn path_exists(&self, path: &str) -> Result<bool, DbErr>;

    /// Apply `update` to a record. Returns `None` if the id does not exist.
    async fn update(&self, id: i32, update: ImageUpdate) -> Result<Option<image::Model>, DbErr>;

    /// Delete a record.
    ///
    /// Returns `true` if the record was deleted, `false` if it did not exist.
    async fn delete(&self, id: i32) -> Result<bool, DbErr>;

    /// Page through records, newest first. Returns the page and the total match count.
    async fn list(
        &self,
        filter: &ImageFilter,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<image::Model>, u64), DbErr>;
}

/// [`ImageRecordRepository`] backed by a SeaORM connection.
#[derive(Clone)]
pub struct SeaOrmImageRepository {
    db: DatabaseConnection,
}

impl SeaOrmImageRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ImageRecordRepository for SeaOrmImageRepository {
    async fn create(&self, record: NewImageRecord) -> Result<image::Model, DbErr> {
        let now = Utc::now();
        let model = image::ActiveModel {
            name: Set(record.name),
            url: Set(record.url),
            path: Set(record.path),
            image_type: Set(record.image_type),
            uploaded_to: Set(record.uploaded_to),
            created_by: Set(record.actor),
            updated_by: Set(record.actor),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        model.insert(&self.db).await
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<image::Model>, DbErr> {
        image::Entity::find_by_id(id).one(&self.db).await
    }

    async fn find_first_by_type(
        &self,
        image_type: ImageType,
    ) -> Result<Option<image::Model>, DbErr> {
        image::Entity::find()
            .filter(image::Column::ImageType.eq(image_type))
            .order_by_asc(image::Column::Id)
            .one(&self.db)
            .await
    }

    async fn path_exists(&self, path: &str) -> Result<bool, DbErr> {
        let count = image::Entity::find()
            .filter(image::Column::Path.eq(path))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    async fn update(&self, id: i32, update: ImageUpdate) -> Result<Option<image::Model>, DbErr> {
        let Some(existing) = image::Entity::find_by_id(id).one(&self.db).await? else {
            return Ok(None);
        };

        let mut active: image::ActiveModel = existing.into();
        if let Some(name) = update.name {
            active.name = Set(name);
        }
        active.updated_by = Set(update.updated_by);
        active.updated_at = Set(Utc::now());

        Ok(Some(active.update(&self.db).await?))
    }

    async fn delete(&self, id: i32) -> Result<bool, DbErr> {
        let result = image::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(result.rows_affected > 0)
    }

    async fn list(
        &self,
        filter: &ImageFilter,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<image::Model>, u64), DbErr> {
        let mut query = image::Entity::find();

        if let Some(image_type) = filter.image_type {
            query = query.filter(image::Column::ImageType.eq(image_type));
        }
        if let Some(uploaded_to) = filter.uploaded_to {
            query = query.filter(image::Column::UploadedTo.eq(uploaded_to));
        }

        let total = query.clone().count(&self.db).await?;

        let images = query
            .order_by_desc(image::Column::CreatedAt)
            .order_by_desc(image::Column::Id)
            .offset(page.saturating_sub(1).saturating_mul(per_page))
            .limit(per_page)
            .all(&self.db)
            .await?;

        Ok((images, total))
    }
}
