use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::Collection;
use mongodb::bson::{Document, doc};
use mongodb::options::FindOptions;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::errors::AppError;

/// 分页结果（page_number 从 1 开始）
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PageResponse<T> {
    pub page_number: u64,
    pub page_size: u64,
    pub total_elements: u64,
    pub total_pages: u64,
    pub content: Vec<T>,
}

impl<T> PageResponse<T> {
    pub fn new(page_number: u64, page_size: u64, total_elements: u64, content: Vec<T>) -> Self {
        let total_pages = if page_size == 0 { 0 } else { total_elements.div_ceil(page_size) };
        Self { page_number, page_size, total_elements, total_pages, content }
    }

    pub fn empty(page_number: u64, page_size: u64) -> Self {
        Self::new(page_number, page_size, 0, vec![])
    }
}

pub fn to_skip(page_number: u64, page_size: u64) -> u64 {
    page_number.saturating_sub(1) * page_size
}

/// 校验分页参数，页号从 1 开始，页大小 1..=100
pub fn validate_page(page_number: u64, page_size: u64) -> Result<(), AppError> {
    if page_number < 1 {
        return Err(AppError::invalid("Page number must be greater than or equal to 1"));
    }
    if page_size < 1 || page_size > 100 {
        return Err(AppError::invalid("Page size must be between 1 and 100"));
    }
    Ok(())
}

#[async_trait]
pub trait Repository<T>: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<T>, AppError>;
    async fn insert(&self, entity: &T) -> Result<(), AppError>;
    async fn find_one(&self, filter: Document) -> Result<Option<T>, AppError>;
    async fn query(&self, filter: Document) -> Result<Vec<T>, AppError>;
    async fn query_with_options(&self, filter: Document, options: FindOptions) -> Result<Vec<T>, AppError>;
    async fn update(&self, filter: Document, update: Document) -> Result<u64, AppError>;
    async fn update_one(&self, filter: Document, update: Document) -> Result<u64, AppError>;
    async fn delete(&self, filter: Document) -> Result<u64, AppError>;
    async fn delete_one(&self, filter: Document) -> Result<u64, AppError>;
    async fn count(&self, filter: Document) -> Result<u64, AppError>;
}

pub struct BaseRepository<T: Send + Sync> {
    pub collection: Collection<T>,
}

impl<T: Send + Sync> BaseRepository<T> {
    pub fn new(collection: Collection<T>) -> Self {
        Self { collection }
    }
}

impl<T: Send + Sync> std::fmt::Debug for BaseRepository<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaseRepository").field("collection", &self.collection.name()).finish()
    }
}

#[async_trait]
impl<T> Repository<T> for BaseRepository<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    async fn find_by_id(&self, id: &str) -> Result<Option<T>, AppError> {
        self.find_one(doc! { "_id": id }).await
    }

    async fn insert(&self, entity: &T) -> Result<(), AppError> {
        self.collection.insert_one(entity).await?;
        Ok(())
    }

    async fn find_one(&self, filter: Document) -> Result<Option<T>, AppError> {
        let result = self.collection.find_one(filter).await?;
        Ok(result)
    }

    async fn query(&self, filter: Document) -> Result<Vec<T>, AppError> {
        let mut cursor = self.collection.find(filter).await?;
        let mut result = vec![];
        while let Some(doc) = cursor.try_next().await? {
            result.push(doc);
        }
        Ok(result)
    }

    async fn query_with_options(&self, filter: Document, options: FindOptions) -> Result<Vec<T>, AppError> {
        let mut cursor = self.collection.find(filter).with_options(options).await?;
        let mut result = vec![];
        while let Some(doc) = cursor.try_next().await? {
            result.push(doc);
        }
        Ok(result)
    }

    async fn update(&self, filter: Document, update: Document) -> Result<u64, AppError> {
        let result = self.collection.update_many(filter, update).await?;
        Ok(result.modified_count)
    }

    async fn update_one(&self, filter: Document, update: Document) -> Result<u64, AppError> {
        let result = self.collection.update_one(filter, update).await?;
        Ok(result.matched_count)
    }

    async fn delete(&self, filter: Document) -> Result<u64, AppError> {
        let result = self.collection.delete_many(filter).await?;
        Ok(result.deleted_count)
    }

    async fn delete_one(&self, filter: Document) -> Result<u64, AppError> {
        let result = self.collection.delete_one(filter).await?;
        Ok(result.deleted_count)
    }

    async fn count(&self, filter: Document) -> Result<u64, AppError> {
        let count = self.collection.count_documents(filter).await?;
        Ok(count)
    }
}
