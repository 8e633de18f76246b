//! Catalog service: item browsing and inventory management

use validator::Validate;

use crate::{
    error::{AppError, AppResult, ConflictKind, Entity},
    models::{
        item::{Category, CreateItem, CreateNamed, Item, ItemQuery, Location, UpdateItem},
        rental::RentalFilter,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Check that the catalog store answers
    pub async fn ping(&self) -> AppResult<()> {
        self.repository.catalog.ping().await
    }

    /// Browse items by category, location, availability and text
    pub async fn list_items(&self, query: &ItemQuery) -> AppResult<Vec<Item>> {
        self.repository.catalog.list_items(query).await
    }

    pub async fn get_item(&self, id: i32) -> AppResult<Item> {
        self.repository
            .catalog
            .find_item(id)
            .await?
            .ok_or(AppError::NotFound(Entity::Item))
    }

    pub async fn create_item(&self, data: &CreateItem) -> AppResult<Item> {
        data.validate()?;
        self.ensure_category(data.category_id).await?;
        self.ensure_location(data.location_id).await?;

        let item = self.repository.catalog.insert_item(data).await?;
        tracing::info!(item_id = item.id, "Item created");
        Ok(item)
    }

    pub async fn update_item(&self, id: i32, data: &UpdateItem) -> AppResult<Item> {
        data.validate()?;
        if let Some(category_id) = data.category_id {
            self.ensure_category(category_id).await?;
        }
        if let Some(location_id) = data.location_id {
            self.ensure_location(location_id).await?;
        }

        self.repository
            .catalog
            .update_item(id, data)
            .await?
            .ok_or(AppError::NotFound(Entity::Item))
    }

    /// Delete an item that has never been rented
    pub async fn delete_item(&self, id: i32) -> AppResult<()> {
        self.get_item(id).await?;

        let history = self
            .repository
            .rentals
            .list_rentals(&RentalFilter {
                item_id: Some(id),
                ..Default::default()
            })
            .await?;
        if !history.is_empty() {
            return Err(AppError::Conflict(ConflictKind::ItemHasRentals));
        }

        if !self.repository.catalog.delete_item(id).await? {
            return Err(AppError::NotFound(Entity::Item));
        }
        tracing::info!(item_id = id, "Item deleted");
        Ok(())
    }

    pub async fn list_categories(&self) -> AppResult<Vec<Category>> {
        self.repository.catalog.list_categories().await
    }

    pub async fn create_category(&self, data: &CreateNamed) -> AppResult<Category> {
        data.validate()?;
        self.repository.catalog.insert_category(data.name.trim()).await
    }

    pub async fn list_locations(&self) -> AppResult<Vec<Location>> {
        self.repository.catalog.list_locations().await
    }

    pub async fn create_location(&self, data: &CreateNamed) -> AppResult<Location> {
        data.validate()?;
        self.repository.catalog.insert_location(data.name.trim()).await
    }

    async fn ensure_category(&self, id: i32) -> AppResult<()> {
        self.repository
            .catalog
            .find_category(id)
            .await?
            .map(|_| ())
            .ok_or(AppError::NotFound(Entity::Category))
    }

    async fn ensure_location(&self, id: i32) -> AppResult<()> {
        self.repository
            .catalog
            .find_location(id)
            .await?
            .map(|_| ())
            .ok_or(AppError::NotFound(Entity::Location))
    }
}
