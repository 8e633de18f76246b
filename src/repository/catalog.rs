//! Catalog repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres, QueryBuilder};

use super::{is_foreign_key_violation, is_unique_violation, CatalogStore};
use crate::{
    error::{AppError, AppResult, ConflictKind},
    models::item::{Category, CreateItem, Item, ItemQuery, Location, UpdateItem},
};

const ITEM_COLUMNS: &str =
    "id, name, item_type, description, available, category_id, location_id";

#[derive(Clone)]
pub struct CatalogRepository {
    pool: Pool<Postgres>,
}

impl CatalogRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for CatalogRepository {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_item(&self, id: i32) -> AppResult<Option<Item>> {
        let item = sqlx::query_as::<_, Item>(&format!(
            "SELECT {} FROM items WHERE id = $1",
            ITEM_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    async fn list_items(&self, query: &ItemQuery) -> AppResult<Vec<Item>> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM items WHERE TRUE",
            ITEM_COLUMNS
        ));

        if let Some(category_id) = query.category_id {
            builder.push(" AND category_id = ").push_bind(category_id);
        }
        if let Some(location_id) = query.location_id {
            builder.push(" AND location_id = ").push_bind(location_id);
        }
        if let Some(available) = query.available {
            builder.push(" AND available = ").push_bind(available);
        }
        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", search);
            builder
                .push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        builder.push(" ORDER BY name, id");

        let items = builder.build_query_as::<Item>().fetch_all(&self.pool).await?;
        Ok(items)
    }

    async fn insert_item(&self, data: &CreateItem) -> AppResult<Item> {
        let item = sqlx::query_as::<_, Item>(&format!(
            r#"
            INSERT INTO items (name, item_type, description, available, category_id, location_id)
            VALUES ($1, $2, $3, TRUE, $4, $5)
            RETURNING {}
            "#,
            ITEM_COLUMNS
        ))
        .bind(&data.name)
        .bind(&data.item_type)
        .bind(&data.description)
        .bind(data.category_id)
        .bind(data.location_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(item)
    }

    async fn update_item(&self, id: i32, data: &UpdateItem) -> AppResult<Option<Item>> {
        let item = sqlx::query_as::<_, Item>(&format!(
            r#"
            UPDATE items SET
                name = COALESCE($2, name),
                item_type = COALESCE($3, item_type),
                description = COALESCE($4, description),
                category_id = COALESCE($5, category_id),
                location_id = COALESCE($6, location_id)
            WHERE id = $1
            RETURNING {}
            "#,
            ITEM_COLUMNS
        ))
        .bind(id)
        .bind(&data.name)
        .bind(&data.item_type)
        .bind(&data.description)
        .bind(data.category_id)
        .bind(data.location_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    async fn delete_item(&self, id: i32) -> AppResult<bool> {
        // A rental opened after the caller's history check trips the FK
        let result = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    AppError::Conflict(ConflictKind::ItemHasRentals)
                } else {
                    AppError::Database(e)
                }
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_category(&self, id: i32) -> AppResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>("SELECT id, name FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(category)
    }

    async fn list_categories(&self) -> AppResult<Vec<Category>> {
        let rows = sqlx::query_as::<_, Category>("SELECT id, name FROM categories ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn insert_category(&self, name: &str) -> AppResult<Category> {
        let row = sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name) VALUES ($1) RETURNING id, name",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(ConflictKind::NameTaken)
            } else {
                AppError::Database(e)
            }
        })?;
        Ok(row)
    }

    async fn find_location(&self, id: i32) -> AppResult<Option<Location>> {
        let location = sqlx::query_as::<_, Location>("SELECT id, name FROM locations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(location)
    }

    async fn list_locations(&self) -> AppResult<Vec<Location>> {
        let rows = sqlx::query_as::<_, Location>("SELECT id, name FROM locations ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn insert_location(&self, name: &str) -> AppResult<Location> {
        let row = sqlx::query_as::<_, Location>(
            "INSERT INTO locations (name) VALUES ($1) RETURNING id, name",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(ConflictKind::NameTaken)
            } else {
                AppError::Database(e)
            }
        })?;
        Ok(row)
    }
}
