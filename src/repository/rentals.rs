//! Rentals repository for database operations

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres, QueryBuilder};

use super::{is_unique_violation, RentalLedger};
use crate::{
    error::{AppError, AppResult, ConflictKind, Entity},
    models::rental::{NewRental, Rental, RentalFilter, RentalStatus},
};

const RENTAL_COLUMNS: &str = "id, user_id, item_id, rental_date, end_date, return_date, extended";

#[derive(Clone)]
pub struct RentalsRepository {
    pool: Pool<Postgres>,
}

impl RentalsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RentalLedger for RentalsRepository {
    async fn find_rental(&self, id: i32) -> AppResult<Option<Rental>> {
        let rental = sqlx::query_as::<_, Rental>(&format!(
            "SELECT {} FROM rentals WHERE id = $1",
            RENTAL_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(rental)
    }

    async fn list_rentals(&self, filter: &RentalFilter) -> AppResult<Vec<Rental>> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM rentals WHERE TRUE",
            RENTAL_COLUMNS
        ));

        if let Some(user_id) = filter.user_id {
            builder.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(item_id) = filter.item_id {
            builder.push(" AND item_id = ").push_bind(item_id);
        }
        match filter.status {
            Some(RentalStatus::Active) => {
                builder.push(" AND return_date IS NULL");
            }
            Some(RentalStatus::Returned) => {
                builder.push(" AND return_date IS NOT NULL");
            }
            None => {}
        }
        if let Some(day) = filter.ends_before {
            builder.push(" AND end_date < ").push_bind(day);
        }
        builder.push(" ORDER BY rental_date, id");

        let rentals = builder.build_query_as::<Rental>().fetch_all(&self.pool).await?;
        Ok(rentals)
    }

    async fn count_active_for_user(&self, user_id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM rentals WHERE user_id = $1 AND return_date IS NULL",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn open_rental(&self, rental: &NewRental, max_active: u32) -> AppResult<Rental> {
        let mut tx = self.pool.begin().await?;

        // Row locks serialize concurrent openings per user (quota) and per item
        let user_id: Option<i32> = sqlx::query_scalar("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(rental.user_id)
            .fetch_optional(&mut *tx)
            .await?;
        if user_id.is_none() {
            return Err(AppError::NotFound(Entity::User));
        }

        let available: Option<bool> =
            sqlx::query_scalar("SELECT available FROM items WHERE id = $1 FOR UPDATE")
                .bind(rental.item_id)
                .fetch_optional(&mut *tx)
                .await?;
        match available {
            None => return Err(AppError::NotFound(Entity::Item)),
            Some(false) => return Err(AppError::Conflict(ConflictKind::ItemUnavailable)),
            Some(true) => {}
        }

        let active: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM rentals WHERE user_id = $1 AND return_date IS NULL",
        )
        .bind(rental.user_id)
        .fetch_one(&mut *tx)
        .await?;
        if active >= i64::from(max_active) {
            return Err(AppError::QuotaExceeded { limit: max_active });
        }

        let already_rented: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM rentals WHERE item_id = $1 AND return_date IS NULL)",
        )
        .bind(rental.item_id)
        .fetch_one(&mut *tx)
        .await?;
        if already_rented {
            return Err(AppError::Conflict(ConflictKind::AlreadyRented));
        }

        let created = sqlx::query_as::<_, Rental>(&format!(
            r#"
            INSERT INTO rentals (user_id, item_id, rental_date, end_date, return_date, extended)
            VALUES ($1, $2, $3, $4, NULL, FALSE)
            RETURNING {}
            "#,
            RENTAL_COLUMNS
        ))
        .bind(rental.user_id)
        .bind(rental.item_id)
        .bind(rental.rental_date)
        .bind(rental.end_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(ConflictKind::AlreadyRented)
            } else {
                AppError::Database(e)
            }
        })?;

        sqlx::query("UPDATE items SET available = FALSE WHERE id = $1")
            .bind(rental.item_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn extend_rental(&self, id: i32, end_date: NaiveDate) -> AppResult<Rental> {
        let updated = sqlx::query_as::<_, Rental>(&format!(
            r#"
            UPDATE rentals SET end_date = $2, extended = TRUE
            WHERE id = $1 AND return_date IS NULL AND extended = FALSE
            RETURNING {}
            "#,
            RENTAL_COLUMNS
        ))
        .bind(id)
        .bind(end_date)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(rental) = updated {
            return Ok(rental);
        }

        // Nothing matched: report why
        match self.find_rental(id).await? {
            None => Err(AppError::NotFound(Entity::Rental)),
            Some(r) if !r.is_active() => Err(AppError::Conflict(ConflictKind::AlreadyReturned)),
            Some(_) => Err(AppError::Conflict(ConflictKind::ExtensionAlreadyUsed)),
        }
    }

    async fn close_rental(&self, id: i32, return_date: NaiveDate) -> AppResult<Rental> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Rental>(&format!(
            "SELECT {} FROM rentals WHERE id = $1 FOR UPDATE",
            RENTAL_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound(Entity::Rental))?;

        if !current.is_active() {
            return Err(AppError::Conflict(ConflictKind::AlreadyReturned));
        }

        let closed = sqlx::query_as::<_, Rental>(&format!(
            "UPDATE rentals SET return_date = $2 WHERE id = $1 RETURNING {}",
            RENTAL_COLUMNS
        ))
        .bind(id)
        .bind(return_date)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE items SET available = TRUE WHERE id = $1")
            .bind(current.item_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(closed)
    }
}
