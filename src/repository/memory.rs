//! In-process store implementing every port
//!
//! All state lives behind one lock, so each port call (including the paired
//! rental + availability writes) is atomic with respect to every other call.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

use super::{CatalogStore, RentalLedger, UserStore};
use crate::{
    error::{AppError, AppResult, ConflictKind, Entity},
    models::{
        item::{Category, CreateItem, Item, ItemQuery, Location, UpdateItem},
        rental::{NewRental, Rental, RentalFilter},
        user::{NewUser, User},
    },
};

#[derive(Default)]
struct State {
    items: BTreeMap<i32, Item>,
    categories: BTreeMap<i32, Category>,
    locations: BTreeMap<i32, Location>,
    users: BTreeMap<i32, User>,
    rentals: BTreeMap<i32, Rental>,
    last_id: i32,
}

impl State {
    fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }

    fn active_rental_for_item(&self, item_id: i32) -> Option<&Rental> {
        self.rentals
            .values()
            .find(|r| r.item_id == item_id && r.is_active())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn find_item(&self, id: i32) -> AppResult<Option<Item>> {
        Ok(self.state.read().await.items.get(&id).cloned())
    }

    async fn list_items(&self, query: &ItemQuery) -> AppResult<Vec<Item>> {
        let state = self.state.read().await;
        let mut items: Vec<Item> = state
            .items
            .values()
            .filter(|item| query.matches(item))
            .cloned()
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(items)
    }

    async fn insert_item(&self, data: &CreateItem) -> AppResult<Item> {
        let mut state = self.state.write().await;
        let item = Item {
            id: state.next_id(),
            name: data.name.clone(),
            item_type: data.item_type.clone(),
            description: data.description.clone(),
            available: true,
            category_id: data.category_id,
            location_id: data.location_id,
        };
        state.items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn update_item(&self, id: i32, data: &UpdateItem) -> AppResult<Option<Item>> {
        let mut state = self.state.write().await;
        let Some(item) = state.items.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(ref name) = data.name {
            item.name = name.clone();
        }
        if data.item_type.is_some() {
            item.item_type = data.item_type.clone();
        }
        if data.description.is_some() {
            item.description = data.description.clone();
        }
        if let Some(category_id) = data.category_id {
            item.category_id = category_id;
        }
        if let Some(location_id) = data.location_id {
            item.location_id = location_id;
        }
        Ok(Some(item.clone()))
    }

    async fn delete_item(&self, id: i32) -> AppResult<bool> {
        let mut state = self.state.write().await;
        if state.rentals.values().any(|r| r.item_id == id) {
            return Err(AppError::Conflict(ConflictKind::ItemHasRentals));
        }
        Ok(state.items.remove(&id).is_some())
    }

    async fn find_category(&self, id: i32) -> AppResult<Option<Category>> {
        Ok(self.state.read().await.categories.get(&id).cloned())
    }

    async fn list_categories(&self) -> AppResult<Vec<Category>> {
        let state = self.state.read().await;
        let mut rows: Vec<Category> = state.categories.values().cloned().collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn insert_category(&self, name: &str) -> AppResult<Category> {
        let mut state = self.state.write().await;
        if state.categories.values().any(|c| c.name == name) {
            return Err(AppError::Conflict(ConflictKind::NameTaken));
        }
        let category = Category {
            id: state.next_id(),
            name: name.to_string(),
        };
        state.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn find_location(&self, id: i32) -> AppResult<Option<Location>> {
        Ok(self.state.read().await.locations.get(&id).cloned())
    }

    async fn list_locations(&self) -> AppResult<Vec<Location>> {
        let state = self.state.read().await;
        let mut rows: Vec<Location> = state.locations.values().cloned().collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn insert_location(&self, name: &str) -> AppResult<Location> {
        let mut state = self.state.write().await;
        if state.locations.values().any(|l| l.name == name) {
            return Err(AppError::Conflict(ConflictKind::NameTaken));
        }
        let location = Location {
            id: state.next_id(),
            name: name.to_string(),
        };
        state.locations.insert(location.id, location.clone());
        Ok(location)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, id: i32) -> AppResult<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        let state = self.state.read().await;
        let mut users: Vec<User> = state.users.values().cloned().collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }

    async fn insert_user(&self, user: &NewUser) -> AppResult<User> {
        let mut state = self.state.write().await;
        if state
            .users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(AppError::Conflict(ConflictKind::EmailTaken));
        }
        let created = User {
            id: state.next_id(),
            full_name: user.full_name.clone(),
            email: user.email.clone(),
            password: user.password_hash.clone(),
            role: user.role,
        };
        state.users.insert(created.id, created.clone());
        Ok(created)
    }
}

#[async_trait]
impl RentalLedger for MemoryStore {
    async fn find_rental(&self, id: i32) -> AppResult<Option<Rental>> {
        Ok(self.state.read().await.rentals.get(&id).cloned())
    }

    async fn list_rentals(&self, filter: &RentalFilter) -> AppResult<Vec<Rental>> {
        let state = self.state.read().await;
        let mut rentals: Vec<Rental> = state
            .rentals
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        rentals.sort_by(|a, b| a.rental_date.cmp(&b.rental_date).then(a.id.cmp(&b.id)));
        Ok(rentals)
    }

    async fn count_active_for_user(&self, user_id: i32) -> AppResult<i64> {
        let state = self.state.read().await;
        let count = state
            .rentals
            .values()
            .filter(|r| r.user_id == user_id && r.is_active())
            .count();
        Ok(count as i64)
    }

    async fn open_rental(&self, rental: &NewRental, max_active: u32) -> AppResult<Rental> {
        let mut state = self.state.write().await;

        if !state.users.contains_key(&rental.user_id) {
            return Err(AppError::NotFound(Entity::User));
        }
        match state.items.get(&rental.item_id) {
            None => return Err(AppError::NotFound(Entity::Item)),
            Some(item) if !item.available => {
                return Err(AppError::Conflict(ConflictKind::ItemUnavailable))
            }
            Some(_) => {}
        }
        let active = state
            .rentals
            .values()
            .filter(|r| r.user_id == rental.user_id && r.is_active())
            .count();
        if active >= max_active as usize {
            return Err(AppError::QuotaExceeded { limit: max_active });
        }
        if state.active_rental_for_item(rental.item_id).is_some() {
            return Err(AppError::Conflict(ConflictKind::AlreadyRented));
        }

        let created = Rental {
            id: state.next_id(),
            user_id: rental.user_id,
            item_id: rental.item_id,
            rental_date: rental.rental_date,
            end_date: rental.end_date,
            return_date: None,
            extended: false,
        };
        state.rentals.insert(created.id, created.clone());
        if let Some(item) = state.items.get_mut(&rental.item_id) {
            item.available = false;
        }
        Ok(created)
    }

    async fn extend_rental(&self, id: i32, end_date: NaiveDate) -> AppResult<Rental> {
        let mut state = self.state.write().await;
        let rental = state
            .rentals
            .get_mut(&id)
            .ok_or(AppError::NotFound(Entity::Rental))?;

        if !rental.is_active() {
            return Err(AppError::Conflict(ConflictKind::AlreadyReturned));
        }
        if rental.extended {
            return Err(AppError::Conflict(ConflictKind::ExtensionAlreadyUsed));
        }
        rental.end_date = end_date;
        rental.extended = true;
        Ok(rental.clone())
    }

    async fn close_rental(&self, id: i32, return_date: NaiveDate) -> AppResult<Rental> {
        let mut state = self.state.write().await;
        let rental = state
            .rentals
            .get_mut(&id)
            .ok_or(AppError::NotFound(Entity::Rental))?;

        if !rental.is_active() {
            return Err(AppError::Conflict(ConflictKind::AlreadyReturned));
        }
        rental.return_date = Some(return_date);
        let closed = rental.clone();

        if let Some(item) = state.items.get_mut(&closed.item_id) {
            item.available = true;
        }
        Ok(closed)
    }
}
