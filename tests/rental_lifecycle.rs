//! Rental lifecycle tests over the in-memory store

use std::sync::Arc;

use chrono::{Duration, NaiveDate};

use kreisel_server::{
    config::{AppConfig, ExtensionPolicy},
    error::{ConflictKind, Entity, RangeViolation},
    models::{
        item::{CreateItem, CreateNamed, ItemQuery},
        user::{CreateUser, Role},
        RentalScope,
    },
    repository::Repository,
    services::clock::ManualClock,
    AppError, AppState,
};

fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 6).unwrap()
}

struct Fixture {
    state: AppState,
    clock: Arc<ManualClock>,
    category_id: i32,
    location_id: i32,
}

impl Fixture {
    async fn new() -> Self {
        Self::with_config(AppConfig::default()).await
    }

    async fn with_config(config: AppConfig) -> Self {
        let clock = Arc::new(ManualClock::new(start_date()));
        let state = AppState::new(&config, Repository::in_memory(), clock.clone()).unwrap();

        let catalog = &state.services.catalog;
        let category_id = catalog
            .create_category(&CreateNamed { name: "Ski".to_string() })
            .await
            .unwrap()
            .id;
        let location_id = catalog
            .create_location(&CreateNamed { name: "Pasing".to_string() })
            .await
            .unwrap()
            .id;

        Self {
            state,
            clock,
            category_id,
            location_id,
        }
    }

    fn today(&self) -> NaiveDate {
        self.state.services.rentals.today()
    }

    fn in_days(&self, days: i64) -> NaiveDate {
        self.today() + Duration::days(days)
    }

    async fn user(&self, email: &str) -> i32 {
        self.state
            .services
            .users
            .register(&CreateUser {
                full_name: None,
                email: email.to_string(),
                password: "secret123".to_string(),
            })
            .await
            .unwrap()
            .id
    }

    async fn item(&self, name: &str) -> i32 {
        self.state
            .services
            .catalog
            .create_item(&CreateItem {
                name: name.to_string(),
                item_type: None,
                description: None,
                category_id: self.category_id,
                location_id: self.location_id,
            })
            .await
            .unwrap()
            .id
    }

    async fn available(&self, item_id: i32) -> bool {
        self.state
            .services
            .catalog
            .get_item(item_id)
            .await
            .unwrap()
            .available
    }
}

#[tokio::test]
async fn test_create_rental_marks_item_unavailable() {
    let fx = Fixture::new().await;
    let user = fx.user("max@hm.edu").await;
    let item = fx.item("Atomic Redster").await;

    let rental = fx
        .state
        .services
        .rentals
        .create_rental(user, item, Some(fx.in_days(10)))
        .await
        .unwrap();

    assert_eq!(rental.user_id, user);
    assert_eq!(rental.item_id, item);
    assert_eq!(rental.rental_date, fx.today());
    assert_eq!(rental.end_date, fx.in_days(10));
    assert_eq!(rental.return_date, None);
    assert!(!rental.extended);
    assert!(!fx.available(item).await);
}

#[tokio::test]
async fn test_second_user_cannot_rent_same_item() {
    let fx = Fixture::new().await;
    let first = fx.user("first@hm.edu").await;
    let second = fx.user("second@hm.edu").await;
    let item = fx.item("Snowboard").await;
    let rentals = &fx.state.services.rentals;

    rentals.create_rental(first, item, Some(fx.in_days(5))).await.unwrap();

    let err = rentals
        .create_rental(second, item, Some(fx.in_days(5)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(ConflictKind::ItemUnavailable)));

    let active = rentals.active_rental_for_item(item).await.unwrap();
    assert_eq!(active.map(|r| r.user_id), Some(first));
}

#[tokio::test]
async fn test_quota_of_five_active_rentals() {
    let fx = Fixture::new().await;
    let user = fx.user("busy@hm.edu").await;
    let rentals = &fx.state.services.rentals;

    for i in 0..5 {
        let item = fx.item(&format!("Helmet {}", i)).await;
        rentals.create_rental(user, item, Some(fx.in_days(7))).await.unwrap();
    }

    let sixth = fx.item("Helmet 5").await;
    let err = rentals
        .create_rental(user, sixth, Some(fx.in_days(7)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::QuotaExceeded { limit: 5 }));
    assert!(fx.available(sixth).await);

    // Returning one frees a slot
    let active = rentals.user_rentals(user, RentalScope::Active).await.unwrap();
    assert_eq!(active.len(), 5);
    rentals.return_rental(active[0].id).await.unwrap();
    rentals.create_rental(user, sixth, Some(fx.in_days(7))).await.unwrap();
}

#[tokio::test]
async fn test_end_date_window() {
    let fx = Fixture::new().await;
    let user = fx.user("window@hm.edu").await;
    let rentals = &fx.state.services.rentals;

    let item = fx.item("Poles").await;
    let err = rentals
        .create_rental(user, item, Some(fx.in_days(61)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidRange(RangeViolation::TooLong)));

    let err = rentals
        .create_rental(user, item, Some(fx.today()))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidRange(RangeViolation::ZeroDuration)));

    let err = rentals
        .create_rental(user, item, Some(fx.in_days(-1)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidRange(RangeViolation::PastDate)));

    let err = rentals.create_rental(user, item, None).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // Refusals leave no trace
    assert!(fx.available(item).await);
    assert!(rentals.list_rentals().await.unwrap().is_empty());

    let rental = rentals
        .create_rental(user, item, Some(fx.in_days(60)))
        .await
        .unwrap();
    assert_eq!(rental.end_date, fx.in_days(60));
}

#[tokio::test]
async fn test_unknown_user_or_item() {
    let fx = Fixture::new().await;
    let user = fx.user("ghost@hm.edu").await;
    let item = fx.item("Goggles").await;
    let rentals = &fx.state.services.rentals;

    let err = rentals
        .create_rental(999, item, Some(fx.in_days(3)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(Entity::User)));

    let err = rentals
        .create_rental(user, 999, Some(fx.in_days(3)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(Entity::Item)));
}

#[tokio::test]
async fn test_fixed_extension_is_used_once() {
    let fx = Fixture::new().await;
    let user = fx.user("extend@hm.edu").await;
    let item = fx.item("Touring skis").await;
    let rentals = &fx.state.services.rentals;

    let rental = rentals
        .create_rental(user, item, Some(fx.in_days(10)))
        .await
        .unwrap();

    let extended = rentals.extend_rental(rental.id, None).await.unwrap();
    assert_eq!(extended.end_date, fx.in_days(40));
    assert!(extended.extended);
    assert!(extended.is_active());

    let err = rentals.extend_rental(rental.id, None).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Conflict(ConflictKind::ExtensionAlreadyUsed)
    ));
    assert_eq!(
        rentals.get_rental(rental.id).await.unwrap().end_date,
        fx.in_days(40)
    );
}

#[tokio::test]
async fn test_fixed_extension_rejects_explicit_date() {
    let fx = Fixture::new().await;
    let user = fx.user("explicit@hm.edu").await;
    let item = fx.item("Sled").await;
    let rentals = &fx.state.services.rentals;

    let rental = rentals
        .create_rental(user, item, Some(fx.in_days(10)))
        .await
        .unwrap();

    let err = rentals
        .extend_rental(rental.id, Some(fx.in_days(20)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert!(!rentals.get_rental(rental.id).await.unwrap().extended);
}

#[tokio::test]
async fn test_caller_supplied_extension() {
    let mut config = AppConfig::default();
    config.rentals.extension_policy = ExtensionPolicy::CallerSupplied;
    let fx = Fixture::with_config(config).await;
    let user = fx.user("caller@hm.edu").await;
    let item = fx.item("Crampons").await;
    let rentals = &fx.state.services.rentals;

    let rental = rentals
        .create_rental(user, item, Some(fx.in_days(10)))
        .await
        .unwrap();

    let err = rentals.extend_rental(rental.id, None).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = rentals
        .extend_rental(rental.id, Some(fx.in_days(10)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::InvalidRange(RangeViolation::NotAfterCurrentEnd)
    ));

    let extended = rentals
        .extend_rental(rental.id, Some(fx.in_days(25)))
        .await
        .unwrap();
    assert_eq!(extended.end_date, fx.in_days(25));
    assert!(extended.extended);
}

#[tokio::test]
async fn test_return_releases_item_and_is_final() {
    let fx = Fixture::new().await;
    let user = fx.user("return@hm.edu").await;
    let other = fx.user("next@hm.edu").await;
    let item = fx.item("Avalanche beacon").await;
    let rentals = &fx.state.services.rentals;

    let rental = rentals
        .create_rental(user, item, Some(fx.in_days(14)))
        .await
        .unwrap();

    fx.clock.advance(3);
    let returned = rentals.return_rental(rental.id).await.unwrap();
    assert_eq!(returned.return_date, Some(start_date() + Duration::days(3)));
    assert!(!returned.is_active());
    assert!(fx.available(item).await);
    assert!(rentals.active_rental_for_item(item).await.unwrap().is_none());

    let err = rentals.return_rental(rental.id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(ConflictKind::AlreadyReturned)));
    let err = rentals.extend_rental(rental.id, None).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(ConflictKind::AlreadyReturned)));

    let history = rentals.user_rentals(user, RentalScope::History).await.unwrap();
    assert_eq!(history.len(), 1);
    assert!(rentals
        .user_rentals(user, RentalScope::Active)
        .await
        .unwrap()
        .is_empty());

    // The item can go out again
    rentals
        .create_rental(other, item, Some(fx.in_days(2)))
        .await
        .unwrap();
    assert!(!fx.available(item).await);
}

#[tokio::test]
async fn test_overdue_rentals() {
    let fx = Fixture::new().await;
    let user = fx.user("late@hm.edu").await;
    let item = fx.item("Ice axe").await;
    let rentals = &fx.state.services.rentals;

    let rental = rentals
        .create_rental(user, item, Some(fx.in_days(2)))
        .await
        .unwrap();

    fx.clock.advance(2);
    assert!(rentals.overdue_rentals().await.unwrap().is_empty());

    fx.clock.advance(1);
    let overdue = rentals.overdue_rentals().await.unwrap();
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].id, rental.id);
    assert!(overdue[0].is_overdue(fx.today()));

    rentals.return_rental(rental.id).await.unwrap();
    assert!(rentals.overdue_rentals().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_user_rentals_require_existing_user() {
    let fx = Fixture::new().await;
    let err = fx
        .state
        .services
        .rentals
        .user_rentals(42, RentalScope::All)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(Entity::User)));

    let err = fx
        .state
        .services
        .rentals
        .active_rental_for_item(42)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(Entity::Item)));
}

#[tokio::test]
async fn test_concurrent_rentals_of_one_item() {
    let fx = Fixture::new().await;
    let item = fx.item("Last snowboard").await;
    let mut users = Vec::new();
    for i in 0..8 {
        users.push(fx.user(&format!("racer{}@hm.edu", i)).await);
    }

    let end_date = fx.in_days(5);
    let handles: Vec<_> = users
        .into_iter()
        .map(|user| {
            let rentals = fx.state.services.rentals.clone();
            tokio::spawn(async move { rentals.create_rental(user, item, Some(end_date)).await })
        })
        .collect();

    let mut won = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => won += 1,
            Err(AppError::Conflict(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(won, 1);

    let all = fx.state.services.rentals.list_rentals().await.unwrap();
    assert_eq!(all.iter().filter(|r| r.is_active()).count(), 1);
}

#[tokio::test]
async fn test_admin_role_and_catalog_filter() {
    let fx = Fixture::new().await;
    let admin = fx
        .state
        .services
        .users
        .register(&CreateUser {
            full_name: Some("Admin".to_string()),
            email: "admin.pool@hm.edu".to_string(),
            password: "secret123".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(admin.role, Role::Admin);

    let user = fx.user("plain@hm.edu").await;
    let rented = fx.item("Rented board").await;
    fx.item("Free board").await;
    fx.state
        .services
        .rentals
        .create_rental(user, rented, Some(fx.in_days(1)))
        .await
        .unwrap();

    let free = fx
        .state
        .services
        .catalog
        .list_items(&ItemQuery {
            available: Some(true),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(free.len(), 1);
    assert_eq!(free[0].name, "Free board");

    let err = fx.state.services.catalog.delete_item(rented).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(ConflictKind::ItemHasRentals)));
}
