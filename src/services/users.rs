//! User registration and lookup

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};
use regex::Regex;
use validator::Validate;

use crate::{
    config::UsersConfig,
    error::{AppError, AppResult, ConflictKind, Entity},
    models::user::{CreateUser, NewUser, Role, User},
    repository::Repository,
};

/// Email local parts with this prefix register as administrators
const ADMIN_PREFIX: &str = "admin";

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: UsersConfig,
    email_pattern: Regex,
}

impl UsersService {
    pub fn new(repository: Repository, config: UsersConfig) -> AppResult<Self> {
        let email_pattern = Regex::new(&format!(
            r"^[A-Za-z0-9._%+-]+@{}$",
            regex::escape(&config.email_domain)
        ))
        .map_err(|e| AppError::Internal(format!("Invalid email domain pattern: {}", e)))?;

        Ok(Self {
            repository,
            config,
            email_pattern,
        })
    }

    /// Whether `email` belongs to the institution domain
    pub fn is_institution_email(&self, email: &str) -> bool {
        self.email_pattern.is_match(email)
    }

    /// Register a new user
    ///
    /// Emails are stored lowercased; the admin prefix is matched against the
    /// address as submitted.
    pub async fn register(&self, data: &CreateUser) -> AppResult<User> {
        data.validate()?;

        let submitted = data.email.trim();
        if !self.is_institution_email(submitted) {
            return Err(AppError::Validation(format!(
                "Only @{} email addresses are allowed",
                self.config.email_domain
            )));
        }
        if data.password.chars().count() < self.config.min_password_length {
            return Err(AppError::Validation(format!(
                "Password must be at least {} characters",
                self.config.min_password_length
            )));
        }

        let email = submitted.to_lowercase();
        if self
            .repository
            .users
            .find_user_by_email(&email)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(ConflictKind::EmailTaken));
        }

        let role = if submitted.starts_with(ADMIN_PREFIX) {
            Role::Admin
        } else {
            Role::User
        };

        // The store's unique index still guards concurrent registrations
        let user = self
            .repository
            .users
            .insert_user(&NewUser {
                full_name: data.full_name.clone(),
                email,
                password_hash: hash_password(&data.password)?,
                role,
            })
            .await?;

        tracing::info!(user_id = user.id, role = %user.role, "User registered");
        Ok(user)
    }

    pub async fn get_user(&self, id: i32) -> AppResult<User> {
        self.repository
            .users
            .find_user(id)
            .await?
            .ok_or(AppError::NotFound(Entity::User))
    }

    pub async fn list_users(&self) -> AppResult<Vec<User>> {
        self.repository.users.list_users().await
    }
}

/// Hash a password using Argon2
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> UsersService {
        UsersService::new(Repository::in_memory(), UsersConfig::default()).unwrap()
    }

    fn request(email: &str, password: &str) -> CreateUser {
        CreateUser {
            full_name: Some("Test".to_string()),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_email_domain_is_enforced() {
        let svc = service();
        assert!(svc.is_institution_email("lena.huber@hm.edu"));
        assert!(!svc.is_institution_email("lena@gmail.com"));
        assert!(!svc.is_institution_email("lena@hm.edu.evil.com"));
        assert!(!svc.is_institution_email("lena@hmxedu"));
    }

    #[tokio::test]
    async fn test_register_assigns_roles_and_hashes_password() {
        let svc = service();

        let user = svc.register(&request("lena@hm.edu", "secret1")).await.unwrap();
        assert_eq!(user.role, Role::User);
        assert_ne!(user.password, "secret1");
        assert!(user.password.starts_with("$argon2"));

        let admin = svc.register(&request("admin.kurt@hm.edu", "secret1")).await.unwrap();
        assert!(admin.is_admin());
    }

    #[tokio::test]
    async fn test_register_rejections() {
        let svc = service();

        let err = svc.register(&request("lena@gmail.com", "secret1")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = svc.register(&request("lena@hm.edu", "short")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        svc.register(&request("lena@hm.edu", "secret1")).await.unwrap();
        let err = svc.register(&request("lena@hm.edu", "secret2")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(ConflictKind::EmailTaken)));
    }

    #[tokio::test]
    async fn test_email_is_stored_lowercased_and_unique_across_case() {
        let svc = service();

        let user = svc.register(&request("MAX.Muster@hm.edu", "secret1")).await.unwrap();
        assert_eq!(user.email, "max.muster@hm.edu");

        let err = svc.register(&request("max.muster@hm.edu", "secret2")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(ConflictKind::EmailTaken)));
    }

    #[tokio::test]
    async fn test_admin_prefix_is_case_sensitive() {
        let svc = service();

        let user = svc.register(&request("Admin.x@hm.edu", "secret1")).await.unwrap();
        assert_eq!(user.role, Role::User);
        assert_eq!(user.email, "admin.x@hm.edu");
    }

    #[tokio::test]
    async fn test_duplicate_email_never_reaches_insert() {
        let mut users = crate::repository::MockUserStore::new();
        users
            .expect_find_user_by_email()
            .withf(|email| email == "max@hm.edu")
            .returning(|_| {
                Ok(Some(User {
                    id: 1,
                    full_name: None,
                    email: "max@hm.edu".to_string(),
                    password: String::new(),
                    role: Role::User,
                }))
            });
        users.expect_insert_user().never();

        let repository = Repository::new(
            std::sync::Arc::new(crate::repository::MockCatalogStore::new()),
            std::sync::Arc::new(users),
            std::sync::Arc::new(crate::repository::MockRentalLedger::new()),
        );
        let svc = UsersService::new(repository, UsersConfig::default()).unwrap();

        let err = svc.register(&request("MAX@hm.edu", "secret1")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(ConflictKind::EmailTaken)));
    }
}
