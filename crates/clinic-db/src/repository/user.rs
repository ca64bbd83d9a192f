//! # User Repository
//!
//! Staff accounts and credential checks.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::password::{hash_password, verify_password};
use clinic_core::validation::validate_new_user;
use clinic_core::{NewUser, User};

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Creates an active user. The password is stored as an argon2 hash.
    pub async fn create(&self, new: &NewUser) -> DbResult<User> {
        validate_new_user(new)?;

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            username: new.username.trim().to_lowercase(),
            password_hash: hash_password(&new.password)?,
            full_name: new.full_name.trim().to_string(),
            role: new.role,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO users (
                id, username, password_hash, full_name, role, is_active,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(user.role)
        .bind(user.is_active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            err if err.is_unique_violation_on("username") => {
                DbError::duplicate("username", &user.username)
            }
            err => err,
        })?;

        info!(username = %user.username, role = %user.role, "User created");
        Ok(user)
    }

    /// Gets a user by ID.
    pub async fn get(&self, id: &str) -> DbResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))
    }

    /// Finds a user by username (case-insensitive).
    pub async fn find_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?1")
            .bind(username.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Lists all users by username.
    pub async fn list(&self) -> DbResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY username")
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    /// Counts users.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Checks a username/password pair.
    ///
    /// `None` for an unknown user, a wrong password or an inactive account;
    /// callers must not tell these apart in their response.
    pub async fn authenticate(&self, username: &str, password: &str) -> DbResult<Option<User>> {
        debug!(username, "Authenticating user");

        let Some(user) = self.find_by_username(username).await? else {
            warn!(username, "Login attempt for unknown user");
            return Ok(None);
        };

        if !user.is_active {
            warn!(username = %user.username, "Login attempt for inactive user");
            return Ok(None);
        }

        if !verify_password(password, &user.password_hash) {
            warn!(username = %user.username, "Login attempt with wrong password");
            return Ok(None);
        }

        Ok(Some(user))
    }
}
