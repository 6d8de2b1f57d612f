use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};
use tokio::task;

use crate::config::SecurityConfig;
use crate::entities::{companies, profiles, users};

/// User projection returned from the repository (never carries the
/// password hash).
#[derive(Debug, Clone)]
pub struct UserAccount {
    pub id: i32,
    pub email: String,
    pub name: String,
    pub active: bool,
    pub profile_code: String,
    pub profile_level: i32,
    pub company_id: Option<i32>,
    pub company_name: Option<String>,
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Get user by email, together with the stored password hash.
    /// The hash is returned separately so callers can verify without the
    /// projection ever carrying it.
    pub async fn get_by_email_with_password(
        &self,
        email: &str,
    ) -> Result<Option<(UserAccount, Option<String>)>> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")?;

        let Some(user) = user else {
            return Ok(None);
        };

        let password_hash = user.password_hash.clone();
        let account = self.project(user).await?;
        Ok(Some((account, password_hash)))
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<UserAccount>> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        match user {
            Some(user) => Ok(Some(self.project(user).await?)),
            None => Ok(None),
        }
    }

    /// Create a user with a hashed password. The company, when given,
    /// must exist.
    pub async fn create(
        &self,
        email: &str,
        password: &str,
        name: &str,
        profile_id: i32,
        company_id: Option<i32>,
        config: &SecurityConfig,
    ) -> Result<UserAccount> {
        if let Some(company_id) = company_id {
            companies::Entity::find_by_id(company_id)
                .one(&self.conn)
                .await
                .context("Failed to query company")?
                .ok_or_else(|| anyhow::anyhow!("Company {company_id} not found"))?;
        }

        let password = password.to_string();
        let config = config.clone();
        let hash = task::spawn_blocking(move || hash_password(&password, Some(&config)))
            .await
            .context("Password hashing task panicked")??;

        let now = chrono::Utc::now().to_rfc3339();

        let model = users::ActiveModel {
            email: Set(email.to_string()),
            password_hash: Set(Some(hash)),
            name: Set(name.to_string()),
            active: Set(true),
            profile_id: Set(profile_id),
            company_id: Set(company_id),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let inserted = model
            .insert(&self.conn)
            .await
            .context("Failed to insert user")?;

        self.project(inserted).await
    }

    /// Re-hash and store a new password for the user.
    pub async fn update_password(
        &self,
        user_id: i32,
        new_password: &str,
        config: &SecurityConfig,
    ) -> Result<()> {
        let user = users::Entity::find_by_id(user_id)
            .one(&self.conn)
            .await
            .context("Failed to query user for password update")?
            .ok_or_else(|| anyhow::anyhow!("User {user_id} not found"))?;

        let password = new_password.to_string();
        let config = config.clone();
        let new_hash = task::spawn_blocking(move || hash_password(&password, Some(&config)))
            .await
            .context("Password hashing task panicked")??;

        let now = chrono::Utc::now().to_rfc3339();

        let mut active: users::ActiveModel = user.into();
        active.password_hash = Set(Some(new_hash));
        active.updated_at = Set(now);
        active.update(&self.conn).await?;

        Ok(())
    }

    pub async fn count(&self) -> Result<u64> {
        let count = users::Entity::find()
            .count(&self.conn)
            .await
            .context("Failed to count users")?;
        Ok(count)
    }

    async fn project(&self, user: users::Model) -> Result<UserAccount> {
        let profile = profiles::Entity::find_by_id(user.profile_id)
            .one(&self.conn)
            .await
            .context("Failed to query profile")?
            .ok_or_else(|| anyhow::anyhow!("Profile {} not found", user.profile_id))?;

        let company_name = match user.company_id {
            Some(company_id) => companies::Entity::find_by_id(company_id)
                .one(&self.conn)
                .await
                .context("Failed to query company")?
                .map(|c| c.name),
            None => None,
        };

        Ok(UserAccount {
            id: user.id,
            email: user.email,
            name: user.name,
            active: user.active,
            profile_code: profile.code,
            profile_level: profile.level,
            company_id: user.company_id,
            company_name,
        })
    }
}

/// Hash a password using Argon2id with optional custom params.
/// If config is None, uses default params.
pub fn hash_password(password: &str, config: Option<&SecurityConfig>) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let argon2 = if let Some(cfg) = config {
        let params = Params::new(
            cfg.argon2_memory_cost_kib,
            cfg.argon2_time_cost,
            cfg.argon2_parallelism,
            None,
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    } else {
        Argon2::default()
    };

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Verify a password against a stored hash.
/// Note: runs in `spawn_blocking` because Argon2 is CPU-intensive and
/// would block the async runtime if run directly.
pub async fn verify_password(stored_hash: String, password: String) -> Result<bool> {
    let is_valid = task::spawn_blocking(move || {
        let parsed_hash = PasswordHash::new(&stored_hash)
            .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

        let argon2 = Argon2::default();
        Ok::<bool, anyhow::Error>(
            argon2
                .verify_password(password.as_bytes(), &parsed_hash)
                .is_ok(),
        )
    })
    .await
    .context("Password verification task panicked")??;

    Ok(is_valid)
}
