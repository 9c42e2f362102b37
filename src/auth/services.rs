use std::sync::Arc;

use anyhow::Context;
use lazy_static::lazy_static;
use regex::Regex;
use tokio::sync::OnceCell;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::{
    claims::Role,
    jwt::JwtKeys,
    password::HashedPassword,
    repo::UserStore,
    repo_types::{NewUser, User},
};
use crate::error::AppError;

const FIELDS_REQUIRED: &str = "All fields are required";

/// Plaintext behind the decoy hash checked when the email is unknown.
const DECOY_PASSWORD: &str = "decoy-password-for-unknown-accounts";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Validated registration input.
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

impl Registration {
    /// Trims and lowercases the email, rejects blanks and unknown roles.
    pub fn parse(
        name: Option<String>,
        email: Option<String>,
        password: Option<String>,
        role: Option<String>,
    ) -> Result<Self, AppError> {
        let name = present(name.as_deref().map(str::trim))?.to_string();
        let email = normalize_email(present(email.as_deref())?);
        if email.is_empty() {
            return Err(AppError::Validation(FIELDS_REQUIRED.into()));
        }
        let password = present(password.as_deref())?.to_string();
        let role = match role {
            Some(r) => r
                .parse::<Role>()
                .map_err(|_| AppError::Validation("Invalid role".into()))?,
            None => Role::default(),
        };
        Ok(Self {
            name,
            email,
            password,
            role,
        })
    }
}

fn present(value: Option<&str>) -> Result<&str, AppError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::Validation(FIELDS_REQUIRED.into())),
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Registration, login and password changes against a credential store.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn UserStore>,
    keys: JwtKeys,
    strict_validation: bool,
    /// Hashed on first use; lets unknown-email logins cost one Argon2 verify like the rest.
    decoy: Arc<OnceCell<HashedPassword>>,
}

impl AuthService {
    pub fn new(store: Arc<dyn UserStore>, keys: JwtKeys, strict_validation: bool) -> Self {
        Self {
            store,
            keys,
            strict_validation,
            decoy: Arc::new(OnceCell::new()),
        }
    }

    pub fn keys(&self) -> &JwtKeys {
        &self.keys
    }

    pub fn store(&self) -> &Arc<dyn UserStore> {
        &self.store
    }

    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: Registration) -> Result<User, AppError> {
        if self.strict_validation && !is_valid_email(&input.email) {
            warn!("invalid email");
            return Err(AppError::Validation("Invalid email".into()));
        }

        if self.store.find_by_email(&input.email).await?.is_some() {
            warn!("email already registered");
            return Err(AppError::Conflict);
        }

        let password = hash_blocking(input.password).await?;
        // A concurrent registration can still win the race; the store's unique key reports it.
        let user = self
            .store
            .insert(NewUser {
                name: input.name,
                email: input.email,
                password,
                role: input.role,
            })
            .await?;

        info!(user_id = %user.id, role = %user.role, "user registered");
        Ok(user)
    }

    /// Returns a signed token. Every credential failure yields the same error.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<String, AppError> {
        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            return Err(AppError::Validation(FIELDS_REQUIRED.into()));
        }

        let Some(user) = self.store.find_by_email(&email).await? else {
            let decoy = self
                .decoy
                .get_or_try_init(|| hash_blocking(DECOY_PASSWORD.to_string()))
                .await?;
            verify_blocking(decoy.clone(), password.to_string()).await?;
            warn!("login unknown email");
            return Err(AppError::Authentication);
        };

        if !verify_blocking(user.password.clone(), password.to_string()).await? {
            warn!(user_id = %user.id, "login invalid password");
            return Err(AppError::Authentication);
        }

        if !user.is_active {
            warn!(user_id = %user.id, "login inactive account");
            return Err(AppError::Authentication);
        }

        let token = self.keys.sign(user.id, user.role)?;
        info!(user_id = %user.id, "user logged in");
        Ok(token)
    }

    /// Re-hashes and stores a new password. The only path that hashes an existing user's password.
    #[instrument(skip(self, new_password))]
    pub async fn change_password(&self, user_id: Uuid, new_password: &str) -> Result<(), AppError> {
        if new_password.is_empty() {
            return Err(AppError::Validation("Password is required".into()));
        }
        let hashed = hash_blocking(new_password.to_string()).await?;
        if !self.store.update_password(user_id, &hashed).await? {
            return Err(AppError::NotFound);
        }
        info!("password changed");
        Ok(())
    }
}

async fn hash_blocking(plain: String) -> Result<HashedPassword, AppError> {
    let hashed = tokio::task::spawn_blocking(move || HashedPassword::hash(&plain))
        .await
        .context("hash task")??;
    Ok(hashed)
}

async fn verify_blocking(hash: HashedPassword, plain: String) -> Result<bool, AppError> {
    let ok = tokio::task::spawn_blocking(move || hash.verify(&plain))
        .await
        .context("verify task")??;
    Ok(ok)
}
