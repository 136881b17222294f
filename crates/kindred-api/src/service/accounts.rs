use std::sync::{Arc, OnceLock};

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use chrono::Utc;
use tracing::{debug, error, info};
use uuid::Uuid;

use kindred_db::models::{AccountRow, NewAccount};
use kindred_db::{Database, is_unique_violation};
use kindred_types::api::{
    AccountResponse, AccountSummary, AuthResponse, Claims, LoginRequest, RegisterRequest,
};
use kindred_types::validation::Validate;

use super::blocking;
use crate::error::{ApiError, ApiResult};
use crate::tokens::{TokenIssuer, TokenSubject};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

pub struct AccountService {
    db: Arc<Database>,
    tokens: Arc<TokenIssuer>,
}

impl AccountService {
    pub fn new(db: Arc<Database>, tokens: Arc<TokenIssuer>) -> Self {
        Self { db, tokens }
    }

    pub async fn register(&self, req: RegisterRequest) -> ApiResult<AuthResponse> {
        req.validate()?;

        let email = normalize_email(&req.email);
        let username = req.username;

        let (lookup_email, lookup_username) = (email.clone(), username.clone());
        let (email_taken, username_taken) = blocking(&self.db, move |db| {
            Ok((
                db.get_account_by_email(&lookup_email)?.is_some(),
                db.get_account_by_username(&lookup_username)?.is_some(),
            ))
        })
        .await?;
        if email_taken {
            return Err(ApiError::Conflict("Email already registered".into()));
        }
        if username_taken {
            return Err(ApiError::Conflict("Username already taken".into()));
        }

        let password_hash = hash_password(req.password).await?;

        let id = Uuid::new_v4();
        let account = blocking(&self.db, move |db| {
            db.create_account(&NewAccount {
                id,
                email: &email,
                username: &username,
                password_hash: &password_hash,
                now: Utc::now(),
            })
        })
        .await
        .map_err(|e| match e {
            // Lost a race with a concurrent registration.
            ApiError::Internal(err) if is_unique_violation(&err) => {
                ApiError::Conflict("Email or username already registered".into())
            }
            other => other,
        })?;

        let token = self.issue(&account)?;
        info!("Registered account {} ({})", account.username, account.id);

        Ok(AuthResponse {
            message: "User registered successfully".into(),
            user: summary(&account),
            token,
        })
    }

    /// Unknown email and wrong password fail identically.
    pub async fn login(&self, req: LoginRequest) -> ApiResult<AuthResponse> {
        req.validate()?;

        let email = normalize_email(&req.email);
        let account = blocking(&self.db, move |db| db.get_account_by_email(&email)).await?;

        // Unknown emails still pay for one argon2 verification.
        let stored = account.as_ref().map(|a| a.password.clone());
        let verified = verify_password(req.password, stored).await?;
        let account = match account {
            Some(account) if verified => account,
            Some(account) => {
                debug!("Password mismatch for account {}", account.id);
                return Err(ApiError::Auth(INVALID_CREDENTIALS.into()));
            }
            None => return Err(ApiError::Auth(INVALID_CREDENTIALS.into())),
        };

        let id = account.id;
        blocking(&self.db, move |db| db.touch_last_login(id, Utc::now())).await?;

        let token = self.issue(&account)?;
        Ok(AuthResponse {
            message: "Login successful".into(),
            user: summary(&account),
            token,
        })
    }

    pub fn validate_token(&self, token: &str) -> ApiResult<Claims> {
        self.tokens.verify(token)
    }

    pub async fn get_account_by_id(&self, id: Uuid) -> ApiResult<AccountResponse> {
        let account = blocking(&self.db, move |db| db.get_account_by_id(id))
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

        Ok(AccountResponse {
            id: account.id,
            email: account.email,
            username: account.username,
            status: account.status,
            email_verified: account.email_verified,
            last_login: account.last_login,
            created_at: account.created_at,
            updated_at: account.updated_at,
        })
    }

    fn issue(&self, account: &AccountRow) -> ApiResult<String> {
        let token = self.tokens.sign(&TokenSubject {
            id: account.id,
            email: &account.email,
            username: &account.username,
        })?;
        Ok(token)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn summary(account: &AccountRow) -> AccountSummary {
    AccountSummary {
        id: account.id,
        email: account.email.clone(),
        username: account.username.clone(),
    }
}

/// Argon2id with a random salt, on the blocking pool.
async fn hash_password(password: String) -> ApiResult<String> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(anyhow::anyhow!("blocking task failed: {}", e))
    })?
    .map_err(ApiError::from)
}

/// Hash verified in place of a missing account so both login failures cost
/// the same.
fn dummy_hash() -> &'static str {
    static DUMMY: OnceLock<String> = OnceLock::new();
    DUMMY.get_or_init(|| {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(b"kindred-unknown-account", &salt)
            .map(|hash| hash.to_string())
            .unwrap_or_default()
    })
}

/// `stored` is `None` for an unknown account, which never verifies.
async fn verify_password(password: String, stored: Option<String>) -> ApiResult<bool> {
    tokio::task::spawn_blocking(move || {
        let known = stored.is_some();
        let hash = stored.unwrap_or_else(|| dummy_hash().to_string());
        let parsed = PasswordHash::new(&hash)
            .map_err(|e| anyhow::anyhow!("stored password hash is malformed: {}", e))?;
        let matches = Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok();
        Ok::<bool, anyhow::Error>(known && matches)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(anyhow::anyhow!("blocking task failed: {}", e))
    })?
    .map_err(ApiError::from)
}
