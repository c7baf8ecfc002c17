//! Authentication manager implementation.

use super::{
    errors::{AuthError, AuthResult},
    mailer::Mailer,
    models::{AccessTokenClaims, LoginRequest, RegisterRequest, SessionTokens, User, UserId},
};
use crate::stats::{StatsError, StatsManager};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::{postgres::PgRow, PgPool, Row};
use std::sync::Arc;
use uuid::Uuid;

/// How long verification codes and reset tokens stay valid
const CODE_VALIDITY_MINUTES: i64 = 10;

/// Authentication manager
#[derive(Clone)]
pub struct AuthManager {
    pool: Arc<PgPool>,
    stats: Arc<StatsManager>,
    mailer: Arc<dyn Mailer>,
    pepper: String,
    jwt_secret: String,
    access_token_duration: Duration,
    refresh_token_duration: Duration,
}

impl AuthManager {
    /// Create a new authentication manager
    ///
    /// # Arguments
    ///
    /// * `pool` - Database connection pool
    /// * `stats` - Profile store; every new account gets a profile
    /// * `mailer` - Outbound email delivery
    /// * `pepper` - Server-side pepper for password hashing
    /// * `jwt_secret` - Secret key for JWT signing
    pub fn new(
        pool: Arc<PgPool>,
        stats: Arc<StatsManager>,
        mailer: Arc<dyn Mailer>,
        pepper: String,
        jwt_secret: String,
    ) -> Self {
        Self {
            pool,
            stats,
            mailer,
            pepper,
            jwt_secret,
            access_token_duration: Duration::minutes(15),
            refresh_token_duration: Duration::days(7),
        }
    }

    /// Register a new user and create their player profile
    ///
    /// # Errors
    ///
    /// * `AuthError::UsernameTaken` - Username already exists
    /// * `AuthError::EmailTaken` - Email already exists
    /// * `AuthError::InvalidUsername` - Username format invalid
    /// * `AuthError::InvalidEmail` - Email format invalid
    /// * `AuthError::WeakPassword` - Password too weak
    pub async fn register(&self, request: RegisterRequest) -> AuthResult<User> {
        self.validate_username(&request.username)?;
        self.validate_email(&request.email)?;
        self.validate_password(&request.password)?;

        let existing_user = sqlx::query("SELECT id FROM users WHERE username = $1")
            .bind(&request.username)
            .fetch_optional(self.pool.as_ref())
            .await?;
        if existing_user.is_some() {
            return Err(AuthError::UsernameTaken);
        }

        let existing_email = sqlx::query("SELECT id FROM users WHERE email = $1")
            .bind(&request.email)
            .fetch_optional(self.pool.as_ref())
            .await?;
        if existing_email.is_some() {
            return Err(AuthError::EmailTaken);
        }

        // Hash password with Argon2id + pepper
        let password_hash = self.hash_password(&request.password)?;

        let row = sqlx::query(
            r#"
            INSERT INTO users (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, username, email, avatar_url, is_email_verified, is_banned, is_admin,
                      created_at, last_login
            "#,
        )
        .bind(&request.username)
        .bind(&request.email)
        .bind(&password_hash)
        .fetch_one(self.pool.as_ref())
        .await?;

        let user = row_to_user(&row);

        // Every account gets a stats profile
        self.stats
            .create_profile(user.id, &user.username)
            .await
            .map_err(|e| match e {
                StatsError::Database(e) => AuthError::Database(e),
                other => AuthError::Database(sqlx::Error::Protocol(other.to_string())),
            })?;

        // Kick off email verification; delivery is best-effort
        if let Err(e) = self.send_verification_code(&user).await {
            log::warn!("Could not send verification code to user {}: {e}", user.id);
        }

        Ok(user)
    }

    /// Login a user
    ///
    /// # Errors
    ///
    /// * `AuthError::UserNotFound` - User doesn't exist
    /// * `AuthError::InvalidCredentials` - Incorrect password
    /// * `AuthError::AccountBanned` - Account is banned
    pub async fn login(
        &self,
        request: LoginRequest,
        device_fingerprint: String,
    ) -> AuthResult<(User, SessionTokens)> {
        let user_row = sqlx::query(
            r#"
            SELECT id, username, email, password_hash, avatar_url, is_email_verified, is_banned,
                   is_admin, created_at, last_login
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(&request.username)
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or(AuthError::UserNotFound)?;

        let password_hash: String = user_row.get("password_hash");
        self.verify_password(&request.password, &password_hash)?;

        let user = row_to_user(&user_row);
        if user.is_banned {
            return Err(AuthError::AccountBanned);
        }

        sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(user.id)
            .execute(self.pool.as_ref())
            .await?;

        let tokens = self
            .create_session(user.id, &user.username, user.is_admin, device_fingerprint)
            .await?;

        Ok((user, tokens))
    }

    /// Fetch a user account
    pub async fn get_user(&self, user_id: UserId) -> AuthResult<User> {
        let row = sqlx::query(
            r#"
            SELECT id, username, email, avatar_url, is_email_verified, is_banned, is_admin,
                   created_at, last_login
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or(AuthError::UserNotFound)?;

        Ok(row_to_user(&row))
    }

    /// Create a new session with access and refresh tokens
    async fn create_session(
        &self,
        user_id: UserId,
        username: &str,
        is_admin: bool,
        device_fingerprint: String,
    ) -> AuthResult<SessionTokens> {
        let access_token = self.generate_access_token(user_id, username, is_admin)?;
        let refresh_token = Uuid::new_v4().to_string();

        let expires_at = Utc::now() + self.refresh_token_duration;
        sqlx::query(
            r#"
            INSERT INTO sessions (token, user_id, device_fingerprint, expires_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&refresh_token)
        .bind(user_id)
        .bind(&device_fingerprint)
        .bind(expires_at.naive_utc())
        .execute(self.pool.as_ref())
        .await?;

        Ok(SessionTokens {
            access_token,
            refresh_token,
        })
    }

    /// Refresh access token using refresh token. The refresh token is
    /// rotated: the old one is deleted and a new pair is issued.
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidRefreshToken` - Refresh token not found or wrong device
    /// * `AuthError::SessionExpired` - Refresh token expired
    pub async fn refresh_token(
        &self,
        refresh_token: String,
        device_fingerprint: String,
    ) -> AuthResult<SessionTokens> {
        let session_row = sqlx::query(
            "SELECT token, user_id, device_fingerprint, expires_at FROM sessions WHERE token = $1",
        )
        .bind(&refresh_token)
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or(AuthError::InvalidRefreshToken)?;

        let expires_at = session_row
            .get::<chrono::NaiveDateTime, _>("expires_at")
            .and_utc();
        if expires_at < Utc::now() {
            sqlx::query("DELETE FROM sessions WHERE token = $1")
                .bind(&refresh_token)
                .execute(self.pool.as_ref())
                .await?;
            return Err(AuthError::SessionExpired);
        }

        let stored_fingerprint: String = session_row.get("device_fingerprint");
        if stored_fingerprint != device_fingerprint {
            return Err(AuthError::InvalidRefreshToken);
        }

        let user_id: i64 = session_row.get("user_id");
        let user = self.get_user(user_id).await?;
        if user.is_banned {
            return Err(AuthError::AccountBanned);
        }

        // Rotation: old token dies with this request
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(&refresh_token)
            .execute(self.pool.as_ref())
            .await?;

        self.create_session(user_id, &user.username, user.is_admin, device_fingerprint)
            .await
    }

    /// Logout user by invalidating refresh token
    pub async fn logout(&self, refresh_token: String) -> AuthResult<()> {
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(&refresh_token)
            .execute(self.pool.as_ref())
            .await?;
        Ok(())
    }

    /// Verify an access token and return its claims
    pub fn verify_access_token(&self, token: &str) -> AuthResult<AccessTokenClaims> {
        let token_data = decode::<AccessTokenClaims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )?;

        Ok(token_data.claims)
    }

    /// Generate a fresh 6-digit verification code and mail it
    pub async fn request_email_verification(&self, user_id: UserId) -> AuthResult<()> {
        let user = self.get_user(user_id).await?;
        if user.is_email_verified {
            return Err(AuthError::AlreadyVerified);
        }
        self.send_verification_code(&user).await
    }

    async fn send_verification_code(&self, user: &User) -> AuthResult<()> {
        let code = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000));
        let expires_at = Utc::now() + Duration::minutes(CODE_VALIDITY_MINUTES);

        sqlx::query(
            r#"
            UPDATE users
            SET email_verification_code = $1, email_verification_expires_at = $2
            WHERE id = $3
            "#,
        )
        .bind(&code)
        .bind(expires_at.naive_utc())
        .bind(user.id)
        .execute(self.pool.as_ref())
        .await?;

        if let Err(e) = self
            .mailer
            .send(
                &user.email,
                "Verify your email",
                &format!("Your verification code is {code}. It expires in {CODE_VALIDITY_MINUTES} minutes."),
            )
            .await
        {
            log::warn!("Verification mail to user {} failed: {e}", user.id);
        }
        Ok(())
    }

    /// Confirm a 6-digit verification code
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidVerificationCode` - Wrong or expired code
    pub async fn verify_email(&self, user_id: UserId, code: &str) -> AuthResult<()> {
        let row = sqlx::query(
            r#"
            SELECT email_verification_code, email_verification_expires_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or(AuthError::UserNotFound)?;

        let stored: Option<String> = row.get("email_verification_code");
        let expires_at: Option<chrono::NaiveDateTime> = row.get("email_verification_expires_at");

        let valid = match (stored, expires_at) {
            (Some(stored), Some(expires_at)) => {
                stored == code && expires_at.and_utc() >= Utc::now()
            }
            _ => false,
        };
        if !valid {
            return Err(AuthError::InvalidVerificationCode);
        }

        sqlx::query(
            r#"
            UPDATE users
            SET is_email_verified = TRUE,
                email_verification_code = NULL,
                email_verification_expires_at = NULL
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .execute(self.pool.as_ref())
        .await?;
        Ok(())
    }

    /// Start a password reset. Always succeeds for well-formed requests so
    /// that account existence is not leaked; only the stored digest of the
    /// token ever touches the database.
    pub async fn request_password_reset(&self, email: &str) -> AuthResult<()> {
        let row = sqlx::query("SELECT id, email FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(self.pool.as_ref())
            .await?;
        let Some(row) = row else {
            return Ok(());
        };
        let user_id: i64 = row.get("id");

        let token = hex::encode(rand::thread_rng().gen::<[u8; 32]>());
        let digest = hex::encode(Sha256::digest(token.as_bytes()));
        let expires_at = Utc::now() + Duration::minutes(CODE_VALIDITY_MINUTES);

        sqlx::query(
            r#"
            UPDATE users
            SET password_reset_digest = $1, password_reset_expires_at = $2
            WHERE id = $3
            "#,
        )
        .bind(&digest)
        .bind(expires_at.naive_utc())
        .bind(user_id)
        .execute(self.pool.as_ref())
        .await?;

        if let Err(e) = self
            .mailer
            .send(
                email,
                "Password reset",
                &format!("Your password reset token is {token}. It expires in {CODE_VALIDITY_MINUTES} minutes."),
            )
            .await
        {
            log::warn!("Password reset mail to user {user_id} failed: {e}");
        }
        Ok(())
    }

    /// Complete a password reset. All of the user's sessions are revoked.
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidResetToken` - Wrong or expired token
    /// * `AuthError::WeakPassword` - New password too weak
    pub async fn reset_password(&self, token: &str, new_password: &str) -> AuthResult<()> {
        self.validate_password(new_password)?;

        let digest = hex::encode(Sha256::digest(token.as_bytes()));
        let row = sqlx::query(
            "SELECT id, password_reset_expires_at FROM users WHERE password_reset_digest = $1",
        )
        .bind(&digest)
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or(AuthError::InvalidResetToken)?;

        let user_id: i64 = row.get("id");
        let expires_at: Option<chrono::NaiveDateTime> = row.get("password_reset_expires_at");
        if expires_at.map(|e| e.and_utc() < Utc::now()).unwrap_or(true) {
            return Err(AuthError::InvalidResetToken);
        }

        let password_hash = self.hash_password(new_password)?;
        sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $1,
                password_reset_digest = NULL,
                password_reset_expires_at = NULL
            WHERE id = $2
            "#,
        )
        .bind(&password_hash)
        .bind(user_id)
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(self.pool.as_ref())
            .await?;
        Ok(())
    }

    /// Hash password with Argon2id + pepper
    fn hash_password(&self, password: &str) -> AuthResult<String> {
        let peppered = format!("{}{}", password, self.pepper);
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        Ok(argon2
            .hash_password(peppered.as_bytes(), &salt)
            .map_err(|_| AuthError::HashingFailed)?
            .to_string())
    }

    /// Verify password against hash
    fn verify_password(&self, password: &str, hash: &str) -> AuthResult<()> {
        let peppered = format!("{}{}", password, self.pepper);
        let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
        let argon2 = Argon2::default();

        argon2
            .verify_password(peppered.as_bytes(), &parsed_hash)
            .map_err(|_| AuthError::InvalidCredentials)
    }

    /// Generate JWT access token
    fn generate_access_token(
        &self,
        user_id: UserId,
        username: &str,
        is_admin: bool,
    ) -> AuthResult<String> {
        let now = Utc::now();
        let claims = AccessTokenClaims {
            sub: user_id,
            username: username.to_string(),
            is_admin,
            exp: (now + self.access_token_duration).timestamp(),
            iat: now.timestamp(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )?;

        Ok(token)
    }

    /// Validate username format
    fn validate_username(&self, username: &str) -> AuthResult<()> {
        let len = username.len();
        if !(3..=20).contains(&len) {
            return Err(AuthError::InvalidUsername(
                "Username must be 3-20 characters".to_string(),
            ));
        }

        if !username.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(AuthError::InvalidUsername(
                "Username can only contain letters, numbers, and underscores".to_string(),
            ));
        }

        Ok(())
    }

    /// Shallow email shape check; real validation is the verification code
    fn validate_email(&self, email: &str) -> AuthResult<()> {
        let Some((local, domain)) = email.split_once('@') else {
            return Err(AuthError::InvalidEmail);
        };
        if local.is_empty() || domain.is_empty() || !domain.contains('.') {
            return Err(AuthError::InvalidEmail);
        }
        Ok(())
    }

    /// Validate password strength
    fn validate_password(&self, password: &str) -> AuthResult<()> {
        if password.len() < 8 {
            return Err(AuthError::WeakPassword(
                "Password must be at least 8 characters".to_string(),
            ));
        }

        let has_digit = password.chars().any(|c| c.is_ascii_digit());
        let has_uppercase = password.chars().any(|c| c.is_ascii_uppercase());
        let has_lowercase = password.chars().any(|c| c.is_ascii_lowercase());

        if !has_digit || !has_uppercase || !has_lowercase {
            return Err(AuthError::WeakPassword(
                "Password must contain at least one number, one uppercase and one lowercase letter"
                    .to_string(),
            ));
        }

        Ok(())
    }
}

fn row_to_user(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        avatar_url: row.get("avatar_url"),
        is_email_verified: row.get("is_email_verified"),
        is_banned: row.get("is_banned"),
        is_admin: row.get("is_admin"),
        created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
        last_login: row
            .get::<Option<chrono::NaiveDateTime>, _>("last_login")
            .map(|dt| dt.and_utc()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::mailer::LogMailer;

    // The pool's maintenance tasks need a Tokio runtime even for a lazy
    // connection, hence #[tokio::test] on tests that never query
    fn manager() -> AuthManager {
        // connect_lazy never touches the network; these tests only exercise
        // the pure validation and token paths
        let pool = Arc::new(PgPool::connect_lazy("postgres://localhost/unused").unwrap());
        AuthManager::new(
            pool.clone(),
            Arc::new(StatsManager::new(pool)),
            Arc::new(LogMailer),
            "test_pepper".to_string(),
            "test_jwt_secret".to_string(),
        )
    }

    #[tokio::test]
    async fn test_username_validation() {
        let m = manager();
        assert!(m.validate_username("alice_99").is_ok());
        assert!(m.validate_username("ab").is_err());
        assert!(m.validate_username("has space").is_err());
        assert!(m.validate_username(&"x".repeat(21)).is_err());
    }

    #[tokio::test]
    async fn test_email_validation() {
        let m = manager();
        assert!(m.validate_email("alice@example.com").is_ok());
        assert!(m.validate_email("no-at-sign").is_err());
        assert!(m.validate_email("@example.com").is_err());
        assert!(m.validate_email("alice@nodot").is_err());
    }

    #[tokio::test]
    async fn test_password_validation() {
        let m = manager();
        assert!(m.validate_password("GoodPass1").is_ok());
        assert!(m.validate_password("short1A").is_err());
        assert!(m.validate_password("nouppercase1").is_err());
        assert!(m.validate_password("NODIGITSHERE").is_err());
    }

    #[tokio::test]
    async fn test_access_token_round_trip() {
        let m = manager();
        let token = m.generate_access_token(42, "alice", true).unwrap();
        let claims = m.verify_access_token(&token).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.username, "alice");
        assert!(claims.is_admin);
    }

    #[tokio::test]
    async fn test_password_hash_round_trip() {
        let m = manager();
        let hash = m.hash_password("GoodPass1").unwrap();
        assert!(m.verify_password("GoodPass1", &hash).is_ok());
        assert!(matches!(
            m.verify_password("WrongPass1", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }
}
