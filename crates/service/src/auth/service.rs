use std::sync::Arc;

use argon2::{Argon2, password_hash::{PasswordHasher, PasswordVerifier, SaltString}, PasswordHash};
use rand::rngs::OsRng;
use tracing::{info, debug, warn, instrument};
use uuid::Uuid;

use models::enums::{ApprovalStatus, Role};
use models::user::{self as user_model, NewUser};

use super::domain::{RegisterInput, LoginInput, AuthUser, AuthSession, Claims};
use super::errors::AuthError;
use super::repository::AuthRepository;
use super::token;

/// Auth service configuration
#[derive(Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub password_algorithm: String,
}

impl AuthSettings {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self { jwt_secret: jwt_secret.into(), token_ttl_hours: 12, password_algorithm: "argon2".into() }
    }
}

impl From<&configs::AuthConfig> for AuthSettings {
    fn from(cfg: &configs::AuthConfig) -> Self {
        Self {
            jwt_secret: cfg.jwt_secret.clone(),
            token_ttl_hours: cfg.token_ttl_hours,
            password_algorithm: "argon2".into(),
        }
    }
}

/// Auth business service independent of web framework
pub struct AuthService<R: AuthRepository> {
    repo: Arc<R>,
    cfg: AuthSettings,
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::HashError(e.to_string()))?
        .to_string())
}

fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(hash).map_err(|e| AuthError::HashError(e.to_string()))?;
    Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
}

impl<R: AuthRepository> AuthService<R> {
    pub fn new(repo: Arc<R>, cfg: AuthSettings) -> Self { Self { repo, cfg } }

    /// Register a new account. It stays `pending` until an admin approves it.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{service::{AuthService, AuthSettings}, repository::mock::MockAuthRepository};
    /// use service::auth::domain::RegisterInput;
    /// use models::enums::{ApprovalStatus, Role};
    /// use std::sync::Arc;
    /// let repo = Arc::new(MockAuthRepository::default());
    /// let svc = AuthService::new(repo, AuthSettings::new("0123456789abcdef"));
    /// let input = RegisterInput {
    ///     name: "Petr".into(), email: "petr@example.com".into(), username: "petr".into(),
    ///     password: "Secret12!".into(), role: Role::Driver, preferred_lang: None,
    /// };
    /// let user = tokio_test::block_on(svc.register(input)).unwrap();
    /// assert_eq!(user.approval_status, ApprovalStatus::Pending);
    /// ```
    #[instrument(skip(self, input), fields(email = %input.email, role = %input.role))]
    pub async fn register(&self, input: RegisterInput) -> Result<AuthUser, AuthError> {
        if input.role == Role::Admin {
            return Err(AuthError::Validation("admin accounts cannot be self-registered".into()));
        }
        user_model::validate_password(&input.password)?;
        let lang = input.preferred_lang.clone().unwrap_or_else(|| "cs".into());

        let new_user = NewUser {
            name: input.name,
            email: input.email,
            username: input.username,
            role: input.role,
            approval_status: ApprovalStatus::Pending,
            preferred_lang: lang,
        };
        validate_new_user(&new_user)?;

        if let Some(existing) = self.repo.find_user_by_login(&new_user.email).await? {
            debug!("email exists: {}", existing.email);
            return Err(AuthError::Conflict("email already registered".into()));
        }
        if self.repo.find_user_by_login(&new_user.username).await?.is_some() {
            return Err(AuthError::Conflict("username already taken".into()));
        }

        let hash = hash_password(&input.password)?;
        let user = self.repo.create_user(new_user, hash, self.cfg.password_algorithm.clone()).await?;
        info!(user_id = %user.id, email = %user.email, role = %user.role, "user_registered");
        Ok(user)
    }

    /// Authenticate by email or username and issue a token.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{service::{AuthService, AuthSettings}, repository::mock::MockAuthRepository};
    /// use service::auth::domain::LoginInput;
    /// use std::sync::Arc;
    /// let repo = Arc::new(MockAuthRepository::default());
    /// let svc = AuthService::new(repo, AuthSettings::new("0123456789abcdef"));
    /// tokio_test::block_on(svc.ensure_admin("root@example.com", "Admin123!")).unwrap();
    /// let session = tokio_test::block_on(svc.login(LoginInput { login: "root@example.com".into(), password: "Admin123!".into() })).unwrap();
    /// assert!(!session.token.is_empty());
    /// ```
    #[instrument(skip(self, input), fields(login = %input.login))]
    pub async fn login(&self, input: LoginInput) -> Result<AuthSession, AuthError> {
        let user = self.repo
            .find_user_by_login(&input.login)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        let cred = self.repo
            .get_credentials(user.id)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        if !verify_password(&input.password, &cred.password_hash)? {
            return Err(AuthError::Unauthorized);
        }
        match user.approval_status {
            ApprovalStatus::Pending => return Err(AuthError::PendingApproval),
            ApprovalStatus::Rejected => return Err(AuthError::Rejected),
            ApprovalStatus::Approved => {}
        }
        if !user.active {
            return Err(AuthError::Inactive);
        }

        if let Err(e) = self.repo.touch_last_login(user.id).await {
            warn!(user_id = %user.id, error = %e, "failed to stamp last_login");
        }
        let (token, expires_at) = token::issue(&self.cfg.jwt_secret, &user, self.cfg.token_ttl_hours)?;
        info!(user_id = %user.id, role = %user.role, "user_logged_in");
        Ok(AuthSession { user, token, expires_at })
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        token::verify(&self.cfg.jwt_secret, token)
    }

    pub async fn current_user(&self, user_id: Uuid) -> Result<AuthUser, AuthError> {
        self.repo.find_user_by_id(user_id).await?.ok_or(AuthError::NotFound)
    }

    #[instrument(skip(self, current, new))]
    pub async fn change_password(&self, user_id: Uuid, current: &str, new: &str) -> Result<(), AuthError> {
        let cred = self.repo.get_credentials(user_id).await?.ok_or(AuthError::NotFound)?;
        if !verify_password(current, &cred.password_hash)? {
            return Err(AuthError::Unauthorized);
        }
        if current == new {
            return Err(AuthError::Validation("new password must differ from the current one".into()));
        }
        user_model::validate_password(new)?;
        let hash = hash_password(new)?;
        self.repo.upsert_password(user_id, hash, self.cfg.password_algorithm.clone()).await?;
        info!(user_id = %user_id, "password_changed");
        Ok(())
    }

    /// Create an approved admin when none exists yet. Returns the new admin, if any.
    #[instrument(skip(self, password))]
    pub async fn ensure_admin(&self, email: &str, password: &str) -> Result<Option<AuthUser>, AuthError> {
        if self.repo.admin_exists().await? {
            debug!("admin already present");
            return Ok(None);
        }
        user_model::validate_password(password)?;
        let local = email.split('@').next().unwrap_or_default();
        let username = if user_model::validate_username(local).is_ok() { local.to_string() } else { "admin".to_string() };
        let new_user = NewUser {
            name: "Administrator".into(),
            email: email.to_string(),
            username,
            role: Role::Admin,
            approval_status: ApprovalStatus::Approved,
            preferred_lang: "cs".into(),
        };
        validate_new_user(&new_user)?;
        let hash = hash_password(password)?;
        let admin = self.repo.create_user(new_user, hash, self.cfg.password_algorithm.clone()).await?;
        info!(user_id = %admin.id, email = %admin.email, "admin_bootstrapped");
        Ok(Some(admin))
    }
}

fn validate_new_user(u: &NewUser) -> Result<(), AuthError> {
    user_model::validate_name(&u.name)?;
    user_model::validate_email(u.email.trim())?;
    user_model::validate_username(&u.username)?;
    user_model::validate_lang(&u.preferred_lang)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repository::mock::MockAuthRepository;

    const SECRET: &str = "0123456789abcdef";

    fn svc() -> (Arc<MockAuthRepository>, AuthService<MockAuthRepository>) {
        let repo = Arc::new(MockAuthRepository::default());
        (repo.clone(), AuthService::new(repo, AuthSettings::new(SECRET)))
    }

    fn input(email: &str, username: &str, role: Role) -> RegisterInput {
        RegisterInput {
            name: "Jana".into(),
            email: email.into(),
            username: username.into(),
            password: "Choco1ate!".into(),
            role,
            preferred_lang: Some("en".into()),
        }
    }

    async fn approve(repo: &MockAuthRepository, id: Uuid) {
        let mut u = repo.find_user_by_id(id).await.unwrap().unwrap();
        u.approval_status = ApprovalStatus::Approved;
        repo.put_user(u);
    }

    #[tokio::test]
    async fn register_starts_pending_and_blocks_login() {
        let (_repo, svc) = svc();
        let u = svc.register(input("jana@example.com", "jana", Role::Employee)).await.unwrap();
        assert_eq!(u.approval_status, ApprovalStatus::Pending);
        assert_eq!(u.preferred_lang, "en");
        let err = svc.login(LoginInput { login: "jana".into(), password: "Choco1ate!".into() }).await.unwrap_err();
        assert!(matches!(err, AuthError::PendingApproval));
    }

    #[tokio::test]
    async fn register_rejects_admin_duplicates_and_weak_passwords() {
        let (_repo, svc) = svc();
        assert!(matches!(svc.register(input("a@example.com", "adm", Role::Admin)).await, Err(AuthError::Validation(_))));

        svc.register(input("jana@example.com", "jana", Role::Employee)).await.unwrap();
        let dup_email = svc.register(input("JANA@example.com", "jana2", Role::Employee)).await.unwrap_err();
        assert!(matches!(dup_email, AuthError::Conflict(m) if m.contains("email")));
        let dup_user = svc.register(input("other@example.com", "jana", Role::Employee)).await.unwrap_err();
        assert!(matches!(dup_user, AuthError::Conflict(m) if m.contains("username")));

        let mut weak = input("weak@example.com", "weak", Role::Driver);
        weak.password = "password".into();
        assert!(matches!(svc.register(weak).await, Err(AuthError::Validation(_))));
    }

    #[tokio::test]
    async fn register_stores_credentials_with_user() {
        let (repo, svc) = svc();
        let u = svc.register(input("jana@example.com", "jana", Role::Driver)).await.unwrap();
        let creds = repo.get_credentials(u.id).await.unwrap().expect("credentials stored");
        assert!(creds.password_hash.starts_with("$argon2"));
        assert_eq!(creds.password_algorithm, "argon2");

        let mut weak = input("weak@example.com", "weak", Role::Driver);
        weak.password = "short".into();
        assert!(svc.register(weak).await.is_err());
        assert!(repo.find_user_by_login("weak").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn login_by_email_or_username_after_approval() {
        let (repo, svc) = svc();
        let u = svc.register(input("jana@example.com", "jana", Role::Driver)).await.unwrap();
        approve(&repo, u.id).await;

        let s = svc.login(LoginInput { login: "Jana@Example.com".into(), password: "Choco1ate!".into() }).await.unwrap();
        assert_eq!(s.user.id, u.id);
        let claims = svc.verify_token(&s.token).unwrap();
        assert_eq!(claims.sub, u.id);
        assert_eq!(claims.role, Role::Driver);

        svc.login(LoginInput { login: "jana".into(), password: "Choco1ate!".into() }).await.unwrap();
        assert_eq!(repo.login_count(u.id), 2);

        let bad = svc.login(LoginInput { login: "jana".into(), password: "Wrong1234!".into() }).await.unwrap_err();
        assert!(matches!(bad, AuthError::Unauthorized));
        let unknown = svc.login(LoginInput { login: "nobody".into(), password: "Choco1ate!".into() }).await.unwrap_err();
        assert!(matches!(unknown, AuthError::Unauthorized));
    }

    #[tokio::test]
    async fn rejected_and_inactive_accounts_cannot_login() {
        let (repo, svc) = svc();
        let u = svc.register(input("jana@example.com", "jana", Role::Driver)).await.unwrap();
        let mut stored = repo.find_user_by_id(u.id).await.unwrap().unwrap();
        stored.approval_status = ApprovalStatus::Rejected;
        repo.put_user(stored.clone());
        let login = || LoginInput { login: "jana".into(), password: "Choco1ate!".into() };
        assert!(matches!(svc.login(login()).await, Err(AuthError::Rejected)));

        stored.approval_status = ApprovalStatus::Approved;
        stored.active = false;
        repo.put_user(stored);
        assert!(matches!(svc.login(login()).await, Err(AuthError::Inactive)));
    }

    #[tokio::test]
    async fn change_password_requires_current() {
        let (repo, svc) = svc();
        let u = svc.register(input("jana@example.com", "jana", Role::Manager)).await.unwrap();
        approve(&repo, u.id).await;

        assert!(matches!(svc.change_password(u.id, "Wrong1234!", "NewPass1!").await, Err(AuthError::Unauthorized)));
        assert!(matches!(svc.change_password(u.id, "Choco1ate!", "Choco1ate!").await, Err(AuthError::Validation(_))));
        assert!(matches!(svc.change_password(u.id, "Choco1ate!", "short").await, Err(AuthError::Validation(_))));
        svc.change_password(u.id, "Choco1ate!", "NewPass1!").await.unwrap();
        svc.login(LoginInput { login: "jana".into(), password: "NewPass1!".into() }).await.unwrap();
    }

    #[tokio::test]
    async fn ensure_admin_runs_once() {
        let (repo, svc) = svc();
        let first = svc.ensure_admin("root@example.com", "Admin123!").await.unwrap();
        let admin = first.expect("created");
        assert_eq!(admin.role, Role::Admin);
        assert_eq!(admin.username, "root");
        assert!(repo.get_credentials(admin.id).await.unwrap().is_some());
        assert!(svc.ensure_admin("other@example.com", "Admin123!").await.unwrap().is_none());
    }
}
