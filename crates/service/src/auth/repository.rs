use async_trait::async_trait;
use uuid::Uuid;

use models::user::NewUser;

use super::domain::{AuthUser, Credentials};
use super::errors::AuthError;

/// Repository abstraction for auth-related persistence.
#[async_trait]
pub trait AuthRepository: Send + Sync {
    /// Match on email (case-insensitive) or username.
    async fn find_user_by_login(&self, login: &str) -> Result<Option<AuthUser>, AuthError>;
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<AuthUser>, AuthError>;
    /// Stores the user together with its password hash. Either both rows exist afterwards or neither does.
    async fn create_user(&self, input: NewUser, password_hash: String, password_algorithm: String) -> Result<AuthUser, AuthError>;
    async fn admin_exists(&self) -> Result<bool, AuthError>;
    async fn touch_last_login(&self, user_id: Uuid) -> Result<(), AuthError>;

    async fn get_credentials(&self, user_id: Uuid) -> Result<Option<Credentials>, AuthError>;
    async fn upsert_password(&self, user_id: Uuid, password_hash: String, password_algorithm: String) -> Result<Credentials, AuthError>;
}

/// Simple in-memory mock repository for tests and doc examples
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use models::enums::Role;

    #[derive(Default)]
    pub struct MockAuthRepository {
        users: Mutex<HashMap<Uuid, AuthUser>>,
        creds: Mutex<HashMap<Uuid, Credentials>>, // key: user_id
        logins: Mutex<HashMap<Uuid, u32>>,
    }

    impl MockAuthRepository {
        /// Overwrite a stored user, e.g. to approve or deactivate it in tests.
        pub fn put_user(&self, user: AuthUser) {
            self.users.lock().unwrap().insert(user.id, user);
        }

        pub fn login_count(&self, user_id: Uuid) -> u32 {
            self.logins.lock().unwrap().get(&user_id).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl AuthRepository for MockAuthRepository {
        async fn find_user_by_login(&self, login: &str) -> Result<Option<AuthUser>, AuthError> {
            let login = login.trim();
            let users = self.users.lock().unwrap();
            Ok(users
                .values()
                .find(|u| u.email.eq_ignore_ascii_case(login) || u.username == login)
                .cloned())
        }

        async fn find_user_by_id(&self, id: Uuid) -> Result<Option<AuthUser>, AuthError> {
            Ok(self.users.lock().unwrap().get(&id).cloned())
        }

        async fn create_user(&self, input: NewUser, password_hash: String, password_algorithm: String) -> Result<AuthUser, AuthError> {
            let mut users = self.users.lock().unwrap();
            let email = input.email.trim().to_ascii_lowercase();
            if users.values().any(|u| u.email == email || u.username == input.username) {
                return Err(AuthError::Conflict("user already exists".into()));
            }
            let user = AuthUser {
                id: Uuid::new_v4(),
                name: input.name,
                email,
                username: input.username,
                role: input.role,
                active: true,
                approval_status: input.approval_status,
                preferred_lang: input.preferred_lang,
            };
            users.insert(user.id, user.clone());
            self.creds.lock().unwrap().insert(
                user.id,
                Credentials { user_id: user.id, password_hash, password_algorithm },
            );
            Ok(user)
        }

        async fn admin_exists(&self) -> Result<bool, AuthError> {
            Ok(self.users.lock().unwrap().values().any(|u| u.role == Role::Admin))
        }

        async fn touch_last_login(&self, user_id: Uuid) -> Result<(), AuthError> {
            *self.logins.lock().unwrap().entry(user_id).or_default() += 1;
            Ok(())
        }

        async fn get_credentials(&self, user_id: Uuid) -> Result<Option<Credentials>, AuthError> {
            let creds = self.creds.lock().unwrap();
            Ok(creds.get(&user_id).cloned())
        }

        async fn upsert_password(&self, user_id: Uuid, password_hash: String, password_algorithm: String) -> Result<Credentials, AuthError> {
            let mut creds = self.creds.lock().unwrap();
            let c = Credentials { user_id, password_hash, password_algorithm };
            creds.insert(user_id, c.clone());
            Ok(c)
        }
    }
}
