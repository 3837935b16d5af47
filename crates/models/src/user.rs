use sea_orm::{entity::prelude::*, ConnectionTrait, Set, DatabaseConnection};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::enums::{ApprovalStatus, Role};
use crate::errors::ModelError;

pub const SUPPORTED_LANGS: [&str; 2] = ["cs", "en"];
const PASSWORD_SPECIALS: &str = "!@#$%^&*(),.?\":{}|<>";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub username: String,
    pub role: Role,
    pub active: bool,
    pub approval_status: ApprovalStatus,
    pub preferred_lang: String,
    pub last_login: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef { match *self {} }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Approved and active accounts may sign in and receive work.
    pub fn can_login(&self) -> bool {
        self.active && self.approval_status == ApprovalStatus::Approved
    }

    pub fn is_assignable_driver(&self) -> bool {
        self.role == Role::Driver && self.can_login()
    }
}

/// Fields required to insert a user row.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub username: String,
    pub role: Role,
    pub approval_status: ApprovalStatus,
    pub preferred_lang: String,
}

pub fn validate_email(email: &str) -> Result<(), ModelError> {
    let invalid = || ModelError::Validation("invalid email".into());
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    if !local.chars().all(|c| c.is_ascii_alphanumeric() || "._%+-".contains(c)) {
        return Err(invalid());
    }
    let (host, tld) = domain.rsplit_once('.').ok_or_else(invalid)?;
    if host.is_empty() || !host.chars().all(|c| c.is_ascii_alphanumeric() || ".-".contains(c)) {
        return Err(invalid());
    }
    if tld.len() < 2 || !tld.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(invalid());
    }
    Ok(())
}

/// Checks the name as it will be stored, i.e. after sanitizing.
pub fn validate_name(name: &str) -> Result<(), ModelError> {
    let cleaned = common::text::sanitize_input(name);
    if cleaned.is_empty() {
        return Err(ModelError::Validation("name required".into()));
    }
    if cleaned.chars().count() > 128 {
        return Err(ModelError::Validation("name too long (<=128)".into()));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), ModelError> {
    let len = username.chars().count();
    if !(3..=64).contains(&len) {
        return Err(ModelError::Validation("username must be 3-64 characters".into()));
    }
    if !username.chars().all(|c| c.is_ascii_alphanumeric() || "._-".contains(c)) {
        return Err(ModelError::Validation("username may contain letters, digits, '.', '_' and '-'".into()));
    }
    Ok(())
}

/// Password strength policy; each failure carries its own message.
pub fn validate_password(password: &str) -> Result<(), ModelError> {
    let fail = |m: &str| Err(ModelError::Validation(m.into()));
    if password.chars().count() < 8 {
        return fail("password must be at least 8 characters long");
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return fail("password must contain at least one uppercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return fail("password must contain at least one lowercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return fail("password must contain at least one number");
    }
    if !password.chars().any(|c| PASSWORD_SPECIALS.contains(c)) {
        return fail("password must contain at least one special character");
    }
    Ok(())
}

pub fn validate_lang(lang: &str) -> Result<(), ModelError> {
    if SUPPORTED_LANGS.contains(&lang) {
        Ok(())
    } else {
        Err(ModelError::Validation(format!("unsupported language: {lang}")))
    }
}

pub async fn create<C: ConnectionTrait>(db: &C, input: NewUser) -> Result<Model, ModelError> {
    validate_name(&input.name)?;
    validate_email(&input.email)?;
    validate_username(&input.username)?;
    validate_lang(&input.preferred_lang)?;
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(common::text::sanitize_input(&input.name)),
        email: Set(input.email.trim().to_ascii_lowercase()),
        username: Set(input.username.trim().to_string()),
        role: Set(input.role),
        active: Set(true),
        approval_status: Set(input.approval_status),
        preferred_lang: Set(input.preferred_lang),
        last_login: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(am.insert(db).await?)
}

pub async fn find_by_email(db: &DatabaseConnection, email: &str) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find()
        .filter(Column::Email.eq(email.trim().to_ascii_lowercase()))
        .one(db)
        .await?)
}

/// Login accepts either the email address or the username.
pub async fn find_by_login(db: &DatabaseConnection, login: &str) -> Result<Option<Model>, ModelError> {
    let login = login.trim();
    let cond = sea_orm::Condition::any()
        .add(Column::Email.eq(login.to_ascii_lowercase()))
        .add(Column::Username.eq(login));
    Ok(Entity::find().filter(cond).one(db).await?)
}

pub async fn hard_delete(db: &DatabaseConnection, id: Uuid) -> Result<bool, ModelError> {
    let res = Entity::delete_by_id(id).exec(db).await?;
    Ok(res.rows_affected > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(validate_email("jana.novakova@chocomap.cz").is_ok());
        assert!(validate_email("a+b@sub.example.com").is_ok());
        assert!(validate_email("missing-at.example.com").is_err());
        assert!(validate_email("two@@example.com").is_err());
        assert!(validate_email("user@localhost").is_err());
        assert!(validate_email("user@example.c").is_err());
        assert!(validate_email("us er@example.com").is_err());
    }

    #[test]
    fn password_policy_messages() {
        let msg = |p: &str| validate_password(p).unwrap_err().to_string();
        assert!(msg("Ab1!").contains("at least 8"));
        assert!(msg("lowercase1!").contains("uppercase"));
        assert!(msg("UPPERCASE1!").contains("lowercase"));
        assert!(msg("NoDigits!!").contains("number"));
        assert!(msg("NoSpecial1").contains("special"));
        assert!(validate_password("Choco1ate!").is_ok());
    }

    #[test]
    fn name_must_survive_sanitizing() {
        assert!(validate_name("<>").is_err());
        assert!(validate_name("  < > ").is_err());
        assert!(validate_name("Jana <b>").is_ok());
        assert!(validate_name(&"x".repeat(129)).is_err());
        assert!(validate_name(&format!("{}<>", "x".repeat(128))).is_ok());
    }

    #[test]
    fn username_rules() {
        assert!(validate_username("driver_01").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
    }

    #[test]
    fn lang_rules() {
        assert!(validate_lang("cs").is_ok());
        assert!(validate_lang("en").is_ok());
        assert!(validate_lang("cz").is_err());
    }

    #[test]
    fn login_requires_approval_and_active() {
        let now = Utc::now().into();
        let mut u = Model {
            id: Uuid::new_v4(),
            name: "Petr".into(),
            email: "petr@example.com".into(),
            username: "petr".into(),
            role: Role::Driver,
            active: true,
            approval_status: ApprovalStatus::Pending,
            preferred_lang: "cs".into(),
            last_login: None,
            created_at: now,
            updated_at: now,
        };
        assert!(!u.can_login());
        u.approval_status = ApprovalStatus::Approved;
        assert!(u.can_login());
        assert!(u.is_assignable_driver());
        u.active = false;
        assert!(!u.is_assignable_driver());
    }
}
