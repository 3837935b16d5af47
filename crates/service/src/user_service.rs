//! Account administration: listing, approval workflow, driver directory and stats.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};
use moka::future::Cache;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use common::pagination::{Page, Pagination};
use models::enums::{ApprovalStatus, DeliveryStatus, Role};
use models::{delivery, user};

use crate::errors::{ServiceError, ServiceResult};

const DRIVERS_TTL: Duration = Duration::from_secs(300);

/// Active, approved driver as shown in assignment pickers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriverSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub username: String,
}

/// Fields an administrator may change. `None` leaves the value untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub preferred_lang: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserStats {
    pub total_users: u64,
    pub drivers: u64,
    pub managers: u64,
    pub active_users: u64,
    pub active_last_week: u64,
}

impl UserStats {
    pub fn from_users(users: &[user::Model], now: DateTime<Utc>) -> Self {
        let week_ago: DateTime<FixedOffset> = (now - chrono::Duration::days(7)).into();
        let mut s = UserStats { total_users: users.len() as u64, ..Default::default() };
        for u in users {
            match u.role {
                Role::Driver => s.drivers += 1,
                Role::Manager => s.managers += 1,
                _ => {}
            }
            if u.can_login() {
                s.active_users += 1;
            }
            if u.last_login.is_some_and(|t| t >= week_ago) {
                s.active_last_week += 1;
            }
        }
        s
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DriverStats {
    pub total_deliveries: u64,
    pub completed: u64,
    pub pending: u64,
    pub in_progress: u64,
    pub cancelled: u64,
}

impl DriverStats {
    pub fn from_statuses(statuses: impl IntoIterator<Item = DeliveryStatus>) -> Self {
        let mut s = DriverStats::default();
        for st in statuses {
            s.total_deliveries += 1;
            match st {
                DeliveryStatus::Completed => s.completed += 1,
                DeliveryStatus::Pending => s.pending += 1,
                DeliveryStatus::InProgress => s.in_progress += 1,
                DeliveryStatus::Cancelled => s.cancelled += 1,
                DeliveryStatus::Accepted | DeliveryStatus::Rejected => {}
            }
        }
        s
    }
}

#[derive(Clone)]
pub struct UserService {
    db: DatabaseConnection,
    /// Keyed by `drivers_generation`; a list loaded before a change lands under a key no reader asks for.
    drivers: Cache<u64, Arc<Vec<DriverSummary>>>,
    drivers_generation: Arc<AtomicU64>,
}

impl UserService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            drivers: Cache::builder().max_capacity(2).time_to_live(DRIVERS_TTL).build(),
            drivers_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    fn invalidate_drivers(&self) {
        self.drivers_generation.fetch_add(1, Ordering::SeqCst);
        self.drivers.invalidate_all();
    }

    /// All users, newest first.
    pub async fn list_users(&self, opts: Pagination) -> ServiceResult<Page<user::Model>> {
        let (page_idx, per_page) = opts.normalize();
        let paginator = user::Entity::find()
            .order_by_desc(user::Column::CreatedAt)
            .paginate(&self.db, per_page);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page_idx).await?;
        Ok(Page::new(items, page_idx, per_page, total))
    }

    /// Accounts waiting for approval, oldest first.
    pub async fn pending_users(&self) -> ServiceResult<Vec<user::Model>> {
        Ok(user::Entity::find()
            .filter(user::Column::ApprovalStatus.eq(ApprovalStatus::Pending))
            .order_by_asc(user::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    pub async fn get_user(&self, id: Uuid) -> ServiceResult<user::Model> {
        user::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("user"))
    }

    #[instrument(skip(self, changes))]
    pub async fn update_user(&self, id: Uuid, changes: UserUpdate) -> ServiceResult<user::Model> {
        let current = self.get_user(id).await?;
        let mut am: user::ActiveModel = current.clone().into();

        if let Some(name) = changes.name {
            user::validate_name(&name)?;
            am.name = Set(common::text::sanitize_input(&name));
        }
        if let Some(email) = changes.email {
            let email = email.trim().to_ascii_lowercase();
            user::validate_email(&email)?;
            if email != current.email {
                if let Some(other) = user::find_by_email(&self.db, &email).await? {
                    if other.id != id {
                        return Err(ServiceError::Conflict("email already registered".into()));
                    }
                }
            }
            am.email = Set(email);
        }
        if let Some(role) = changes.role {
            am.role = Set(role);
        }
        if let Some(lang) = changes.preferred_lang {
            user::validate_lang(&lang)?;
            am.preferred_lang = Set(lang);
        }
        am.updated_at = Set(Utc::now().into());
        let updated = am.update(&self.db).await?;
        self.invalidate_drivers();
        info!(user_id = %id, "user_updated");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn set_approval(&self, id: Uuid, status: ApprovalStatus) -> ServiceResult<user::Model> {
        let mut am: user::ActiveModel = self.get_user(id).await?.into();
        am.approval_status = Set(status);
        am.updated_at = Set(Utc::now().into());
        let updated = am.update(&self.db).await?;
        self.invalidate_drivers();
        info!(user_id = %id, status = %status, "user_approval_changed");
        Ok(updated)
    }

    pub async fn approve(&self, id: Uuid) -> ServiceResult<user::Model> {
        self.set_approval(id, ApprovalStatus::Approved).await
    }

    pub async fn reject(&self, id: Uuid) -> ServiceResult<user::Model> {
        self.set_approval(id, ApprovalStatus::Rejected).await
    }

    /// Disable an account. Administrators cannot disable themselves.
    #[instrument(skip(self))]
    pub async fn deactivate(&self, id: Uuid, actor: Uuid) -> ServiceResult<user::Model> {
        if id == actor {
            return Err(ServiceError::Validation("cannot deactivate your own account".into()));
        }
        let mut am: user::ActiveModel = self.get_user(id).await?.into();
        am.active = Set(false);
        am.updated_at = Set(Utc::now().into());
        let updated = am.update(&self.db).await?;
        self.invalidate_drivers();
        info!(user_id = %id, "user_deactivated");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: Uuid, actor: Uuid) -> ServiceResult<()> {
        if id == actor {
            return Err(ServiceError::Validation("cannot delete your own account".into()));
        }
        if !user::hard_delete(&self.db, id).await? {
            return Err(ServiceError::not_found("user"));
        }
        self.invalidate_drivers();
        info!(user_id = %id, "user_deleted");
        Ok(())
    }

    /// Active, approved drivers ordered by name. Cached for five minutes.
    pub async fn drivers(&self) -> ServiceResult<Arc<Vec<DriverSummary>>> {
        let generation = self.drivers_generation.load(Ordering::SeqCst);
        let db = self.db.clone();
        self.drivers
            .try_get_with(generation, async move { load_drivers(&db).await })
            .await
            .map_err(|e: Arc<sea_orm::DbErr>| ServiceError::Db(e.to_string()))
    }

    pub async fn user_stats(&self) -> ServiceResult<UserStats> {
        let users = user::Entity::find().all(&self.db).await?;
        Ok(UserStats::from_users(&users, Utc::now()))
    }

    pub async fn driver_stats(&self, driver_id: Uuid) -> ServiceResult<DriverStats> {
        let rows = delivery::Entity::find()
            .filter(delivery::Column::DriverId.eq(driver_id))
            .all(&self.db)
            .await?;
        Ok(DriverStats::from_statuses(rows.into_iter().map(|d| d.status)))
    }
}

async fn load_drivers(db: &DatabaseConnection) -> Result<Arc<Vec<DriverSummary>>, sea_orm::DbErr> {
    let rows = user::Entity::find()
        .filter(user::Column::Role.eq(Role::Driver))
        .filter(user::Column::Active.eq(true))
        .filter(user::Column::ApprovalStatus.eq(ApprovalStatus::Approved))
        .order_by_asc(user::Column::Name)
        .all(db)
        .await?;
    Ok(Arc::new(
        rows.into_iter()
            .map(|u| DriverSummary { id: u.id, name: u.name, email: u.email, username: u.username })
            .collect(),
    ))
}
