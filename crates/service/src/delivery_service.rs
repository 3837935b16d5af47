//! Delivery scheduling, driver status workflow, calendar and route planning.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use common::{geo, text::sanitize_input, types::GeoPoint};
use models::enums::{DeliveryStatus, Role};
use models::{address, delivery, user};

use crate::errors::{ServiceError, ServiceResult};
use crate::maps::RoutingProvider;
use crate::metrics::{DELIVERIES_CREATED_TOTAL, STATUS_CHANGES_TOTAL};
use crate::Actor;

/// Scheduling fields shared by create and update.
#[derive(Debug, Clone)]
pub struct DeliveryInput {
    pub driver_id: Uuid,
    pub address_id: Uuid,
    pub delivery_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub notes: Option<String>,
}

/// Delivery row joined with its address and driver name.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryDetails {
    #[serde(flatten)]
    pub delivery: delivery::Model,
    pub address: Option<address::Model>,
    pub driver_name: Option<String>,
    pub processing_minutes: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeliveryFilter {
    pub date: Option<NaiveDate>,
    pub status: Option<DeliveryStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarGroup {
    pub date: NaiveDate,
    pub driver_name: String,
    pub deliveries: Vec<DeliveryDetails>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteStop {
    pub position: usize,
    #[serde(flatten)]
    pub details: DeliveryDetails,
    /// Straight-line distance from the warehouse.
    pub distance_km: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NextDelivery {
    pub delivery_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub address_label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub today: NaiveDate,
    pub today_count: u64,
    pub week_count: u64,
    pub next_delivery: Option<NextDelivery>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeliveryStats {
    pub total_deliveries: u64,
    pub completed_deliveries: u64,
    pub cancelled_deliveries: u64,
    pub avg_processing_minutes: Option<f64>,
    pub avg_eta_minutes: Option<f64>,
}

pub(crate) fn average(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.into_iter().fold((0.0, 0u64), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

impl DeliveryStats {
    pub fn from_rows(rows: &[delivery::Model]) -> Self {
        let count = |st: DeliveryStatus| rows.iter().filter(|d| d.status == st).count() as u64;
        Self {
            total_deliveries: rows.len() as u64,
            completed_deliveries: count(DeliveryStatus::Completed),
            cancelled_deliveries: count(DeliveryStatus::Cancelled),
            avg_processing_minutes: average(rows.iter().filter_map(|d| d.processing_minutes()).map(|m| m as f64)),
            avg_eta_minutes: average(rows.iter().filter_map(|d| d.eta_minutes).map(f64::from)),
        }
    }
}

/// Order stops by window start, then ETA; stops without an ETA go last within a slot.
pub fn sort_route(stops: &mut [DeliveryDetails]) {
    stops.sort_by_key(|d| {
        let eta = d.delivery.eta_minutes;
        (d.delivery.start_time, eta.is_none(), eta.unwrap_or(i32::MAX))
    });
}

/// Group by (date, driver name). `driver` keeps only names containing it, ignoring case.
pub fn group_calendar(rows: Vec<DeliveryDetails>, driver: Option<&str>) -> Vec<CalendarGroup> {
    let needle = driver.map(str::trim).filter(|s| !s.is_empty()).map(str::to_lowercase);
    let mut groups: BTreeMap<(NaiveDate, String), Vec<DeliveryDetails>> = BTreeMap::new();
    for d in rows {
        let name = d.driver_name.clone().unwrap_or_default();
        if let Some(n) = &needle {
            if !name.to_lowercase().contains(n.as_str()) {
                continue;
            }
        }
        groups.entry((d.delivery.delivery_date, name)).or_default().push(d);
    }
    groups
        .into_iter()
        .map(|((date, driver_name), mut deliveries)| {
            deliveries.sort_by_key(|d| d.delivery.start_time);
            CalendarGroup { date, driver_name, deliveries }
        })
        .collect()
}

fn clean_notes(notes: Option<String>) -> Option<String> {
    notes.map(|n| sanitize_input(&n)).filter(|n| !n.is_empty())
}

#[derive(Clone)]
pub struct DeliveryService {
    db: DatabaseConnection,
    routing: Arc<dyn RoutingProvider>,
    warehouse: GeoPoint,
}

impl DeliveryService {
    pub fn new(db: DatabaseConnection, routing: Arc<dyn RoutingProvider>, warehouse: GeoPoint) -> Self {
        Self { db, routing, warehouse }
    }

    async fn eta_to(&self, addr: &address::Model) -> Option<i32> {
        match self.routing.eta_minutes(self.warehouse, addr.location()).await {
            Ok(eta) => eta,
            Err(e) => {
                warn!(address_id = %addr.id, error = %e, "eta lookup failed");
                None
            }
        }
    }

    async fn find(&self, id: Uuid) -> ServiceResult<delivery::Model> {
        delivery::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("delivery"))
    }

    async fn assignable_driver(&self, driver_id: Uuid) -> ServiceResult<user::Model> {
        let driver = user::Entity::find_by_id(driver_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("driver"))?;
        if !driver.is_assignable_driver() {
            return Err(ServiceError::Validation("driver must be an active, approved driver".into()));
        }
        Ok(driver)
    }

    async fn existing_address(&self, address_id: Uuid) -> ServiceResult<address::Model> {
        address::Entity::find_by_id(address_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("address"))
    }

    /// Attach addresses and driver names with two batched lookups.
    async fn with_details(&self, rows: Vec<delivery::Model>) -> ServiceResult<Vec<DeliveryDetails>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let address_ids: HashSet<Uuid> = rows.iter().map(|d| d.address_id).collect();
        let driver_ids: HashSet<Uuid> = rows.iter().map(|d| d.driver_id).collect();
        let addresses: HashMap<Uuid, address::Model> = address::Entity::find()
            .filter(address::Column::Id.is_in(address_ids))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|a| (a.id, a))
            .collect();
        let drivers: HashMap<Uuid, String> = user::Entity::find()
            .filter(user::Column::Id.is_in(driver_ids))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|u| (u.id, u.name))
            .collect();
        Ok(rows
            .into_iter()
            .map(|d| DeliveryDetails {
                address: addresses.get(&d.address_id).cloned(),
                driver_name: drivers.get(&d.driver_id).cloned(),
                processing_minutes: d.processing_minutes(),
                delivery: d,
            })
            .collect())
    }

    #[instrument(skip(self, input), fields(driver_id = %input.driver_id, date = %input.delivery_date))]
    pub async fn create(&self, input: DeliveryInput, assigned_by: Option<Uuid>) -> ServiceResult<delivery::Model> {
        delivery::validate_window(input.start_time, input.end_time)?;
        self.assignable_driver(input.driver_id).await?;
        let addr = self.existing_address(input.address_id).await?;
        let eta = self.eta_to(&addr).await;

        let now = Utc::now().into();
        let am = delivery::ActiveModel {
            id: Set(Uuid::new_v4()),
            driver_id: Set(input.driver_id),
            address_id: Set(input.address_id),
            delivery_date: Set(input.delivery_date),
            start_time: Set(input.start_time),
            end_time: Set(input.end_time),
            status: Set(DeliveryStatus::Pending),
            eta_minutes: Set(eta),
            return_eta_minutes: Set(eta),
            notes: Set(clean_notes(input.notes)),
            assigned_by: Set(assigned_by),
            created_at: Set(now),
            updated_at: Set(now),
            completed_at: Set(None),
        };
        let created = am.insert(&self.db).await?;
        DELIVERIES_CREATED_TOTAL.inc();
        info!(delivery_id = %created.id, eta = ?created.eta_minutes, "delivery_created");
        Ok(created)
    }

    /// Reschedule or reassign. A rejected delivery handed to another driver goes back to pending.
    #[instrument(skip(self, input))]
    pub async fn update(&self, id: Uuid, input: DeliveryInput) -> ServiceResult<delivery::Model> {
        delivery::validate_window(input.start_time, input.end_time)?;
        let current = self.find(id).await?;
        if input.driver_id != current.driver_id {
            self.assignable_driver(input.driver_id).await?;
        }
        let addr = self.existing_address(input.address_id).await?;

        let mut am: delivery::ActiveModel = current.clone().into();
        if input.address_id != current.address_id {
            let eta = self.eta_to(&addr).await;
            am.eta_minutes = Set(eta);
            am.return_eta_minutes = Set(eta);
        }
        if current.status == DeliveryStatus::Rejected && input.driver_id != current.driver_id {
            am.status = Set(DeliveryStatus::Pending);
        }
        am.driver_id = Set(input.driver_id);
        am.address_id = Set(input.address_id);
        am.delivery_date = Set(input.delivery_date);
        am.start_time = Set(input.start_time);
        am.end_time = Set(input.end_time);
        am.notes = Set(clean_notes(input.notes));
        am.updated_at = Set(Utc::now().into());
        let updated = am.update(&self.db).await?;
        info!(delivery_id = %id, status = %updated.status, "delivery_updated");
        Ok(updated)
    }

    /// Move a delivery along its lifecycle.
    ///
    /// Drivers may only touch their own deliveries and only set accepted,
    /// rejected, in_progress or completed.
    #[instrument(skip(self, actor), fields(actor = %actor.id, role = %actor.role))]
    pub async fn update_status(&self, id: Uuid, next: DeliveryStatus, actor: &Actor) -> ServiceResult<delivery::Model> {
        let current = self.find(id).await?;
        if actor.role == Role::Driver {
            if current.driver_id != actor.id {
                return Err(ServiceError::Forbidden("delivery is assigned to another driver".into()));
            }
            if !next.driver_settable() {
                return Err(ServiceError::Forbidden(format!("drivers cannot set status {next}")));
            }
        }
        if !current.status.can_transition_to(next) {
            return Err(ServiceError::InvalidTransition { from: current.status, to: next });
        }

        let now = Utc::now();
        let mut am: delivery::ActiveModel = current.clone().into();
        am.status = Set(next);
        am.updated_at = Set(now.into());
        if next == DeliveryStatus::Completed {
            am.completed_at = Set(Some(now.into()));
        }
        let updated = am.update(&self.db).await?;
        STATUS_CHANGES_TOTAL.with_label_values(&[next.as_str()]).inc();
        info!(delivery_id = %id, from = %current.status, to = %next, "delivery_status_changed");
        Ok(updated)
    }

    pub async fn cancel(&self, id: Uuid, actor: &Actor) -> ServiceResult<delivery::Model> {
        self.update_status(id, DeliveryStatus::Cancelled, actor).await
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<DeliveryDetails> {
        let row = self.find(id).await?;
        let mut details = self.with_details(vec![row]).await?;
        details.pop().ok_or_else(|| ServiceError::not_found("delivery"))
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> ServiceResult<()> {
        let res = delivery::Entity::delete_by_id(id).exec(&self.db).await?;
        if res.rows_affected == 0 {
            return Err(ServiceError::not_found("delivery"));
        }
        info!(delivery_id = %id, "delivery_deleted");
        Ok(())
    }

    /// A driver's deliveries ordered by date then start time.
    pub async fn driver_deliveries(&self, driver_id: Uuid, filter: DeliveryFilter) -> ServiceResult<Vec<DeliveryDetails>> {
        let mut q = delivery::Entity::find().filter(delivery::Column::DriverId.eq(driver_id));
        if let Some(date) = filter.date {
            q = q.filter(delivery::Column::DeliveryDate.eq(date));
        }
        if let Some(status) = filter.status {
            q = q.filter(delivery::Column::Status.eq(status));
        }
        let rows = q
            .order_by_asc(delivery::Column::DeliveryDate)
            .order_by_asc(delivery::Column::StartTime)
            .all(&self.db)
            .await?;
        self.with_details(rows).await
    }

    pub async fn calendar(&self, driver: Option<&str>, date: Option<NaiveDate>) -> ServiceResult<Vec<CalendarGroup>> {
        let mut q = delivery::Entity::find();
        if let Some(date) = date {
            q = q.filter(delivery::Column::DeliveryDate.eq(date));
        }
        let rows = q
            .order_by_asc(delivery::Column::DeliveryDate)
            .order_by_asc(delivery::Column::StartTime)
            .all(&self.db)
            .await?;
        Ok(group_calendar(self.with_details(rows).await?, driver))
    }

    /// Pending deliveries of one driver and day in visiting order.
    #[instrument(skip(self))]
    pub async fn optimize_route(&self, driver_id: Uuid, date: NaiveDate) -> ServiceResult<Vec<RouteStop>> {
        let mut stops = self
            .driver_deliveries(driver_id, DeliveryFilter { date: Some(date), status: Some(DeliveryStatus::Pending) })
            .await?;
        sort_route(&mut stops);
        Ok(stops
            .into_iter()
            .enumerate()
            .map(|(i, details)| RouteStop {
                position: i + 1,
                distance_km: details.address.as_ref().map(|a| geo::distance_km(self.warehouse, a.location())),
                details,
            })
            .collect())
    }

    /// Counts for `today` and the seven days starting today, plus the next delivery.
    pub async fn dashboard_summary(&self, today: NaiveDate) -> ServiceResult<DashboardSummary> {
        let week_end = today + Duration::days(6);
        let week = delivery::Entity::find()
            .filter(delivery::Column::DeliveryDate.between(today, week_end))
            .all(&self.db)
            .await?;
        let today_count = week.iter().filter(|d| d.delivery_date == today).count() as u64;

        let next = delivery::Entity::find()
            .filter(delivery::Column::DeliveryDate.gte(today))
            .order_by_asc(delivery::Column::DeliveryDate)
            .order_by_asc(delivery::Column::StartTime)
            .find_also_related(address::Entity)
            .one(&self.db)
            .await?
            .map(|(d, a)| NextDelivery {
                delivery_id: d.id,
                date: d.delivery_date,
                start_time: d.start_time,
                address_label: a.map(|a| a.label).unwrap_or_default(),
            });

        Ok(DashboardSummary { today, today_count, week_count: week.len() as u64, next_delivery: next })
    }

    /// Stats for deliveries scheduled within `[start, end]`.
    pub async fn stats(&self, start: NaiveDate, end: NaiveDate) -> ServiceResult<DeliveryStats> {
        if start > end {
            return Err(ServiceError::Validation("start date must not be after end date".into()));
        }
        let rows = delivery::Entity::find()
            .filter(delivery::Column::DeliveryDate.between(start, end))
            .all(&self.db)
            .await?;
        Ok(DeliveryStats::from_rows(&rows))
    }
}
