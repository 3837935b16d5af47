//! Manager-facing aggregates over deliveries, users and system logs.
//!
//! Rows are fetched with plain filters and folded in memory by the pure
//! `*_from` functions below, which keeps the aggregation logic testable
//! without a database.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use models::enums::{DeliveryStatus, Role};
use models::system_log::{self, LogLevel};
use models::{address, delivery, user, user_activity};

use crate::delivery_service::average;
use crate::errors::{ServiceError, ServiceResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BasicStats {
    pub total_deliveries: u64,
    pub completed_deliveries: u64,
    pub cancelled_deliveries: u64,
    pub in_progress_deliveries: u64,
    pub avg_processing_minutes: Option<f64>,
    pub avg_eta_minutes: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTrend {
    pub date: NaiveDate,
    pub total: u64,
    pub completed: u64,
    pub cancelled: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriverPerformance {
    pub driver_id: Uuid,
    pub driver_name: String,
    pub total_deliveries: u64,
    pub completed_deliveries: u64,
    pub avg_processing_minutes: Option<f64>,
    pub avg_eta_minutes: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityDistribution {
    pub city: String,
    pub delivery_count: u64,
    pub unique_drivers: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeliveryAnalytics {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub basic_stats: BasicStats,
    pub daily_trends: Vec<DailyTrend>,
    pub driver_performance: Vec<DriverPerformance>,
    pub address_distribution: Vec<CityDistribution>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleCount {
    pub role: Role,
    pub count: u64,
    pub active_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityTrend {
    pub date: NaiveDate,
    pub activity_count: u64,
    pub unique_users: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Engagement {
    pub total_users: u64,
    pub active_last_week: u64,
    pub active_last_month: u64,
    pub avg_days_to_last_login: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserAnalytics {
    pub role_distribution: Vec<RoleCount>,
    pub activity_trends: Vec<ActivityTrend>,
    pub engagement: Engagement,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DatabaseMetrics {
    pub total_deliveries: u64,
    pub active_drivers: u64,
    pub unique_addresses: u64,
    pub last_activity: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LogMetrics {
    pub total_events: u64,
    pub error_count: u64,
    pub warning_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemHealth {
    pub database_metrics: DatabaseMetrics,
    pub log_metrics: LogMetrics,
    pub timestamp: DateTime<Utc>,
}

pub fn basic_stats_from(rows: &[delivery::Model]) -> BasicStats {
    let count = |st: DeliveryStatus| rows.iter().filter(|d| d.status == st).count() as u64;
    BasicStats {
        total_deliveries: rows.len() as u64,
        completed_deliveries: count(DeliveryStatus::Completed),
        cancelled_deliveries: count(DeliveryStatus::Cancelled),
        in_progress_deliveries: count(DeliveryStatus::InProgress),
        avg_processing_minutes: average(rows.iter().filter_map(|d| d.processing_minutes()).map(|m| m as f64)),
        avg_eta_minutes: average(rows.iter().filter_map(|d| d.eta_minutes).map(f64::from)),
    }
}

/// One entry per date with deliveries, ascending.
pub fn daily_trends_from(rows: &[delivery::Model]) -> Vec<DailyTrend> {
    let mut by_day: BTreeMap<NaiveDate, DailyTrend> = BTreeMap::new();
    for d in rows {
        let t = by_day
            .entry(d.delivery_date)
            .or_insert(DailyTrend { date: d.delivery_date, total: 0, completed: 0, cancelled: 0 });
        t.total += 1;
        match d.status {
            DeliveryStatus::Completed => t.completed += 1,
            DeliveryStatus::Cancelled => t.cancelled += 1,
            _ => {}
        }
    }
    by_day.into_values().collect()
}

/// Per-driver totals ordered by completed deliveries, most first.
pub fn driver_performance_from(rows: &[delivery::Model], names: &HashMap<Uuid, String>) -> Vec<DriverPerformance> {
    let mut by_driver: HashMap<Uuid, Vec<&delivery::Model>> = HashMap::new();
    for d in rows {
        by_driver.entry(d.driver_id).or_default().push(d);
    }
    let mut out: Vec<DriverPerformance> = by_driver
        .into_iter()
        .map(|(driver_id, ds)| DriverPerformance {
            driver_id,
            driver_name: names.get(&driver_id).cloned().unwrap_or_default(),
            total_deliveries: ds.len() as u64,
            completed_deliveries: ds.iter().filter(|d| d.status == DeliveryStatus::Completed).count() as u64,
            avg_processing_minutes: average(ds.iter().filter_map(|d| d.processing_minutes()).map(|m| m as f64)),
            avg_eta_minutes: average(ds.iter().filter_map(|d| d.eta_minutes).map(f64::from)),
        })
        .collect();
    out.sort_by(|a, b| {
        b.completed_deliveries
            .cmp(&a.completed_deliveries)
            .then_with(|| a.driver_name.cmp(&b.driver_name))
    });
    out
}

/// Deliveries per city ordered by count, most first.
pub fn city_distribution_from(rows: &[delivery::Model], cities: &HashMap<Uuid, String>) -> Vec<CityDistribution> {
    let mut by_city: HashMap<String, (u64, HashSet<Uuid>)> = HashMap::new();
    for d in rows {
        let Some(city) = cities.get(&d.address_id) else { continue };
        let e = by_city.entry(city.clone()).or_default();
        e.0 += 1;
        e.1.insert(d.driver_id);
    }
    let mut out: Vec<CityDistribution> = by_city
        .into_iter()
        .map(|(city, (n, drivers))| CityDistribution { city, delivery_count: n, unique_drivers: drivers.len() as u64 })
        .collect();
    out.sort_by(|a, b| b.delivery_count.cmp(&a.delivery_count).then_with(|| a.city.cmp(&b.city)));
    out
}

pub fn role_distribution_from(users: &[user::Model]) -> Vec<RoleCount> {
    let mut by_role: BTreeMap<&'static str, RoleCount> = BTreeMap::new();
    for u in users {
        let e = by_role
            .entry(u.role.as_str())
            .or_insert(RoleCount { role: u.role, count: 0, active_count: 0 });
        e.count += 1;
        if u.active {
            e.active_count += 1;
        }
    }
    by_role.into_values().collect()
}

/// Activity per day, newest first.
pub fn activity_trends_from(events: &[user_activity::Model]) -> Vec<ActivityTrend> {
    let mut by_day: BTreeMap<NaiveDate, (u64, HashSet<Uuid>)> = BTreeMap::new();
    for e in events {
        let day = by_day.entry(e.created_at.date_naive()).or_default();
        day.0 += 1;
        day.1.insert(e.user_id);
    }
    by_day
        .into_iter()
        .rev()
        .map(|(date, (n, users))| ActivityTrend { date, activity_count: n, unique_users: users.len() as u64 })
        .collect()
}

pub fn engagement_from(users: &[user::Model], now: DateTime<Utc>) -> Engagement {
    let since = |days: i64| -> DateTime<FixedOffset> { (now - Duration::days(days)).into() };
    let (week, month) = (since(7), since(30));
    Engagement {
        total_users: users.len() as u64,
        active_last_week: users.iter().filter(|u| u.last_login.is_some_and(|t| t >= week)).count() as u64,
        active_last_month: users.iter().filter(|u| u.last_login.is_some_and(|t| t >= month)).count() as u64,
        avg_days_to_last_login: average(
            users
                .iter()
                .filter_map(|u| u.last_login.map(|t| (t - u.created_at).num_days() as f64)),
        ),
    }
}

pub fn database_metrics_from(rows: &[delivery::Model]) -> DatabaseMetrics {
    DatabaseMetrics {
        total_deliveries: rows.len() as u64,
        active_drivers: rows.iter().map(|d| d.driver_id).collect::<HashSet<_>>().len() as u64,
        unique_addresses: rows.iter().map(|d| d.address_id).collect::<HashSet<_>>().len() as u64,
        last_activity: rows.iter().map(|d| d.created_at).max(),
    }
}

pub fn log_metrics_from(logs: &[system_log::Model]) -> LogMetrics {
    LogMetrics {
        total_events: logs.len() as u64,
        error_count: logs.iter().filter(|l| l.level == LogLevel::Error).count() as u64,
        warning_count: logs.iter().filter(|l| l.level == LogLevel::Warning).count() as u64,
    }
}

#[derive(Clone)]
pub struct AnalyticsService {
    db: DatabaseConnection,
}

impl AnalyticsService {
    pub fn new(db: DatabaseConnection) -> Self { Self { db } }

    #[instrument(skip(self))]
    pub async fn delivery_analytics(&self, start: NaiveDate, end: NaiveDate) -> ServiceResult<DeliveryAnalytics> {
        if start > end {
            return Err(ServiceError::Validation("start date must not be after end date".into()));
        }
        let rows = delivery::Entity::find()
            .filter(delivery::Column::DeliveryDate.between(start, end))
            .all(&self.db)
            .await?;

        let driver_ids: HashSet<Uuid> = rows.iter().map(|d| d.driver_id).collect();
        let address_ids: HashSet<Uuid> = rows.iter().map(|d| d.address_id).collect();
        let names: HashMap<Uuid, String> = if driver_ids.is_empty() {
            HashMap::new()
        } else {
            user::Entity::find()
                .filter(user::Column::Id.is_in(driver_ids))
                .all(&self.db)
                .await?
                .into_iter()
                .map(|u| (u.id, u.name))
                .collect()
        };
        let cities: HashMap<Uuid, String> = if address_ids.is_empty() {
            HashMap::new()
        } else {
            address::Entity::find()
                .filter(address::Column::Id.is_in(address_ids))
                .all(&self.db)
                .await?
                .into_iter()
                .map(|a| (a.id, a.city))
                .collect()
        };

        Ok(DeliveryAnalytics {
            start,
            end,
            basic_stats: basic_stats_from(&rows),
            daily_trends: daily_trends_from(&rows),
            driver_performance: driver_performance_from(&rows, &names),
            address_distribution: city_distribution_from(&rows, &cities),
        })
    }

    #[instrument(skip(self))]
    pub async fn user_analytics(&self) -> ServiceResult<UserAnalytics> {
        let now = Utc::now();
        let users = user::Entity::find().all(&self.db).await?;
        let month_ago: DateTime<FixedOffset> = (now - Duration::days(30)).into();
        let events = user_activity::Entity::find()
            .filter(user_activity::Column::CreatedAt.gte(month_ago))
            .all(&self.db)
            .await?;
        Ok(UserAnalytics {
            role_distribution: role_distribution_from(&users),
            activity_trends: activity_trends_from(&events),
            engagement: engagement_from(&users, now),
        })
    }

    /// Activity over the last 24 hours.
    #[instrument(skip(self))]
    pub async fn system_health(&self) -> ServiceResult<SystemHealth> {
        let now = Utc::now();
        let since: DateTime<FixedOffset> = (now - Duration::hours(24)).into();
        let deliveries = delivery::Entity::find()
            .filter(delivery::Column::CreatedAt.gte(since))
            .all(&self.db)
            .await?;
        let logs = system_log::Entity::find()
            .filter(system_log::Column::CreatedAt.gte(since))
            .all(&self.db)
            .await?;
        Ok(SystemHealth {
            database_metrics: database_metrics_from(&deliveries),
            log_metrics: log_metrics_from(&logs),
            timestamp: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::enums::ApprovalStatus;

    fn d(driver: Uuid, addr: Uuid, date: NaiveDate, status: DeliveryStatus, eta: Option<i32>) -> delivery::Model {
        let now = Utc::now();
        delivery::Model {
            id: Uuid::new_v4(),
            driver_id: driver,
            address_id: addr,
            delivery_date: date,
            start_time: chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: chrono::NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            status,
            eta_minutes: eta,
            return_eta_minutes: eta,
            notes: None,
            assigned_by: None,
            created_at: now.into(),
            updated_at: now.into(),
            completed_at: (status == DeliveryStatus::Completed).then(|| (now + Duration::minutes(60)).into()),
        }
    }

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, n).unwrap()
    }

    #[test]
    fn delivery_aggregates() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let (praha, brno) = (Uuid::new_v4(), Uuid::new_v4());
        let rows = vec![
            d(a, praha, day(1), DeliveryStatus::Completed, Some(10)),
            d(a, praha, day(1), DeliveryStatus::Cancelled, Some(20)),
            d(b, praha, day(2), DeliveryStatus::InProgress, None),
            d(b, brno, day(2), DeliveryStatus::Completed, Some(30)),
            d(b, brno, day(3), DeliveryStatus::Completed, None),
        ];

        let basic = basic_stats_from(&rows);
        assert_eq!(basic.total_deliveries, 5);
        assert_eq!(basic.completed_deliveries, 3);
        assert_eq!(basic.cancelled_deliveries, 1);
        assert_eq!(basic.in_progress_deliveries, 1);
        assert_eq!(basic.avg_eta_minutes, Some(20.0));
        assert_eq!(basic.avg_processing_minutes, Some(60.0));

        let trends = daily_trends_from(&rows);
        assert_eq!(trends.len(), 3);
        assert_eq!(trends[0], DailyTrend { date: day(1), total: 2, completed: 1, cancelled: 1 });
        assert_eq!(trends[2].date, day(3));

        let names = HashMap::from([(a, "Adam".to_string()), (b, "Bara".to_string())]);
        let perf = driver_performance_from(&rows, &names);
        assert_eq!(perf[0].driver_name, "Bara");
        assert_eq!(perf[0].completed_deliveries, 2);
        assert_eq!(perf[1].total_deliveries, 2);

        let cities = HashMap::from([(praha, "Praha".to_string()), (brno, "Brno".to_string())]);
        let dist = city_distribution_from(&rows, &cities);
        assert_eq!(dist[0], CityDistribution { city: "Praha".into(), delivery_count: 3, unique_drivers: 2 });
        assert_eq!(dist[1], CityDistribution { city: "Brno".into(), delivery_count: 2, unique_drivers: 1 });

        let db = database_metrics_from(&rows);
        assert_eq!((db.total_deliveries, db.active_drivers, db.unique_addresses), (5, 2, 2));
        assert!(db.last_activity.is_some());
        assert_eq!(database_metrics_from(&[]), DatabaseMetrics::default());
    }

    fn u(role: Role, active: bool, created_days_ago: i64, login_days_ago: Option<i64>) -> user::Model {
        let now = Utc::now();
        user::Model {
            id: Uuid::new_v4(),
            name: "N".into(),
            email: "n@example.com".into(),
            username: "n".into(),
            role,
            active,
            approval_status: ApprovalStatus::Approved,
            preferred_lang: "cs".into(),
            last_login: login_days_ago.map(|n| (now - Duration::days(n)).into()),
            created_at: (now - Duration::days(created_days_ago)).into(),
            updated_at: now.into(),
        }
    }

    #[test]
    fn user_aggregates() {
        let users = vec![
            u(Role::Driver, true, 40, Some(2)),
            u(Role::Driver, false, 40, Some(20)),
            u(Role::Manager, true, 10, None),
        ];
        let roles = role_distribution_from(&users);
        let driver = roles.iter().find(|r| r.role == Role::Driver).unwrap();
        assert_eq!((driver.count, driver.active_count), (2, 1));
        assert_eq!(roles.len(), 2);

        let e = engagement_from(&users, Utc::now());
        assert_eq!(e.total_users, 3);
        assert_eq!(e.active_last_week, 1);
        assert_eq!(e.active_last_month, 2);
        assert_eq!(e.avg_days_to_last_login, Some(29.0));
    }

    #[test]
    fn activity_trends_newest_first() {
        let now = Utc::now();
        let (x, y) = (Uuid::new_v4(), Uuid::new_v4());
        let ev = |user: Uuid, days: i64| user_activity::Model {
            id: 0,
            user_id: user,
            action: "login".into(),
            details: None,
            created_at: (now - Duration::days(days)).into(),
        };
        let trends = activity_trends_from(&[ev(x, 0), ev(x, 0), ev(y, 0), ev(y, 3)]);
        assert_eq!(trends.len(), 2);
        assert!(trends[0].date > trends[1].date);
        assert_eq!((trends[0].activity_count, trends[0].unique_users), (3, 2));
    }

    #[test]
    fn log_levels_counted() {
        let log = |level| system_log::Model { id: 0, level, event_type: "e".into(), details: None, created_at: Utc::now().into() };
        let m = log_metrics_from(&[log(LogLevel::Error), log(LogLevel::Warning), log(LogLevel::Info), log(LogLevel::Error)]);
        assert_eq!(m, LogMetrics { total_events: 4, error_count: 2, warning_count: 1 });
    }
}
