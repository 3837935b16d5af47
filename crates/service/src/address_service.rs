//! Delivery addresses with geocoded coordinates.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use common::types::GeoPoint;
use models::address::{self, AddressFields};
use models::delivery;

use crate::errors::{ServiceError, ServiceResult};
use crate::maps::RoutingProvider;

#[derive(Debug, Clone, Deserialize)]
pub struct NewAddress {
    pub label: String,
    pub street: String,
    pub city: String,
    pub zip_code: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressUpdate {
    pub label: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub zip_code: Option<String>,
}

impl AddressUpdate {
    pub fn is_empty(&self) -> bool {
        self.label.is_none() && self.street.is_none() && self.city.is_none() && self.zip_code.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AddressStats {
    pub total_addresses: u64,
    pub unique_cities: u64,
    pub unique_zip_codes: u64,
    pub unique_creators: u64,
}

impl AddressStats {
    pub fn from_addresses(rows: &[address::Model]) -> Self {
        let cities: HashSet<&str> = rows.iter().map(|a| a.city.as_str()).collect();
        let zips: HashSet<&str> = rows.iter().map(|a| a.zip_code.as_str()).collect();
        let creators: HashSet<Uuid> = rows.iter().filter_map(|a| a.created_by).collect();
        Self {
            total_addresses: rows.len() as u64,
            unique_cities: cities.len() as u64,
            unique_zip_codes: zips.len() as u64,
            unique_creators: creators.len() as u64,
        }
    }
}

#[derive(Clone)]
pub struct AddressService {
    db: DatabaseConnection,
    routing: Arc<dyn RoutingProvider>,
}

impl AddressService {
    pub fn new(db: DatabaseConnection, routing: Arc<dyn RoutingProvider>) -> Self {
        Self { db, routing }
    }

    async fn geocode(&self, street: &str, city: &str, zip_code: &str) -> Option<GeoPoint> {
        match self.routing.geocode(street, city, zip_code).await {
            Ok(found) => found,
            Err(e) => {
                warn!(error = %e, "geocoding failed");
                None
            }
        }
    }

    /// Create an address. Missing coordinates are geocoded from the postal address.
    #[instrument(skip(self, input), fields(label = %input.label))]
    pub async fn create(&self, input: NewAddress, created_by: Option<Uuid>) -> ServiceResult<address::Model> {
        let fields = AddressFields::parse(&input.label, &input.street, &input.city, &input.zip_code)?;
        let location = match (input.latitude, input.longitude) {
            (Some(lat), Some(lng)) => {
                address::validate_coordinates(lat, lng)?;
                GeoPoint::new(lat, lng)
            }
            _ => self
                .geocode(&fields.street, &fields.city, &fields.zip_code)
                .await
                .ok_or_else(|| ServiceError::Validation("could not geocode address".into()))?,
        };
        let created = address::create(&self.db, fields, location, created_by).await?;
        info!(address_id = %created.id, "address_created");
        Ok(created)
    }

    /// Update text fields; coordinates follow when the postal address changes.
    #[instrument(skip(self, changes))]
    pub async fn update(&self, id: Uuid, changes: AddressUpdate) -> ServiceResult<address::Model> {
        if changes.is_empty() {
            return Err(ServiceError::Validation("no fields to update".into()));
        }
        let current = self.get(id).await?;
        let fields = AddressFields::parse(
            changes.label.as_deref().unwrap_or(&current.label),
            changes.street.as_deref().unwrap_or(&current.street),
            changes.city.as_deref().unwrap_or(&current.city),
            changes.zip_code.as_deref().unwrap_or(&current.zip_code),
        )?;
        let moved = fields.street != current.street || fields.city != current.city || fields.zip_code != current.zip_code;

        let mut am: address::ActiveModel = current.into();
        if moved {
            match self.geocode(&fields.street, &fields.city, &fields.zip_code).await {
                Some(p) => {
                    am.latitude = Set(p.lat);
                    am.longitude = Set(p.lng);
                }
                None => warn!(address_id = %id, "could not geocode updated address, keeping coordinates"),
            }
        }
        am.label = Set(fields.label);
        am.street = Set(fields.street);
        am.city = Set(fields.city);
        am.zip_code = Set(fields.zip_code);
        am.updated_at = Set(Utc::now().into());
        let updated = am.update(&self.db).await?;
        info!(address_id = %id, moved, "address_updated");
        Ok(updated)
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<address::Model> {
        address::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("address"))
    }

    pub async fn list(&self) -> ServiceResult<Vec<address::Model>> {
        Ok(address::Entity::find().order_by_asc(address::Column::Label).all(&self.db).await?)
    }

    pub async fn list_by_creator(&self, user_id: Uuid) -> ServiceResult<Vec<address::Model>> {
        Ok(address::Entity::find()
            .filter(address::Column::CreatedBy.eq(user_id))
            .order_by_desc(address::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    pub async fn stats(&self) -> ServiceResult<AddressStats> {
        let rows = address::Entity::find().all(&self.db).await?;
        Ok(AddressStats::from_addresses(&rows))
    }

    /// Addresses still referenced by deliveries cannot be removed.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> ServiceResult<()> {
        let used = delivery::Entity::find()
            .filter(delivery::Column::AddressId.eq(id))
            .count(&self.db)
            .await?;
        if used > 0 {
            return Err(ServiceError::Conflict(format!("address is used by {used} deliveries")));
        }
        let res = address::Entity::delete_by_id(id).exec(&self.db).await?;
        if res.rows_affected == 0 {
            return Err(ServiceError::not_found("address"));
        }
        info!(address_id = %id, "address_deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maps::DisabledRouting;
    use crate::test_support::{get_db, seed_address, FixedRouting};

    fn row(city: &str, zip: &str, creator: Option<Uuid>) -> address::Model {
        let now = Utc::now().into();
        address::Model {
            id: Uuid::new_v4(),
            label: "L".into(),
            street: "S".into(),
            city: city.into(),
            zip_code: zip.into(),
            latitude: 50.0,
            longitude: 14.0,
            created_by: creator,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn stats_count_distinct_values() {
        let creator = Uuid::new_v4();
        let rows = vec![
            row("Praha", "11000", Some(creator)),
            row("Praha", "12000", Some(creator)),
            row("Brno", "60200", None),
        ];
        let s = AddressStats::from_addresses(&rows);
        assert_eq!(s, AddressStats { total_addresses: 3, unique_cities: 2, unique_zip_codes: 3, unique_creators: 1 });
    }

    #[test]
    fn empty_update_detected() {
        assert!(AddressUpdate::default().is_empty());
        assert!(!AddressUpdate { city: Some("Brno".into()), ..Default::default() }.is_empty());
    }

    #[tokio::test]
    async fn create_without_coordinates_requires_geocoding() -> Result<(), anyhow::Error> {
        if !models::db::db_tests_enabled() { return Ok(()); }
        let db = get_db().await?;
        let input = NewAddress {
            label: "Cafe".into(),
            street: "Karlova 3".into(),
            city: "Praha".into(),
            zip_code: "11000".into(),
            latitude: None,
            longitude: None,
        };

        let disabled = AddressService::new(db.clone(), Arc::new(DisabledRouting));
        let err = disabled.create(input.clone(), None).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(m) if m.contains("geocode")));

        let svc = AddressService::new(db.clone(), Arc::new(FixedRouting::new(GeoPoint::new(50.086, 14.417), 12)));
        let created = svc.create(input, None).await?;
        assert_eq!(created.latitude, 50.086);

        let updated = svc.update(created.id, AddressUpdate { label: Some("Cafe 2".into()), ..Default::default() }).await?;
        assert_eq!(updated.label, "Cafe 2");
        assert!(matches!(svc.update(created.id, AddressUpdate::default()).await, Err(ServiceError::Validation(_))));

        svc.delete(created.id).await?;
        assert!(matches!(svc.delete(created.id).await, Err(ServiceError::NotFound(_))));
        Ok(())
    }

    #[tokio::test]
    async fn moving_an_address_regeocodes_it() -> Result<(), anyhow::Error> {
        if !models::db::db_tests_enabled() { return Ok(()); }
        let db = get_db().await?;
        let seeded = seed_address(&db).await?;

        let svc = AddressService::new(db.clone(), Arc::new(FixedRouting::new(GeoPoint::new(49.19, 16.60), 10)));
        let moved = svc.update(seeded.id, AddressUpdate { street: Some("Masarykova 1".into()), ..Default::default() }).await?;
        assert_eq!(moved.street, "Masarykova 1");
        assert_eq!((moved.latitude, moved.longitude), (49.19, 16.60));

        let rezoned = AddressService::new(db.clone(), Arc::new(FixedRouting::new(GeoPoint::new(49.20, 16.61), 10)));
        let updated = rezoned.update(seeded.id, AddressUpdate { zip_code: Some("60200".into()), ..Default::default() }).await?;
        assert_eq!((updated.latitude, updated.longitude), (49.20, 16.61));

        // label-only edits never touch coordinates
        let relabeled = svc.update(seeded.id, AddressUpdate { label: Some("Depot B".into()), ..Default::default() }).await?;
        assert_eq!((relabeled.latitude, relabeled.longitude), (49.20, 16.61));

        svc.delete(seeded.id).await?;
        Ok(())
    }

    #[tokio::test]
    async fn failed_geocoding_keeps_old_coordinates() -> Result<(), anyhow::Error> {
        if !models::db::db_tests_enabled() { return Ok(()); }
        let db = get_db().await?;
        let seeded = seed_address(&db).await?;

        let svc = AddressService::new(db.clone(), Arc::new(DisabledRouting));
        let updated = svc.update(seeded.id, AddressUpdate { city: Some("Brno".into()), ..Default::default() }).await?;
        assert_eq!(updated.city, "Brno");
        assert_eq!((updated.latitude, updated.longitude), (seeded.latitude, seeded.longitude));

        svc.delete(seeded.id).await?;
        Ok(())
    }
}
