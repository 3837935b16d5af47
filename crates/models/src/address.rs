use sea_orm::{entity::prelude::*, Set, DatabaseConnection};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use common::{geo, text::sanitize_input, types::GeoPoint};

use crate::errors::ModelError;
use crate::user;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "address")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub label: String,
    pub street: String,
    pub city: String,
    pub zip_code: String,
    pub latitude: f64,
    pub longitude: f64,
    pub created_by: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Creator }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Creator => Entity::belongs_to(user::Entity)
                .from(Column::CreatedBy)
                .to(user::Column::Id)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    /// Single-line form used for geocoding and display.
    pub fn one_line(&self) -> String {
        format!("{}, {}, {}", self.street, self.city, self.zip_code)
    }
}

/// Sanitized address text fields.
#[derive(Debug, Clone, PartialEq)]
pub struct AddressFields {
    pub label: String,
    pub street: String,
    pub city: String,
    pub zip_code: String,
}

impl AddressFields {
    /// Sanitize every field and require each to be non-empty.
    pub fn parse(label: &str, street: &str, city: &str, zip_code: &str) -> Result<Self, ModelError> {
        let fields = Self {
            label: sanitize_input(label),
            street: sanitize_input(street),
            city: sanitize_input(city),
            zip_code: sanitize_input(zip_code),
        };
        for (name, value, max) in [
            ("label", &fields.label, 128),
            ("street", &fields.street, 255),
            ("city", &fields.city, 128),
            ("zip_code", &fields.zip_code, 16),
        ] {
            validate_text(name, value, max)?;
        }
        Ok(fields)
    }
}

pub fn validate_text(field: &str, value: &str, max: usize) -> Result<(), ModelError> {
    if value.trim().is_empty() {
        return Err(ModelError::Validation(format!("{field} required")));
    }
    if value.chars().count() > max {
        return Err(ModelError::Validation(format!("{field} too long (<={max})")));
    }
    Ok(())
}

pub fn validate_coordinates(lat: f64, lng: f64) -> Result<(), ModelError> {
    if geo::valid_coordinates(lat, lng) {
        Ok(())
    } else {
        Err(ModelError::Validation(format!("coordinates out of range: {lat},{lng}")))
    }
}

pub async fn create(
    db: &DatabaseConnection,
    fields: AddressFields,
    location: GeoPoint,
    created_by: Option<Uuid>,
) -> Result<Model, ModelError> {
    validate_coordinates(location.lat, location.lng)?;
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        label: Set(fields.label),
        street: Set(fields.street),
        city: Set(fields.city),
        zip_code: Set(fields.zip_code),
        latitude: Set(location.lat),
        longitude: Set(location.lng),
        created_by: Set(created_by),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(am.insert(db).await?)
}
