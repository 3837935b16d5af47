use anyhow::Result;
use chrono::{NaiveDate, NaiveTime, Utc};
use migration::MigratorTrait;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, ModelTrait, Set};
use uuid::Uuid;

use common::types::GeoPoint;

use crate::db::{connect, db_tests_enabled};
use crate::{address, delivery, user, user_credentials};
use crate::enums::{ApprovalStatus, DeliveryStatus, Role};

/// Setup test database with migrations
async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = connect().await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

async fn make_user(db: &DatabaseConnection, role: Role) -> Result<user::Model> {
    let tag = Uuid::new_v4().simple().to_string();
    Ok(user::create(db, user::NewUser {
        name: format!("Test {role}"),
        email: format!("{}@example.com", &tag[..12]),
        username: format!("u{}", &tag[..12]),
        role,
        approval_status: ApprovalStatus::Approved,
        preferred_lang: "cs".into(),
    }).await?)
}

#[tokio::test]
async fn test_user_crud_and_login_lookup() -> Result<()> {
    if !db_tests_enabled() {
        return Ok(());
    }
    let db = setup_test_db().await?;

    let u = make_user(&db, Role::Employee).await?;
    let by_email = user::find_by_login(&db, &u.email.to_uppercase()).await?;
    assert_eq!(by_email.map(|m| m.id), Some(u.id));
    let by_username = user::find_by_login(&db, &u.username).await?;
    assert_eq!(by_username.map(|m| m.id), Some(u.id));

    user_credentials::upsert_password(&db, u.id, "hash-1".into(), "argon2").await?;
    user_credentials::upsert_password(&db, u.id, "hash-2".into(), "argon2").await?;
    let cred = user_credentials::find_by_user(&db, u.id).await?.expect("credentials");
    assert_eq!(cred.password_hash, "hash-2");

    assert!(user::hard_delete(&db, u.id).await?);
    assert!(!user::hard_delete(&db, u.id).await?);
    assert!(user_credentials::find_by_user(&db, u.id).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_delivery_joins_address() -> Result<()> {
    if !db_tests_enabled() {
        return Ok(());
    }
    let db = setup_test_db().await?;

    let driver = make_user(&db, Role::Driver).await?;
    let fields = address::AddressFields::parse("Depot", "Na Příkopě 1", "Praha", "11000")?;
    let addr = address::create(&db, fields, GeoPoint::new(50.087, 14.421), None).await?;

    let now = Utc::now().into();
    let d = delivery::ActiveModel {
        id: Set(Uuid::new_v4()),
        driver_id: Set(driver.id),
        address_id: Set(addr.id),
        delivery_date: Set(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()),
        start_time: Set(NaiveTime::from_hms_opt(9, 0, 0).unwrap()),
        end_time: Set(NaiveTime::from_hms_opt(10, 0, 0).unwrap()),
        status: Set(DeliveryStatus::Pending),
        eta_minutes: Set(None),
        return_eta_minutes: Set(None),
        notes: Set(None),
        assigned_by: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        completed_at: Set(None),
    }
    .insert(&db)
    .await?;

    let joined = delivery::Entity::find_by_id(d.id)
        .find_also_related(address::Entity)
        .one(&db)
        .await?
        .expect("delivery row");
    assert_eq!(joined.1.map(|a| a.city), Some("Praha".to_string()));

    d.delete(&db).await?;
    address::Entity::delete_by_id(addr.id).exec(&db).await?;
    user::hard_delete(&db, driver.id).await?;
    Ok(())
}
