use std::sync::Arc;

use common::types::GeoPoint;
use configs::AppConfig;
use sea_orm::DatabaseConnection;

use service::activity_service::ActivityService;
use service::address_service::AddressService;
use service::analytics_service::AnalyticsService;
use service::auth::repo::seaorm::SeaOrmAuthRepository;
use service::auth::{AuthService, AuthSettings};
use service::delivery_service::DeliveryService;
use service::maps::RoutingProvider;
use service::user_service::UserService;

#[derive(Clone)]
pub struct ServerAuthConfig {
    pub jwt_secret: String,
    pub cookie_secure: bool,
}

/// Shared handler state. Everything inside is cheap to clone.
#[derive(Clone)]
pub struct ServerState {
    pub db: DatabaseConnection,
    pub auth: ServerAuthConfig,
    pub auth_svc: Arc<AuthService<SeaOrmAuthRepository>>,
    pub users: Arc<UserService>,
    pub addresses: Arc<AddressService>,
    pub deliveries: Arc<DeliveryService>,
    pub analytics: Arc<AnalyticsService>,
    pub activity: Arc<ActivityService>,
}

impl ServerState {
    pub fn new(db: DatabaseConnection, cfg: &AppConfig, routing: Arc<dyn RoutingProvider>) -> Self {
        let warehouse = GeoPoint::new(cfg.maps.warehouse_lat, cfg.maps.warehouse_lng);
        let repo = Arc::new(SeaOrmAuthRepository::new(db.clone()));
        Self {
            auth: ServerAuthConfig {
                jwt_secret: cfg.auth.jwt_secret.clone(),
                cookie_secure: cfg.auth.cookie_secure,
            },
            auth_svc: Arc::new(AuthService::new(repo, AuthSettings::from(&cfg.auth))),
            users: Arc::new(UserService::new(db.clone())),
            addresses: Arc::new(AddressService::new(db.clone(), routing.clone())),
            deliveries: Arc::new(DeliveryService::new(db.clone(), routing, warehouse)),
            analytics: Arc::new(AnalyticsService::new(db.clone())),
            activity: Arc::new(ActivityService::new(db.clone())),
            db,
        }
    }
}
