pub mod types;
pub mod utils;
pub mod pagination;
pub mod env;
pub mod geo;
pub mod text;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_type_ok() {
        let h = types::Health { status: "ok", version: "0.1.0" };
        assert_eq!(h.status, "ok");
    }

    #[test]
    fn geo_point_cache_key_rounds() {
        let p = types::GeoPoint::new(50.0755381, 14.4378005);
        assert_eq!(p.cache_key(), "50.07554,14.43780");
    }
}
