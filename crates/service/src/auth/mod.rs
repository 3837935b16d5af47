//! Auth module: three-layer architecture (domain, repository, service).
//!
//! Registration, login, password changes and admin bootstrap live here;
//! the HTTP layer only deals with cookies and headers.

pub mod domain;
pub mod errors;
pub mod repository;
pub mod service;
pub mod repo;
pub mod token;

pub use errors::AuthError;
pub use service::{AuthService, AuthSettings};
