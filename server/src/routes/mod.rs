pub mod app_router;
pub mod auth;
pub mod emails;
