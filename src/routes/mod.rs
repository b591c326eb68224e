pub mod auth;
pub mod health;
pub mod nav;
pub mod permissions;
