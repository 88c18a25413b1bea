pub mod db;
pub mod error;
pub mod migrations;
pub mod models;

pub use db::Database;
pub use error::StoreError;
pub use models::{IdentityMode, Session, Settings};
