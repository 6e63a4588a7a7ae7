pub mod db;
pub mod error;
pub mod models;
pub mod org;
pub mod query;
pub mod seed;
pub mod server;

pub use db::Database;
pub use error::ApiError;
