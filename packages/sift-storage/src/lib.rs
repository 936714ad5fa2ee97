pub mod db;
pub mod elasticsearch;
pub mod models;
pub mod queries;
pub mod rows;
pub mod schema;

mod error;

pub use error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;
