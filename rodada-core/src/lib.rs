pub mod auth;
pub mod config;
pub mod errors;
pub mod live;
pub mod receipts;
pub mod store;
pub mod submit;

pub use rodada_schema as schema;
