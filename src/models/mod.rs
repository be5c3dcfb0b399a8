//! Data models for product master queries

mod entity;
mod odata;
mod query;
mod table;

pub use entity::EntitySet;
pub use odata::{ODataResult, Record};
pub use query::{
    FilterEscaping, ODataRequest, QueryConfig, DEFAULT_BASE_URL, DEFAULT_TOP, MAX_TOP, MIN_TOP,
};
pub use table::QueryResult;
