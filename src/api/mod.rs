//! API module for the product master OData service

mod client;
mod executor;

pub use client::{ODataClient, DEFAULT_TIMEOUT};
