//! Wire and domain types shared by the database, API and server crates.

pub mod api;
pub mod models;
