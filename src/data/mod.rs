//! Data layer module
//!
//! Handles all relational persistence:
//! - Users, profiles and follow edges
//! - Activity log
//! - Images and likes

mod database;
mod models;

pub use database::{Database, UserUpdate};
pub use models::*;

#[cfg(test)]
mod database_test;
