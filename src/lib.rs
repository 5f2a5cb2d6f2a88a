//! Hotelier: room catalog, availability search and reservations for a
//! single hotel, served as server-rendered HTML.

use diesel_migrations::{EmbeddedMigrations, embed_migrations};

#[macro_use]
mod sql_enum;

pub mod auth;
pub mod bookings;
pub mod config;
pub mod gallery;
pub mod money;
pub mod permission;
pub mod rooms;
pub mod schema;
pub mod state;
pub mod template;
pub mod util_resp;
pub mod validation;
pub mod widgets;

#[cfg(test)]
pub mod test;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();
