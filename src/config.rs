//! Settings and the router.

use std::path::Path;

use axum::{
    Router,
    routing::{get, post},
};
use axum_extra::extract::cookie::Key;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::{
    auth::{
        login::{do_login, do_logout, login_page},
        register::{do_register, register_page},
    },
    bookings::{
        book::{book_room_page, do_book_room},
        manage::{bookings_page, do_change_status},
    },
    gallery::manage::{do_add_image, do_set_primary},
    rooms::{
        detail::{booked_dates_json, room_detail_page},
        manage::{
            create_room_page, do_create_room, do_edit_room, edit_room_page,
            manage_rooms_page,
        },
        search::home,
    },
    state::{AppState, DbPool, tx_commit},
};

pub const MEMORY_DB: &str = ":memory:";

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    /// At least 64 bytes, used to encrypt session cookies.
    pub secret_key: Option<String>,
    pub pool_size: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: MEMORY_DB.to_string(),
            bind_addr: "127.0.0.1:8000".to_string(),
            secret_key: None,
            pool_size: 10,
        }
    }
}

impl AppConfig {
    /// Reads `HOTELIER_CONFIG` (default `hotelier.toml`) if present, then
    /// applies `DATABASE_URL`, `SECRET_KEY` and `BIND_ADDR` over it.
    pub fn load() -> Result<Self, String> {
        let path = std::env::var("HOTELIER_CONFIG")
            .unwrap_or_else(|_| "hotelier.toml".to_string());

        let mut config = if Path::new(&path).exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| format!("could not read {path}: {e}"))?;
            Self::from_toml(&text)
                .map_err(|e| format!("could not parse {path}: {e}"))?
        } else {
            Self::default()
        };

        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var("DATABASE_URL") {
            self.database_url = url;
        }
        if let Some(key) = var("SECRET_KEY") {
            self.secret_key = Some(key);
        }
        if let Some(addr) = var("BIND_ADDR") {
            self.bind_addr = addr;
        }
    }

    /// An in-memory database only exists on the connection which created
    /// it, so the pool must not open a second one.
    pub fn effective_pool_size(&self) -> u32 {
        if self.database_url == MEMORY_DB {
            1
        } else {
            self.pool_size.max(1)
        }
    }

    pub fn key(&self) -> Result<Key, String> {
        match &self.secret_key {
            Some(secret) => Key::try_from(secret.as_bytes()).map_err(|_| {
                "the secret key must be at least 64 bytes long".to_string()
            }),
            None if cfg!(test) => Ok(Key::from(&[b'0'; 64])),
            None => {
                tracing::warn!(
                    "no secret key configured; sessions will not survive a restart"
                );
                Ok(Key::generate())
            }
        }
    }
}

/// The router with an ephemeral session key (a fixed one under test).
pub fn create_app(pool: DbPool) -> Router {
    let key = AppConfig::default()
        .key()
        .unwrap_or_else(|_| Key::generate());

    create_app_with_key(pool, key)
}

pub fn create_app_with_key(pool: DbPool, key: Key) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/login", get(login_page).post(do_login))
        .route("/register", get(register_page).post(do_register))
        .route("/logout", post(do_logout))
        .route("/rooms/:id", get(room_detail_page))
        .route("/rooms/:id/booked-dates", get(booked_dates_json))
        .route("/rooms/:id/book", get(book_room_page).post(do_book_room))
        .route("/bookings", get(bookings_page))
        .route("/bookings/:id/status", post(do_change_status))
        .route("/manage/rooms", get(manage_rooms_page))
        .route(
            "/manage/rooms/create",
            get(create_room_page).post(do_create_room),
        )
        .route(
            "/manage/rooms/:id/edit",
            get(edit_room_page).post(do_edit_room),
        )
        .route("/manage/rooms/:id/images", post(do_add_image))
        .route("/manage/images/:id/primary", post(do_set_primary))
        .layer(axum::middleware::from_fn(tx_commit))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { pool, key })
}
