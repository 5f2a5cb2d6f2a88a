use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::Cookie;
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use chrono::{Days, NaiveDateTime, Utc};
use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use serde::{Deserialize, Serialize};

use crate::{
    schema::users,
    state::{DbPool, ThreadSafeConn},
};

pub mod login;
pub mod register;

pub const LOGIN_COOKIE: &str = "hotelier_session";

text_enum! {
    /// What a member of staff (or a guest) may see and do.
    pub enum Role {
        Admin => ("admin", "Admin"),
        Manager => ("manager", "Manager"),
        Team => ("team", "Team"),
        Customer => ("customer", "Customer"),
    }
}

impl Role {
    pub fn is_staff(&self) -> bool {
        !matches!(self, Role::Customer)
    }
}

#[derive(Debug, Queryable, Serialize, Deserialize, Clone)]
pub struct User<const TX: bool> {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub phone: String,
    pub address: String,
    pub is_superuser: bool,
    pub created_at: NaiveDateTime,
}

impl<const TX: bool> User<TX> {
    pub fn validate_password(password: &str) -> bool {
        password.len() >= 6
    }

    /// May manage the room catalog and gallery.
    pub fn can_manage_rooms(&self) -> bool {
        self.is_superuser || matches!(self.role, Role::Admin | Role::Manager)
    }

    /// May change the status of bookings they can see.
    pub fn can_manage_bookings(&self) -> bool {
        self.is_superuser || self.role.is_staff()
    }

    #[tracing::instrument(skip(conn))]
    pub fn fetch(
        user_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<Option<User<TX>>> {
        users::table
            .filter(users::id.eq(user_id))
            .first::<User<TX>>(conn)
            .optional()
    }
}

#[derive(Debug)]
pub enum AuthError {
    CookieMissingOrMalformed,
    NoDatabase,
    Unauthorized,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AuthError::CookieMissingOrMalformed => {
                (StatusCode::UNAUTHORIZED, "Cookie missing or malformed")
            }
            AuthError::NoDatabase => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error")
            }
            AuthError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "Unauthorized")
            }
        };
        (status, body).into_response()
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct LoginSession {
    id: String,
    expiry: NaiveDateTime,
}

#[async_trait]
impl<const TX: bool, S> FromRequestParts<S> for User<TX>
where
    S: Send + Sync,
    DbPool: FromRef<S>,
    Key: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let jar: PrivateCookieJar<Key> =
            PrivateCookieJar::from_request_parts(parts, state)
                .await
                .map_err(|_| AuthError::CookieMissingOrMalformed)?;

        let login_cookie = match jar.get(LOGIN_COOKIE) {
            Some(cookie) => cookie,
            None => return Err(AuthError::Unauthorized),
        };

        let login: LoginSession =
            match serde_json::from_str::<LoginSession>(login_cookie.value()) {
                Ok(t) if Utc::now().naive_utc() < t.expiry => t,
                _ => {
                    return Err(AuthError::Unauthorized);
                }
            };

        let conn_wrapper =
            ThreadSafeConn::<TX>::from_request_parts(parts, state)
                .await
                .map_err(|_| AuthError::NoDatabase)?;

        let mut conn = conn_wrapper
            .inner
            .try_lock()
            .map_err(|_| AuthError::NoDatabase)?;

        let user = User::<TX>::fetch(&login.id, &mut *conn)
            .map_err(|_| AuthError::NoDatabase)?;

        match user {
            Some(user) => Ok(user),
            None => Err(AuthError::Unauthorized),
        }
    }
}

pub fn set_login_cookie(id: String, jar: PrivateCookieJar) -> PrivateCookieJar {
    let expiry = Utc::now()
        .naive_utc()
        .checked_add_days(Days::new(7))
        .unwrap_or(NaiveDateTime::MAX);

    let session = serde_json::to_string(&LoginSession { id, expiry })
        .unwrap_or_default();

    let mut cookie = Cookie::new(LOGIN_COOKIE, session);
    cookie.set_path("/");
    cookie.set_http_only(true);
    jar.add(cookie)
}

pub fn clear_login_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.remove(Cookie::build(LOGIN_COOKIE).path("/"))
}
