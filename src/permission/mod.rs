//! Who may see which bookings, and who may manage the catalog.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::Key;
use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};

use crate::{
    auth::{Role, User},
    bookings::{Booking, BookingStatus},
    schema::bookings,
    state::DbPool,
    util_resp::FailureResponse,
};

/// The slice of the ledger an actor may read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    ActiveOnly,
    OwnOnly,
}

impl Scope {
    pub fn for_role(role: Role) -> Scope {
        match role {
            Role::Admin | Role::Manager => Scope::All,
            Role::Team => Scope::ActiveOnly,
            Role::Customer => Scope::OwnOnly,
        }
    }

    pub fn for_user<const TX: bool>(user: &User<TX>) -> Scope {
        if user.is_superuser {
            Scope::All
        } else {
            Scope::for_role(user.role)
        }
    }

    pub fn admits(&self, booking: &Booking, user_id: &str) -> bool {
        match self {
            Scope::All => true,
            Scope::ActiveOnly => booking.status.is_active(),
            Scope::OwnOnly => booking.guest_id == user_id,
        }
    }

    /// The ledger filtered to this scope, newest first.
    pub fn query<'a>(
        &self,
        user_id: &'a str,
    ) -> bookings::BoxedQuery<'a, Sqlite> {
        let query = bookings::table
            .order_by((bookings::booking_date.desc(), bookings::id.asc()))
            .into_boxed();

        match self {
            Scope::All => query,
            Scope::ActiveOnly => {
                query.filter(bookings::status.eq_any(BookingStatus::ACTIVE))
            }
            Scope::OwnOnly => query.filter(bookings::guest_id.eq(user_id)),
        }
    }
}

#[tracing::instrument(skip_all, fields(user = %user.id))]
pub fn visible_bookings<const TX: bool>(
    user: &User<TX>,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> QueryResult<Vec<Booking>> {
    Scope::for_user(user)
        .query(&user.id)
        .load::<Booking>(conn)
}

/// A logged in user who may manage rooms and gallery images.
pub struct RoomManager<const TX: bool>(pub User<TX>);

pub enum NotPermitted {
    LoggedOut,
    Forbidden,
}

impl IntoResponse for NotPermitted {
    fn into_response(self) -> Response {
        match self {
            NotPermitted::LoggedOut => {
                axum::response::Redirect::to("/login").into_response()
            }
            NotPermitted::Forbidden => {
                FailureResponse::Unauthorized(()).into_response()
            }
        }
    }
}

#[async_trait]
impl<S, const TX: bool> FromRequestParts<S> for RoomManager<TX>
where
    S: Send + Sync,
    DbPool: FromRef<S>,
    Key: FromRef<S>,
{
    type Rejection = NotPermitted;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let user = User::<TX>::from_request_parts(parts, state)
            .await
            .map_err(|_| NotPermitted::LoggedOut)?;

        if user.can_manage_rooms() {
            Ok(RoomManager(user))
        } else {
            tracing::warn!("user {} may not manage rooms", user.id);
            Err(NotPermitted::Forbidden)
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::test::{booking_fixture, room_fixture, test_conn, user_fixture};

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn role_mapping() {
        assert_eq!(Scope::for_role(Role::Admin), Scope::All);
        assert_eq!(Scope::for_role(Role::Manager), Scope::All);
        assert_eq!(Scope::for_role(Role::Team), Scope::ActiveOnly);
        assert_eq!(Scope::for_role(Role::Customer), Scope::OwnOnly);
    }

    #[test]
    fn each_role_sees_its_slice() {
        let mut conn = test_conn();
        let room = room_fixture(&mut conn, "101", 2, 0, 10_000);
        let alice = user_fixture(&mut conn, "alice", Role::Customer);
        let bob = user_fixture(&mut conn, "bob", Role::Customer);
        let team = user_fixture(&mut conn, "desk", Role::Team);
        let manager = user_fixture(&mut conn, "boss", Role::Manager);
        let mut root = user_fixture(&mut conn, "root", Role::Customer);
        root.is_superuser = true;

        let mine = booking_fixture(
            &mut conn,
            &room,
            &alice.id,
            d("2024-06-01"),
            d("2024-06-03"),
            BookingStatus::Pending,
        );
        let cancelled = booking_fixture(
            &mut conn,
            &room,
            &alice.id,
            d("2024-07-01"),
            d("2024-07-03"),
            BookingStatus::Cancelled,
        );
        let theirs = booking_fixture(
            &mut conn,
            &room,
            &bob.id,
            d("2024-08-01"),
            d("2024-08-03"),
            BookingStatus::Confirmed,
        );

        let ids = |user: &User<false>, conn: &mut SqliteConnection| {
            let mut ids = visible_bookings(user, conn)
                .unwrap()
                .into_iter()
                .map(|b| b.id)
                .collect::<Vec<_>>();
            ids.sort();
            ids
        };
        let sorted = |mut v: Vec<String>| {
            v.sort();
            v
        };

        assert_eq!(
            ids(&alice, &mut conn),
            sorted(vec![mine.id.clone(), cancelled.id.clone()])
        );
        assert_eq!(ids(&bob, &mut conn), vec![theirs.id.clone()]);
        assert_eq!(
            ids(&team, &mut conn),
            sorted(vec![mine.id.clone(), theirs.id.clone()])
        );
        let everything =
            sorted(vec![mine.id.clone(), cancelled.id.clone(), theirs.id.clone()]);
        assert_eq!(ids(&manager, &mut conn), everything);
        assert_eq!(ids(&root, &mut conn), everything);

        assert!(Scope::for_user(&team).admits(&mine, &team.id));
        assert!(!Scope::for_user(&team).admits(&cancelled, &team.id));
        assert!(!Scope::for_user(&bob).admits(&mine, &bob.id));
    }
}
