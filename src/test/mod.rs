//! Shared fixtures, and tests which drive the whole router.

use argon2::{
    Algorithm, Argon2, Params, PasswordHasher, Version,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum_test::TestServer;
use chrono::{NaiveDate, Utc};
use diesel::{connection::SimpleConnection, prelude::*};
use diesel_migrations::MigrationHarness;

use crate::{
    MIGRATIONS,
    auth::{Role, User},
    bookings::{Booking, BookingStatus},
    config::create_app,
    rooms::{Amenities, BedType, Room, RoomType},
    schema::{bookings, rooms, users},
    state::{DbPool, build_pool, run_migrations},
};

pub const PASSWORD: &str = "password";

/// A migrated in-memory database with foreign keys enforced.
pub fn test_conn() -> SqliteConnection {
    let mut conn = SqliteConnection::establish(":memory:").unwrap();
    conn.batch_execute("PRAGMA foreign_keys = ON;").unwrap();
    conn.run_pending_migrations(MIGRATIONS).unwrap();
    conn
}

/// An active room named after its number.
pub fn room_fixture(
    conn: &mut SqliteConnection,
    number: &str,
    adults: i64,
    children: i64,
    price_cents: i64,
) -> Room {
    let now = Utc::now().naive_utc();
    let room = Room {
        id: uuid::Uuid::now_v7().to_string(),
        name: format!("Test room {number}"),
        room_type: RoomType::Double,
        room_number: number.to_string(),
        floor: 1,
        bed_type: BedType::Double,
        capacity_adults: adults,
        capacity_children: children,
        price_per_night_cents: price_cents,
        amenities: Amenities::default(),
        description: String::new(),
        is_active: true,
        created_at: now,
        updated_at: now,
    };

    diesel::insert_into(rooms::table)
        .values(&room)
        .execute(conn)
        .unwrap();
    room
}

/// A user whose password is [`PASSWORD`], hashed with the cheapest
/// parameters argon2 accepts.
pub fn user_fixture(
    conn: &mut SqliteConnection,
    username: &str,
    role: Role,
) -> User<false> {
    let argon2 = Argon2::new(
        Algorithm::Argon2id,
        Version::V0x13,
        Params::new(8, 1, 1, None).unwrap(),
    );
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = argon2
        .hash_password(PASSWORD.as_bytes(), &salt)
        .unwrap()
        .to_string();

    let user = User::<false> {
        id: uuid::Uuid::now_v7().to_string(),
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password_hash,
        role,
        phone: String::new(),
        address: String::new(),
        is_superuser: false,
        created_at: Utc::now().naive_utc(),
    };

    diesel::insert_into(users::table)
        .values((
            users::id.eq(&user.id),
            users::username.eq(&user.username),
            users::email.eq(&user.email),
            users::password_hash.eq(&user.password_hash),
            users::role.eq(user.role),
            users::is_superuser.eq(user.is_superuser),
            users::created_at.eq(user.created_at),
        ))
        .execute(conn)
        .unwrap();
    user
}

/// A booking written straight to the ledger, bypassing admission.
pub fn booking_fixture(
    conn: &mut SqliteConnection,
    room: &Room,
    guest_id: &str,
    check_in: NaiveDate,
    check_out: NaiveDate,
    status: BookingStatus,
) -> Booking {
    let now = Utc::now().naive_utc();
    let booking = Booking {
        id: uuid::Uuid::now_v7().to_string(),
        room_id: room.id.clone(),
        guest_id: guest_id.to_string(),
        check_in,
        check_out,
        num_adults: 1,
        num_children: 0,
        total_price_cents: room.price_per_night_cents
            * (check_out - check_in).num_days(),
        status,
        special_requests: String::new(),
        booking_date: now,
        updated_at: now,
    };

    diesel::insert_into(bookings::table)
        .values(&booking)
        .execute(conn)
        .unwrap();
    booking
}

/// The router over a fresh in-memory database. Drop any connection taken
/// from the pool before sending a request: there is only one.
pub fn test_server() -> (TestServer, DbPool) {
    let pool = build_pool(":memory:", 1).unwrap();
    run_migrations(&pool).unwrap();
    let server = TestServer::new(create_app(pool.clone())).unwrap();
    (server, pool)
}

mod http {
    use axum::http::{HeaderName, HeaderValue, StatusCode};
    use axum_extra::extract::cookie::Cookie;
    use chrono::{Days, NaiveDate, Utc};
    use diesel::prelude::*;

    use super::*;
    use crate::{
        auth::LOGIN_COOKIE,
        bookings::book::{FLASH_BOOKED, FLASH_COOKIE},
        rooms::detail::BookedDatesResponse,
    };

    fn days_from_today(days: u64) -> NaiveDate {
        Utc::now()
            .date_naive()
            .checked_add_days(Days::new(days))
            .unwrap()
    }

    async fn login(server: &TestServer, username: &str) -> Cookie<'static> {
        let res = server
            .post("/login")
            .form(&[("id", username), ("password", PASSWORD)])
            .await;
        assert_eq!(res.status_code(), StatusCode::SEE_OTHER);
        res.cookie(LOGIN_COOKIE)
    }

    fn booking_count(pool: &DbPool) -> i64 {
        let mut conn = pool.get().unwrap();
        bookings::table
            .count()
            .get_result::<i64>(&mut *conn)
            .unwrap()
    }

    #[tokio::test]
    async fn search_filters_by_capacity_and_serves_htmx_partials() {
        let (server, pool) = test_server();
        let (small, large) = {
            let mut conn = pool.get().unwrap();
            (
                room_fixture(&mut conn, "101", 2, 0, 8_000),
                room_fixture(&mut conn, "102", 4, 2, 14_000),
            )
        };

        let everything = server.get("/").await;
        everything.assert_status_ok();
        assert!(everything.text().contains(&small.id));
        assert!(everything.text().contains(&large.id));

        let check_in = days_from_today(10).to_string();
        let check_out = days_from_today(12).to_string();
        let filtered = server
            .get("/")
            .add_query_params([
                ("check_in", check_in.as_str()),
                ("check_out", check_out.as_str()),
                ("adults", "3"),
            ])
            .add_header(
                HeaderName::from_static("hx-request"),
                HeaderValue::from_static("true"),
            )
            .await;
        filtered.assert_status_ok();
        let body = filtered.text();
        assert!(!body.contains("<html"));
        assert!(body.contains("room-list"));
        assert!(body.contains(&large.id));
        assert!(!body.contains(&small.id));
    }

    #[tokio::test]
    async fn invalid_search_shows_the_active_catalog() {
        let (server, pool) = test_server();
        let (open, closed) = {
            let mut conn = pool.get().unwrap();
            let open = room_fixture(&mut conn, "101", 2, 0, 8_000);
            let closed = room_fixture(&mut conn, "102", 2, 0, 8_000);
            diesel::update(rooms::table.find(&closed.id))
                .set(rooms::is_active.eq(false))
                .execute(&mut *conn)
                .unwrap();
            (open, closed)
        };

        let res = server
            .get("/")
            .add_query_params([("check_in", "not a date"), ("adults", "9")])
            .await;
        res.assert_status_ok();
        let body = res.text();
        assert!(body.contains(&open.id));
        assert!(!body.contains(&closed.id));
        assert!(body.contains("invalid-feedback"));
    }

    #[tokio::test]
    async fn booked_dates_endpoint_lists_each_occupied_day() {
        let (server, pool) = test_server();
        let room = {
            let mut conn = pool.get().unwrap();
            let room = room_fixture(&mut conn, "101", 2, 0, 8_000);
            let guest = user_fixture(&mut conn, "guest", Role::Customer);
            booking_fixture(
                &mut conn,
                &room,
                &guest.id,
                days_from_today(3),
                days_from_today(5),
                BookingStatus::Confirmed,
            );
            booking_fixture(
                &mut conn,
                &room,
                &guest.id,
                days_from_today(20),
                days_from_today(22),
                BookingStatus::Cancelled,
            );
            room
        };

        let res = server.get(&format!("/rooms/{}/booked-dates", room.id)).await;
        res.assert_status_ok();
        let json = res.json::<serde_json::Value>();
        assert!(json.get("booked_dates").is_some_and(|v| v.is_array()));
        assert_eq!(
            res.json::<BookedDatesResponse>().booked_dates,
            (3..=5)
                .map(|d| days_from_today(d).to_string())
                .collect::<Vec<_>>()
        );

        server
            .get("/rooms/no-such-room/booked-dates")
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn booking_requires_a_login_and_creates_nothing_without_one() {
        let (server, pool) = test_server();
        let room = {
            let mut conn = pool.get().unwrap();
            room_fixture(&mut conn, "101", 2, 0, 8_000)
        };

        let check_in = days_from_today(1).to_string();
        let check_out = days_from_today(2).to_string();
        let res = server
            .post(&format!("/rooms/{}/book", room.id))
            .form(&[
                ("check_in", check_in.as_str()),
                ("check_out", check_out.as_str()),
                ("num_adults", "1"),
            ])
            .await;

        assert_eq!(res.status_code(), StatusCode::SEE_OTHER);
        let location = res.header("location");
        assert!(location.to_str().unwrap().starts_with("/login?next="));
        assert_eq!(booking_count(&pool), 0);
    }

    #[tokio::test]
    async fn booking_then_overlapping_booking() {
        let (server, pool) = test_server();
        let room = {
            let mut conn = pool.get().unwrap();
            user_fixture(&mut conn, "guest", Role::Customer);
            room_fixture(&mut conn, "101", 2, 1, 10_000)
        };
        let cookie = login(&server, "guest").await;

        let check_in = days_from_today(7).to_string();
        let check_out = days_from_today(10).to_string();
        let form = [
            ("check_in", check_in.as_str()),
            ("check_out", check_out.as_str()),
            ("num_adults", "2"),
            ("num_children", "1"),
            ("special_requests", "Late arrival"),
        ];

        let res = server
            .post(&format!("/rooms/{}/book", room.id))
            .add_cookie(cookie.clone())
            .form(&form)
            .await;
        assert_eq!(res.status_code(), StatusCode::SEE_OTHER);
        assert_eq!(
            res.header("location").to_str().unwrap(),
            format!("/rooms/{}", room.id)
        );
        assert_eq!(res.cookie(FLASH_COOKIE).value(), FLASH_BOOKED);

        let stored = {
            let mut conn = pool.get().unwrap();
            bookings::table
                .select(Booking::as_select())
                .first::<Booking>(&mut *conn)
                .unwrap()
        };
        assert_eq!(stored.total_price_cents, 30_000);
        assert_eq!(stored.status, BookingStatus::Pending);
        assert_eq!(stored.special_requests, "Late arrival");

        let page = server
            .get(&format!("/rooms/{}", room.id))
            .add_cookie(cookie.clone())
            .add_cookie(Cookie::new(FLASH_COOKIE, FLASH_BOOKED))
            .await;
        page.assert_status_ok();
        assert!(page.text().contains("Room booked successfully!"));
        assert!(page.text().contains(&check_in));

        // Starting on the previous stay's check-out day still conflicts.
        let next_out = days_from_today(12).to_string();
        let res = server
            .post(&format!("/rooms/{}/book", room.id))
            .add_cookie(cookie)
            .form(&[
                ("check_in", check_out.as_str()),
                ("check_out", next_out.as_str()),
                ("num_adults", "1"),
            ])
            .await;
        assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
        assert!(res.text().contains("alert-danger"));
        assert_eq!(booking_count(&pool), 1);
    }

    #[tokio::test]
    async fn inverted_range_is_reported_before_guest_counts() {
        let (server, pool) = test_server();
        let room = {
            let mut conn = pool.get().unwrap();
            user_fixture(&mut conn, "guest", Role::Customer);
            room_fixture(&mut conn, "101", 2, 0, 10_000)
        };
        let cookie = login(&server, "guest").await;

        let check_in = days_from_today(10).to_string();
        let check_out = days_from_today(6).to_string();
        let res = server
            .post(&format!("/rooms/{}/book", room.id))
            .add_cookie(cookie.clone())
            .form(&[
                ("check_in", check_in.as_str()),
                ("check_out", check_out.as_str()),
                ("num_adults", "0"),
            ])
            .await;
        assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
        let body = res.text();
        assert!(body.contains("Check-out date must be after check-in date."));
        assert!(!body.contains("1 to 6 adults"));

        // with the range fixed the guest count is what gets reported
        let res = server
            .post(&format!("/rooms/{}/book", room.id))
            .add_cookie(cookie)
            .form(&[
                ("check_in", check_out.as_str()),
                ("check_out", check_in.as_str()),
                ("num_adults", "0"),
            ])
            .await;
        assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
        assert!(res.text().contains("1 to 6 adults"));
        assert_eq!(booking_count(&pool), 0);
    }

    #[tokio::test]
    async fn booking_an_unknown_room_is_not_found() {
        let (server, pool) = test_server();
        {
            let mut conn = pool.get().unwrap();
            user_fixture(&mut conn, "guest", Role::Customer);
        }
        let cookie = login(&server, "guest").await;

        server
            .post("/rooms/missing/book")
            .add_cookie(cookie)
            .form(&[("check_in", "2030-01-01"), ("check_out", "2030-01-02")])
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn each_role_sees_its_slice_of_the_ledger() {
        let (server, pool) = test_server();
        let (own, cancelled, other) = {
            let mut conn = pool.get().unwrap();
            let room = room_fixture(&mut conn, "101", 2, 0, 8_000);
            let alice = user_fixture(&mut conn, "alice", Role::Customer);
            let bob = user_fixture(&mut conn, "bob", Role::Customer);
            user_fixture(&mut conn, "desk", Role::Team);
            user_fixture(&mut conn, "boss", Role::Manager);

            let own = booking_fixture(
                &mut conn,
                &room,
                &alice.id,
                days_from_today(1),
                days_from_today(2),
                BookingStatus::Pending,
            );
            let cancelled = booking_fixture(
                &mut conn,
                &room,
                &bob.id,
                days_from_today(4),
                days_from_today(5),
                BookingStatus::Cancelled,
            );
            let other = booking_fixture(
                &mut conn,
                &room,
                &bob.id,
                days_from_today(8),
                days_from_today(9),
                BookingStatus::Confirmed,
            );
            (own, cancelled, other)
        };
        let status_form = |id: &str| format!("/bookings/{id}/status");

        let alice = login(&server, "alice").await;
        let page = server.get("/bookings").add_cookie(alice.clone()).await;
        page.assert_status_ok();
        let body = page.text();
        assert!(body.contains(&own.check_in.to_string()));
        assert!(!body.contains(&other.check_in.to_string()));
        assert!(!body.contains(&status_form(&own.id)));

        let desk = login(&server, "desk").await;
        let body = server.get("/bookings").add_cookie(desk.clone()).await.text();
        assert!(body.contains(&status_form(&own.id)));
        assert!(body.contains(&status_form(&other.id)));
        assert!(!body.contains(&status_form(&cancelled.id)));

        let boss = login(&server, "boss").await;
        let body = server.get("/bookings").add_cookie(boss).await.text();
        for booking in [&own, &cancelled, &other] {
            assert!(body.contains(&status_form(&booking.id)));
        }

        // Customers cannot change a status; team cannot reach a booking
        // outside their slice.
        server
            .post(&status_form(&own.id))
            .add_cookie(alice)
            .form(&[("status", "confirmed")])
            .await
            .assert_status(StatusCode::FORBIDDEN);
        server
            .post(&status_form(&cancelled.id))
            .add_cookie(desk.clone())
            .form(&[("status", "pending")])
            .await
            .assert_status_not_found();

        let res = server
            .post(&status_form(&own.id))
            .add_cookie(desk)
            .form(&[("status", "confirmed")])
            .await;
        assert_eq!(res.status_code(), StatusCode::SEE_OTHER);
        let mut conn = pool.get().unwrap();
        let stored = Booking::fetch(&own.id, &mut *conn).unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Confirmed);
        assert_eq!(stored.total_price_cents, own.total_price_cents);
    }

    #[tokio::test]
    async fn only_room_managers_reach_the_catalog_screens() {
        let (server, pool) = test_server();
        {
            let mut conn = pool.get().unwrap();
            user_fixture(&mut conn, "guest", Role::Customer);
            user_fixture(&mut conn, "boss", Role::Manager);
        }

        let res = server.get("/manage/rooms").await;
        assert_eq!(res.status_code(), StatusCode::SEE_OTHER);

        let guest = login(&server, "guest").await;
        server
            .get("/manage/rooms")
            .add_cookie(guest)
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let boss = login(&server, "boss").await;
        let res = server
            .post("/manage/rooms/create")
            .add_cookie(boss.clone())
            .form(&[
                ("name", "Lake view"),
                ("room_number", "501"),
                ("room_type", "suite"),
                ("floor", "5"),
                ("bed_type", "king"),
                ("capacity_adults", "2"),
                ("capacity_children", "2"),
                ("price_per_night", "210.00"),
                ("description", "Top floor."),
                ("is_active", "on"),
                ("has_wifi", "on"),
                ("has_balcony", "on"),
            ])
            .await;
        assert_eq!(res.status_code(), StatusCode::SEE_OTHER);

        let room = {
            let mut conn = pool.get().unwrap();
            rooms::table
                .filter(rooms::room_number.eq("501"))
                .select(Room::as_select())
                .first::<Room>(&mut *conn)
                .unwrap()
        };
        assert_eq!(room.price_per_night_cents, 21_000);
        assert!(room.amenities.has_balcony);
        assert!(!room.amenities.has_tv);

        // The same number again is a field error, not a 500.
        let res = server
            .post("/manage/rooms/create")
            .add_cookie(boss.clone())
            .form(&[
                ("name", "Copy"),
                ("room_number", "501"),
                ("room_type", "single"),
                ("floor", "5"),
                ("bed_type", "single"),
                ("capacity_adults", "1"),
                ("price_per_night", "50"),
            ])
            .await;
        assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);

        let res = server
            .post(&format!("/manage/rooms/{}/images", room.id))
            .add_cookie(boss.clone())
            .form(&[
                ("title", "Balcony"),
                ("image_path", "/media/501.jpg"),
                ("is_primary", "on"),
            ])
            .await;
        assert_eq!(res.status_code(), StatusCode::SEE_OTHER);

        let page = server
            .get(&format!("/manage/rooms/{}/edit", room.id))
            .add_cookie(boss)
            .await;
        page.assert_status_ok();
        assert!(page.text().contains("/media/501.jpg"));
    }

    #[tokio::test]
    async fn register_logs_the_new_customer_in() {
        let (server, pool) = test_server();

        let res = server
            .post("/register")
            .form(&[
                ("username", "newguest"),
                ("email", "new@example.com"),
                ("password", "secret1"),
                ("password2", "secret1"),
            ])
            .await;
        assert_eq!(res.status_code(), StatusCode::SEE_OTHER);
        let cookie = res.cookie(LOGIN_COOKIE);

        let body = server.get("/").add_cookie(cookie).await.text();
        assert!(body.contains("newguest"));

        let mut conn = pool.get().unwrap();
        let role = users::table
            .filter(users::username.eq("newguest"))
            .select(users::role)
            .first::<Role>(&mut *conn)
            .unwrap();
        assert_eq!(role, Role::Customer);
    }
}
