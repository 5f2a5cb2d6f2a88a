//! Occupancy queries over the ledger.
//!
//! A stay occupies its check-out day as well as its check-in day: two stays
//! conflict when `existing.check_in <= requested.check_out` and
//! `existing.check_out >= requested.check_in`. Only pending and confirmed
//! bookings occupy a room.

use chrono::NaiveDate;
use diesel::{
    connection::LoadConnection,
    dsl::{exists, not},
    prelude::*,
    sqlite::Sqlite,
};
use serde::{Deserialize, Serialize};

use crate::{
    bookings::BookingStatus,
    rooms::Room,
    schema::{bookings, rooms},
};

pub fn overlaps(
    existing_in: NaiveDate,
    existing_out: NaiveDate,
    requested_in: NaiveDate,
    requested_out: NaiveDate,
) -> bool {
    existing_in <= requested_out && existing_out >= requested_in
}

/// Whether the room has no active booking overlapping the requested stay.
#[tracing::instrument(skip(conn))]
pub fn is_available(
    room_id: &str,
    check_in: NaiveDate,
    check_out: NaiveDate,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> QueryResult<bool> {
    let clash = diesel::select(exists(
        bookings::table
            .filter(bookings::room_id.eq(room_id))
            .filter(bookings::status.eq_any(BookingStatus::ACTIVE))
            .filter(bookings::check_in.le(check_out))
            .filter(bookings::check_out.ge(check_in)),
    ))
    .get_result::<bool>(conn)?;

    Ok(!clash)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCriteria {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub adults: i64,
    pub children: i64,
}

/// Active rooms large enough for the party with no active booking
/// overlapping the stay, in room number order.
///
/// This is a single statement: the occupied rooms come from one sub-select
/// over the ledger.
#[tracing::instrument(skip(conn))]
pub fn search(
    criteria: &SearchCriteria,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> QueryResult<Vec<Room>> {
    let occupied = bookings::table
        .filter(bookings::status.eq_any(BookingStatus::ACTIVE))
        .filter(bookings::check_in.le(criteria.check_out))
        .filter(bookings::check_out.ge(criteria.check_in))
        .select(bookings::room_id);

    rooms::table
        .filter(rooms::is_active.eq(true))
        .filter(rooms::capacity_adults.ge(criteria.adults))
        .filter(rooms::capacity_children.ge(criteria.children))
        .filter(not(rooms::id.eq_any(occupied)))
        .order_by(rooms::room_number.asc())
        .select(Room::as_select())
        .load(conn)
}

/// The catalog as shown when no (valid) criteria were given.
pub fn active_rooms(
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> QueryResult<Vec<Room>> {
    rooms::table
        .filter(rooms::is_active.eq(true))
        .order_by(rooms::room_number.asc())
        .select(Room::as_select())
        .load(conn)
}

/// Every occupied date of the room's active bookings which end on or after
/// `from`.
#[tracing::instrument(skip(conn))]
pub fn booked_dates(
    room_id: &str,
    from: NaiveDate,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> QueryResult<BookedDates> {
    let spans = bookings::table
        .filter(bookings::room_id.eq(room_id))
        .filter(bookings::status.eq_any(BookingStatus::ACTIVE))
        .filter(bookings::check_out.ge(from))
        .order_by((bookings::booking_date.desc(), bookings::id.asc()))
        .select((bookings::check_in, bookings::check_out))
        .load::<(NaiveDate, NaiveDate)>(conn)?;

    Ok(BookedDates::new(spans))
}

/// Walks a list of stays day by day, from check-in to check-out inclusive.
///
/// Days covered by more than one stay are yielded once per stay. Clone the
/// iterator to walk it again.
#[derive(Debug, Clone)]
pub struct BookedDates {
    spans: Vec<(NaiveDate, NaiveDate)>,
    span: usize,
    cursor: Option<NaiveDate>,
}

impl BookedDates {
    pub fn new(spans: Vec<(NaiveDate, NaiveDate)>) -> Self {
        Self {
            spans,
            span: 0,
            cursor: None,
        }
    }

    /// `YYYY-MM-DD` strings, the way date pickers want them.
    pub fn iso_strings(self) -> Vec<String> {
        self.map(|date| date.format("%Y-%m-%d").to_string()).collect()
    }
}

impl Iterator for BookedDates {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        loop {
            let (start, end) = *self.spans.get(self.span)?;
            let day = self.cursor.unwrap_or(start);

            if day > end {
                self.span += 1;
                self.cursor = None;
                continue;
            }

            match day.succ_opt() {
                Some(next) if next <= end => self.cursor = Some(next),
                _ => {
                    self.span += 1;
                    self.cursor = None;
                }
            }

            return Some(day);
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::{
        auth::Role,
        test::{booking_fixture, room_fixture, test_conn, user_fixture},
    };

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn overlap_is_inclusive_on_both_ends() {
        let (a, b) = (d("2024-06-01"), d("2024-06-05"));
        assert!(overlaps(a, b, d("2024-06-04"), d("2024-06-06")));
        assert!(overlaps(a, b, d("2024-06-05"), d("2024-06-07")));
        assert!(overlaps(a, b, d("2024-05-28"), d("2024-06-01")));
        assert!(!overlaps(a, b, d("2024-06-06"), d("2024-06-08")));
        assert!(!overlaps(a, b, d("2024-05-20"), d("2024-05-31")));
    }

    #[test]
    fn confirmed_booking_blocks_overlapping_stays() {
        let mut conn = test_conn();
        let room = room_fixture(&mut conn, "101", 2, 0, 10_000);
        let guest = user_fixture(&mut conn, "guest", Role::Customer);
        booking_fixture(
            &mut conn,
            &room,
            &guest.id,
            d("2024-06-01"),
            d("2024-06-05"),
            BookingStatus::Confirmed,
        );

        let free = |conn: &mut diesel::SqliteConnection, a: &str, b: &str| {
            is_available(&room.id, d(a), d(b), conn).unwrap()
        };

        assert!(!free(&mut conn, "2024-06-04", "2024-06-06"));
        // the check-out day still counts as occupied
        assert!(!free(&mut conn, "2024-06-05", "2024-06-07"));
        assert!(free(&mut conn, "2024-06-06", "2024-06-08"));
    }

    #[test]
    fn cancelled_and_completed_bookings_never_block() {
        let mut conn = test_conn();
        let room = room_fixture(&mut conn, "101", 2, 0, 10_000);
        let guest = user_fixture(&mut conn, "guest", Role::Customer);
        for status in [BookingStatus::Cancelled, BookingStatus::Completed] {
            booking_fixture(
                &mut conn,
                &room,
                &guest.id,
                d("2024-06-01"),
                d("2024-06-05"),
                status,
            );
        }

        assert!(
            is_available(&room.id, d("2024-06-02"), d("2024-06-03"), &mut conn)
                .unwrap()
        );
        assert_eq!(
            booked_dates(&room.id, d("2024-06-01"), &mut conn)
                .unwrap()
                .count(),
            0
        );
    }

    #[test]
    fn search_filters_capacity_activity_and_occupancy() {
        let mut conn = test_conn();
        room_fixture(&mut conn, "101", 1, 0, 5_000);
        room_fixture(&mut conn, "102", 4, 2, 15_000);
        let booked = room_fixture(&mut conn, "103", 4, 2, 15_000);
        let closed = room_fixture(&mut conn, "104", 4, 2, 15_000);
        diesel::update(crate::schema::rooms::table.find(&closed.id))
            .set(crate::schema::rooms::is_active.eq(false))
            .execute(&mut conn)
            .unwrap();
        let guest = user_fixture(&mut conn, "guest", Role::Customer);
        booking_fixture(
            &mut conn,
            &booked,
            &guest.id,
            d("2024-06-01"),
            d("2024-06-05"),
            BookingStatus::Pending,
        );

        let ids = |rooms: Vec<Room>| {
            rooms.into_iter().map(|r| r.room_number).collect::<Vec<_>>()
        };

        let criteria = SearchCriteria {
            check_in: d("2024-06-05"),
            check_out: d("2024-06-07"),
            adults: 2,
            children: 1,
        };
        assert_eq!(ids(search(&criteria, &mut conn).unwrap()), vec!["102"]);

        let criteria = SearchCriteria {
            check_in: d("2024-06-06"),
            check_out: d("2024-06-07"),
            adults: 1,
            children: 0,
        };
        assert_eq!(
            ids(search(&criteria, &mut conn).unwrap()),
            vec!["101", "102", "103"]
        );

        assert_eq!(
            ids(active_rooms(&mut conn).unwrap()),
            vec!["101", "102", "103"]
        );
    }

    #[test]
    fn booked_dates_cover_check_out_day() {
        let mut conn = test_conn();
        let room = room_fixture(&mut conn, "101", 2, 0, 10_000);
        let guest = user_fixture(&mut conn, "guest", Role::Customer);
        booking_fixture(
            &mut conn,
            &room,
            &guest.id,
            d("2024-06-01"),
            d("2024-06-05"),
            BookingStatus::Confirmed,
        );

        let dates = booked_dates(&room.id, d("2024-06-01"), &mut conn).unwrap();
        let again = dates.clone();
        assert_eq!(
            dates.iso_strings(),
            vec![
                "2024-06-01",
                "2024-06-02",
                "2024-06-03",
                "2024-06-04",
                "2024-06-05"
            ]
        );
        assert_eq!(again.count(), 5);

        // bookings which ended before `from` are skipped
        assert_eq!(
            booked_dates(&room.id, d("2024-06-06"), &mut conn)
                .unwrap()
                .count(),
            0
        );
    }

    #[test]
    fn overlapping_stays_repeat_shared_days() {
        let dates = BookedDates::new(vec![
            (d("2024-06-03"), d("2024-06-04")),
            (d("2024-06-01"), d("2024-06-03")),
        ]);
        assert_eq!(
            dates.iso_strings(),
            vec![
                "2024-06-03",
                "2024-06-04",
                "2024-06-01",
                "2024-06-02",
                "2024-06-03"
            ]
        );
    }

    #[test]
    fn last_representable_day_terminates() {
        let end = NaiveDate::MAX;
        let start = end.pred_opt().unwrap();
        assert_eq!(BookedDates::new(vec![(start, end)]).count(), 2);
    }
}
