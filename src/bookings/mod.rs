//! The reservation ledger.

use chrono::{NaiveDate, NaiveDateTime, Utc};
use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{money::cents_to_decimal, schema::bookings};

pub mod admission;
pub mod availability;
pub mod book;
pub mod manage;

text_enum! {
    pub enum BookingStatus {
        Pending => ("pending", "Pending"),
        Confirmed => ("confirmed", "Confirmed"),
        Cancelled => ("cancelled", "Cancelled"),
        Completed => ("completed", "Completed"),
    }
}

impl BookingStatus {
    /// Statuses which occupy a room.
    pub const ACTIVE: [BookingStatus; 2] =
        [BookingStatus::Pending, BookingStatus::Confirmed];

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }

    pub fn badge_class(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "badge text-bg-warning",
            BookingStatus::Confirmed => "badge text-bg-success",
            BookingStatus::Cancelled => "badge text-bg-secondary",
            BookingStatus::Completed => "badge text-bg-info",
        }
    }
}

#[derive(
    Queryable,
    Selectable,
    Insertable,
    AsChangeset,
    Serialize,
    Deserialize,
    Debug,
    Clone,
    PartialEq,
)]
#[diesel(table_name = bookings)]
#[diesel(check_for_backend(Sqlite))]
pub struct Booking {
    pub id: String,
    pub room_id: String,
    pub guest_id: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub num_adults: i64,
    pub num_children: i64,
    /// Fixed when the booking is admitted. Later changes to the room's
    /// nightly rate do not touch it.
    pub total_price_cents: i64,
    pub status: BookingStatus,
    pub special_requests: String,
    pub booking_date: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Booking {
    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }

    pub fn total_price(&self) -> Decimal {
        cents_to_decimal(self.total_price_cents)
    }

    pub fn fetch(
        booking_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<Option<Booking>> {
        bookings::table
            .find(booking_id)
            .select(Booking::as_select())
            .first(conn)
            .optional()
    }

    /// Writes the booking as it stands. The stored total is written back
    /// unchanged.
    #[tracing::instrument(skip(self, conn), fields(booking = %self.id))]
    pub fn save(&mut self, conn: &mut SqliteConnection) -> QueryResult<()> {
        self.updated_at = Utc::now().naive_utc();

        diesel::insert_into(bookings::table)
            .values(&*self)
            .on_conflict(bookings::id)
            .do_update()
            .set(&*self)
            .execute(conn)?;

        Ok(())
    }

    #[tracing::instrument(skip(self, conn), fields(booking = %self.id))]
    pub fn set_status(
        &mut self,
        status: BookingStatus,
        conn: &mut SqliteConnection,
    ) -> QueryResult<()> {
        tracing::info!("status {} -> {}", self.status.as_str(), status.as_str());
        self.status = status;
        self.save(conn)
    }
}
