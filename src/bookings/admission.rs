//! Turning a booking request into a ledger entry.

use chrono::{NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    bookings::{Booking, BookingStatus, availability::is_available},
    money::MAX_CENTS,
    rooms::{MAX_ADULTS, MAX_CHILDREN, Room},
    schema::{bookings, rooms},
};

#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("Check-out date must be after check-in date.")]
    InvalidRange,
    #[error("Check-in date cannot be in the past.")]
    PastDate,
    #[error("A booking is for 1 to 6 adults and 0 to 4 children.")]
    CapacityOutOfBounds,
    #[error("A stay can be at most 365 nights.")]
    StayTooLong,
    #[error("The total for this stay is larger than a booking can record.")]
    TotalTooLarge,
    #[error("This room is not available for the selected dates.")]
    RoomUnavailable,
    #[error("No such room.")]
    NotFound,
    #[error("You must be logged in to book a room.")]
    Unauthenticated,
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
}

impl AdmissionError {
    /// Whether the guest can fix this by changing the request.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            AdmissionError::InvalidRange
                | AdmissionError::PastDate
                | AdmissionError::CapacityOutOfBounds
                | AdmissionError::StayTooLong
                | AdmissionError::TotalTooLarge
                | AdmissionError::RoomUnavailable
        )
    }
}

/// Longest stay a single booking may cover.
pub const MAX_NIGHTS: i64 = 365;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub num_adults: i64,
    pub num_children: i64,
    pub special_requests: String,
}

/// The checks which need no database, in the order they are reported.
pub fn validate(
    request: &BookingRequest,
    today: NaiveDate,
) -> Result<(), AdmissionError> {
    if request.check_in >= request.check_out {
        return Err(AdmissionError::InvalidRange);
    }
    if request.check_in < today {
        return Err(AdmissionError::PastDate);
    }
    if !(1..=MAX_ADULTS).contains(&request.num_adults)
        || !(0..=MAX_CHILDREN).contains(&request.num_children)
    {
        return Err(AdmissionError::CapacityOutOfBounds);
    }
    if (request.check_out - request.check_in).num_days() > MAX_NIGHTS {
        return Err(AdmissionError::StayTooLong);
    }
    Ok(())
}

/// Nightly rate times the number of nights, or `None` when that exceeds
/// [`MAX_CENTS`].
pub fn quote_cents(
    price_per_night_cents: i64,
    check_in: NaiveDate,
    check_out: NaiveDate,
) -> Option<i64> {
    price_per_night_cents
        .checked_mul((check_out - check_in).num_days())
        .filter(|total| *total <= MAX_CENTS)
}

/// Validates the request and records a pending booking for `guest_id`.
///
/// The availability check and the insert share one `BEGIN IMMEDIATE`
/// transaction, so the write lock is held before the ledger is read and a
/// concurrent admission for the same dates waits, then sees this booking.
/// `conn` must not already be inside a transaction.
#[tracing::instrument(skip(room, request, conn), fields(room = %room.id))]
pub fn submit(
    room: &Room,
    guest_id: &str,
    request: BookingRequest,
    today: NaiveDate,
    conn: &mut SqliteConnection,
) -> Result<Booking, AdmissionError> {
    validate(&request, today)?;

    conn.immediate_transaction(|conn| {
        let (active, price_per_night_cents) = rooms::table
            .find(&room.id)
            .select((rooms::is_active, rooms::price_per_night_cents))
            .first::<(bool, i64)>(conn)
            .optional()?
            .ok_or(AdmissionError::NotFound)?;

        if !active
            || !is_available(&room.id, request.check_in, request.check_out, conn)?
        {
            tracing::info!("rejected: room unavailable");
            return Err(AdmissionError::RoomUnavailable);
        }

        let total_price_cents = quote_cents(
            price_per_night_cents,
            request.check_in,
            request.check_out,
        )
        .ok_or(AdmissionError::TotalTooLarge)?;

        let now = Utc::now().naive_utc();
        let booking = Booking {
            id: uuid::Uuid::now_v7().to_string(),
            room_id: room.id.clone(),
            guest_id: guest_id.to_string(),
            check_in: request.check_in,
            check_out: request.check_out,
            num_adults: request.num_adults,
            num_children: request.num_children,
            total_price_cents,
            status: BookingStatus::Pending,
            special_requests: request.special_requests,
            booking_date: now,
            updated_at: now,
        };

        diesel::insert_into(bookings::table)
            .values(&booking)
            .execute(conn)?;

        tracing::info!("admitted booking {}", booking.id);
        Ok(booking)
    })
}
