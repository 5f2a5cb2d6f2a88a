use axum::{
    extract::{Form, Path, Query},
    response::Redirect,
};
use axum_extra::extract::{CookieJar, cookie::Cookie};
use chrono::Utc;
use hypertext::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    auth::User,
    bookings::{
        admission::{self, AdmissionError, BookingRequest},
        availability::booked_dates,
    },
    rooms::{MAX_ADULTS, MAX_CHILDREN, Room},
    state::Conn,
    template::Page,
    util_resp::{
        FailureResponse, StandardResponse, SuccessResponse, see_other_ok,
        success,
    },
    validation::{FieldErrors, max_len, parse_date, parse_whole},
    widgets::alert::ErrorAlert,
};

/// One-shot message shown on the room page after a booking is made.
pub const FLASH_COOKIE: &str = "hotelier_flash";
pub const FLASH_BOOKED: &str = "booked";

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct BookingForm {
    pub check_in: String,
    pub check_out: String,
    pub num_adults: String,
    pub num_children: String,
    pub special_requests: String,
}

impl Default for BookingForm {
    fn default() -> Self {
        Self {
            check_in: String::new(),
            check_out: String::new(),
            num_adults: "1".to_string(),
            num_children: "0".to_string(),
            special_requests: String::new(),
        }
    }
}

impl BookingForm {
    pub fn parse(&self) -> Result<BookingRequest, FieldErrors> {
        let mut errors = FieldErrors::new();

        let check_in = parse_date(&self.check_in)
            .map_err(|e| errors.push("check_in", e))
            .ok();
        let check_out = parse_date(&self.check_out)
            .map_err(|e| errors.push("check_out", e))
            .ok();
        // guest counts are range checked by admission, in its own order
        let num_adults = parse_whole(&self.num_adults, None)
            .map_err(|e| errors.push("num_adults", e))
            .ok();
        let num_children = parse_whole(&self.num_children, Some(0))
            .map_err(|e| errors.push("num_children", e))
            .ok();
        errors.check("special_requests", max_len(2000)(&self.special_requests));

        match (check_in, check_out, num_adults, num_children) {
            (Some(check_in), Some(check_out), Some(num_adults), Some(num_children))
                if errors.is_empty() =>
            {
                Ok(BookingRequest {
                    check_in,
                    check_out,
                    num_adults,
                    num_children,
                    special_requests: self.special_requests.trim().to_string(),
                })
            }
            _ => Err(errors),
        }
    }
}

/// The booking form, posting to the room's booking endpoint.
pub struct BookingFormView<'r> {
    pub room: &'r Room,
    pub form: &'r BookingForm,
    pub errors: &'r FieldErrors,
    pub booked_dates: &'r [String],
}

impl<'r> Renderable for BookingFormView<'r> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        let booked = serde_json::to_string(self.booked_dates)
            .unwrap_or_else(|_| "[]".to_string());
        let field = |name: &str| {
            if self.errors.get(name).is_some() {
                "form-control is-invalid"
            } else {
                "form-control"
            }
        };

        maud! {
            form method="post" action=(format!("/rooms/{}/book", self.room.id))
                id="booking-form" data-booked-dates=(booked) class="card card-body" {
                div class="row g-3" {
                    div class="col-md-6" {
                        label for="check_in" class="form-label" { "Check-in" }
                        input type="date" class=(field("check_in")) id="check_in" name="check_in" value=(self.form.check_in) required;
                        @if let Some(e) = self.errors.get("check_in") {
                            div class="invalid-feedback" { (e) }
                        }
                    }
                    div class="col-md-6" {
                        label for="check_out" class="form-label" { "Check-out" }
                        input type="date" class=(field("check_out")) id="check_out" name="check_out" value=(self.form.check_out) required;
                        @if let Some(e) = self.errors.get("check_out") {
                            div class="invalid-feedback" { (e) }
                        }
                    }
                    div class="col-md-6" {
                        label for="num_adults" class="form-label" { "Adults" }
                        input type="number" class=(field("num_adults")) id="num_adults" name="num_adults" min="1" max=(MAX_ADULTS.to_string()) value=(self.form.num_adults) required;
                        @if let Some(e) = self.errors.get("num_adults") {
                            div class="invalid-feedback" { (e) }
                        }
                    }
                    div class="col-md-6" {
                        label for="num_children" class="form-label" { "Children" }
                        input type="number" class=(field("num_children")) id="num_children" name="num_children" min="0" max=(MAX_CHILDREN.to_string()) value=(self.form.num_children);
                        @if let Some(e) = self.errors.get("num_children") {
                            div class="invalid-feedback" { (e) }
                        }
                    }
                    div class="col-12" {
                        label for="special_requests" class="form-label" { "Special requests" }
                        textarea class=(field("special_requests")) id="special_requests" name="special_requests" rows="3" {
                            (self.form.special_requests)
                        }
                        @if let Some(e) = self.errors.get("special_requests") {
                            div class="invalid-feedback" { (e) }
                        }
                    }
                    div class="col-12" {
                        button type="submit" class="btn btn-primary" {
                            "Book for " (self.room.price_per_night().to_string()) " per night"
                        }
                    }
                }
            }
        }
        .render_to(buffer);
    }
}

fn booking_page<const TX: bool>(
    user: User<TX>,
    room: &Room,
    form: &BookingForm,
    errors: &FieldErrors,
    alert: Option<String>,
    booked_dates: &[String],
) -> Rendered<String> {
    Page::new()
        .title(format!("Book {}", room.name))
        .user(user)
        .body(maud! {
            h1 { "Book " (room.name) }
            p class="text-muted" {
                "Room " (room.room_number) " · " (room.room_type.label())
                " · " (room.capacity_display())
            }
            @if let Some(msg) = &alert {
                ErrorAlert msg=(msg);
            }
            BookingFormView room=(room) form=(form) errors=(errors) booked_dates=(booked_dates);
        })
        .render()
}

pub fn login_redirect(next: &str) -> Redirect {
    let query = serde_urlencoded::to_string([("next", next)])
        .unwrap_or_default();
    Redirect::to(&format!("/login?{query}"))
}

pub async fn book_room_page(
    Path(room_id): Path<String>,
    user: Option<User<true>>,
    mut conn: Conn<true>,
    Query(form): Query<BookingForm>,
) -> StandardResponse {
    let room = Room::fetch(&room_id, &mut *conn)?;

    let Some(user) = user else {
        return see_other_ok(login_redirect(&format!("/rooms/{}/book", room.id)));
    };

    let booked = booked_dates(&room.id, Utc::now().date_naive(), &mut *conn)?
        .iso_strings();

    success(booking_page(
        user,
        &room,
        &form,
        &FieldErrors::new(),
        None,
        &booked,
    ))
}

/// Admits a booking.
///
/// This handler uses a connection outside the request transaction, so that
/// admission can open its own `BEGIN IMMEDIATE` transaction.
#[tracing::instrument(skip(user, conn, jar, form))]
pub async fn do_book_room(
    Path(room_id): Path<String>,
    user: Option<User<false>>,
    mut conn: Conn<false>,
    jar: CookieJar,
    Form(form): Form<BookingForm>,
) -> Result<(CookieJar, SuccessResponse), FailureResponse> {
    let Some(user) = user else {
        tracing::debug!("{}", AdmissionError::Unauthenticated);
        return Ok((
            jar,
            SuccessResponse::SeeOther(Box::new(login_redirect(&format!(
                "/rooms/{room_id}/book"
            )))),
        ));
    };

    let room = Room::fetch(&room_id, &mut *conn)?;
    let today = Utc::now().date_naive();

    let rerender = |user: User<false>,
                    errors: &FieldErrors,
                    alert: Option<String>,
                    conn: &mut Conn<false>|
     -> Result<(CookieJar, SuccessResponse), FailureResponse> {
        let booked = booked_dates(&room.id, today, &mut **conn)?.iso_strings();
        Err(FailureResponse::BadRequest(booking_page(
            user, &room, &form, errors, alert, &booked,
        )))
    };

    let request = match form.parse() {
        Ok(request) => request,
        Err(errors) => return rerender(user, &errors, None, &mut conn),
    };

    match admission::submit(&room, &user.id, request, today, &mut conn) {
        Ok(booking) => {
            tracing::info!("booking {} created", booking.id);
            let mut flash = Cookie::new(FLASH_COOKIE, FLASH_BOOKED);
            flash.set_path("/");
            Ok((
                jar.add(flash),
                SuccessResponse::SeeOther(Box::new(Redirect::to(&format!(
                    "/rooms/{}",
                    room.id
                )))),
            ))
        }
        Err(e) if e.is_user_error() => {
            rerender(user, &FieldErrors::new(), Some(e.to_string()), &mut conn)
        }
        Err(AdmissionError::NotFound) => Err(FailureResponse::NotFound(())),
        Err(e) => {
            tracing::error!("admission failed: {e}");
            Err(FailureResponse::ServerError(()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::BookingForm;

    #[test]
    fn form_reports_every_bad_field() {
        let form = BookingForm {
            check_in: "tomorrow".into(),
            check_out: "2024-06-03".into(),
            num_adults: "two".into(),
            num_children: "".into(),
            special_requests: String::new(),
        };
        let errors = form.parse().unwrap_err();
        assert!(errors.get("check_in").is_some());
        assert!(errors.get("check_out").is_none());
        assert!(errors.get("num_adults").is_some());
        assert!(errors.get("num_children").is_none());
    }

    #[test]
    fn empty_children_defaults_to_zero() {
        let form = BookingForm {
            check_in: "2024-06-01".into(),
            check_out: "2024-06-03".into(),
            num_adults: "2".into(),
            num_children: "".into(),
            special_requests: "  cot please ".into(),
        };
        let request = form.parse().unwrap();
        assert_eq!(request.num_children, 0);
        assert_eq!(request.special_requests, "cot please");
    }

    #[test]
    fn out_of_range_counts_reach_admission() {
        let form = BookingForm {
            check_in: "2030-06-05".into(),
            check_out: "2030-06-01".into(),
            num_adults: "0".into(),
            num_children: "9".into(),
            special_requests: String::new(),
        };
        let request = form.parse().unwrap();
        assert_eq!((request.num_adults, request.num_children), (0, 9));
    }
}
