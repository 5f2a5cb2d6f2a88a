use axum::{
    Json,
    extract::{Path, Query},
};
use axum_extra::extract::{CookieJar, cookie::Cookie};
use chrono::Utc;
use hypertext::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    auth::User,
    bookings::{
        availability::booked_dates,
        book::{BookingForm, BookingFormView, FLASH_BOOKED, FLASH_COOKIE},
    },
    rooms::Room,
    state::Conn,
    template::Page,
    util_resp::{FailureResponse, SuccessResponse},
    validation::FieldErrors,
    widgets::{
        alert::SuccessAlert,
        amenities::{AmenityBadges, AmenityTable},
    },
};

#[tracing::instrument(skip(user, conn, jar, form))]
pub async fn room_detail_page(
    Path(room_id): Path<String>,
    user: Option<User<true>>,
    mut conn: Conn<true>,
    jar: CookieJar,
    Query(form): Query<BookingForm>,
) -> Result<(CookieJar, SuccessResponse), FailureResponse> {
    let room = Room::fetch(&room_id, &mut *conn)?;
    let images = room.images(&mut *conn)?;
    let primary = room.primary_image(&mut *conn)?;
    let booked = booked_dates(&room.id, Utc::now().date_naive(), &mut *conn)?
        .iso_strings();

    let booked_flash = jar
        .get(FLASH_COOKIE)
        .is_some_and(|cookie| cookie.value() == FLASH_BOOKED);
    let jar = if booked_flash {
        jar.remove(Cookie::build(FLASH_COOKIE).path("/"))
    } else {
        jar
    };

    let logged_in = user.is_some();
    let errors = FieldErrors::new();
    let booked_json =
        serde_json::to_string(&booked).unwrap_or_else(|_| "[]".to_string());
    let login_href = format!(
        "/login?{}",
        serde_urlencoded::to_string([("next", format!("/rooms/{}", room.id))])
            .unwrap_or_default()
    );

    let page = Page::new()
        .title(room.name.clone())
        .user_opt(user)
        .body(maud! {
            @if booked_flash {
                SuccessAlert msg="Room booked successfully!";
            }
            div class="row g-4" {
                div class="col-lg-7" {
                    h1 { (room.name) }
                    p class="text-muted" {
                        "Room " (room.room_number) " · Floor " (room.floor)
                        " · " (room.room_type.label()) " · " (room.bed_type.label())
                    }
                    @if let Some(image) = &primary {
                        img src=(image.image_path) class="img-fluid rounded mb-3" alt=(image.title);
                    }
                    @if images.len() > 1 {
                        div class="d-flex flex-wrap gap-2 mb-3" {
                            @for image in &images {
                                a href=(image.image_path) {
                                    img src=(image.thumbnail()) class="img-thumbnail" style="height: 96px;" alt=(image.title);
                                }
                            }
                        }
                    }
                    p { (room.description) }
                    AmenityBadges amenities=(&room.amenities);
                    h2 class="h5 mt-4" { "Amenities" }
                    AmenityTable amenities=(&room.amenities);
                }
                div class="col-lg-5" {
                    div class="mb-3" {
                        span class="fs-4 fw-bold" { (room.price_per_night().to_string()) }
                        " per night · " (room.capacity_display())
                    }
                    @if !room.is_active {
                        div class="alert alert-secondary" {
                            "This room is not currently available for booking."
                        }
                    } @else if logged_in {
                        BookingFormView room=(&room) form=(&form) errors=(&errors) booked_dates=(&booked);
                    } @else {
                        div data-booked-dates=(booked_json) {
                            a class="btn btn-primary" href=(login_href) {
                                "Log in to book"
                            }
                        }
                    }
                }
            }
        })
        .render();

    Ok((jar, SuccessResponse::Success(page)))
}

#[derive(Serialize, Deserialize, Debug)]
pub struct BookedDatesResponse {
    pub booked_dates: Vec<String>,
}

/// Dates a date picker should disable, from today on.
pub async fn booked_dates_json(
    Path(room_id): Path<String>,
    mut conn: Conn<true>,
) -> Result<Json<BookedDatesResponse>, FailureResponse> {
    let room = Room::fetch(&room_id, &mut *conn)?;
    let booked_dates =
        booked_dates(&room.id, Utc::now().date_naive(), &mut *conn)?
            .iso_strings();

    Ok(Json(BookedDatesResponse { booked_dates }))
}
