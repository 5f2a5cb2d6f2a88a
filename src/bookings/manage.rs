use std::collections::HashMap;

use axum::{
    extract::{Form, Path},
    response::Redirect,
};
use diesel::prelude::*;
use hypertext::prelude::*;
use serde::Deserialize;

use crate::{
    auth::User,
    bookings::{Booking, BookingStatus},
    permission::{Scope, visible_bookings},
    schema::{rooms, users},
    state::Conn,
    template::Page,
    util_resp::{
        FailureResponse, StandardResponse, bad_request, err_not_found,
        see_other_ok, success, unauthorized,
    },
    widgets::{actions::Actions, alert::ErrorAlert},
};

#[tracing::instrument(skip_all, fields(user = %user.id))]
pub async fn bookings_page(
    user: User<true>,
    mut conn: Conn<true>,
) -> StandardResponse {
    let bookings = visible_bookings(&user, &mut *conn)?;

    let room_ids: Vec<String> =
        bookings.iter().map(|b| b.room_id.clone()).collect();
    let room_names: HashMap<String, (String, String)> = rooms::table
        .filter(rooms::id.eq_any(&room_ids))
        .select((rooms::id, rooms::room_number, rooms::name))
        .load::<(String, String, String)>(&mut *conn)?
        .into_iter()
        .map(|(id, number, name)| (id, (number, name)))
        .collect();

    let guest_ids: Vec<String> =
        bookings.iter().map(|b| b.guest_id.clone()).collect();
    let guest_names: HashMap<String, String> = users::table
        .filter(users::id.eq_any(&guest_ids))
        .select((users::id, users::username))
        .load::<(String, String)>(&mut *conn)?
        .into_iter()
        .collect();

    let staff = user.can_manage_bookings();
    let heading = match Scope::for_user(&user) {
        Scope::All => "All reservations",
        Scope::ActiveOnly => "Active reservations",
        Scope::OwnOnly => "My bookings",
    };

    success(
        Page::new()
            .title(heading)
            .user(user)
            .body(maud! {
                h1 { (heading) }
                @if !staff {
                    Actions options=(&[("/", "Find a room")]);
                }
                div class="table-responsive" {
                    table class="table table-hover align-middle" {
                        thead {
                            tr {
                                th { "Room" }
                                @if staff {
                                    th { "Guest" }
                                }
                                th { "Check-in" }
                                th { "Check-out" }
                                th { "Guests" }
                                th { "Total" }
                                th { "Status" }
                                @if staff {
                                    th class="text-end" { "Change status" }
                                }
                            }
                        }
                        tbody {
                            @for booking in &bookings {
                                tr {
                                    td {
                                        @if let Some((number, name)) = room_names.get(&booking.room_id) {
                                            a href=(format!("/rooms/{}", booking.room_id)) {
                                                (number) " · " (name)
                                            }
                                        }
                                    }
                                    @if staff {
                                        td {
                                            (guest_names.get(&booking.guest_id).map(String::as_str).unwrap_or("?"))
                                        }
                                    }
                                    td { (booking.check_in.to_string()) }
                                    td { (booking.check_out.to_string()) }
                                    td {
                                        (booking.num_adults) " adults, "
                                        (booking.num_children) " children"
                                    }
                                    td { (booking.total_price().to_string()) }
                                    td {
                                        span class=(booking.status.badge_class()) {
                                            (booking.status.label())
                                        }
                                    }
                                    @if staff {
                                        td class="text-end" {
                                            StatusForm booking=(booking);
                                        }
                                    }
                                }
                            }
                            @if bookings.is_empty() {
                                tr {
                                    td colspan="8" class="text-center text-muted py-4" {
                                        "No bookings yet."
                                    }
                                }
                            }
                        }
                    }
                }
            })
            .render(),
    )
}

struct StatusForm<'r> {
    booking: &'r Booking,
}

impl<'r> Renderable for StatusForm<'r> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        maud! {
            form method="post" action=(format!("/bookings/{}/status", self.booking.id))
                class="d-inline-flex gap-2" {
                select name="status" class="form-select form-select-sm" {
                    @for status in BookingStatus::ALL {
                        option value=(status.as_str()) selected[*status == self.booking.status] {
                            (status.label())
                        }
                    }
                }
                button type="submit" class="btn btn-sm btn-outline-primary" { "Save" }
            }
        }
        .render_to(buffer);
    }
}

#[derive(Deserialize)]
pub struct StatusChangeForm {
    status: String,
}

#[tracing::instrument(skip(user, conn, form), fields(user = %user.id))]
pub async fn do_change_status(
    Path(booking_id): Path<String>,
    user: User<true>,
    mut conn: Conn<true>,
    Form(form): Form<StatusChangeForm>,
) -> StandardResponse {
    if !user.can_manage_bookings() {
        return unauthorized();
    }

    let Some(mut booking) = Booking::fetch(&booking_id, &mut *conn)? else {
        return err_not_found();
    };
    if !Scope::for_user(&user).admits(&booking, &user.id) {
        return err_not_found();
    }

    let status = match form.status.parse::<BookingStatus>() {
        Ok(status) => status,
        Err(e) => {
            return bad_request(
                Page::new()
                    .user(user)
                    .body(maud! {
                        ErrorAlert msg=(&e);
                    })
                    .render(),
            );
        }
    };

    booking
        .set_status(status, &mut conn)
        .map_err(FailureResponse::from)?;

    see_other_ok(Redirect::to("/bookings"))
}
