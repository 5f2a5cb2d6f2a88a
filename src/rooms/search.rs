use axum::{extract::Query, http::HeaderMap};
use diesel::{connection::LoadConnection, sqlite::Sqlite};
use hypertext::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    auth::User,
    bookings::availability::{SearchCriteria, active_rooms, search},
    gallery::GalleryImage,
    rooms::{MAX_ADULTS, MAX_CHILDREN, Room},
    state::Conn,
    template::Page,
    util_resp::{StandardResponse, success},
    validation::{FieldErrors, parse_bounded, parse_date},
    widgets::amenities::AmenityBadges,
};

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct SearchQuery {
    pub check_in: String,
    pub check_out: String,
    pub adults: String,
    pub children: String,
}

impl SearchQuery {
    fn is_blank(&self) -> bool {
        self.check_in.is_empty()
            && self.check_out.is_empty()
            && self.adults.is_empty()
            && self.children.is_empty()
    }

    /// `Ok(None)` when nothing was asked for.
    pub fn criteria(&self) -> Result<Option<SearchCriteria>, FieldErrors> {
        if self.is_blank() {
            return Ok(None);
        }

        let mut errors = FieldErrors::new();
        let check_in = parse_date(&self.check_in)
            .map_err(|e| errors.push("check_in", e))
            .ok();
        let check_out = parse_date(&self.check_out)
            .map_err(|e| errors.push("check_out", e))
            .ok();
        let adults = parse_bounded(&self.adults, 1, MAX_ADULTS, Some(1))
            .map_err(|e| errors.push("adults", e))
            .ok();
        let children = parse_bounded(&self.children, 0, MAX_CHILDREN, Some(0))
            .map_err(|e| errors.push("children", e))
            .ok();

        match (check_in, check_out, adults, children) {
            (Some(check_in), Some(check_out), Some(adults), Some(children)) => {
                Ok(Some(SearchCriteria {
                    check_in,
                    check_out,
                    adults,
                    children,
                }))
            }
            _ => Err(errors),
        }
    }

    /// Carries the stay over to the room page's booking form.
    fn booking_query(&self) -> String {
        serde_urlencoded::to_string([
            ("check_in", self.check_in.as_str()),
            ("check_out", self.check_out.as_str()),
            ("num_adults", self.adults.as_str()),
            ("num_children", self.children.as_str()),
        ])
        .unwrap_or_default()
    }
}

/// What the catalog listing shows.
pub struct RoomListing {
    pub rooms: Vec<(Room, Option<GalleryImage>)>,
    pub is_filtered: bool,
}

impl RoomListing {
    pub fn load(
        criteria: Option<&SearchCriteria>,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> diesel::QueryResult<Self> {
        let rooms = match criteria {
            Some(criteria) => search(criteria, conn)?,
            None => active_rooms(conn)?,
        };

        let rooms = rooms
            .into_iter()
            .map(|room| -> diesel::QueryResult<_> {
                let image = room.primary_image(conn)?;
                Ok((room, image))
            })
            .collect::<diesel::QueryResult<Vec<_>>>()?;

        Ok(Self {
            rooms,
            is_filtered: criteria.is_some(),
        })
    }
}

struct RoomList<'r> {
    listing: &'r RoomListing,
    link_query: &'r str,
}

impl<'r> Renderable for RoomList<'r> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        maud! {
            div id="room-list" {
                @if self.listing.is_filtered {
                    p class="text-muted" {
                        (self.listing.rooms.len()) " room(s) available for your stay."
                    }
                }
                div class="row row-cols-1 row-cols-md-3 g-4" {
                    @for (room, image) in &self.listing.rooms {
                        div class="col" {
                            div class="card h-100" {
                                @if let Some(image) = image {
                                    img src=(image.thumbnail()) class="card-img-top" alt=(image.title);
                                }
                                div class="card-body" {
                                    h5 class="card-title" {
                                        a href=(format!("/rooms/{}?{}", room.id, self.link_query)) {
                                            (room.name)
                                        }
                                    }
                                    p class="card-text text-muted mb-1" {
                                        "Room " (room.room_number) " · " (room.room_type.label())
                                        " · " (room.bed_type.label())
                                    }
                                    p class="card-text mb-2" { (room.capacity_display()) }
                                    AmenityBadges amenities=(&room.amenities);
                                }
                                div class="card-footer d-flex justify-content-between align-items-center" {
                                    span class="fw-bold" { (room.price_per_night().to_string()) " / night" }
                                    a class="btn btn-sm btn-primary" href=(format!("/rooms/{}?{}", room.id, self.link_query)) {
                                        "View"
                                    }
                                }
                            }
                        }
                    }
                }
                @if self.listing.rooms.is_empty() {
                    p class="text-center text-muted py-5" {
                        "No rooms match your search."
                    }
                }
            }
        }
        .render_to(buffer);
    }
}

struct SearchForm<'r> {
    query: &'r SearchQuery,
    errors: &'r FieldErrors,
}

impl<'r> Renderable for SearchForm<'r> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        let field_class = |name: &str| {
            if self.errors.get(name).is_some() {
                "form-control is-invalid"
            } else {
                "form-control"
            }
        };
        let adults = if self.query.adults.is_empty() {
            "1"
        } else {
            self.query.adults.as_str()
        };
        let children = if self.query.children.is_empty() {
            "0"
        } else {
            self.query.children.as_str()
        };

        maud! {
            form method="get" action="/" class="row g-3 align-items-end mb-4"
                hx-get="/" hx-target="#room-list" hx-swap="outerHTML" hx-push-url="true" {
                div class="col-md-3" {
                    label for="check_in" class="form-label" { "Check-in Date" }
                    input type="date" class=(field_class("check_in")) id="check_in" name="check_in" value=(self.query.check_in);
                    @if let Some(e) = self.errors.get("check_in") {
                        div class="invalid-feedback" { (e) }
                    }
                }
                div class="col-md-3" {
                    label for="check_out" class="form-label" { "Check-out Date" }
                    input type="date" class=(field_class("check_out")) id="check_out" name="check_out" value=(self.query.check_out);
                    @if let Some(e) = self.errors.get("check_out") {
                        div class="invalid-feedback" { (e) }
                    }
                }
                div class="col-md-2" {
                    label for="adults" class="form-label" { "Adults" }
                    input type="number" class=(field_class("adults")) id="adults" name="adults" min="1" max=(MAX_ADULTS.to_string()) value=(adults);
                    @if let Some(e) = self.errors.get("adults") {
                        div class="invalid-feedback" { (e) }
                    }
                }
                div class="col-md-2" {
                    label for="children" class="form-label" { "Children" }
                    input type="number" class=(field_class("children")) id="children" name="children" min="0" max=(MAX_CHILDREN.to_string()) value=(children);
                    @if let Some(e) = self.errors.get("children") {
                        div class="invalid-feedback" { (e) }
                    }
                }
                div class="col-md-2" {
                    button type="submit" class="btn btn-primary w-100" { "Search" }
                }
            }
        }
        .render_to(buffer);
    }
}

/// The home page: the active catalog, narrowed to free rooms when a stay is
/// given.
///
/// htmx requests get only the room list.
#[tracing::instrument(skip(user, conn, headers))]
pub async fn home(
    user: Option<User<true>>,
    mut conn: Conn<true>,
    headers: HeaderMap,
    Query(query): Query<SearchQuery>,
) -> StandardResponse {
    let (criteria, errors) = match query.criteria() {
        Ok(criteria) => (criteria, FieldErrors::new()),
        Err(errors) => (None, errors),
    };

    let listing = RoomListing::load(criteria.as_ref(), &mut *conn)?;
    let link_query = if listing.is_filtered {
        query.booking_query()
    } else {
        String::new()
    };

    if headers.get("HX-Request").is_some_and(|v| v == "true") {
        return success(
            maud! {
                RoomList listing=(&listing) link_query=(&link_query);
            }
            .render(),
        );
    }

    success(
        Page::new()
            .title("Rooms")
            .user_opt(user)
            .body(maud! {
                h1 class="mb-4" { "Find a room" }
                SearchForm query=(&query) errors=(&errors);
                RoomList listing=(&listing) link_query=(&link_query);
            })
            .render(),
    )
}
