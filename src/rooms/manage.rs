//! Staff screens for the room catalog.

use axum::{
    extract::{Form, Path},
    response::Redirect,
};
use chrono::Utc;
use diesel::prelude::*;
use hypertext::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    auth::User,
    gallery::{
        GalleryImage,
        manage::{AddImageForm, GalleryEditor},
    },
    money::{format_cents, parse_cents},
    permission::RoomManager,
    rooms::{
        Amenities, BedType, MAX_ADULTS, MAX_CHILDREN, MAX_EXTRA_BEDS, Room,
        RoomType,
    },
    schema::rooms,
    state::Conn,
    template::Page,
    util_resp::{
        FailureResponse, StandardResponse, bad_request, see_other_ok, success,
    },
    validation::{FieldErrors, is_valid_room_number, max_len, parse_bounded},
    widgets::{actions::Actions, amenities::AmenityBadges},
};

pub async fn manage_rooms_page(
    RoomManager(user): RoomManager<true>,
    mut conn: Conn<true>,
) -> StandardResponse {
    let rooms = Room::list_all(&mut *conn)?;

    success(
        Page::new()
            .title("Manage rooms")
            .user(user)
            .body(maud! {
                h1 { "Rooms" }
                Actions options=(&[("/manage/rooms/create", "Add a room")]);
                div class="table-responsive border rounded" {
                    table class="table table-hover mb-0 align-middle" {
                        thead class="bg-light" {
                            tr {
                                th { "Number" }
                                th { "Name" }
                                th { "Type" }
                                th { "Capacity" }
                                th { "Price / night" }
                                th { "Amenities" }
                                th { "Active" }
                                th class="text-end" { "Actions" }
                            }
                        }
                        tbody {
                            @for room in &rooms {
                                tr {
                                    td class="fw-medium" { (room.room_number) }
                                    td { a href=(format!("/rooms/{}", room.id)) { (room.name) } }
                                    td { (room.room_type.label()) }
                                    td { (room.capacity_display()) }
                                    td { (room.price_per_night().to_string()) }
                                    td { AmenityBadges amenities=(&room.amenities); }
                                    td {
                                        @if room.is_active { "Yes" } @else { span class="text-muted" { "No" } }
                                    }
                                    td class="text-end" {
                                        a class="btn btn-sm btn-outline-primary" href=(format!("/manage/rooms/{}/edit", room.id)) {
                                            "Edit"
                                        }
                                    }
                                }
                            }
                            @if rooms.is_empty() {
                                tr {
                                    td colspan="8" class="text-center text-muted py-4" { "No rooms created yet." }
                                }
                            }
                        }
                    }
                }
            })
            .render(),
    )
}

/// The room form as submitted. Every field is kept as text so that a bad
/// value can be shown back to the user next to its error.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct RoomForm {
    pub name: String,
    pub room_number: String,
    pub room_type: String,
    pub floor: String,
    pub bed_type: String,
    pub capacity_adults: String,
    pub capacity_children: String,
    pub price_per_night: String,
    pub description: String,
    pub is_active: Option<String>,
    pub extra_beds_available: String,
    pub tv_details: String,
    pub room_view: String,
    pub has_wifi: Option<String>,
    pub has_ac: Option<String>,
    pub has_heating: Option<String>,
    pub has_tv: Option<String>,
    pub has_private_bathroom: Option<String>,
    pub has_bathtub: Option<String>,
    pub has_shower: Option<String>,
    pub has_hairdryer: Option<String>,
    pub has_minibar: Option<String>,
    pub has_safe: Option<String>,
    pub has_desk: Option<String>,
    pub has_wardrobe: Option<String>,
    pub has_coffee_maker: Option<String>,
    pub has_balcony: Option<String>,
}

fn checkbox(on: bool) -> Option<String> {
    on.then(|| "on".to_string())
}

impl Default for RoomForm {
    fn default() -> Self {
        let mut form = RoomForm::from_parts(
            "",
            "",
            RoomType::Single,
            0,
            BedType::Single,
            1,
            0,
            "",
            &Amenities::default(),
            "",
            true,
        );
        form.price_per_night = String::new();
        form.floor = String::new();
        form
    }
}

impl RoomForm {
    #[allow(clippy::too_many_arguments)]
    fn from_parts(
        name: &str,
        room_number: &str,
        room_type: RoomType,
        floor: i64,
        bed_type: BedType,
        capacity_adults: i64,
        capacity_children: i64,
        price_per_night: &str,
        amenities: &Amenities,
        description: &str,
        is_active: bool,
    ) -> Self {
        Self {
            name: name.to_string(),
            room_number: room_number.to_string(),
            room_type: room_type.as_str().to_string(),
            floor: floor.to_string(),
            bed_type: bed_type.as_str().to_string(),
            capacity_adults: capacity_adults.to_string(),
            capacity_children: capacity_children.to_string(),
            price_per_night: price_per_night.to_string(),
            description: description.to_string(),
            is_active: checkbox(is_active),
            extra_beds_available: amenities.extra_beds_available.to_string(),
            tv_details: amenities.tv_details.clone(),
            room_view: amenities.room_view.clone(),
            has_wifi: checkbox(amenities.has_wifi),
            has_ac: checkbox(amenities.has_ac),
            has_heating: checkbox(amenities.has_heating),
            has_tv: checkbox(amenities.has_tv),
            has_private_bathroom: checkbox(amenities.has_private_bathroom),
            has_bathtub: checkbox(amenities.has_bathtub),
            has_shower: checkbox(amenities.has_shower),
            has_hairdryer: checkbox(amenities.has_hairdryer),
            has_minibar: checkbox(amenities.has_minibar),
            has_safe: checkbox(amenities.has_safe),
            has_desk: checkbox(amenities.has_desk),
            has_wardrobe: checkbox(amenities.has_wardrobe),
            has_coffee_maker: checkbox(amenities.has_coffee_maker),
            has_balcony: checkbox(amenities.has_balcony),
        }
    }

    pub fn from_room(room: &Room) -> Self {
        RoomForm::from_parts(
            &room.name,
            &room.room_number,
            room.room_type,
            room.floor,
            room.bed_type,
            room.capacity_adults,
            room.capacity_children,
            &format_cents(room.price_per_night_cents),
            &room.amenities,
            &room.description,
            room.is_active,
        )
    }

    /// Yes/no amenities as they stand on the form.
    fn amenity_flags(&self) -> Amenities {
        Amenities {
            has_wifi: self.has_wifi.is_some(),
            has_ac: self.has_ac.is_some(),
            has_heating: self.has_heating.is_some(),
            extra_beds_available: 0,
            has_tv: self.has_tv.is_some(),
            tv_details: self.tv_details.trim().to_string(),
            has_private_bathroom: self.has_private_bathroom.is_some(),
            has_bathtub: self.has_bathtub.is_some(),
            has_shower: self.has_shower.is_some(),
            has_hairdryer: self.has_hairdryer.is_some(),
            has_minibar: self.has_minibar.is_some(),
            has_safe: self.has_safe.is_some(),
            has_desk: self.has_desk.is_some(),
            has_wardrobe: self.has_wardrobe.is_some(),
            has_coffee_maker: self.has_coffee_maker.is_some(),
            room_view: self.room_view.trim().to_string(),
            has_balcony: self.has_balcony.is_some(),
        }
    }

    pub fn parse(&self) -> Result<RoomFields, FieldErrors> {
        let mut errors = FieldErrors::new();

        let name = self.name.trim();
        if name.is_empty() {
            errors.push("name", "is required");
        }
        errors.check("name", max_len(100)(name));

        let room_number = self.room_number.trim();
        errors.check("room_number", is_valid_room_number(room_number));

        let room_type = self
            .room_type
            .parse::<RoomType>()
            .map_err(|e| errors.push("room_type", e))
            .ok();
        let bed_type = self
            .bed_type
            .parse::<BedType>()
            .map_err(|e| errors.push("bed_type", e))
            .ok();
        let floor = parse_bounded(&self.floor, 0, i64::from(u16::MAX), None)
            .map_err(|e| errors.push("floor", e))
            .ok();
        let capacity_adults =
            parse_bounded(&self.capacity_adults, 1, MAX_ADULTS, None)
                .map_err(|e| errors.push("capacity_adults", e))
                .ok();
        let capacity_children =
            parse_bounded(&self.capacity_children, 0, MAX_CHILDREN, Some(0))
                .map_err(|e| errors.push("capacity_children", e))
                .ok();
        let extra_beds_available =
            parse_bounded(&self.extra_beds_available, 0, MAX_EXTRA_BEDS, Some(0))
                .map_err(|e| errors.push("extra_beds_available", e))
                .ok();
        let price_per_night_cents = parse_cents(&self.price_per_night)
            .map_err(|e| errors.push("price_per_night", e))
            .ok();
        errors.check("tv_details", max_len(100)(self.tv_details.trim()));
        errors.check("room_view", max_len(100)(self.room_view.trim()));

        match (
            room_type,
            bed_type,
            floor,
            capacity_adults,
            capacity_children,
            extra_beds_available,
            price_per_night_cents,
        ) {
            (
                Some(room_type),
                Some(bed_type),
                Some(floor),
                Some(capacity_adults),
                Some(capacity_children),
                Some(extra_beds_available),
                Some(price_per_night_cents),
            ) if errors.is_empty() => Ok(RoomFields {
                name: name.to_string(),
                room_number: room_number.to_string(),
                room_type,
                floor,
                bed_type,
                capacity_adults,
                capacity_children,
                price_per_night_cents,
                amenities: Amenities {
                    extra_beds_available,
                    ..self.amenity_flags()
                },
                description: self.description.trim().to_string(),
                is_active: self.is_active.is_some(),
            }),
            _ => Err(errors),
        }
    }
}

/// A validated room form.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomFields {
    pub name: String,
    pub room_number: String,
    pub room_type: RoomType,
    pub floor: i64,
    pub bed_type: BedType,
    pub capacity_adults: i64,
    pub capacity_children: i64,
    pub price_per_night_cents: i64,
    pub amenities: Amenities,
    pub description: String,
    pub is_active: bool,
}

impl RoomFields {
    pub fn into_room(self) -> Room {
        let now = Utc::now().naive_utc();
        Room {
            id: uuid::Uuid::now_v7().to_string(),
            name: self.name,
            room_type: self.room_type,
            room_number: self.room_number,
            floor: self.floor,
            bed_type: self.bed_type,
            capacity_adults: self.capacity_adults,
            capacity_children: self.capacity_children,
            price_per_night_cents: self.price_per_night_cents,
            amenities: self.amenities,
            description: self.description,
            is_active: self.is_active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrites an existing room. Bookings already made keep their price.
    pub fn apply(
        &self,
        room_id: &str,
        conn: &mut SqliteConnection,
    ) -> QueryResult<()> {
        let target = rooms::table.find(room_id);

        diesel::update(target)
            .set((
                rooms::name.eq(&self.name),
                rooms::room_type.eq(self.room_type),
                rooms::room_number.eq(&self.room_number),
                rooms::floor.eq(self.floor),
                rooms::bed_type.eq(self.bed_type),
                rooms::capacity_adults.eq(self.capacity_adults),
                rooms::capacity_children.eq(self.capacity_children),
                rooms::price_per_night_cents.eq(self.price_per_night_cents),
                rooms::description.eq(&self.description),
                rooms::is_active.eq(self.is_active),
                rooms::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(conn)?;

        diesel::update(target).set(&self.amenities).execute(conn)?;

        Ok(())
    }

    pub fn room_number_taken(
        &self,
        except: Option<&str>,
        conn: &mut SqliteConnection,
    ) -> QueryResult<bool> {
        let mut query = rooms::table
            .filter(rooms::room_number.eq(&self.room_number))
            .into_boxed();
        if let Some(id) = except {
            query = query.filter(rooms::id.ne(id));
        }
        diesel::select(diesel::dsl::exists(query)).get_result(conn)
    }
}

struct RoomFormView<'r> {
    action: &'r str,
    submit: &'r str,
    form: &'r RoomForm,
    errors: &'r FieldErrors,
}

impl<'r> Renderable for RoomFormView<'r> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        let form = self.form;
        let errors = self.errors;
        let checked = form.amenity_flags();
        let control = |name: &str| {
            if errors.get(name).is_some() {
                "form-control is-invalid"
            } else {
                "form-control"
            }
        };
        let text_fields: [(&str, &str, &str, &str); 7] = [
            ("name", "Room name", "text", form.name.as_str()),
            ("room_number", "Room number", "text", form.room_number.as_str()),
            ("floor", "Floor", "number", form.floor.as_str()),
            ("capacity_adults", "Adult capacity (1-6)", "number", form.capacity_adults.as_str()),
            ("capacity_children", "Children capacity (0-4)", "number", form.capacity_children.as_str()),
            ("price_per_night", "Price per night", "text", form.price_per_night.as_str()),
            ("extra_beds_available", "Extra beds available (0-2)", "number", form.extra_beds_available.as_str()),
        ];

        maud! {
            form method="post" action=(self.action) class="mt-3" {
                div class="row g-3" {
                    @for (name, label, kind, value) in text_fields {
                        div class="col-md-6" {
                            label for=(name) class="form-label" { (label) }
                            input type=(kind) class=(control(name)) id=(name) name=(name) value=(value);
                            @if let Some(e) = errors.get(name) {
                                div class="invalid-feedback" { (e) }
                            }
                        }
                    }
                    div class="col-md-6" {
                        label for="room_type" class="form-label" { "Room type" }
                        select class="form-select" id="room_type" name="room_type" {
                            @for t in RoomType::ALL {
                                option value=(t.as_str()) selected[t.as_str() == form.room_type] { (t.label()) }
                            }
                        }
                    }
                    div class="col-md-6" {
                        label for="bed_type" class="form-label" { "Bed type" }
                        select class="form-select" id="bed_type" name="bed_type" {
                            @for t in BedType::ALL {
                                option value=(t.as_str()) selected[t.as_str() == form.bed_type] { (t.label()) }
                            }
                        }
                    }
                    div class="col-md-6" {
                        label for="tv_details" class="form-label" { "TV details" }
                        input type="text" class=(control("tv_details")) id="tv_details" name="tv_details" value=(form.tv_details);
                    }
                    div class="col-md-6" {
                        label for="room_view" class="form-label" { "View" }
                        input type="text" class=(control("room_view")) id="room_view" name="room_view" value=(form.room_view);
                    }
                    div class="col-12" {
                        label for="description" class="form-label" { "Description" }
                        textarea class="form-control" id="description" name="description" rows="4" {
                            (form.description)
                        }
                    }
                    div class="col-12" {
                        div class="row row-cols-2 row-cols-md-4 g-2" {
                            @for (name, label, on) in checked.flags() {
                                div class="col form-check" {
                                    input class="form-check-input" type="checkbox" id=(name) name=(name) checked[on];
                                    label class="form-check-label" for=(name) { (label) }
                                }
                            }
                        }
                    }
                    div class="col-12 form-check" {
                        input class="form-check-input" type="checkbox" id="is_active" name="is_active" checked[form.is_active.is_some()];
                        label class="form-check-label" for="is_active" { "Open for booking" }
                    }
                    div class="col-12" {
                        button type="submit" class="btn btn-primary" { (self.submit) }
                    }
                }
            }
        }
        .render_to(buffer);
    }
}

fn room_form_page<const TX: bool>(
    user: User<TX>,
    title: &str,
    action: &str,
    form: &RoomForm,
    errors: &FieldErrors,
    room: Option<&Room>,
    images: &[GalleryImage],
) -> Rendered<String> {
    let image_form = AddImageForm::default();
    let no_errors = FieldErrors::new();
    Page::new()
        .title(title.to_string())
        .user(user)
        .body(maud! {
            h1 { (title) }
            RoomFormView action=(action) submit=("Save") form=(form) errors=(errors);
            @if let Some(room) = room {
                hr class="my-5";
                h2 class="h4" { "Gallery" }
                GalleryEditor room=(room) images=(images) form=(&image_form) errors=(&no_errors);
            }
        })
        .render()
}

pub async fn create_room_page(
    RoomManager(user): RoomManager<true>,
) -> StandardResponse {
    success(room_form_page(
        user,
        "Add a room",
        "/manage/rooms/create",
        &RoomForm::default(),
        &FieldErrors::new(),
        None,
        &[],
    ))
}

#[tracing::instrument(skip_all, fields(user = %user.id))]
pub async fn do_create_room(
    RoomManager(user): RoomManager<true>,
    mut conn: Conn<true>,
    Form(form): Form<RoomForm>,
) -> StandardResponse {
    let fields = match form.parse() {
        Ok(fields) => fields,
        Err(errors) => {
            return bad_request(room_form_page(
                user,
                "Add a room",
                "/manage/rooms/create",
                &form,
                &errors,
                None,
                &[],
            ));
        }
    };

    if fields.room_number_taken(None, &mut conn)? {
        let mut errors = FieldErrors::new();
        errors.push("room_number", "a room with this number already exists");
        return bad_request(room_form_page(
            user,
            "Add a room",
            "/manage/rooms/create",
            &form,
            &errors,
            None,
            &[],
        ));
    }

    let room = fields.into_room();
    diesel::insert_into(rooms::table)
        .values(&room)
        .execute(&mut *conn)
        .map_err(FailureResponse::from)?;
    tracing::info!("created room {} ({})", room.room_number, room.id);

    see_other_ok(Redirect::to(&format!("/manage/rooms/{}/edit", room.id)))
}

pub async fn edit_room_page(
    Path(room_id): Path<String>,
    RoomManager(user): RoomManager<true>,
    mut conn: Conn<true>,
) -> StandardResponse {
    let room = Room::fetch(&room_id, &mut *conn)?;
    let images = room.images(&mut *conn)?;

    success(room_form_page(
        user,
        &format!("Edit room {}", room.room_number),
        &format!("/manage/rooms/{}/edit", room.id),
        &RoomForm::from_room(&room),
        &FieldErrors::new(),
        Some(&room),
        &images,
    ))
}

#[tracing::instrument(skip(user, conn, form), fields(user = %user.id))]
pub async fn do_edit_room(
    Path(room_id): Path<String>,
    RoomManager(user): RoomManager<true>,
    mut conn: Conn<true>,
    Form(form): Form<RoomForm>,
) -> StandardResponse {
    let room = Room::fetch(&room_id, &mut *conn)?;

    let errors = match form.parse() {
        Ok(fields) => {
            if fields.room_number_taken(Some(&room.id), &mut conn)? {
                let mut errors = FieldErrors::new();
                errors.push(
                    "room_number",
                    "a room with this number already exists",
                );
                errors
            } else {
                fields.apply(&room.id, &mut conn)?;
                tracing::info!("updated room {}", room.id);
                return see_other_ok(Redirect::to("/manage/rooms"));
            }
        }
        Err(errors) => errors,
    };

    let images = room.images(&mut *conn)?;
    bad_request(room_form_page(
        user,
        &format!("Edit room {}", room.room_number),
        &format!("/manage/rooms/{}/edit", room.id),
        &form,
        &errors,
        Some(&room),
        &images,
    ))
}
