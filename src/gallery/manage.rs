use axum::{
    extract::{Form, Path},
    response::Redirect,
};
use hypertext::prelude::*;
use serde::Deserialize;

use crate::{
    gallery::GalleryImage,
    permission::RoomManager,
    rooms::Room,
    state::Conn,
    template::Page,
    util_resp::{
        FailureResponse, StandardResponse, bad_request, err_not_found,
        see_other_ok,
    },
    validation::{FieldErrors, max_len, parse_bounded},
    widgets::alert::ErrorAlert,
};

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct AddImageForm {
    pub title: String,
    pub image_path: String,
    pub thumbnail_path: String,
    pub display_order: String,
    pub is_primary: Option<String>,
}

impl AddImageForm {
    pub fn parse(&self, room_id: &str) -> Result<GalleryImage, FieldErrors> {
        let mut errors = FieldErrors::new();

        let title = self.title.trim();
        errors.check("title", max_len(100)(title));
        let image_path = self.image_path.trim();
        if image_path.is_empty() {
            errors.push("image_path", "is required");
        }
        let display_order =
            parse_bounded(&self.display_order, 0, i64::from(u16::MAX), Some(0))
                .map_err(|e| errors.push("display_order", e))
                .ok();

        match display_order {
            Some(display_order) if errors.is_empty() => {
                let mut image = GalleryImage::new(
                    Some(room_id.to_string()),
                    title.to_string(),
                    image_path.to_string(),
                    display_order,
                    self.is_primary.is_some(),
                );
                let thumbnail = self.thumbnail_path.trim();
                if !thumbnail.is_empty() {
                    image.thumbnail_path = Some(thumbnail.to_string());
                }
                Ok(image)
            }
            _ => Err(errors),
        }
    }
}

/// The images of a room with controls to attach more and to pick the primary
/// one.
pub struct GalleryEditor<'r> {
    pub room: &'r Room,
    pub images: &'r [GalleryImage],
    pub form: &'r AddImageForm,
    pub errors: &'r FieldErrors,
}

impl<'r> Renderable for GalleryEditor<'r> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        let errors = self.errors;
        maud! {
            div class="row row-cols-2 row-cols-md-4 g-3 mb-4" {
                @for image in self.images {
                    div class="col" {
                        div class="card h-100" {
                            img src=(image.thumbnail()) class="card-img-top" alt=(image.title);
                            div class="card-body p-2" {
                                p class="card-text small mb-1" {
                                    (image.title) " · #" (image.display_order)
                                }
                                @if image.is_primary {
                                    span class="badge text-bg-primary" { "Primary" }
                                } @else {
                                    form method="post" action=(format!("/manage/images/{}/primary", image.id)) class="m-0" {
                                        button type="submit" class="btn btn-sm btn-outline-secondary" {
                                            "Make primary"
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
            @if self.images.is_empty() {
                p class="text-muted" { "No images yet." }
            }
            @for (_, msg) in errors.iter() {
                ErrorAlert msg=(msg);
            }
            form method="post" action=(format!("/manage/rooms/{}/images", self.room.id)) class="row g-3" {
                div class="col-md-4" {
                    label for="title" class="form-label" { "Title" }
                    input type="text" class="form-control" id="title" name="title" value=(self.form.title);
                }
                div class="col-md-4" {
                    label for="image_path" class="form-label" { "Image URL" }
                    input type="text" class="form-control" id="image_path" name="image_path" value=(self.form.image_path);
                }
                div class="col-md-4" {
                    label for="thumbnail_path" class="form-label" { "Thumbnail URL (optional)" }
                    input type="text" class="form-control" id="thumbnail_path" name="thumbnail_path" value=(self.form.thumbnail_path);
                }
                div class="col-md-2" {
                    label for="display_order" class="form-label" { "Order" }
                    input type="number" class="form-control" id="display_order" name="display_order" min="0" value=(self.form.display_order);
                }
                div class="col-md-3 form-check align-self-end ms-3" {
                    input class="form-check-input" type="checkbox" id="is_primary" name="is_primary" checked[self.form.is_primary.is_some()];
                    label class="form-check-label" for="is_primary" { "Primary image" }
                }
                div class="col-12" {
                    button type="submit" class="btn btn-outline-primary" { "Attach image" }
                }
            }
        }
        .render_to(buffer);
    }
}

#[tracing::instrument(skip(user, conn, form), fields(user = %user.id))]
pub async fn do_add_image(
    Path(room_id): Path<String>,
    RoomManager(user): RoomManager<true>,
    mut conn: Conn<true>,
    Form(form): Form<AddImageForm>,
) -> StandardResponse {
    let room = Room::fetch(&room_id, &mut *conn)?;

    let mut image = match form.parse(&room.id) {
        Ok(image) => image,
        Err(errors) => {
            let images = room.images(&mut *conn)?;
            return bad_request(
                Page::new()
                    .title(format!("Images of room {}", room.room_number))
                    .user(user)
                    .body(maud! {
                        h1 { "Images of room " (room.room_number) }
                        GalleryEditor room=(&room) images=(&images) form=(&form) errors=(&errors);
                    })
                    .render(),
            );
        }
    };

    image.save(&mut conn).map_err(FailureResponse::from)?;
    tracing::info!("attached image {} to room {}", image.id, room.id);

    see_other_ok(Redirect::to(&format!("/manage/rooms/{}/edit", room.id)))
}

#[tracing::instrument(skip(user, conn), fields(user = %user.id))]
pub async fn do_set_primary(
    Path(image_id): Path<String>,
    RoomManager(user): RoomManager<true>,
    mut conn: Conn<true>,
) -> StandardResponse {
    let Some(mut image) = GalleryImage::fetch(&image_id, &mut *conn)? else {
        return err_not_found();
    };

    image.is_primary = true;
    image.save(&mut conn).map_err(FailureResponse::from)?;

    match &image.room_id {
        Some(room_id) => {
            see_other_ok(Redirect::to(&format!("/manage/rooms/{room_id}/edit")))
        }
        None => see_other_ok(Redirect::to("/manage/rooms")),
    }
}
