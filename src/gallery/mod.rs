//! Images attached to rooms.
//!
//! Only the image location is stored: resizing and thumbnailing happen before
//! an image reaches this application.

use chrono::NaiveDateTime;
use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use serde::{Deserialize, Serialize};

use crate::schema::gallery_images;

pub mod manage;

#[derive(
    Queryable,
    Selectable,
    Insertable,
    AsChangeset,
    Serialize,
    Deserialize,
    Debug,
    Clone,
)]
#[diesel(table_name = gallery_images)]
#[diesel(check_for_backend(Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct GalleryImage {
    pub id: String,
    pub room_id: Option<String>,
    pub title: String,
    pub image_path: String,
    pub thumbnail_path: Option<String>,
    pub is_primary: bool,
    pub display_order: i64,
    pub upload_date: NaiveDateTime,
}

impl GalleryImage {
    pub fn new(
        room_id: Option<String>,
        title: String,
        image_path: String,
        display_order: i64,
        is_primary: bool,
    ) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            room_id,
            title,
            image_path,
            thumbnail_path: None,
            is_primary,
            display_order,
            upload_date: chrono::Utc::now().naive_utc(),
        }
    }

    pub fn thumbnail(&self) -> &str {
        self.thumbnail_path.as_deref().unwrap_or(&self.image_path)
    }

    /// Inserts or overwrites this image.
    ///
    /// When the image is primary, every other image of the same room is
    /// demoted first, in the same transaction. The partial unique index on
    /// `gallery_images (room_id) WHERE is_primary` rejects any write which
    /// would still leave two primaries behind.
    #[tracing::instrument(skip(self, conn), fields(image = %self.id))]
    pub fn save(&mut self, conn: &mut SqliteConnection) -> QueryResult<()> {
        if self.thumbnail_path.as_deref().is_none_or(str::is_empty) {
            self.thumbnail_path = Some(self.image_path.clone());
        }

        conn.transaction(|conn| {
            if self.is_primary
                && let Some(room_id) = &self.room_id
            {
                let demoted = diesel::update(
                    gallery_images::table
                        .filter(gallery_images::room_id.eq(room_id))
                        .filter(gallery_images::is_primary.eq(true))
                        .filter(gallery_images::id.ne(&self.id)),
                )
                .set(gallery_images::is_primary.eq(false))
                .execute(conn)?;

                if demoted > 0 {
                    tracing::debug!("demoted {demoted} primary image(s)");
                }
            }

            self.upsert(conn)
        })
    }

    /// Only a clash on `id` becomes an update. Any other unique violation,
    /// such as a second primary for the room, is returned as an error.
    fn upsert(&self, conn: &mut SqliteConnection) -> QueryResult<()> {
        diesel::insert_into(gallery_images::table)
            .values(self)
            .on_conflict(gallery_images::id)
            .do_update()
            .set(self)
            .execute(conn)?;
        Ok(())
    }

    /// Images of a room in display order.
    pub fn for_room(
        room_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<Vec<GalleryImage>> {
        gallery_images::table
            .filter(gallery_images::room_id.eq(room_id))
            .order_by((
                gallery_images::display_order.asc(),
                gallery_images::upload_date.desc(),
            ))
            .select(GalleryImage::as_select())
            .load(conn)
    }

    pub fn primary_for_room(
        room_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<Option<GalleryImage>> {
        let flagged = gallery_images::table
            .filter(gallery_images::room_id.eq(room_id))
            .filter(gallery_images::is_primary.eq(true))
            .select(GalleryImage::as_select())
            .first(conn)
            .optional()?;

        match flagged {
            Some(image) => Ok(Some(image)),
            None => gallery_images::table
                .filter(gallery_images::room_id.eq(room_id))
                .order_by((
                    gallery_images::display_order.asc(),
                    gallery_images::upload_date.desc(),
                ))
                .select(GalleryImage::as_select())
                .first(conn)
                .optional(),
        }
    }

    pub fn fetch(
        image_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<Option<GalleryImage>> {
        gallery_images::table
            .find(image_id)
            .select(GalleryImage::as_select())
            .first(conn)
            .optional()
    }
}
