use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    gallery::GalleryImage, money::cents_to_decimal, schema::rooms,
    util_resp::FailureResponse,
};

pub mod detail;
pub mod manage;
pub mod search;

text_enum! {
    pub enum RoomType {
        Single => ("single", "Single"),
        Double => ("double", "Double"),
        Suite => ("suite", "Suite"),
        Family => ("family", "Family"),
    }
}

text_enum! {
    pub enum BedType {
        Single => ("single", "Single Bed"),
        Double => ("double", "Double Bed"),
        Queen => ("queen", "Queen Bed"),
        King => ("king", "King Bed"),
    }
}

pub const MAX_ADULTS: i64 = 6;
pub const MAX_CHILDREN: i64 = 4;
pub const MAX_EXTRA_BEDS: i64 = 2;

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
#[diesel(table_name = rooms)]
#[diesel(check_for_backend(Sqlite))]
pub struct Amenities {
    pub has_wifi: bool,
    pub has_ac: bool,
    pub has_heating: bool,
    pub extra_beds_available: i64,
    pub has_tv: bool,
    pub tv_details: String,
    pub has_private_bathroom: bool,
    pub has_bathtub: bool,
    pub has_shower: bool,
    pub has_hairdryer: bool,
    pub has_minibar: bool,
    pub has_safe: bool,
    pub has_desk: bool,
    pub has_wardrobe: bool,
    pub has_coffee_maker: bool,
    pub room_view: String,
    pub has_balcony: bool,
}

impl Default for Amenities {
    fn default() -> Self {
        Self {
            has_wifi: true,
            has_ac: true,
            has_heating: true,
            extra_beds_available: 0,
            has_tv: true,
            tv_details: String::new(),
            has_private_bathroom: true,
            has_bathtub: false,
            has_shower: true,
            has_hairdryer: true,
            has_minibar: false,
            has_safe: false,
            has_desk: true,
            has_wardrobe: true,
            has_coffee_maker: false,
            room_view: String::new(),
            has_balcony: false,
        }
    }
}

impl Amenities {
    /// Form field name, label and value of every yes/no amenity, in display
    /// order.
    pub fn flags(&self) -> [(&'static str, &'static str, bool); 14] {
        [
            ("has_wifi", "WiFi", self.has_wifi),
            ("has_ac", "Air conditioning", self.has_ac),
            ("has_heating", "Heating", self.has_heating),
            ("has_tv", "TV", self.has_tv),
            ("has_private_bathroom", "Private bathroom", self.has_private_bathroom),
            ("has_bathtub", "Bathtub", self.has_bathtub),
            ("has_shower", "Shower", self.has_shower),
            ("has_hairdryer", "Hair dryer", self.has_hairdryer),
            ("has_minibar", "Minibar", self.has_minibar),
            ("has_safe", "Safe", self.has_safe),
            ("has_desk", "Work desk", self.has_desk),
            ("has_wardrobe", "Wardrobe", self.has_wardrobe),
            ("has_coffee_maker", "Coffee maker", self.has_coffee_maker),
            ("has_balcony", "Balcony", self.has_balcony),
        ]
    }
}

#[derive(
    Queryable, Selectable, Insertable, Serialize, Deserialize, Debug, Clone,
)]
#[diesel(table_name = rooms)]
#[diesel(check_for_backend(Sqlite))]
pub struct Room {
    pub id: String,
    pub name: String,
    pub room_type: RoomType,
    pub room_number: String,
    pub floor: i64,
    pub bed_type: BedType,
    pub capacity_adults: i64,
    pub capacity_children: i64,
    pub price_per_night_cents: i64,
    #[diesel(embed)]
    pub amenities: Amenities,
    pub description: String,
    pub is_active: bool,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

impl Room {
    #[tracing::instrument(skip(conn))]
    pub fn fetch(
        room_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Room, FailureResponse> {
        let ret = rooms::table
            .filter(rooms::id.eq(room_id))
            .select(Room::as_select())
            .first::<Room>(conn)
            .optional()
            .map_err(FailureResponse::from)?
            .ok_or(FailureResponse::NotFound(()));

        tracing::trace!("ok? {}", ret.is_ok());

        ret
    }

    /// Every room, including inactive ones, in room number order.
    pub fn list_all(
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<Vec<Room>> {
        rooms::table
            .order_by(rooms::room_number.asc())
            .select(Room::as_select())
            .load(conn)
    }

    pub fn price_per_night(&self) -> Decimal {
        cents_to_decimal(self.price_per_night_cents)
    }

    pub fn capacity_display(&self) -> String {
        format!(
            "Adults: {}, Children: {}",
            self.capacity_adults, self.capacity_children
        )
    }

    /// The image flagged as primary, otherwise the first image in display
    /// order, otherwise nothing.
    pub fn primary_image(
        &self,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<Option<GalleryImage>> {
        GalleryImage::primary_for_room(&self.id, conn)
    }

    pub fn images(
        &self,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<Vec<GalleryImage>> {
        GalleryImage::for_room(&self.id, conn)
    }
}
