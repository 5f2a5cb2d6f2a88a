use hypertext::prelude::*;

use crate::rooms::Amenities;

/// The amenities a room has, as small badges.
pub struct AmenityBadges<'r> {
    pub amenities: &'r Amenities,
}

impl<'r> Renderable for AmenityBadges<'r> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        let flags = self.amenities.flags();
        maud! {
            div class="d-flex flex-wrap gap-1" {
                @for (_, label, _) in flags.iter().filter(|(_, _, on)| *on) {
                    span class="badge text-bg-light border" { (label) }
                }
            }
        }
        .render_to(buffer);
    }
}

/// Every amenity with whether the room has it.
pub struct AmenityTable<'r> {
    pub amenities: &'r Amenities,
}

impl<'r> Renderable for AmenityTable<'r> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        let a = self.amenities;
        let flags = a.flags();
        maud! {
            ul class="list-group list-group-flush" {
                @for (_, label, on) in flags.iter() {
                    li class="list-group-item d-flex justify-content-between" {
                        (label)
                        @if *on {
                            span class="text-success" { "Yes" }
                        } @else {
                            span class="text-muted" { "No" }
                        }
                    }
                }
                @if a.has_tv && !a.tv_details.is_empty() {
                    li class="list-group-item" { "TV: " (a.tv_details) }
                }
                @if a.extra_beds_available > 0 {
                    li class="list-group-item" {
                        "Extra beds available: " (a.extra_beds_available)
                    }
                }
                @if !a.room_view.is_empty() {
                    li class="list-group-item" { "View: " (a.room_view) }
                }
            }
        }
        .render_to(buffer);
    }
}
