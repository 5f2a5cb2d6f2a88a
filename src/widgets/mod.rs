//! Page fragments shared between screens.

pub mod actions;
pub mod alert;
pub mod amenities;
