//! Trips: grouping transactions for a stay abroad and tracking the spend
//! against a planned budget.

pub(crate) mod core;
mod create;
mod delete_endpoint;
mod detail;
mod edit;
mod list;

pub use core::{
    Trip, TripBuilder, TripId, create_trip, create_trip_table, delete_trip, get_all_trips,
    get_trip, update_trip,
};
pub use create::{create_trip_endpoint, get_new_trip_page};
pub use delete_endpoint::delete_trip_endpoint;
pub use detail::get_trip_detail_page;
pub use edit::{get_edit_trip_page, update_trip_endpoint};
pub use list::get_trips_page;
