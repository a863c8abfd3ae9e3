//! The statistics page: charts over the user's spending history.

mod aggregation;
mod page;

pub use page::get_stats_page;
