//! The dashboard: the current month at a glance plus charts over the last
//! twelve months.

mod aggregation;
mod page;

pub use page::get_dashboard_page;
