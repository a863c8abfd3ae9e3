//! Country spending comparison: the user's monthly category averages next to
//! stored per-country benchmarks, opt-in via the profile consent flag.

pub(crate) mod core;
mod page;
mod share_endpoint;

pub use core::{
    CountryBenchmark, CountryBenchmarkId, add_benchmark_sample, create_country_benchmark_table,
    get_benchmarks_for_country,
};
pub use page::get_countries_page;
pub use share_endpoint::share_spending_endpoint;
