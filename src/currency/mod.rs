//! Currency codes, stored exchange rates and conversion between currencies.

mod core;
mod rates_page;

pub use core::{
    CurrencyCode, ExchangeRate, convert, conversion_rate, create_exchange_rate_table,
    get_all_exchange_rates, upsert_exchange_rate,
};
pub use rates_page::{RatesPageState, UpsertRateEndpointState, get_rates_page, upsert_rate_endpoint};
