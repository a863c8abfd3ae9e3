//! The country comparison page: the user's monthly spending by category next
//! to the stored benchmarks for their home country.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use time::Date;

use crate::{
    AppState, Error,
    auth::{UserId, get_user_by_id},
    category::get_all_categories,
    country::{CountryBenchmark, get_benchmarks_for_country},
    currency::{CurrencyCode, convert},
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE,
        TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base, format_amount,
    },
    navigation::NavBar,
    timezone::today_in,
    transaction::{TransactionKind, get_transactions_in_range, month_bounds},
};

/// The fewest categorised expenses a month needs before the user's averages
/// are meaningful enough to show or share.
pub(super) const MINIMUM_MONTHLY_SAMPLES: u32 = 3;

/// The state needed for the country comparison page.
#[derive(Debug, Clone)]
pub struct CountriesPageState {
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CountriesPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The user's average spend per category over one month, denominated in the
/// preferred currency.
pub(super) struct MonthlyAverages {
    /// Average amount per category name.
    pub by_category: HashMap<String, f64>,
    /// How many transactions the averages were computed from.
    pub transaction_count: u32,
}

/// Average the month's categorised expenses per category, converted into
/// `preferred_currency`.
///
/// Transactions booked against a trip are skipped, as is anything without a
/// category; trip spending says more about the destination than about living
/// costs at home.
///
/// # Errors
/// This function will return a:
/// - [Error::MissingExchangeRate] if a transaction's currency cannot be
///   converted into the preferred currency,
/// - or [Error::SqlError] if there is an SQL error.
pub(super) fn monthly_category_averages(
    start: Date,
    end: Date,
    preferred_currency: &CurrencyCode,
    connection: &Connection,
) -> Result<MonthlyAverages, Error> {
    let category_names = get_all_categories(connection)?
        .into_iter()
        .map(|category| (category.id, category.name))
        .collect::<HashMap<_, _>>();

    let mut totals: HashMap<String, (f64, u32)> = HashMap::new();
    let mut transaction_count = 0;

    for transaction in get_transactions_in_range(start, end, connection)? {
        if transaction.kind != TransactionKind::Expense || transaction.trip_id.is_some() {
            continue;
        }

        let Some(name) = transaction
            .category_id
            .and_then(|category_id| category_names.get(&category_id))
        else {
            continue;
        };

        let converted = convert(
            transaction.amount,
            &transaction.currency,
            preferred_currency,
            connection,
        )?;

        let (total, count) = totals.entry(name.to_string()).or_insert((0.0, 0));
        *total += converted;
        *count += 1;
        transaction_count += 1;
    }

    let by_category = totals
        .into_iter()
        .map(|(name, (total, count))| (name, total / count as f64))
        .collect();

    Ok(MonthlyAverages {
        by_category,
        transaction_count,
    })
}

/// Render the country comparison page.
pub async fn get_countries_page(State(state): State<CountriesPageState>) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let user = get_user_by_id(UserId::new(1), &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve user: {error}"))?;

    let Some(home_country) = user.home_country.as_deref().filter(|_| user.data_sharing_consent)
    else {
        return Ok(consent_needed_view().into_response());
    };

    let today = today_in(&state.local_timezone)?;
    let (start, end) = month_bounds(today.year(), today.month());

    let benchmarks = get_benchmarks_for_country(home_country, &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve country benchmarks: {error}"))?;

    let averages = match monthly_category_averages(start, end, &user.preferred_currency, &connection)
    {
        Ok(averages) => Some(averages),
        Err(Error::MissingExchangeRate { .. }) => None,
        Err(error) => {
            tracing::error!("Failed to compute monthly category averages: {error}");
            return Err(error);
        }
    };

    Ok(
        comparison_view(home_country, &benchmarks, &averages, &user.preferred_currency, &connection)
            .into_response(),
    )
}

fn consent_needed_view() -> Markup {
    let nav_bar = NavBar::new(endpoints::COUNTRIES_VIEW).into_html();

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-4"
            {
                h1 class="text-xl font-bold" { "Country Comparison" }

                p
                {
                    "To compare your spending against country averages, set your home "
                    "country and enable the data sharing consent on the "
                    a href=(endpoints::PROFILE_VIEW) class=(LINK_STYLE) { "profile page" }
                    "."
                }
            }
        }
    );

    base("Country Comparison", &[], &content)
}

fn comparison_view(
    home_country: &str,
    benchmarks: &[CountryBenchmark],
    averages: &Option<MonthlyAverages>,
    preferred_currency: &CurrencyCode,
    connection: &Connection,
) -> Markup {
    let nav_bar = NavBar::new(endpoints::COUNTRIES_VIEW).into_html();

    let incomplete = averages
        .as_ref()
        .is_none_or(|averages| averages.transaction_count < MINIMUM_MONTHLY_SAMPLES);

    let user_average_cell = |benchmark: &CountryBenchmark| -> Markup {
        if incomplete {
            return html!( "\u{2013}" );
        }

        let Some(average) = averages
            .as_ref()
            .and_then(|averages| averages.by_category.get(&benchmark.category))
        else {
            return html!( "\u{2013}" );
        };

        // The averages are in the preferred currency, the benchmark may be
        // stored in another one.
        match convert(*average, preferred_currency, &benchmark.currency, connection) {
            Ok(converted) => html!( (format_amount(converted, &benchmark.currency)) ),
            Err(_) => html!( "\u{2013}" ),
        }
    };

    let table_row = |benchmark: &CountryBenchmark| {
        html!(
            tr class=(TABLE_ROW_STYLE)
            {
                td class=(TABLE_CELL_STYLE) { (benchmark.category) }

                td class=(TABLE_CELL_STYLE) { (user_average_cell(benchmark)) }

                td class=(TABLE_CELL_STYLE)
                {
                    (format_amount(benchmark.average_amount, &benchmark.currency))
                }

                td class=(TABLE_CELL_STYLE) { (benchmark.sample_size) }
            }
        )
    };

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-4"
            {
                header class="flex justify-between flex-wrap items-end"
                {
                    h1 class="text-xl font-bold" { "Spending in " (home_country) }

                    @if !incomplete {
                        form
                            hx-post=(endpoints::POST_COUNTRY_SHARE)
                            hx-target-error="#alert-container"
                        {
                            button type="submit" class=(BUTTON_PRIMARY_STYLE)
                            {
                                "Share My Averages"
                            }
                        }
                    }
                }

                @if incomplete {
                    p class="text-gray-500 dark:text-gray-400"
                    {
                        "Record at least " (MINIMUM_MONTHLY_SAMPLES) " categorised expenses "
                        "this month to see and share your averages."
                    }
                }

                section class="dark:bg-gray-800 lg:max-w-5xl lg:w-full lg:mx-auto"
                {
                    table class="w-full text-sm text-left rtl:text-right
                        text-gray-500 dark:text-gray-400"
                    {
                        thead class=(TABLE_HEADER_STYLE)
                        {
                            tr
                            {
                                th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Your Average" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Country Average" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Samples" }
                            }
                        }

                        tbody
                        {
                            @for benchmark in benchmarks {
                                (table_row(benchmark))
                            }

                            @if benchmarks.is_empty() {
                                tr
                                {
                                    td
                                        colspan="4"
                                        class="px-6 py-4 text-center
                                            text-gray-500 dark:text-gray-400"
                                    {
                                        "No benchmark data for " (home_country) " yet. "
                                        "Shared averages will appear here."
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    );

    base("Country Comparison", &[], &content)
}

#[cfg(test)]
mod countries_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::extract::State;
    use rusqlite::Connection;
    use time::OffsetDateTime;

    use crate::{
        auth::{PasswordHash, UserId, create_user, update_profile},
        category::{CategoryName, create_category},
        country::{add_benchmark_sample, get_countries_page},
        currency::CurrencyCode,
        db::initialize,
        test_utils::{assert_status_ok, assert_valid_html, parse_html_document},
        transaction::{Transaction, TransactionKind, create_transaction},
    };

    use super::CountriesPageState;

    const TEST_TIMEZONE: &str = "Etc/UTC";

    fn eur() -> CurrencyCode {
        CurrencyCode::new_unchecked("EUR")
    }

    fn get_page_state() -> CountriesPageState {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        initialize(&connection).expect("Could not initialize database");
        create_user(PasswordHash::new_unchecked("hunter2"), &connection)
            .expect("Could not create test user");

        CountriesPageState {
            local_timezone: TEST_TIMEZONE.to_owned(),
            db_connection: Arc::new(Mutex::new(connection)),
        }
    }

    fn give_consent(state: &CountriesPageState, country: &str) {
        update_profile(
            UserId::new(1),
            &eur(),
            Some(country),
            true,
            &state.db_connection.lock().unwrap(),
        )
        .expect("Could not update test profile");
    }

    #[tokio::test]
    async fn page_asks_for_consent_and_home_country() {
        let state = get_page_state();

        let response = get_countries_page(State(state)).await.unwrap();

        assert_status_ok(&response);

        let html = parse_html_document(response).await;
        assert_valid_html(&html);

        let text = html.root_element().text().collect::<String>();
        assert!(text.contains("set your home country"));
        assert!(!text.contains("Country Average"));
    }

    #[tokio::test]
    async fn page_shows_empty_state_without_benchmarks() {
        let state = get_page_state();
        give_consent(&state, "Czech Republic");

        let response = get_countries_page(State(state)).await.unwrap();

        assert_status_ok(&response);

        let html = parse_html_document(response).await;
        let text = html.root_element().text().collect::<String>();
        assert!(text.contains("No benchmark data for Czech Republic yet"));
    }

    #[tokio::test]
    async fn page_compares_user_averages_against_benchmarks() {
        let state = get_page_state();
        give_consent(&state, "Czech Republic");
        let today = OffsetDateTime::now_utc().date();
        {
            let connection = state.db_connection.lock().unwrap();
            add_benchmark_sample("Czech Republic", "Groceries", 150.0, &eur(), &connection)
                .unwrap();
            let groceries =
                create_category(CategoryName::new_unchecked("Groceries"), &connection).unwrap();

            for amount in [30.0, 40.0, 50.0] {
                create_transaction(
                    Transaction::build(
                        TransactionKind::Expense,
                        amount,
                        CurrencyCode::new_unchecked("EUR"),
                        today,
                        "Weekly shop",
                    )
                    .category_id(Some(groceries.id)),
                    &connection,
                )
                .unwrap();
            }
        }

        let response = get_countries_page(State(state)).await.unwrap();

        assert_status_ok(&response);

        let html = parse_html_document(response).await;
        assert_valid_html(&html);

        let text = html.root_element().text().collect::<String>();
        assert!(text.contains("Groceries"));
        // The user average is (30 + 40 + 50) / 3 = 40.
        assert!(text.contains("€40.00"));
        assert!(text.contains("€150.00"));
        assert!(text.contains("Share My Averages"));
    }

    #[tokio::test]
    async fn page_hides_averages_with_too_few_expenses() {
        let state = get_page_state();
        give_consent(&state, "Czech Republic");
        let today = OffsetDateTime::now_utc().date();
        {
            let connection = state.db_connection.lock().unwrap();
            add_benchmark_sample("Czech Republic", "Groceries", 150.0, &eur(), &connection)
                .unwrap();
            let groceries =
                create_category(CategoryName::new_unchecked("Groceries"), &connection).unwrap();
            create_transaction(
                Transaction::build(
                    TransactionKind::Expense,
                    30.0,
                    CurrencyCode::new_unchecked("EUR"),
                    today,
                    "Weekly shop",
                )
                .category_id(Some(groceries.id)),
                &connection,
            )
            .unwrap();
        }

        let response = get_countries_page(State(state)).await.unwrap();

        assert_status_ok(&response);

        let html = parse_html_document(response).await;
        let text = html.root_element().text().collect::<String>();
        assert!(text.contains("Record at least 3 categorised expenses"));
        assert!(!text.contains("€30.00"));
    }
}
