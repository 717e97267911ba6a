//! Historical daily price series: provider abstraction, concrete providers,
//! and a fetching store that applies timeouts, retries, rate limiting and
//! caching on top of any provider.

pub mod errors;
pub mod models;
pub mod providers;
pub mod store;

pub use errors::{StoreError, Unavailable};
pub use models::{
    bar::{Bar, Series},
    date_range::{DateRange, InvalidDateRange},
};
pub use providers::{DataProvider, ProviderError, ProviderInitError};
pub use store::{BatchFetch, FetchFailure, FetchPolicy, PriceStore};
