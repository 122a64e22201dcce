//! Page fetching for the listing API.
//!
//! The sweep controller only sees the [`Fetcher`] trait and the
//! [`PageResult`] it returns; transport details, cookie priming and
//! user-agent rotation stay behind it in [`HttpFetcher`] and [`RunContext`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod context;
pub mod error;
pub mod http;
pub mod identity;
pub mod page;

// Re-export commonly used types
pub use context::RunContext;
pub use error::{FetchError, Result};
pub use http::HttpFetcher;
pub use identity::IdentityPool;
pub use page::{Fetcher, PageResult};
