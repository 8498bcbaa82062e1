//! # twnews
//!
//! Field extraction and keyword search for Taiwanese news sites.
//!
//! Every supported site ("channel") is described declaratively in a JSON
//! channel document: CSS selectors (or JSON key paths) for the article
//! fields, date formats, which URL prefixes carry desktop markup, and the
//! search endpoint's URL template and result selectors. The same code then
//! handles every channel.
//!
//! ## Features
//!
//! - [`NewsSoup`]: lazily loads one article (URL or local file, optionally
//!   gzip-compressed) and extracts title, publication date, author and body
//!   text, with a byline scanner for channels that have no author element
//! - [`NewsSearch`]: walks a channel's paginated search results, filters by
//!   date window and title, binary-searches for the first page of a date
//!   window where the channel supports it, and drops duplicated links
//! - Remote pages are normalized (redirects, `https`, mobile hosts) and
//!   cached as gzip files under `~/.twnews/cache`
//!
//! Broken pages never abort a run: extraction failures are logged once and
//! surface as `None`. Only invalid search parameters are returned as errors.
//!
//! ## Usage
//!
//! ```ignore
//! use twnews::{ClientContext, ContextOptions, NewsSearch, SearchOptions};
//!
//! let ctx = ClientContext::from_options(&ContextOptions::default())?;
//! let mut search = NewsSearch::new(&ctx, "ltn", &SearchOptions::default())?;
//! for mut soup in search.by_keyword("酒駕", true).await.to_soup_list() {
//!     println!("{:?} {:?}", soup.title().await, soup.author().await);
//! }
//! ```

pub mod author;
pub mod cache;
pub mod config;
pub mod context;
pub mod document;
pub mod error;
pub mod models;
pub mod node;
pub mod search;
pub mod soup;
pub mod transport;
pub mod utils;

pub use config::{ChannelRegistry, Layout};
pub use context::{ClientContext, ContextOptions};
pub use error::{ConfigError, SearchError};
pub use models::SearchResultItem;
pub use search::{NewsSearch, SearchOptions};
pub use soup::NewsSoup;
pub use transport::{ReqwestTransport, Transport};
