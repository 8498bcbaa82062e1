//! Command-line interface definitions for twnews.
//!
//! Global options select the channel document and the page cache; each
//! subcommand maps to one library entry point.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use twnews::Layout;

/// Extract and search Taiwanese news.
///
/// # Examples
///
/// ```sh
/// # Fields of one article
/// twnews soup https://udn.com/news/story/7320/3407294
///
/// # Newest 10 LTN hits within a date window, as JSON
/// twnews search 酒駕 --channel ltn --limit 10 --begin 2020-02-01 --end 2020-02-10 --json
///
/// # Title hit counts of every channel for last month
/// twnews compare 上吊
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Replacement channel configuration document (JSON)
    #[arg(long, global = true, env = "TWNEWS_CHANNELS")]
    pub channels: Option<PathBuf>,

    /// Page cache directory (default: ~/.twnews/cache)
    #[arg(long, global = true, env = "TWNEWS_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Do not read or write the page cache
    #[arg(long, global = true)]
    pub no_cache: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Extract title, date, author and body of one article
    Soup(SoupArgs),
    /// Search a channel by keyword
    Search(SearchArgs),
    /// Count title hits of a keyword on every searchable channel
    Compare(CompareArgs),
}

#[derive(Args, Debug)]
pub struct SoupArgs {
    /// Article URL or local file (.html, .json, optionally .gz)
    pub path: String,

    /// Fetch again even if the page is cached
    #[arg(long)]
    pub refresh: bool,

    /// Force a layout instead of detecting it from the URL
    #[arg(long, value_enum)]
    pub layout: Option<Layout>,

    /// Cut the body text to this many characters
    #[arg(long)]
    pub max_chars: Option<usize>,

    /// Print the fields as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    pub keyword: String,

    #[arg(short, long, default_value = "udn")]
    pub channel: String,

    /// Maximum number of results
    #[arg(short, long, default_value_t = 25)]
    pub limit: usize,

    /// Keep only results whose title contains the keyword
    #[arg(short, long)]
    pub title_only: bool,

    /// First day of the date window (yyyy-mm-dd)
    #[arg(long)]
    pub begin: Option<String>,

    /// Last day of the date window, inclusive (yyyy-mm-dd)
    #[arg(long)]
    pub end: Option<String>,

    /// Also load every hit and show its author and effective text rate
    #[arg(long)]
    pub soup: bool,

    /// Print the results as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct CompareArgs {
    pub keyword: String,

    /// First day of the date window (default: first day of last month)
    #[arg(long)]
    pub begin: Option<String>,

    /// Last day of the date window (default: last day of last month)
    #[arg(long)]
    pub end: Option<String>,

    /// Maximum number of results per channel
    #[arg(short, long, default_value_t = 1000)]
    pub limit: usize,
}
