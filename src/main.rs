//! # twnews
//!
//! Command-line front end of the `twnews` library.
//!
//! ## Usage
//!
//! ```sh
//! twnews soup https://udn.com/news/story/7320/3407294
//! twnews search 酒駕 --channel ltn --limit 10
//! twnews compare 上吊 --begin 2020-02-01 --end 2020-02-29
//! ```
//!
//! Logs go to stderr (`RUST_LOG` controls the level, `info` by default);
//! results go to stdout, as text or with `--json` as JSON.

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime};
use clap::Parser;
use serde::Serialize;
use std::error::Error;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};
use tracing_subscriber::{fmt as tfmt, EnvFilter};
use twnews::{ClientContext, ContextOptions, NewsSearch, NewsSoup, ReqwestTransport, SearchOptions};

mod cli;

use cli::{Cli, Command, CompareArgs, SearchArgs, SoupArgs};

type Context = ClientContext<ReqwestTransport>;

/// Extracted fields of one article, as printed by `soup` and `search --soup`.
#[derive(Debug, Serialize)]
struct SoupReport {
    path: String,
    channel: Option<String>,
    title: Option<String>,
    date: Option<NaiveDateTime>,
    author: Option<String>,
    contents: Option<String>,
    effective_text_rate: f64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = Instant::now();
    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let ctx = ClientContext::from_options(&ContextOptions {
        channels_path: args.channels.clone(),
        cache_dir: args.cache_dir.clone(),
        no_cache: args.no_cache,
    })?;

    match &args.command {
        Command::Soup(soup_args) => soup(&ctx, soup_args).await?,
        Command::Search(search_args) => search(&ctx, search_args).await?,
        Command::Compare(compare_args) => compare(&ctx, compare_args).await?,
    }

    let elapsed = start_time.elapsed();
    info!(?elapsed, secs = elapsed.as_secs(), millis = elapsed.subsec_millis(), "Execution complete");
    Ok(())
}

async fn soup_report(soup: &mut NewsSoup<'_, ReqwestTransport>, max_chars: Option<usize>) -> SoupReport {
    let title = soup.title().await;
    let date = soup.date().await;
    let author = soup.author().await;
    let contents = match max_chars {
        Some(limit) => soup.contents_truncated(limit).await,
        None => soup.contents().await,
    };
    SoupReport {
        path: soup.path().to_string(),
        channel: soup.channel().map(str::to_string),
        title,
        date,
        author,
        contents,
        effective_text_rate: soup.effective_text_rate().await,
    }
}

fn or_none(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("None")
}

fn print_report(report: &SoupReport) {
    println!("{}", "-".repeat(75));
    println!("路徑: {}", report.path);
    println!("頻道: {}", or_none(&report.channel));
    println!("標題: {}", or_none(&report.title));
    match report.date {
        Some(date) => println!("日期: {}", date.format("%Y-%m-%d %H:%M:%S")),
        None => println!("日期: None"),
    }
    println!("記者: {}", or_none(&report.author));
    println!("內文:");
    println!("{}", or_none(&report.contents));
    println!("有效內容率: {:.2}%", report.effective_text_rate * 100.0);
    println!("{}", "-".repeat(75));
}

#[instrument(level = "info", skip_all, fields(path = %args.path))]
async fn soup(ctx: &Context, args: &SoupArgs) -> Result<(), Box<dyn Error>> {
    let mut soup = NewsSoup::new(ctx, args.path.clone()).with_refresh(args.refresh);
    if let Some(layout) = args.layout {
        soup = soup.with_layout(layout);
    }

    let report = soup_report(&mut soup, args.max_chars).await;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

#[instrument(level = "info", skip_all, fields(keyword = %args.keyword, channel = %args.channel))]
async fn search(ctx: &Context, args: &SearchArgs) -> Result<(), Box<dyn Error>> {
    let options = SearchOptions {
        limit: args.limit,
        beg_date: args.begin.clone(),
        end_date: args.end.clone(),
    };
    let mut search = NewsSearch::new(ctx, &args.channel, &options)?;
    search.by_keyword(&args.keyword, args.title_only).await;

    if args.soup {
        let mut reports = Vec::new();
        for mut soup in search.to_soup_list() {
            reports.push(soup_report(&mut soup, Some(30)).await);
        }
        if args.json {
            println!("{}", serde_json::to_string_pretty(&reports)?);
        } else {
            for (i, report) in reports.iter().enumerate() {
                println!("{i:03}: {}", report.path);
                println!("     記者: {} / 日期: {:?}", or_none(&report.author), report.date);
                println!("     標題: {}", or_none(&report.title));
                println!("     {} ...", or_none(&report.contents));
            }
        }
    } else if args.json {
        println!("{}", serde_json::to_string_pretty(search.to_dict_list())?);
    } else {
        for (i, item) in search.to_dict_list().iter().enumerate() {
            println!("{i:03}: {}", item.title);
            println!("     日期: {}", item.date);
            println!("     連結: {}", item.link);
        }
    }

    let pages = search.pages().max(1);
    let results = search.to_dict_list().len().max(1);
    let secs = search.elapsed().as_secs_f64();
    info!(
        pages = search.pages(),
        secs_per_page = secs / pages as f64,
        secs_per_result = secs / results as f64,
        "Search statistics"
    );
    Ok(())
}

/// First and last day of the month before the one containing `today`.
fn previous_month(today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let end = today.with_day(1)?.pred_opt()?;
    Some((end.with_day(1)?, end))
}

#[instrument(level = "info", skip_all, fields(keyword = %args.keyword))]
async fn compare(ctx: &Context, args: &CompareArgs) -> Result<(), Box<dyn Error>> {
    let (begin, end) = match (&args.begin, &args.end) {
        (Some(begin), Some(end)) => (begin.clone(), end.clone()),
        (None, None) => {
            let (begin, end) =
                previous_month(Local::now().date_naive()).ok_or("cannot determine last month")?;
            (begin.to_string(), end.to_string())
        }
        _ => return Err("--begin and --end must be given together".into()),
    };

    println!("比較 \"{}\" 在各媒體標題出現次數", args.keyword);
    println!("時間區間: {begin} ~ {end}");

    let options = SearchOptions {
        limit: args.limit,
        beg_date: Some(begin),
        end_date: Some(end),
    };
    let channels: Vec<&str> = ctx.channels().names().collect();
    for channel in channels {
        let mut search = match NewsSearch::new(ctx, channel, &options) {
            Ok(search) => search,
            Err(e) => {
                warn!(channel, error = %e, "Channel skipped");
                println!("{channel:>12}: -");
                continue;
            }
        };
        let count = search.by_keyword(&args.keyword, true).await.to_dict_list().len();
        println!("{channel:>12}: {count}");
    }
    Ok(())
}
