pub mod aggregate;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod filter;
pub mod io_utils;
pub mod labels;
pub mod loader;
pub mod record;
pub mod session;
pub mod stats;
pub mod table;

use std::{env, io, sync::Arc, sync::OnceLock};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use log::{LevelFilter, debug, info};
use serde::Serialize;

use crate::{
    aggregate::{Dimension, SummaryTable, count_by, ratio_by},
    cli::{Cli, Commands, OutputFormat, SourceArgs},
    config::DashboardConfig,
    dashboard::{DashboardView, FilterOptions, compute_chart, compute_metrics},
    io_utils::CsvSource,
    labels::waiting_list_rank,
    loader::{Dataset, DatasetCache},
    session::Session,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("hotel_insights", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let mut config = DashboardConfig::load_optional(cli.config.as_deref())?;
    if let Some(locale) = cli.locale {
        config.locale = locale;
    }
    debug!("Effective configuration: {config:?}");
    let mut cache = DatasetCache::new(config.load_options());

    match cli.command {
        Commands::Overview(args) => {
            let (source, dataset) = open(&config, &mut cache, &args.source)?;
            let filters = args.filters.to_state(dataset.date_bounds());
            let (base, hotel) = compute_metrics(&dataset, &filters);
            info!("Computed overview for {:?}", source.path);
            match args.format {
                OutputFormat::Json => print_json(&serde_json::json!({
                    "overview": base,
                    "hotel": hotel,
                })),
                OutputFormat::Table => {
                    print!("{}", table::render_metrics("Overview", &base));
                    println!();
                    print!("{}", table::render_metrics("Selected hotel type", &hotel));
                    Ok(())
                }
            }
        }
        Commands::Chart(args) => {
            let (_, dataset) = open(&config, &mut cache, &args.source)?;
            let filters = args.filters.to_state(dataset.date_bounds());
            let chart = compute_chart(&dataset, &filters, args.chart);
            info!("Computed chart '{}'", args.chart.name());
            match args.format {
                OutputFormat::Json => print_json(&chart),
                OutputFormat::Table => {
                    print!("{}", table::render_chart(&chart));
                    Ok(())
                }
            }
        }
        Commands::Dashboard(args) => {
            let (_, dataset) = open(&config, &mut cache, &args.source)?;
            let filters = args.filters.to_state(dataset.date_bounds());
            let view = DashboardView::compute(&dataset, &filters);
            info!(
                "Computed dashboard over {} of {} booking(s)",
                view.base_rows,
                dataset.len()
            );
            match args.format {
                OutputFormat::Json => print_json(&view),
                OutputFormat::Table => {
                    print!("{}", table::render_dashboard(&view));
                    Ok(())
                }
            }
        }
        Commands::Group(args) => {
            let (_, dataset) = open(&config, &mut cache, &args.source)?;
            let filters = args.filters.to_state(dataset.date_bounds());
            let rows = filters.apply(dataset.bookings());
            info!(
                "Grouping {} of {} booking(s) by {:?}",
                rows.len(),
                dataset.len(),
                args.by
            );
            let summary = group_summary(&rows, &args.by, &args.within);
            match args.format {
                OutputFormat::Json => print_json(&summary),
                OutputFormat::Table => {
                    if summary.is_empty() {
                        println!("{}", aggregate::NO_DATA);
                    } else {
                        print!("{}", table::render_table(&summary.header(), &summary.render_rows()));
                    }
                    Ok(())
                }
            }
        }
        Commands::Options(args) => {
            let (_, dataset) = open(&config, &mut cache, &args.source)?;
            let options = FilterOptions::from_dataset(&dataset);
            match args.format {
                OutputFormat::Json => print_json(&options),
                OutputFormat::Table => {
                    print!("{}", session::render_options(&options));
                    Ok(())
                }
            }
        }
        Commands::Preview(args) => {
            let (source, dataset) = open(&config, &mut cache, &args.source)?;
            let rows = &dataset.bookings()[..args.rows.min(dataset.len())];
            info!("Displaying {} row(s) from {:?}", rows.len(), source.path);
            match args.format {
                OutputFormat::Json => print_json(&rows),
                OutputFormat::Table => {
                    let (headers, cells) = preview_rows(rows)?;
                    print!("{}", table::render_table(&headers, &cells));
                    Ok(())
                }
            }
        }
        Commands::Session(args) => {
            let source = resolve_source(&config, &args.source)?;
            let mut session = Session::new(cache, source);
            session.run(io::stdin().lock(), io::stdout().lock())
        }
    }
}

/// Count summary, or ratio summary when outer dimensions are given. The
/// waiting-list bucket keeps its fixed order wherever it appears.
pub fn group_summary(
    rows: &[&record::Booking],
    by: &[Dimension],
    within: &[Dimension],
) -> SummaryTable {
    let mut summary = if within.is_empty() {
        count_by(rows, by)
    } else {
        ratio_by(rows, within, by)
    };
    summary.order_by_rank(Dimension::WaitingList, |key| {
        key.as_str().and_then(waiting_list_rank)
    });
    summary
}

fn resolve_source(config: &DashboardConfig, args: &SourceArgs) -> Result<CsvSource> {
    let input = args
        .input
        .as_ref()
        .or(config.input.as_ref())
        .ok_or_else(|| anyhow!("No input file: pass -i/--input or set `input` in the config"))?;
    let delimiter = match args.delimiter {
        Some(delimiter) => Some(delimiter),
        None => config.delimiter_byte()?,
    };
    let encoding = args
        .input_encoding
        .as_deref()
        .or(config.input_encoding.as_deref());
    CsvSource::new(input, delimiter, encoding)
}

fn open(
    config: &DashboardConfig,
    cache: &mut DatasetCache,
    args: &SourceArgs,
) -> Result<(CsvSource, Arc<Dataset>)> {
    let source = resolve_source(config, args)?;
    let dataset = cache
        .load(&source)
        .with_context(|| format!("Loading bookings from {:?}", source.path))?;
    Ok((source, dataset))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Serializing output to JSON")?;
    println!("{rendered}");
    Ok(())
}

/// Flattens derived bookings into header + string cells via their JSON form,
/// so the preview lists every derived field (sorted by column name).
fn preview_rows(rows: &[record::Booking]) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut headers = Vec::new();
    let mut cells = Vec::with_capacity(rows.len());
    for booking in rows {
        let value = serde_json::to_value(booking).context("Serializing booking")?;
        let serde_json::Value::Object(fields) = value else {
            continue;
        };
        if headers.is_empty() {
            headers = fields.keys().cloned().collect();
        }
        cells.push(
            fields
                .values()
                .map(|field| match field {
                    serde_json::Value::String(text) => text.clone(),
                    serde_json::Value::Null => String::new(),
                    other => other.to_string(),
                })
                .collect(),
        );
    }
    Ok((headers, cells))
}
