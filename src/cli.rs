use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::{
    aggregate::Dimension,
    dashboard::ChartId,
    filter::{BOTH_HOTELS, DateRange, FilterState, Selection},
    labels::Locale,
};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Explore hotel booking cancellations from the command line",
    long_about = None
)]
pub struct Cli {
    /// YAML configuration file (input path, labels, thresholds)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Label language; overrides `locale` from the config file
    #[arg(long, global = true, value_enum)]
    pub locale: Option<Locale>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Headline metrics for the date range and the selected hotel type
    Overview(OverviewArgs),
    /// Summary table behind a single chart
    Chart(ChartArgs),
    /// Every section and chart of the dashboard
    Dashboard(DashboardArgs),
    /// Ad-hoc count or ratio aggregation over booking dimensions
    Group(GroupArgs),
    /// Values offered by each filter and the default date range
    Options(OptionsArgs),
    /// First rows of the derived booking table
    Preview(PreviewArgs),
    /// Interactive filter session reading commands from stdin
    Session(SessionArgs),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Debug, Clone, Default, Args)]
pub struct SourceArgs {
    /// Bookings CSV file (falls back to `input` from the config file)
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct FilterArgs {
    /// First arrival date to include (YYYY-MM-DD, defaults to the earliest)
    #[arg(long, value_parser = parse_date)]
    pub from: Option<NaiveDate>,
    /// Last arrival date to include (YYYY-MM-DD, defaults to the latest)
    #[arg(long, value_parser = parse_date)]
    pub to: Option<NaiveDate>,
    /// Hotel type to focus on, or `both`
    #[arg(long, default_value = BOTH_HOTELS)]
    pub hotel: String,
    /// Deposit types to keep (repeatable or comma-separated)
    #[arg(long = "deposit", value_delimiter = ',', action = clap::ArgAction::Append)]
    pub deposit: Vec<String>,
    /// Customer types to keep
    #[arg(long = "customer", value_delimiter = ',', action = clap::ArgAction::Append)]
    pub customer: Vec<String>,
    /// Distribution channels to keep
    #[arg(long = "channel", value_delimiter = ',', action = clap::ArgAction::Append)]
    pub channel: Vec<String>,
    /// Market segments to keep
    #[arg(long = "segment", value_delimiter = ',', action = clap::ArgAction::Append)]
    pub segment: Vec<String>,
}

impl Default for FilterArgs {
    fn default() -> Self {
        Self {
            from: None,
            to: None,
            hotel: BOTH_HOTELS.to_string(),
            deposit: Vec::new(),
            customer: Vec::new(),
            channel: Vec::new(),
            segment: Vec::new(),
        }
    }
}

impl FilterArgs {
    /// Builds the filter state. A single open end of the date range is
    /// filled from `bounds`; with neither end given no date predicate is set.
    pub fn to_state(&self, bounds: Option<DateRange>) -> FilterState {
        let date_range = match (self.from, self.to) {
            (None, None) => None,
            (from, to) => Some(DateRange::new(
                from.or(bounds.map(|b| b.start)).unwrap_or(NaiveDate::MIN),
                to.or(bounds.map(|b| b.end)).unwrap_or(NaiveDate::MAX),
            )),
        };
        FilterState {
            date_range,
            hotel: Selection::from_hotel_choice(&self.hotel),
            deposit: multiselect(&self.deposit),
            customer: multiselect(&self.customer),
            channel: multiselect(&self.channel),
            segment: multiselect(&self.segment),
        }
    }
}

fn multiselect(values: &[String]) -> Selection {
    Selection::from_multiselect(
        values
            .iter()
            .map(|v| v.trim())
            .filter(|v| !v.is_empty()),
    )
}

#[derive(Debug, Args)]
pub struct OverviewArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct ChartArgs {
    /// Chart to compute
    #[arg(value_enum)]
    pub chart: ChartId,
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct DashboardArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Output format; json is the hand-off document for a chart renderer
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct GroupArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Dimensions to group by, e.g. `deposit_type,is_canceled_label`
    #[arg(long = "by", required = true, value_delimiter = ',', value_parser = parse_dimension)]
    pub by: Vec<Dimension>,
    /// Outer dimensions; when present each row's share of its outer group is reported
    #[arg(long = "within", value_delimiter = ',', value_parser = parse_dimension)]
    pub within: Vec<Dimension>,
    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct OptionsArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Number of rows to display
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct SessionArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

pub fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|err| format!("'{value}' is not a YYYY-MM-DD date: {err}"))
}

pub fn parse_dimension(value: &str) -> Result<Dimension, String> {
    value.parse::<Dimension>().map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("date")
    }

    #[test]
    fn open_ended_range_is_completed_from_bounds() {
        let bounds = DateRange::new(date(2015, 7, 1), date(2017, 8, 31));
        let args = FilterArgs {
            from: Some(date(2016, 1, 1)),
            ..FilterArgs::default()
        };
        let state = args.to_state(Some(bounds));
        assert_eq!(
            state.date_range,
            Some(DateRange::new(date(2016, 1, 1), date(2017, 8, 31)))
        );
    }

    #[test]
    fn no_dates_and_defaults_mean_no_predicates() {
        let state = FilterArgs::default().to_state(None);
        assert_eq!(state, FilterState::default());
    }

    #[test]
    fn blank_multiselect_values_are_ignored() {
        let args = FilterArgs {
            deposit: vec![" ".into(), "No Deposit".into()],
            customer: vec!["".into()],
            ..FilterArgs::default()
        };
        let state = args.to_state(None);
        assert_eq!(state.deposit, Selection::only(["No Deposit"]));
        assert!(state.customer.is_any());
    }

    #[test]
    fn cli_parses_shared_filter_flags() {
        let cli = Cli::try_parse_from([
            "hotel-insights",
            "chart",
            "waiting-list",
            "-i",
            "bookings.csv",
            "--deposit",
            "No Deposit,Refundable",
            "--hotel",
            "City",
        ])
        .expect("parse");
        let Commands::Chart(args) = cli.command else {
            panic!("expected chart command");
        };
        assert_eq!(args.chart, ChartId::WaitingList);
        assert_eq!(args.filters.deposit, vec!["No Deposit", "Refundable"]);
        assert_eq!(args.filters.hotel, "City");
    }

    #[test]
    fn locale_flag_is_global() {
        let cli = Cli::try_parse_from([
            "hotel-insights",
            "overview",
            "-i",
            "bookings.csv",
            "--locale",
            "vi",
        ])
        .expect("parse");
        assert_eq!(cli.locale, Some(Locale::Vi));
        assert!(Cli::try_parse_from(["hotel-insights", "--locale", "fr", "options"]).is_err());
    }

    #[test]
    fn delimiter_parser_accepts_names() {
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert_eq!(parse_delimiter(";"), Ok(b';'));
        assert!(parse_delimiter("ab").is_err());
    }
}
