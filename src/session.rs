use std::io::{BufRead, Write};

use anyhow::{Context, Result, anyhow, bail};
use clap::ValueEnum;
use log::{debug, info};

use crate::{
    cli::parse_date,
    dashboard::{ChartId, DashboardView, FilterOptions, compute_chart, compute_metrics},
    filter::{Category, DateRange, FilterState, Selection},
    io_utils::CsvSource,
    loader::DatasetCache,
    table,
};

const HELP: &str = "\
commands:
  from YYYY-MM-DD | to YYYY-MM-DD | dates clear
  hotel <name|both>
  deposit|customer|channel|segment add <v1,v2,..> | set <v1,..> | clear
  filters | options | reset | reload
  show overview | show dashboard | show <chart-id>
  help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Continue(String),
    Quit,
}

pub struct Session {
    cache: DatasetCache,
    source: CsvSource,
    filters: FilterState,
}

impl Session {
    pub fn new(cache: DatasetCache, source: CsvSource) -> Self {
        Self {
            cache,
            source,
            filters: FilterState::default(),
        }
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn run<R, W>(&mut self, input: R, mut output: W) -> Result<()>
    where
        R: BufRead,
        W: Write,
    {
        // Load eagerly so a bad file fails before the first prompt.
        let dataset = self.cache.load(&self.source)?;
        info!(
            "Session started on {:?} ({} booking(s))",
            self.source.path,
            dataset.len()
        );
        for line in input.lines() {
            let line = line.context("Reading session input")?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            match self.handle(trimmed) {
                Ok(Step::Continue(text)) => {
                    if !text.is_empty() {
                        writeln!(output, "{}", text.trim_end())?;
                    }
                }
                Ok(Step::Quit) => break,
                Err(err) => writeln!(output, "error: {err:#}")?,
            }
            output.flush()?;
        }
        Ok(())
    }

    pub fn handle(&mut self, line: &str) -> Result<Step> {
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };
        debug!("Session command '{command}' args '{rest}'");
        let text = match command.to_ascii_lowercase().as_str() {
            "quit" | "exit" => return Ok(Step::Quit),
            "help" => HELP.to_string(),
            "from" | "to" => {
                self.set_date_end(command.eq_ignore_ascii_case("from"), rest)?;
                self.filters.to_string()
            }
            "dates" if rest.eq_ignore_ascii_case("clear") => {
                self.filters.date_range = None;
                self.filters.to_string()
            }
            "hotel" => {
                self.filters.hotel = Selection::from_hotel_choice(rest);
                self.filters.to_string()
            }
            "filters" => self.filters.to_string(),
            "reset" => {
                self.filters = FilterState::default();
                self.filters.to_string()
            }
            "reload" => {
                self.cache.invalidate(&self.source.path);
                let dataset = self.cache.load(&self.source)?;
                format!("reloaded {} booking(s)", dataset.len())
            }
            "options" => {
                let dataset = self.cache.load(&self.source)?;
                render_options(&FilterOptions::from_dataset(&dataset))
            }
            "show" => self.show(rest)?,
            other => match other.parse::<Category>() {
                Ok(category) => {
                    self.update_category(category, rest)?;
                    self.filters.to_string()
                }
                Err(_) => bail!("Unknown command '{other}'. Type 'help' for a list."),
            },
        };
        Ok(Step::Continue(text))
    }

    fn set_date_end(&mut self, start: bool, value: &str) -> Result<()> {
        let date = parse_date(value).map_err(|err| anyhow!(err))?;
        let dataset = self.cache.load(&self.source)?;
        let current = self
            .filters
            .date_range
            .or(dataset.date_bounds())
            .unwrap_or(DateRange::new(date, date));
        self.filters.date_range = Some(if start {
            DateRange::new(date, current.end)
        } else {
            DateRange::new(current.start, date)
        });
        Ok(())
    }

    fn update_category(&mut self, category: Category, rest: &str) -> Result<()> {
        let (action, values) = match rest.split_once(char::is_whitespace) {
            Some((action, values)) => (action, values),
            None => (rest, ""),
        };
        let values = values
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .collect::<Vec<_>>();
        let selection = self.filters.selection_mut(category);
        match action.to_ascii_lowercase().as_str() {
            "clear" => *selection = Selection::any(),
            "set" => *selection = Selection::from_multiselect(values),
            "add" if values.is_empty() => {
                bail!("'{} add' needs at least one value", category.column())
            }
            "add" => selection.extend(values),
            other => bail!("Unknown action '{other}' for {}", category.column()),
        }
        Ok(())
    }

    fn show(&mut self, what: &str) -> Result<String> {
        let dataset = self.cache.load(&self.source)?;
        match what.to_ascii_lowercase().as_str() {
            "" | "overview" => {
                let (base, hotel) = compute_metrics(&dataset, &self.filters);
                Ok(format!(
                    "{}\n{}",
                    table::render_metrics("Overview", &base),
                    table::render_metrics("Selected hotel type", &hotel)
                ))
            }
            "dashboard" => Ok(table::render_dashboard(&DashboardView::compute(
                &dataset,
                &self.filters,
            ))),
            other => {
                let id = <ChartId as ValueEnum>::from_str(other, true).map_err(|_| {
                    anyhow!("Unknown chart '{other}'. Try 'show dashboard' for the full list.")
                })?;
                Ok(table::render_chart(&compute_chart(&dataset, &self.filters, id)))
            }
        }
    }
}

pub fn render_options(options: &FilterOptions) -> String {
    let mut rows = vec![vec![
        "date_range".to_string(),
        options
            .date_range
            .map(|range| range.to_string())
            .unwrap_or_else(|| "(no valid dates)".to_string()),
    ]];
    rows.push(vec!["hotel_type".to_string(), options.hotels.join(", ")]);
    for category in Category::ALL {
        rows.push(vec![
            category.column().to_string(),
            options.values(category).join(", "),
        ]);
    }
    table::render_table(&["filter".to_string(), "values".to_string()], &rows)
}
