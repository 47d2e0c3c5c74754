use std::borrow::Cow;
use std::fmt::Write as _;

use crate::{
    aggregate::{Metrics, NO_DATA},
    dashboard::{ChartSpec, DashboardView},
};

const MIN_WIDTH: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
}

/// Aligned columns separated by two spaces. A column whose non-empty cells
/// all parse as numbers is right-aligned; headers always sit on the left.
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let cells = rows
        .iter()
        .map(|row| row.iter().map(|cell| flatten_cell(cell)).collect::<Vec<_>>())
        .collect::<Vec<_>>();
    let layout = headers
        .iter()
        .enumerate()
        .map(|(idx, header)| {
            let column = cells.iter().filter_map(|row| row.get(idx));
            let width = column
                .clone()
                .map(|cell| cell.chars().count())
                .fold(header.chars().count().max(MIN_WIDTH), usize::max);
            let mut filled = column.filter(|cell| !cell.is_empty()).peekable();
            let align = if filled.peek().is_some() && filled.all(|cell| is_numeric(cell)) {
                Align::Right
            } else {
                Align::Left
            };
            (width, align)
        })
        .collect::<Vec<_>>();

    let mut output = String::new();
    let header_line = headers
        .iter()
        .zip(&layout)
        .map(|(header, (width, _))| pad(header, *width, Align::Left))
        .collect::<Vec<_>>();
    let _ = writeln!(output, "{}", header_line.join("  ").trim_end());
    let rule = layout
        .iter()
        .map(|(width, _)| "-".repeat(*width))
        .collect::<Vec<_>>();
    let _ = writeln!(output, "{}", rule.join("  "));
    for row in &cells {
        let line = row
            .iter()
            .zip(&layout)
            .map(|(cell, (width, align))| pad(cell, *width, *align))
            .collect::<Vec<_>>();
        let _ = writeln!(output, "{}", line.join("  ").trim_end());
    }
    output
}

pub fn render_chart(chart: &ChartSpec) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "## {} [{}]", chart.title, chart.id.name());
    if chart.data.is_empty() {
        let _ = writeln!(output, "{NO_DATA}");
    } else {
        output.push_str(&render_table(&chart.data.header(), &chart.data.render_rows()));
    }
    output
}

pub fn render_metrics(title: &str, metrics: &Metrics) -> String {
    let (headers, values): (Vec<String>, Vec<String>) = metrics
        .cards()
        .into_iter()
        .map(|(label, value)| (label.to_string(), value))
        .unzip();
    let mut output = String::new();
    let _ = writeln!(output, "## {title}");
    output.push_str(&render_table(&headers, &[values]));
    output
}

pub fn render_dashboard(view: &DashboardView) -> String {
    let mut output = String::new();
    let _ = writeln!(
        output,
        "{} booking(s) in range; {} after hotel filter; {} after segment filters",
        view.base_rows, view.hotel_rows, view.segment_rows
    );
    for section in &view.sections {
        let _ = writeln!(output, "\n# {}", section.title);
        if let Some(metrics) = &section.metrics {
            output.push_str(&render_metrics("Metrics", metrics));
        }
        for chart in &section.charts {
            output.push('\n');
            output.push_str(&render_chart(chart));
        }
    }
    output
}

fn pad(value: &str, width: usize, align: Align) -> String {
    let fill = " ".repeat(width.saturating_sub(value.chars().count()));
    match align {
        Align::Left => format!("{value}{fill}"),
        Align::Right => format!("{fill}{value}"),
    }
}

fn is_numeric(value: &str) -> bool {
    value.parse::<f64>().is_ok()
}

/// Table cells are single-line.
fn flatten_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_align_right_and_text_left() {
        let headers = vec!["hotel_type".to_string(), "count".to_string()];
        let rows = vec![
            vec!["City".to_string(), "7".to_string()],
            vec!["Resort".to_string(), "12".to_string()],
        ];
        let rendered = render_table(&headers, &rows);
        let lines = rendered.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "hotel_type  count");
        assert_eq!(lines[1], "----------  -----");
        assert_eq!(lines[2], "City            7");
        assert_eq!(lines[3], "Resort         12");
    }

    #[test]
    fn mixed_columns_stay_left_aligned() {
        let headers = vec!["arrival_date_month".to_string(), "count".to_string()];
        let rows = vec![
            vec!["12".to_string(), "3".to_string()],
            vec!["unspecified".to_string(), "1".to_string()],
        ];
        let rendered = render_table(&headers, &rows);
        let lines = rendered.lines().collect::<Vec<_>>();
        assert_eq!(lines[2], "12                      3");
        assert_eq!(lines[3], "unspecified             1");
    }

    #[test]
    fn control_characters_become_spaces() {
        let headers = vec!["note".to_string()];
        let rows = vec![vec!["a\tb\nc".to_string()]];
        let rendered = render_table(&headers, &rows);
        assert_eq!(rendered.lines().nth(2), Some("a b c"));
    }

    #[test]
    fn metrics_render_no_data_for_empty_views() {
        let rendered = render_metrics("Overview", &Metrics::compute(&[]));
        assert!(rendered.contains("no data"));
        assert!(rendered.starts_with("## Overview"));
    }
}
