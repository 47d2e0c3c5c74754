use std::{cmp::Ordering, collections::BTreeMap, fmt, str::FromStr};

use anyhow::{Result, anyhow};
use itertools::Itertools;
use serde::Serialize;

use crate::{labels::waiting_list_rank, record::Booking};

/// A typed grouping key. Ordering puts numbers before text and the
/// `Unspecified` sentinel last.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum Key {
    Int(i64),
    Text(String),
    Unspecified,
}

impl Key {
    pub fn text(value: &str) -> Self {
        Key::Text(value.to_string())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Key::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(value) => write!(f, "{value}"),
            Key::Text(value) => write!(f, "{value}"),
            Key::Unspecified => write!(f, "unspecified"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    HotelType,
    ArrivalYear,
    ArrivalMonth,
    IsCanceled,
    CancellationStatus,
    DepositType,
    CustomerType,
    DistributionChannel,
    MarketSegment,
    CountryGroup,
    RepeatedGuest,
    PreviousCancellations,
    PreviousNotCanceled,
    WaitingList,
    TotalStays,
    RoomAssignment,
    Company,
    Agent,
}

impl Dimension {
    pub const ALL: [Dimension; 18] = [
        Dimension::HotelType,
        Dimension::ArrivalYear,
        Dimension::ArrivalMonth,
        Dimension::IsCanceled,
        Dimension::CancellationStatus,
        Dimension::DepositType,
        Dimension::CustomerType,
        Dimension::DistributionChannel,
        Dimension::MarketSegment,
        Dimension::CountryGroup,
        Dimension::RepeatedGuest,
        Dimension::PreviousCancellations,
        Dimension::PreviousNotCanceled,
        Dimension::WaitingList,
        Dimension::TotalStays,
        Dimension::RoomAssignment,
        Dimension::Company,
        Dimension::Agent,
    ];

    /// Column name of the derived field this dimension reads.
    pub fn column(&self) -> &'static str {
        match self {
            Dimension::HotelType => "hotel_type",
            Dimension::ArrivalYear => "arrival_date_year",
            Dimension::ArrivalMonth => "arrival_date_month",
            Dimension::IsCanceled => "is_canceled",
            Dimension::CancellationStatus => "is_canceled_label",
            Dimension::DepositType => "deposit_type",
            Dimension::CustomerType => "customer_type",
            Dimension::DistributionChannel => "distribution_channel",
            Dimension::MarketSegment => "market_segment",
            Dimension::CountryGroup => "country_group",
            Dimension::RepeatedGuest => "is_repeated_guest_label",
            Dimension::PreviousCancellations => "previous_cancellations_label",
            Dimension::PreviousNotCanceled => "previous_not_canceled_label",
            Dimension::WaitingList => "days_in_waiting_list_group",
            Dimension::TotalStays => "total_stays",
            Dimension::RoomAssignment => "is_different_room_label",
            Dimension::Company => "has_company_label",
            Dimension::Agent => "has_agent_label",
        }
    }

    pub fn key(&self, booking: &Booking) -> Key {
        match self {
            Dimension::HotelType => Key::text(&booking.hotel_type),
            Dimension::ArrivalYear => Key::Int(booking.arrival_date_year.into()),
            Dimension::ArrivalMonth => booking
                .arrival_month_number
                .map_or(Key::Unspecified, |month| Key::Int(month.into())),
            Dimension::IsCanceled => Key::Int(booking.is_canceled.into()),
            Dimension::CancellationStatus => Key::text(&booking.is_canceled_label),
            Dimension::DepositType => Key::text(&booking.deposit_type),
            Dimension::CustomerType => Key::text(&booking.customer_type),
            Dimension::DistributionChannel => Key::text(&booking.distribution_channel),
            Dimension::MarketSegment => Key::text(&booking.market_segment),
            Dimension::CountryGroup => Key::text(&booking.country_group),
            Dimension::RepeatedGuest => Key::text(&booking.is_repeated_guest_label),
            Dimension::PreviousCancellations => Key::text(&booking.previous_cancellations_label),
            Dimension::PreviousNotCanceled => Key::text(&booking.previous_not_canceled_label),
            Dimension::WaitingList => Key::text(&booking.days_in_waiting_list_group),
            Dimension::TotalStays => Key::Int(booking.total_stays.into()),
            Dimension::RoomAssignment => Key::text(&booking.is_different_room_label),
            Dimension::Company => Key::text(&booking.has_company_label),
            Dimension::Agent => Key::text(&booking.has_agent_label),
        }
    }

    fn keys(dimensions: &[Dimension], booking: &Booking) -> Vec<Key> {
        dimensions.iter().map(|dim| dim.key(booking)).collect()
    }
}

impl FromStr for Dimension {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        let wanted = value.trim();
        Dimension::ALL
            .iter()
            .copied()
            .find(|dim| dim.column() == wanted)
            .ok_or_else(|| {
                anyhow!(
                    "Unknown dimension '{wanted}'. Expected one of: {}",
                    Dimension::ALL.iter().map(Dimension::column).join(", ")
                )
            })
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Numeric booking fields that can be summed or summarised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericField {
    TotalGuests,
    Adr,
    LeadTime,
    TotalStays,
}

impl NumericField {
    pub fn value_of(&self, booking: &Booking) -> f64 {
        match self {
            NumericField::TotalGuests => booking.total_guests.into(),
            NumericField::Adr => booking.adr,
            NumericField::LeadTime => booking.lead_time.into(),
            NumericField::TotalStays => booking.total_stays.into(),
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            NumericField::TotalGuests => "total_guests",
            NumericField::Adr => "adr",
            NumericField::LeadTime => "lead_time",
            NumericField::TotalStays => "total_stays",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "field")]
pub enum Measure {
    Count,
    /// Share of the row's count within its outer group (the first
    /// `outer` dimensions).
    Ratio { outer: usize },
    Sum(NumericField),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub keys: Vec<Key>,
    pub count: usize,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryTable {
    pub dimensions: Vec<Dimension>,
    pub measure: Measure,
    pub rows: Vec<SummaryRow>,
}

impl SummaryTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn position(&self, dimension: Dimension) -> Option<usize> {
        self.dimensions.iter().position(|dim| *dim == dimension)
    }

    /// Keeps only rows whose key for `dimension` equals `key`.
    pub fn retain_key(&mut self, dimension: Dimension, key: &Key) {
        if let Some(position) = self.position(dimension) {
            self.rows.retain(|row| &row.keys[position] == key);
        }
    }

    /// Re-orders rows key by key, with `dimension`'s key compared by `rank`
    /// first. Keys without a rank sort after all ranked keys, in key order.
    pub fn order_by_rank<F>(&mut self, dimension: Dimension, rank: F)
    where
        F: Fn(&Key) -> Option<u8>,
    {
        let Some(position) = self.position(dimension) else {
            return;
        };
        self.rows.sort_by(|a, b| {
            a.keys
                .iter()
                .zip(&b.keys)
                .enumerate()
                .map(|(idx, (left, right))| {
                    if idx == position {
                        let rank_left = rank(left).unwrap_or(u8::MAX);
                        let rank_right = rank(right).unwrap_or(u8::MAX);
                        rank_left.cmp(&rank_right).then_with(|| left.cmp(right))
                    } else {
                        left.cmp(right)
                    }
                })
                .find(|ordering| ordering.is_ne())
                .unwrap_or(Ordering::Equal)
        });
    }

    pub fn header(&self) -> Vec<String> {
        let mut header = self
            .dimensions
            .iter()
            .map(|dim| dim.column().to_string())
            .collect::<Vec<_>>();
        header.push("count".to_string());
        match self.measure {
            Measure::Count => {}
            Measure::Ratio { .. } => header.push("ratio".to_string()),
            Measure::Sum(field) => header.push(format!("sum_{}", field.column())),
        }
        header
    }

    pub fn render_rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                let mut cells = row.keys.iter().map(Key::to_string).collect::<Vec<_>>();
                cells.push(row.count.to_string());
                match self.measure {
                    Measure::Count => {}
                    Measure::Ratio { .. } => cells.push(format!("{:.4}", row.value)),
                    Measure::Sum(_) => cells.push(format_number(row.value)),
                }
                cells
            })
            .collect()
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

fn group_counts(rows: &[&Booking], dimensions: &[Dimension]) -> BTreeMap<Vec<Key>, usize> {
    let mut counts = BTreeMap::new();
    for booking in rows {
        *counts.entry(Dimension::keys(dimensions, booking)).or_insert(0) += 1;
    }
    counts
}

/// Row count per observed key combination, sorted by key.
pub fn count_by(rows: &[&Booking], dimensions: &[Dimension]) -> SummaryTable {
    let rows = group_counts(rows, dimensions)
        .into_iter()
        .map(|(keys, count)| SummaryRow {
            keys,
            count,
            value: count as f64,
        })
        .collect();
    SummaryTable {
        dimensions: dimensions.to_vec(),
        measure: Measure::Count,
        rows,
    }
}

/// Count per `outer ++ inner` combination, normalised by the outer group's
/// total so each outer group's ratios sum to one. Outer groups with a zero
/// total are omitted.
pub fn ratio_by(rows: &[&Booking], outer: &[Dimension], inner: &[Dimension]) -> SummaryTable {
    let dimensions = outer.iter().chain(inner).copied().collect::<Vec<_>>();
    let counts = group_counts(rows, &dimensions);

    let mut totals: BTreeMap<&[Key], usize> = BTreeMap::new();
    for (keys, count) in &counts {
        *totals.entry(&keys[..outer.len()]).or_insert(0) += count;
    }

    let rows = counts
        .iter()
        .filter_map(|(keys, count)| {
            let total = *totals.get(&keys[..outer.len()])?;
            (total > 0).then(|| SummaryRow {
                keys: keys.clone(),
                count: *count,
                value: *count as f64 / total as f64,
            })
        })
        .collect();

    SummaryTable {
        dimensions,
        measure: Measure::Ratio { outer: outer.len() },
        rows,
    }
}

/// Sum of a numeric field per observed key combination.
pub fn sum_by(rows: &[&Booking], dimensions: &[Dimension], field: NumericField) -> SummaryTable {
    let mut sums: BTreeMap<Vec<Key>, (usize, f64)> = BTreeMap::new();
    for booking in rows {
        let entry = sums
            .entry(Dimension::keys(dimensions, booking))
            .or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += field.value_of(booking);
    }
    SummaryTable {
        dimensions: dimensions.to_vec(),
        measure: Measure::Sum(field),
        rows: sums
            .into_iter()
            .map(|(keys, (count, value))| SummaryRow { keys, count, value })
            .collect(),
    }
}

/// Count summary ordered by the fixed waiting-list bucket ranks rather than
/// alphabetically.
pub fn count_by_waiting_list(rows: &[&Booking], extra: &[Dimension]) -> SummaryTable {
    let dimensions = std::iter::once(Dimension::WaitingList)
        .chain(extra.iter().copied())
        .collect::<Vec<_>>();
    let mut table = count_by(rows, &dimensions);
    table.order_by_rank(Dimension::WaitingList, |key| {
        key.as_str().and_then(waiting_list_rank)
    });
    table
}

/// Headline numbers shown above the charts. Means over zero rows are `None`
/// and render as "no data".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub bookings: usize,
    pub cancellation_rate: Option<f64>,
    pub total_guests: u64,
    pub mean_adr: Option<f64>,
}

impl Metrics {
    pub fn compute(rows: &[&Booking]) -> Self {
        let bookings = rows.len();
        let canceled = rows.iter().filter(|b| b.is_canceled).count();
        let total_guests = rows.iter().map(|b| u64::from(b.total_guests)).sum();
        let (adr_sum, adr_count) = rows
            .iter()
            .map(|b| b.adr)
            .filter(|adr| adr.is_finite())
            .fold((0.0, 0usize), |(sum, count), adr| (sum + adr, count + 1));
        Self {
            bookings,
            cancellation_rate: (bookings > 0).then(|| canceled as f64 / bookings as f64),
            total_guests,
            mean_adr: (adr_count > 0).then(|| adr_sum / adr_count as f64),
        }
    }

    /// `(label, value)` pairs as displayed: rate as a percentage and ADR
    /// rounded to two decimals.
    pub fn cards(&self) -> Vec<(&'static str, String)> {
        vec![
            ("bookings", self.bookings.to_string()),
            (
                "cancellation rate (%)",
                display_or_no_data(self.cancellation_rate.map(|rate| rate * 100.0)),
            ),
            ("guests", self.total_guests.to_string()),
            ("mean adr", display_or_no_data(self.mean_adr)),
        ]
    }
}

pub const NO_DATA: &str = "no data";

pub fn display_or_no_data(value: Option<f64>) -> String {
    value.map_or_else(|| NO_DATA.to_string(), |v| format!("{v:.2}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        labels::LabelSet,
        record::{CountryGroups, tests::raw},
    };

    fn booking(hotel: &str, canceled: bool, month: &str, waiting: &str) -> Booking {
        let mut row = raw("PRT");
        row.hotel_type = hotel.into();
        row.is_canceled = canceled;
        row.arrival_date_month = month.into();
        row.days_in_waiting_list_group = waiting.into();
        Booking::derive(&row, &LabelSet::default(), &CountryGroups::default()).0
    }

    #[test]
    fn count_by_does_not_zero_fill() {
        let data = vec![
            booking("City", true, "January", "no_wait"),
            booking("City", false, "January", "no_wait"),
            booking("Resort", false, "February", "no_wait"),
        ];
        let view = data.iter().collect::<Vec<_>>();
        let table = count_by(&view, &[Dimension::HotelType, Dimension::CancellationStatus]);
        assert_eq!(table.len(), 3);
        assert!(
            !table
                .rows
                .iter()
                .any(|row| row.keys == vec![Key::text("Resort"), Key::text("Canceled")])
        );
    }

    #[test]
    fn ratio_by_normalises_within_outer_group() {
        let data = vec![
            booking("City", true, "January", "no_wait"),
            booking("City", false, "January", "no_wait"),
            booking("City", false, "January", "no_wait"),
            booking("City", false, "January", "no_wait"),
            booking("Resort", true, "January", "no_wait"),
        ];
        let view = data.iter().collect::<Vec<_>>();
        let mut table = ratio_by(
            &view,
            &[Dimension::ArrivalMonth, Dimension::HotelType],
            &[Dimension::IsCanceled],
        );
        table.retain_key(Dimension::IsCanceled, &Key::Int(1));
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0].keys, vec![Key::Int(1), Key::text("City"), Key::Int(1)]);
        assert!((table.rows[0].value - 0.25).abs() < 1e-12);
        assert!((table.rows[1].value - 1.0).abs() < 1e-12);
    }

    #[test]
    fn ratio_by_over_no_rows_is_empty() {
        let table = ratio_by(&[], &[Dimension::DepositType], &[Dimension::CustomerType]);
        assert!(table.is_empty());
    }

    #[test]
    fn waiting_list_buckets_follow_fixed_rank() {
        let data = vec![
            booking("City", true, "January", "long"),
            booking("City", true, "January", "no_wait"),
            booking("City", true, "January", "short"),
        ];
        let view = data.iter().collect::<Vec<_>>();
        let table = count_by_waiting_list(&view, &[Dimension::CancellationStatus]);
        let order = table
            .rows
            .iter()
            .map(|row| row.keys[0].to_string())
            .collect::<Vec<_>>();
        assert_eq!(order, vec!["no_wait", "short", "long"]);
    }

    #[test]
    fn unranked_buckets_sort_last() {
        let data = vec![
            booking("City", true, "January", "eternal"),
            booking("City", true, "January", "very_long"),
            booking("City", true, "January", "medium"),
        ];
        let view = data.iter().collect::<Vec<_>>();
        let table = count_by_waiting_list(&view, &[]);
        let order = table
            .rows
            .iter()
            .map(|row| row.keys[0].to_string())
            .collect::<Vec<_>>();
        assert_eq!(order, vec!["medium", "very_long", "eternal"]);
    }

    #[test]
    fn unknown_month_groups_under_unspecified_key_last() {
        let data = vec![
            booking("City", true, "Nope", "no_wait"),
            booking("City", true, "December", "no_wait"),
        ];
        let view = data.iter().collect::<Vec<_>>();
        let table = count_by(&view, &[Dimension::ArrivalMonth]);
        assert_eq!(table.rows[0].keys, vec![Key::Int(12)]);
        assert_eq!(table.rows[1].keys, vec![Key::Unspecified]);
    }

    #[test]
    fn sum_by_adds_guests() {
        let data = vec![
            booking("City", true, "January", "no_wait"),
            booking("City", false, "January", "no_wait"),
            booking("Resort", false, "January", "no_wait"),
        ];
        let view = data.iter().collect::<Vec<_>>();
        let table = sum_by(&view, &[Dimension::HotelType], NumericField::TotalGuests);
        assert_eq!(table.rows[0].value, 4.0);
        assert_eq!(table.rows[0].count, 2);
        assert_eq!(table.rows[1].value, 2.0);
    }

    #[test]
    fn metrics_over_no_rows_report_no_data() {
        let metrics = Metrics::compute(&[]);
        assert_eq!(metrics.bookings, 0);
        assert_eq!(metrics.cancellation_rate, None);
        assert_eq!(metrics.mean_adr, None);
        let cards = metrics.cards();
        assert_eq!(cards[1].1, NO_DATA);
        assert_eq!(cards[3].1, NO_DATA);
    }

    #[test]
    fn metrics_compute_rate_and_means() {
        let data = vec![
            booking("City", true, "January", "no_wait"),
            booking("City", false, "January", "no_wait"),
        ];
        let view = data.iter().collect::<Vec<_>>();
        let metrics = Metrics::compute(&view);
        assert_eq!(metrics.cancellation_rate, Some(0.5));
        assert_eq!(metrics.total_guests, 4);
        assert_eq!(metrics.cards()[1].1, "50.00");
        assert_eq!(metrics.cards()[3].1, "98.50");
    }

    #[test]
    fn mean_adr_skips_non_finite_values() {
        let mut data = vec![
            booking("City", true, "January", "no_wait"),
            booking("City", false, "January", "no_wait"),
            booking("Resort", false, "January", "no_wait"),
        ];
        data[0].adr = 100.0;
        data[1].adr = f64::NAN;
        data[2].adr = 50.0;
        let view = data.iter().collect::<Vec<_>>();
        let metrics = Metrics::compute(&view);
        assert_eq!(metrics.bookings, 3);
        assert_eq!(metrics.mean_adr, Some(75.0));

        data[0].adr = f64::NAN;
        data[2].adr = f64::INFINITY;
        let view = data.iter().collect::<Vec<_>>();
        assert_eq!(Metrics::compute(&view).mean_adr, None);
    }

    #[test]
    fn ranked_dimension_in_second_position_keeps_leading_groups() {
        let data = vec![
            booking("Resort", true, "January", "long"),
            booking("City", true, "January", "long"),
            booking("City", true, "January", "short"),
            booking("Resort", true, "January", "no_wait"),
        ];
        let view = data.iter().collect::<Vec<_>>();
        let mut table = count_by(&view, &[Dimension::HotelType, Dimension::WaitingList]);
        table.order_by_rank(Dimension::WaitingList, |key| {
            key.as_str().and_then(waiting_list_rank)
        });
        let order = table
            .rows
            .iter()
            .map(|row| format!("{}/{}", row.keys[0], row.keys[1]))
            .collect::<Vec<_>>();
        assert_eq!(
            order,
            vec!["City/short", "City/long", "Resort/no_wait", "Resort/long"]
        );
    }

    #[test]
    fn dimensions_parse_from_column_names() {
        for dim in Dimension::ALL {
            assert_eq!(dim.column().parse::<Dimension>().unwrap(), dim);
        }
        assert!("nope".parse::<Dimension>().is_err());
    }
}
