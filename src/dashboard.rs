//! The full dashboard pipeline: `(dataset, filter state) → summaries`.
//!
//! [`DashboardView::compute`] is pure. It resolves the default date range,
//! derives the three working views the page uses (date only, date + hotel,
//! date + segment filters), and computes every chart's summary from the
//! appropriate view. Nothing is cached between calls.

use std::collections::BTreeSet;

use clap::ValueEnum;
use log::debug;
use serde::Serialize;

use crate::{
    aggregate::{
        Dimension, Key, Metrics, NumericField, SummaryTable, count_by, count_by_waiting_list,
        ratio_by, sum_by,
    },
    filter::{BOTH_HOTELS, Category, DateRange, FilterState},
    loader::Dataset,
    record::Booking,
    stats::{DistributionTable, distribution_by},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ChartId {
    MonthlyBookings,
    AdrByStatus,
    GuestShareByHotel,
    MonthlyCancelRate,
    BookingsByHotel,
    BookingsByDeposit,
    BookingsByCustomer,
    BookingsByChannel,
    MarketSegmentShare,
    SegmentTreemap,
    BookingsByCountry,
    BookingsByRepeatGuest,
    PreviousCancellations,
    PreviousNotCanceled,
    WaitingList,
    TotalStays,
    RoomAssignment,
    LeadTimeViolin,
    LeadTimeBox,
    HotelDeposit,
    CustomerWithinDeposit,
    ChannelWithinDeposit,
}

impl ChartId {
    pub fn name(&self) -> String {
        self.to_possible_value()
            .map(|value| value.get_name().to_string())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    GroupedBar,
    HorizontalBar,
    StackedBar,
    FacetedBar,
    Line,
    Pie,
    Donut,
    Treemap,
    Box,
    Violin,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChartData {
    Summary(SummaryTable),
    Distribution(DistributionTable),
}

impl ChartData {
    pub fn is_empty(&self) -> bool {
        match self {
            ChartData::Summary(table) => table.is_empty(),
            ChartData::Distribution(table) => table.is_empty(),
        }
    }

    pub fn header(&self) -> Vec<String> {
        match self {
            ChartData::Summary(table) => table.header(),
            ChartData::Distribution(table) => table.header(),
        }
    }

    pub fn render_rows(&self) -> Vec<Vec<String>> {
        match self {
            ChartData::Summary(table) => table.render_rows(),
            ChartData::Distribution(table) => table.render_rows(),
        }
    }
}

/// Everything a renderer needs for one chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub id: ChartId,
    pub title: &'static str,
    pub kind: ChartKind,
    pub x: &'static str,
    pub y: &'static str,
    pub color: Option<&'static str>,
    pub data: ChartData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub title: &'static str,
    pub metrics: Option<Metrics>,
    pub charts: Vec<ChartSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub filters: FilterState,
    pub base_rows: usize,
    pub hotel_rows: usize,
    pub segment_rows: usize,
    pub sections: Vec<Section>,
}

/// The row subsets each part of the page reads from.
struct Views<'a> {
    base: Vec<&'a Booking>,
    hotel: Vec<&'a Booking>,
    segment: Vec<&'a Booking>,
}

impl<'a> Views<'a> {
    fn build(dataset: &'a Dataset, filters: &FilterState) -> Self {
        let base = filters.date_scope().apply(dataset.bookings());
        let hotel = filters.hotel_scope().apply(base.iter().copied());
        let segment = filters.segment_scope().apply(base.iter().copied());
        Self {
            base,
            hotel,
            segment,
        }
    }
}

/// Date range defaulting to the dataset's arrival-date bounds.
pub fn resolve_filters(dataset: &Dataset, filters: &FilterState) -> FilterState {
    filters.with_default_dates(dataset.date_bounds())
}

impl DashboardView {
    pub fn compute(dataset: &Dataset, filters: &FilterState) -> Self {
        let filters = resolve_filters(dataset, filters);
        debug!("Computing dashboard with filters:\n{filters}");
        let views = Views::build(dataset, &filters);

        let sections = vec![
            Section {
                title: "Overview",
                metrics: Some(Metrics::compute(&views.base)),
                charts: charts_for(&views, &[ChartId::MonthlyBookings, ChartId::AdrByStatus]),
            },
            Section {
                title: "Hotel type and cancellations",
                metrics: Some(Metrics::compute(&views.hotel)),
                charts: charts_for(
                    &views,
                    &[
                        ChartId::GuestShareByHotel,
                        ChartId::MonthlyCancelRate,
                        ChartId::BookingsByHotel,
                    ],
                ),
            },
            Section {
                title: "Customer segments and cancellations",
                metrics: None,
                charts: charts_for(
                    &views,
                    &[
                        ChartId::BookingsByDeposit,
                        ChartId::BookingsByCustomer,
                        ChartId::BookingsByChannel,
                        ChartId::MarketSegmentShare,
                        ChartId::SegmentTreemap,
                        ChartId::BookingsByCountry,
                        ChartId::BookingsByRepeatGuest,
                    ],
                ),
            },
            Section {
                title: "Booking history and stay characteristics",
                metrics: None,
                charts: charts_for(
                    &views,
                    &[
                        ChartId::PreviousCancellations,
                        ChartId::PreviousNotCanceled,
                        ChartId::WaitingList,
                        ChartId::TotalStays,
                        ChartId::RoomAssignment,
                    ],
                ),
            },
            Section {
                title: "Lead time, deposit type and cancellations",
                metrics: None,
                charts: charts_for(
                    &views,
                    &[
                        ChartId::LeadTimeViolin,
                        ChartId::LeadTimeBox,
                        ChartId::HotelDeposit,
                        ChartId::CustomerWithinDeposit,
                        ChartId::ChannelWithinDeposit,
                    ],
                ),
            },
        ];

        Self {
            filters,
            base_rows: views.base.len(),
            hotel_rows: views.hotel.len(),
            segment_rows: views.segment.len(),
            sections,
        }
    }

    pub fn chart(&self, id: ChartId) -> Option<&ChartSpec> {
        self.sections
            .iter()
            .flat_map(|section| section.charts.iter())
            .find(|chart| chart.id == id)
    }
}

fn charts_for(views: &Views<'_>, ids: &[ChartId]) -> Vec<ChartSpec> {
    ids.iter().map(|id| build_chart(views, *id)).collect()
}

/// Computes a single chart without building the rest of the page.
pub fn compute_chart(dataset: &Dataset, filters: &FilterState, id: ChartId) -> ChartSpec {
    let filters = resolve_filters(dataset, filters);
    let views = Views::build(dataset, &filters);
    build_chart(&views, id)
}

/// Metrics for the date-only and the date + hotel views.
pub fn compute_metrics(dataset: &Dataset, filters: &FilterState) -> (Metrics, Metrics) {
    let filters = resolve_filters(dataset, filters);
    let views = Views::build(dataset, &filters);
    (Metrics::compute(&views.base), Metrics::compute(&views.hotel))
}

const STATUS: &str = "is_canceled_label";
const COUNT: &str = "count";

fn by_status(rows: &[&Booking], dimension: Dimension) -> ChartData {
    ChartData::Summary(count_by(
        rows,
        &[dimension, Dimension::CancellationStatus],
    ))
}

fn build_chart(views: &Views<'_>, id: ChartId) -> ChartSpec {
    use Dimension::*;

    let spec = |title: &'static str,
                kind: ChartKind,
                x: &'static str,
                y: &'static str,
                color: Option<&'static str>,
                data: ChartData| ChartSpec {
        id,
        title,
        kind,
        x,
        y,
        color,
        data,
    };

    match id {
        ChartId::MonthlyBookings => spec(
            "Monthly bookings",
            ChartKind::GroupedBar,
            "arrival_date_month",
            COUNT,
            Some(STATUS),
            by_status(&views.base, ArrivalMonth),
        ),
        ChartId::AdrByStatus => spec(
            "Average daily rate by cancellation status",
            ChartKind::Box,
            STATUS,
            "adr",
            Some(STATUS),
            ChartData::Distribution(distribution_by(
                &views.base,
                &[CancellationStatus],
                NumericField::Adr,
            )),
        ),
        ChartId::GuestShareByHotel => spec(
            "Guest share by hotel type",
            ChartKind::Pie,
            "hotel_type",
            "total_guests",
            None,
            ChartData::Summary(sum_by(&views.hotel, &[HotelType], NumericField::TotalGuests)),
        ),
        ChartId::MonthlyCancelRate => {
            let mut table = ratio_by(&views.hotel, &[ArrivalMonth, HotelType], &[IsCanceled]);
            table.retain_key(IsCanceled, &Key::Int(1));
            spec(
                "Monthly cancellation rate by hotel type",
                ChartKind::Line,
                "arrival_date_month",
                "ratio",
                Some("hotel_type"),
                ChartData::Summary(table),
            )
        }
        ChartId::BookingsByHotel => spec(
            "Bookings and cancellations by hotel type",
            ChartKind::HorizontalBar,
            COUNT,
            "hotel_type",
            Some(STATUS),
            by_status(&views.hotel, HotelType),
        ),
        ChartId::BookingsByDeposit => spec(
            "Booking status by deposit type",
            ChartKind::Bar,
            "deposit_type",
            COUNT,
            Some(STATUS),
            by_status(&views.base, DepositType),
        ),
        ChartId::BookingsByCustomer => spec(
            "Booking status by customer type",
            ChartKind::Bar,
            "customer_type",
            COUNT,
            Some(STATUS),
            by_status(&views.base, CustomerType),
        ),
        ChartId::BookingsByChannel => spec(
            "Booking status by distribution channel",
            ChartKind::Bar,
            "distribution_channel",
            COUNT,
            Some(STATUS),
            by_status(&views.base, DistributionChannel),
        ),
        ChartId::MarketSegmentShare => spec(
            "Market segment share",
            ChartKind::Donut,
            "market_segment",
            COUNT,
            None,
            ChartData::Summary(count_by(&views.base, &[MarketSegment])),
        ),
        ChartId::SegmentTreemap => spec(
            "Market segment by customer type and booking status",
            ChartKind::Treemap,
            "market_segment",
            COUNT,
            Some(STATUS),
            ChartData::Summary(count_by(
                &views.base,
                &[MarketSegment, CustomerType, CancellationStatus],
            )),
        ),
        ChartId::BookingsByCountry => spec(
            "Bookings by guest country",
            ChartKind::GroupedBar,
            "country_group",
            COUNT,
            Some(STATUS),
            by_status(&views.segment, CountryGroup),
        ),
        ChartId::BookingsByRepeatGuest => spec(
            "Bookings by guest history",
            ChartKind::GroupedBar,
            "is_repeated_guest_label",
            COUNT,
            Some(STATUS),
            by_status(&views.segment, RepeatedGuest),
        ),
        ChartId::PreviousCancellations => spec(
            "Bookings by previous cancellations",
            ChartKind::GroupedBar,
            "previous_cancellations_label",
            COUNT,
            Some(STATUS),
            by_status(&views.base, PreviousCancellations),
        ),
        ChartId::PreviousNotCanceled => spec(
            "Bookings by previous kept bookings",
            ChartKind::GroupedBar,
            "previous_not_canceled_label",
            COUNT,
            Some(STATUS),
            by_status(&views.base, PreviousNotCanceled),
        ),
        ChartId::WaitingList => spec(
            "Bookings by days on the waiting list",
            ChartKind::GroupedBar,
            "days_in_waiting_list_group",
            COUNT,
            Some(STATUS),
            ChartData::Summary(count_by_waiting_list(&views.base, &[CancellationStatus])),
        ),
        ChartId::TotalStays => spec(
            "Booking status by nights stayed",
            ChartKind::StackedBar,
            "total_stays",
            COUNT,
            Some(STATUS),
            by_status(&views.base, TotalStays),
        ),
        ChartId::RoomAssignment => spec(
            "Booking status by assigned room",
            ChartKind::HorizontalBar,
            COUNT,
            "is_different_room_label",
            Some(STATUS),
            by_status(&views.base, RoomAssignment),
        ),
        ChartId::LeadTimeViolin | ChartId::LeadTimeBox => spec(
            "Lead time by deposit type",
            if id == ChartId::LeadTimeViolin {
                ChartKind::Violin
            } else {
                ChartKind::Box
            },
            "deposit_type",
            "lead_time",
            Some(STATUS),
            ChartData::Distribution(distribution_by(
                &views.base,
                &[DepositType, CancellationStatus],
                NumericField::LeadTime,
            )),
        ),
        ChartId::HotelDeposit => spec(
            "Cancellations by hotel type and deposit type",
            ChartKind::FacetedBar,
            "deposit_type",
            COUNT,
            Some(STATUS),
            ChartData::Summary(count_by(
                &views.base,
                &[HotelType, DepositType, CancellationStatus],
            )),
        ),
        ChartId::CustomerWithinDeposit => spec(
            "Customer type share within each deposit type",
            ChartKind::StackedBar,
            "deposit_type",
            "ratio",
            Some("customer_type"),
            ChartData::Summary(ratio_by(&views.base, &[DepositType], &[CustomerType])),
        ),
        ChartId::ChannelWithinDeposit => spec(
            "Distribution channel share within each deposit type",
            ChartKind::StackedBar,
            "deposit_type",
            "ratio",
            Some("distribution_channel"),
            ChartData::Summary(ratio_by(&views.base, &[DepositType], &[DistributionChannel])),
        ),
    }
}

/// Choices the filter widgets offer, computed from the full dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterOptions {
    pub date_range: Option<DateRange>,
    pub hotels: Vec<String>,
    pub deposit: Vec<String>,
    pub customer: Vec<String>,
    pub channel: Vec<String>,
    pub segment: Vec<String>,
}

impl FilterOptions {
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let category = |category: Category| {
            dataset
                .bookings()
                .iter()
                .map(|booking| category.value_of(booking))
                .collect::<BTreeSet<_>>()
                .into_iter()
                .map(str::to_string)
                .collect::<Vec<_>>()
        };
        let mut hotels = dataset
            .bookings()
            .iter()
            .map(|booking| booking.hotel_type.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>();
        hotels.push(BOTH_HOTELS.to_string());
        Self {
            date_range: dataset.date_bounds(),
            hotels,
            deposit: category(Category::Deposit),
            customer: category(Category::Customer),
            channel: category(Category::Channel),
            segment: category(Category::Segment),
        }
    }

    pub fn values(&self, category: Category) -> &[String] {
        match category {
            Category::Deposit => &self.deposit,
            Category::Customer => &self.customer,
            Category::Channel => &self.channel,
            Category::Segment => &self.segment,
        }
    }
}
