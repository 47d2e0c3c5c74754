use std::{collections::BTreeSet, fmt, str::FromStr};

use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::record::Booking;

/// Hotel selector value meaning "no hotel filter".
pub const BOTH_HOTELS: &str = "both";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Rows without a valid arrival date never fall inside a range.
    pub fn contains(&self, date: Option<NaiveDate>) -> bool {
        date.is_some_and(|d| self.start <= d && d <= self.end)
    }

    pub fn intersect(&self, other: &DateRange) -> DateRange {
        DateRange {
            start: self.start.max(other.start),
            end: self.end.min(other.end),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} .. {}", self.start, self.end)
    }
}

/// `None` passes every row; an empty set passes none.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection(Option<BTreeSet<String>>);

impl Selection {
    pub fn any() -> Self {
        Self(None)
    }

    /// Exactly these values; an empty iterator matches nothing.
    pub fn only<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(Some(values.into_iter().map(Into::into).collect()))
    }

    /// Widget semantics: nothing picked means no filter.
    pub fn from_multiselect<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let picked = Self::only(values);
        if picked.values().is_some_and(BTreeSet::is_empty) {
            Self::any()
        } else {
            picked
        }
    }

    pub fn from_hotel_choice(choice: &str) -> Self {
        let trimmed = choice.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(BOTH_HOTELS) {
            Self::any()
        } else {
            Self::only([trimmed])
        }
    }

    pub fn is_any(&self) -> bool {
        self.0.is_none()
    }

    pub fn values(&self) -> Option<&BTreeSet<String>> {
        self.0.as_ref()
    }

    pub fn matches(&self, value: &str) -> bool {
        match &self.0 {
            None => true,
            Some(set) => set.contains(value),
        }
    }

    pub fn intersect(&self, other: &Selection) -> Selection {
        match (&self.0, &other.0) {
            (None, _) => other.clone(),
            (_, None) => self.clone(),
            (Some(left), Some(right)) => Self(Some(left.intersection(right).cloned().collect())),
        }
    }

    /// Adds values to the selection, turning "any" into an explicit set.
    pub fn extend<I, S>(&mut self, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0
            .get_or_insert_with(BTreeSet::new)
            .extend(values.into_iter().map(Into::into));
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            None => write!(f, "(any)"),
            Some(set) if set.is_empty() => write!(f, "(none)"),
            Some(set) => write!(
                f,
                "{}",
                set.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
            ),
        }
    }
}

/// The four multi-select filter categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Deposit,
    Customer,
    Channel,
    Segment,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Deposit,
        Category::Customer,
        Category::Channel,
        Category::Segment,
    ];

    pub fn value_of<'a>(&self, booking: &'a Booking) -> &'a str {
        match self {
            Category::Deposit => &booking.deposit_type,
            Category::Customer => &booking.customer_type,
            Category::Channel => &booking.distribution_channel,
            Category::Segment => &booking.market_segment,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            Category::Deposit => "deposit_type",
            Category::Customer => "customer_type",
            Category::Channel => "distribution_channel",
            Category::Segment => "market_segment",
        }
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "deposit" | "deposit_type" => Ok(Category::Deposit),
            "customer" | "customer_type" => Ok(Category::Customer),
            "channel" | "distribution_channel" => Ok(Category::Channel),
            "segment" | "market_segment" => Ok(Category::Segment),
            other => Err(anyhow!("Unknown filter category '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    pub date_range: Option<DateRange>,
    pub hotel: Selection,
    pub deposit: Selection,
    pub customer: Selection,
    pub channel: Selection,
    pub segment: Selection,
}

impl FilterState {
    pub fn selection(&self, category: Category) -> &Selection {
        match category {
            Category::Deposit => &self.deposit,
            Category::Customer => &self.customer,
            Category::Channel => &self.channel,
            Category::Segment => &self.segment,
        }
    }

    pub fn selection_mut(&mut self, category: Category) -> &mut Selection {
        match category {
            Category::Deposit => &mut self.deposit,
            Category::Customer => &mut self.customer,
            Category::Channel => &mut self.channel,
            Category::Segment => &mut self.segment,
        }
    }

    pub fn matches(&self, booking: &Booking) -> bool {
        if let Some(range) = &self.date_range
            && !range.contains(booking.arrival_date)
        {
            return false;
        }
        self.hotel.matches(&booking.hotel_type)
            && Category::ALL
                .iter()
                .all(|category| self.selection(*category).matches(category.value_of(booking)))
    }

    /// Rows passing every active predicate, in input order.
    pub fn apply<'a, I>(&self, rows: I) -> Vec<&'a Booking>
    where
        I: IntoIterator<Item = &'a Booking>,
    {
        rows.into_iter().filter(|b| self.matches(b)).collect()
    }

    /// Conjunction of two predicate sets.
    pub fn and(&self, other: &FilterState) -> FilterState {
        let date_range = match (&self.date_range, &other.date_range) {
            (Some(left), Some(right)) => Some(left.intersect(right)),
            (left, right) => (*left).or(*right),
        };
        FilterState {
            date_range,
            hotel: self.hotel.intersect(&other.hotel),
            deposit: self.deposit.intersect(&other.deposit),
            customer: self.customer.intersect(&other.customer),
            channel: self.channel.intersect(&other.channel),
            segment: self.segment.intersect(&other.segment),
        }
    }

    /// Only the date predicate.
    pub fn date_scope(&self) -> FilterState {
        FilterState {
            date_range: self.date_range,
            ..FilterState::default()
        }
    }

    /// Date and hotel predicates.
    pub fn hotel_scope(&self) -> FilterState {
        FilterState {
            date_range: self.date_range,
            hotel: self.hotel.clone(),
            ..FilterState::default()
        }
    }

    /// Date and the four multi-select predicates.
    pub fn segment_scope(&self) -> FilterState {
        FilterState {
            hotel: Selection::any(),
            ..self.clone()
        }
    }

    pub fn with_default_dates(&self, default: Option<DateRange>) -> FilterState {
        FilterState {
            date_range: self.date_range.or(default),
            ..self.clone()
        }
    }
}

impl fmt::Display for FilterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.date_range {
            Some(range) => writeln!(f, "dates:    {range}")?,
            None => writeln!(f, "dates:    (any)")?,
        }
        writeln!(f, "hotel:    {}", self.hotel)?;
        writeln!(f, "deposit:  {}", self.deposit)?;
        writeln!(f, "customer: {}", self.customer)?;
        writeln!(f, "channel:  {}", self.channel)?;
        write!(f, "segment:  {}", self.segment)
    }
}
