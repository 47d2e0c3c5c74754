//! Raw and derived booking schemas.
//!
//! [`RawBooking`] mirrors the columns of the source file one-to-one and is
//! deserialized straight from each CSV row. [`Booking`] is the derived
//! record the rest of the crate works with: every raw field plus the display
//! labels, month number, composed arrival date, and country group. The
//! conversion between the two is [`Booking::derive`], a pure function of the
//! raw row, the label set, and the country groups fixed at load time.

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, de};

use crate::labels::{LabelSet, month_number};

pub const REQUIRED_COLUMNS: &[&str] = &[
    "hotel_type",
    "is_canceled",
    "lead_time",
    "arrival_date_year",
    "arrival_date_month",
    "arrival_date_day_of_month",
    "deposit_type",
    "customer_type",
    "distribution_channel",
    "market_segment",
    "country",
    "total_guests",
    "adr",
    "is_repeated_guest",
    "previous_cancellations_group",
    "previous_bookings_not_canceled_group",
    "days_in_waiting_list_group",
    "reserved_room_type",
    "assigned_room_type",
    "total_stays",
    "has_company",
    "has_agent",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBooking {
    pub hotel_type: String,
    #[serde(deserialize_with = "deserialize_flag")]
    pub is_canceled: bool,
    pub lead_time: u32,
    pub arrival_date_year: i32,
    pub arrival_date_month: String,
    pub arrival_date_day_of_month: u32,
    pub deposit_type: String,
    pub customer_type: String,
    pub distribution_channel: String,
    pub market_segment: String,
    pub country: String,
    pub total_guests: f64,
    pub adr: f64,
    #[serde(deserialize_with = "deserialize_flag")]
    pub is_repeated_guest: bool,
    pub previous_cancellations_group: String,
    pub previous_bookings_not_canceled_group: String,
    pub days_in_waiting_list_group: String,
    pub reserved_room_type: String,
    pub assigned_room_type: String,
    pub total_stays: u32,
    #[serde(deserialize_with = "deserialize_flag")]
    pub has_company: bool,
    #[serde(deserialize_with = "deserialize_flag")]
    pub has_agent: bool,
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_flag(&raw).ok_or_else(|| de::Error::custom(format!("'{raw}' is not a 0/1 flag")))
}

pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "1.0" | "true" => Some(true),
        "0" | "0.0" | "false" => Some(false),
        _ => None,
    }
}

/// Countries that keep their own group; everything else collapses into the
/// "other" label. Built once from the unfiltered population.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CountryGroups {
    threshold: usize,
    top: BTreeSet<String>,
}

impl CountryGroups {
    pub fn from_counts(counts: &HashMap<String, usize>, threshold: usize) -> Self {
        let top = counts
            .iter()
            .filter(|(_, count)| **count > threshold)
            .map(|(country, _)| country.clone())
            .collect();
        Self { threshold, top }
    }

    pub fn from_raw(rows: &[RawBooking], threshold: usize) -> Self {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for row in rows {
            *counts.entry(row.country.clone()).or_insert(0) += 1;
        }
        Self::from_counts(&counts, threshold)
    }

    pub fn group<'a>(&self, country: &'a str, other: &'a str) -> &'a str {
        if self.top.contains(country) {
            country
        } else {
            other
        }
    }

    pub fn top_countries(&self) -> impl Iterator<Item = &str> {
        self.top.iter().map(String::as_str)
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }
}

/// A raw code that had no entry in its lookup table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnmappedCode {
    pub column: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Booking {
    pub hotel_type: String,
    pub is_canceled: bool,
    pub is_canceled_label: String,
    pub lead_time: u32,
    pub arrival_date_year: i32,
    pub arrival_date_month: String,
    pub arrival_date_day_of_month: u32,
    pub arrival_month_number: Option<u32>,
    pub arrival_date: Option<NaiveDate>,
    pub deposit_type: String,
    pub customer_type: String,
    pub distribution_channel: String,
    pub market_segment: String,
    pub country: String,
    pub country_group: String,
    pub total_guests: u32,
    pub adr: f64,
    pub is_repeated_guest: bool,
    pub is_repeated_guest_label: String,
    pub previous_cancellations_group: String,
    pub previous_cancellations_label: String,
    pub previous_not_canceled_group: String,
    pub previous_not_canceled_label: String,
    pub days_in_waiting_list_group: String,
    pub reserved_room_type: String,
    pub assigned_room_type: String,
    pub is_different_room_label: String,
    pub total_stays: u32,
    pub has_company: bool,
    pub has_company_label: String,
    pub has_agent: bool,
    pub has_agent_label: String,
}

impl Booking {
    /// Derives the display record. Unmapped codes get the `unspecified`
    /// label and are reported back so the caller can warn about them.
    pub fn derive(
        raw: &RawBooking,
        labels: &LabelSet,
        countries: &CountryGroups,
    ) -> (Self, Vec<UnmappedCode>) {
        let mut unmapped = Vec::new();

        let mut previous_label = |column: &'static str, code: &str| -> String {
            match labels.previous_bookings(code) {
                Some(label) => label.to_string(),
                None => {
                    unmapped.push(UnmappedCode {
                        column,
                        value: code.to_string(),
                    });
                    labels.unspecified.clone()
                }
            }
        };
        let previous_cancellations_label = previous_label(
            "previous_cancellations_group",
            &raw.previous_cancellations_group,
        );
        let previous_not_canceled_label = previous_label(
            "previous_bookings_not_canceled_group",
            &raw.previous_bookings_not_canceled_group,
        );

        let arrival_month_number = month_number(&raw.arrival_date_month);
        if arrival_month_number.is_none() {
            unmapped.push(UnmappedCode {
                column: "arrival_date_month",
                value: raw.arrival_date_month.clone(),
            });
        }
        let arrival_date = arrival_month_number.and_then(|month| {
            NaiveDate::from_ymd_opt(raw.arrival_date_year, month, raw.arrival_date_day_of_month)
        });

        let different_room = raw.reserved_room_type != raw.assigned_room_type;

        let booking = Self {
            hotel_type: raw.hotel_type.clone(),
            is_canceled: raw.is_canceled,
            is_canceled_label: labels.canceled(raw.is_canceled).to_string(),
            lead_time: raw.lead_time,
            arrival_date_year: raw.arrival_date_year,
            arrival_date_month: raw.arrival_date_month.clone(),
            arrival_date_day_of_month: raw.arrival_date_day_of_month,
            arrival_month_number,
            arrival_date,
            deposit_type: raw.deposit_type.clone(),
            customer_type: raw.customer_type.clone(),
            distribution_channel: raw.distribution_channel.clone(),
            market_segment: raw.market_segment.clone(),
            country: raw.country.clone(),
            country_group: countries
                .group(&raw.country, &labels.other_country)
                .to_string(),
            // Truncates like an integer cast; negative or NaN become 0.
            total_guests: raw.total_guests as u32,
            adr: raw.adr,
            is_repeated_guest: raw.is_repeated_guest,
            is_repeated_guest_label: labels.repeated_guest(raw.is_repeated_guest).to_string(),
            previous_cancellations_group: raw.previous_cancellations_group.clone(),
            previous_cancellations_label,
            previous_not_canceled_group: raw.previous_bookings_not_canceled_group.clone(),
            previous_not_canceled_label,
            days_in_waiting_list_group: raw.days_in_waiting_list_group.clone(),
            reserved_room_type: raw.reserved_room_type.clone(),
            assigned_room_type: raw.assigned_room_type.clone(),
            is_different_room_label: labels.room(different_room).to_string(),
            total_stays: raw.total_stays,
            has_company: raw.has_company,
            has_company_label: labels.company(raw.has_company).to_string(),
            has_agent: raw.has_agent,
            has_agent_label: labels.agent(raw.has_agent).to_string(),
        };
        (booking, unmapped)
    }
}
