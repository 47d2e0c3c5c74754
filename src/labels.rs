use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Waiting-list buckets in display order.
pub const WAITING_LIST_ORDER: [&str; 5] = ["no_wait", "short", "medium", "long", "very_long"];

/// Maps a canonical English month name to 1..=12.
pub fn month_number(name: &str) -> Option<u32> {
    let trimmed = name.trim();
    MONTH_NAMES
        .iter()
        .position(|month| *month == trimmed)
        .map(|idx| idx as u32 + 1)
}

/// Ordinal rank of a waiting-list bucket, `None` outside the fixed vocabulary.
pub fn waiting_list_rank(bucket: &str) -> Option<u8> {
    WAITING_LIST_ORDER
        .iter()
        .position(|candidate| *candidate == bucket)
        .map(|idx| idx as u8 + 1)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Vi,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LabelSet {
    pub never: String,
    pub one_to_five: String,
    pub more_than_five: String,
    pub canceled: String,
    pub not_canceled: String,
    pub with_company: String,
    pub without_company: String,
    pub with_agent: String,
    pub without_agent: String,
    pub returning_guest: String,
    pub new_guest: String,
    pub different_room: String,
    pub same_room: String,
    pub other_country: String,
    pub unspecified: String,
}

impl Default for LabelSet {
    fn default() -> Self {
        Self::for_locale(Locale::En)
    }
}

impl LabelSet {
    pub fn for_locale(locale: Locale) -> Self {
        let strings: [&str; 15] = match locale {
            Locale::En => [
                "never",
                "1 to 5 times",
                "more than 5 times",
                "Canceled",
                "Not canceled",
                "via company",
                "not via company",
                "via agent",
                "not via agent",
                "returning guest",
                "new guest",
                "different room",
                "same room",
                "Other",
                "unspecified",
            ],
            Locale::Vi => [
                "Chưa lần nào",
                "Từ 1-5 lần",
                "Trên 5 lần",
                "Hủy",
                "Không hủy",
                "Thông qua công ty",
                "Không thông qua công ty",
                "Thông qua đại lý",
                "Không thông qua đại lý",
                "Đã từng đặt phòng",
                "Chưa từng đặt phòng",
                "Khác phòng đã đặt",
                "Giống phòng đã đặt",
                "Other",
                "Không xác định",
            ],
        };
        let [
            never,
            one_to_five,
            more_than_five,
            canceled,
            not_canceled,
            with_company,
            without_company,
            with_agent,
            without_agent,
            returning_guest,
            new_guest,
            different_room,
            same_room,
            other_country,
            unspecified,
        ] = strings.map(str::to_string);
        Self {
            never,
            one_to_five,
            more_than_five,
            canceled,
            not_canceled,
            with_company,
            without_company,
            with_agent,
            without_agent,
            returning_guest,
            new_guest,
            different_room,
            same_room,
            other_country,
            unspecified,
        }
    }

    /// Label for a previous-booking bucket code (`0`, `1-5`, `>5`).
    pub fn previous_bookings(&self, code: &str) -> Option<&str> {
        match code.trim() {
            "0" => Some(&self.never),
            "1-5" => Some(&self.one_to_five),
            ">5" => Some(&self.more_than_five),
            _ => None,
        }
    }

    pub fn canceled(&self, flag: bool) -> &str {
        if flag { &self.canceled } else { &self.not_canceled }
    }

    pub fn company(&self, flag: bool) -> &str {
        if flag {
            &self.with_company
        } else {
            &self.without_company
        }
    }

    pub fn agent(&self, flag: bool) -> &str {
        if flag { &self.with_agent } else { &self.without_agent }
    }

    pub fn repeated_guest(&self, flag: bool) -> &str {
        if flag {
            &self.returning_guest
        } else {
            &self.new_guest
        }
    }

    pub fn room(&self, different: bool) -> &str {
        if different {
            &self.different_room
        } else {
            &self.same_room
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_lookup_accepts_only_canonical_names() {
        assert_eq!(month_number("January"), Some(1));
        assert_eq!(month_number(" December "), Some(12));
        assert_eq!(month_number("june"), None);
        assert_eq!(month_number("Sept"), None);
    }

    #[test]
    fn waiting_list_rank_is_fixed() {
        assert_eq!(waiting_list_rank("no_wait"), Some(1));
        assert_eq!(waiting_list_rank("very_long"), Some(5));
        assert_eq!(waiting_list_rank("forever"), None);
    }

    #[test]
    fn previous_bookings_mapping_has_three_codes() {
        let labels = LabelSet::default();
        assert_eq!(labels.previous_bookings("0"), Some("never"));
        assert_eq!(labels.previous_bookings("1-5"), Some("1 to 5 times"));
        assert_eq!(labels.previous_bookings(">5"), Some("more than 5 times"));
        assert_eq!(labels.previous_bookings("6-10"), None);
    }

    #[test]
    fn vietnamese_labels_cover_cancellation() {
        let labels = LabelSet::for_locale(Locale::Vi);
        assert_eq!(labels.canceled(true), "Hủy");
        assert_eq!(labels.canceled(false), "Không hủy");
    }

    #[test]
    fn vietnamese_repeat_guest_labels() {
        let labels = LabelSet::for_locale(Locale::Vi);
        assert_eq!(labels.repeated_guest(true), "Đã từng đặt phòng");
        assert_eq!(labels.repeated_guest(false), "Chưa từng đặt phòng");
    }

    #[test]
    fn partial_yaml_override_keeps_defaults() {
        let labels: LabelSet = serde_yaml::from_str("canceled: Cancelled\n").expect("parse");
        assert_eq!(labels.canceled, "Cancelled");
        assert_eq!(labels.not_canceled, "Not canceled");
    }
}
