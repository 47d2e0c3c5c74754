#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use hotel_insights::record::{REQUIRED_COLUMNS, RawBooking};
use tempfile::{TempDir, tempdir};

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Writes a bookings file with the full header and the given data lines.
    pub fn write_bookings(&self, name: &str, lines: &[&str]) -> PathBuf {
        let mut contents = REQUIRED_COLUMNS.join(",");
        contents.push('\n');
        for line in lines {
            contents.push_str(line);
            contents.push('\n');
        }
        self.write(name, &contents)
    }
}

/// A canceled City booking arriving 2016-03-14 from `country`.
pub fn raw_booking(country: &str) -> RawBooking {
    RawBooking {
        hotel_type: "City".into(),
        is_canceled: true,
        lead_time: 34,
        arrival_date_year: 2016,
        arrival_date_month: "March".into(),
        arrival_date_day_of_month: 14,
        deposit_type: "No Deposit".into(),
        customer_type: "Transient".into(),
        distribution_channel: "TA/TO".into(),
        market_segment: "Online TA".into(),
        country: country.into(),
        total_guests: 2.0,
        adr: 98.5,
        is_repeated_guest: false,
        previous_cancellations_group: "0".into(),
        previous_bookings_not_canceled_group: "0".into(),
        days_in_waiting_list_group: "no_wait".into(),
        reserved_room_type: "A".into(),
        assigned_room_type: "A".into(),
        total_stays: 3,
        has_company: false,
        has_agent: true,
    }
}

/// Data line matching `raw_booking`'s layout with the main variable fields.
pub fn booking_line(hotel: &str, canceled: u8, month: &str, day: u32, country: &str) -> String {
    format!(
        "{hotel},{canceled},10,2016,{month},{day},No Deposit,Transient,TA/TO,Online TA,{country},2,100,0,0,0,no_wait,A,A,2,0,1"
    )
}
