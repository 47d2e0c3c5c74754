mod common;

use std::io::Cursor;

use common::{TestWorkspace, booking_line, fixture_path};
use hotel_insights::{
    filter::Selection,
    io_utils::CsvSource,
    loader::{DatasetCache, LoadOptions},
    session::{Session, Step},
};

fn session_for(path: &std::path::Path) -> Session {
    let source = CsvSource::new(path, None, None).expect("source");
    Session::new(DatasetCache::new(LoadOptions::default()), source)
}

fn text(step: Step) -> String {
    match step {
        Step::Continue(text) => text,
        Step::Quit => panic!("unexpected quit"),
    }
}

#[test]
fn category_commands_update_selections() {
    let mut session = session_for(&fixture_path("bookings_sample.csv"));
    session.handle("deposit add No Deposit").expect("add");
    session.handle("deposit add Refundable").expect("add");
    assert_eq!(
        session.filters().deposit,
        Selection::only(["No Deposit", "Refundable"])
    );

    session.handle("segment set Direct, Groups").expect("set");
    assert_eq!(session.filters().segment, Selection::only(["Direct", "Groups"]));

    session.handle("deposit clear").expect("clear");
    assert!(session.filters().deposit.is_any());

    assert!(session.handle("deposit add").is_err());
    assert!(session.handle("channel toggle Direct").is_err());
}

#[test]
fn date_commands_fill_the_open_end_from_bounds() {
    let mut session = session_for(&fixture_path("bookings_sample.csv"));
    let shown = text(session.handle("from 2016-04-01").expect("from"));
    assert!(shown.contains("dates:    2016-04-01 .. 2017-07-10"), "{shown}");

    session.handle("to 2016-12-31").expect("to");
    let range = session.filters().date_range.expect("range set");
    assert_eq!(range.to_string(), "2016-04-01 .. 2016-12-31");

    assert!(session.handle("from yesterday").is_err());
    session.handle("dates clear").expect("clear");
    assert!(session.filters().date_range.is_none());
}

#[test]
fn show_renders_charts_and_rejects_unknown_ids() {
    let mut session = session_for(&fixture_path("bookings_sample.csv"));
    let chart = text(session.handle("show waiting-list").expect("chart"));
    assert!(chart.contains("[waiting-list]"));
    assert!(chart.contains("no_wait"));

    let err = session.handle("show pie-of-the-day").expect_err("unknown chart");
    assert!(err.to_string().contains("Unknown chart"));
}

#[test]
fn run_reports_errors_and_stops_at_quit() {
    let mut session = session_for(&fixture_path("bookings_sample.csv"));
    let input = Cursor::new("# comment\nhotel City\nbogus\nquit\nhotel Resort\n");
    let mut output = Vec::new();
    session.run(input, &mut output).expect("run");
    let output = String::from_utf8(output).expect("utf-8");

    assert!(output.contains("hotel:    City"));
    assert!(output.contains("error: Unknown command 'bogus'"));
    assert!(!output.contains("Resort"));
    assert_eq!(session.filters().hotel, Selection::only(["City"]));
}

#[test]
fn reload_picks_up_file_changes() {
    let workspace = TestWorkspace::new();
    let first = booking_line("City", 1, "June", 5, "PRT");
    let path = workspace.write_bookings("bookings.csv", &[first.as_str()]);
    let mut session = session_for(&path);
    assert_eq!(
        text(session.handle("reload").expect("reload")),
        "reloaded 1 booking(s)"
    );

    let second = booking_line("Resort", 0, "July", 6, "GBR");
    workspace.write_bookings("bookings.csv", &[first.as_str(), second.as_str()]);
    assert_eq!(
        text(session.handle("reload").expect("reload")),
        "reloaded 2 booking(s)"
    );
}

#[test]
fn quit_ends_the_session() {
    let mut session = session_for(&fixture_path("bookings_sample.csv"));
    assert!(matches!(session.handle("quit").expect("quit"), Step::Quit));
    assert!(matches!(session.handle("EXIT").expect("exit"), Step::Quit));
}
