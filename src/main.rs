fn main() {
    if let Err(err) = hotel_insights::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
