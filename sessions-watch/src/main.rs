fn main() {
    if let Err(err) = trip_sessions::app::run_watch() {
        eprintln!("sessions watch failed: {err}");
        std::process::exit(1);
    }
}
