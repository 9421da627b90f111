fn main() {
    if let Err(err) = trip_sessions::app::run() {
        eprintln!("sessions screen failed: {err}");
        std::process::exit(1);
    }
}
