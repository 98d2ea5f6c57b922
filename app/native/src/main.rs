//! Wallstore command-line entry point.

fn main() {
    wallstore_lib::init_tracing();

    if let Err(err) = wallstore_lib::cli::run() {
        eprintln!("wallstore: {err}");
        std::process::exit(1);
    }
}
