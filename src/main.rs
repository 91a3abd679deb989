//! Binary entry point: set up file logging, then hand the terminal to the
//! browser UI until the user quits. Databases are opened from inside the UI.
use sqlite_browser::config::AppConfig;
use sqlite_browser::logging::init_logging;
use sqlite_browser::{run_app, App};

fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env();
    // Logging is best-effort; the browser works without it.
    let _guard = match init_logging(&config) {
        Ok(guard) => Some(guard),
        Err(err) => {
            eprintln!("logging disabled: {err:#}");
            None
        }
    };

    let mut app = App::new();
    run_app(&mut app)
}
