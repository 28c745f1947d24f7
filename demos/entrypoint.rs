//! Entry-point example
//!
//! Applies a JSON logging configuration, starts the listener, runs the
//! application and stops the listener on the way out, even on error.
//!
//! Run with: cargo run --example entrypoint

use rust_queue_logger::prelude::*;
use serde_json::json;

fn app() -> std::result::Result<u32, String> {
    let logger = get_logger("demo.app");
    logger.info("Application starting");

    let processed = (1..=5)
        .inspect(|i| {
            logger
                .event(LogLevel::DEBUG)
                .field("item", *i)
                .message("processing item")
        })
        .count() as u32;

    get_logger("demo.app.audit").warn(format!("{} items processed", processed));
    Ok(processed)
}

fn main() -> Result<()> {
    let config = LoggingConfig::from_value(json!({
        "version": 1,
        "handlers": {
            "queue": { "class": "queue", "level": "DEBUG" }
        },
        "loggers": {
            "demo.app": { "level": "DEBUG", "handlers": ["queue"], "propagate": false }
        },
        "root": { "level": "WARNING", "handlers": ["queue"] }
    }))?;

    // The provider runs when the entry point resolves its configuration
    let source = ConfigSource::provider(move || ConfigSource::Static(config.clone()));

    match entrypoint(source, app)? {
        Ok(count) => println!("processed {} items", count),
        Err(e) => println!("application failed: {}", e),
    }
    Ok(())
}
