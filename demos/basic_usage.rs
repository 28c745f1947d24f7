//! Basic queue logger usage example
//!
//! Loggers push snapshots onto the process-wide queue; the listener writes
//! them to stderr as JSON lines on its own thread.
//!
//! Run with: cargo run --example basic_usage

use rust_queue_logger::prelude::*;
use rust_queue_logger::{info, warn};
use std::sync::Arc;

fn main() -> Result<()> {
    println!("=== Rust Queue Logger - Basic Usage Example ===\n");

    let root = get_logger("root");
    root.set_level(LogLevel::DEBUG);
    root.add_handler(Arc::new(QueueHandler::new()));

    let listener = QueueListener::instance();
    listener.start()?;

    println!("1. Logging at different levels:");
    let logger = get_logger("demo.basic");
    logger.trace("This is a trace message (below DEBUG, hidden)");
    logger.debug("This is a debug message");
    logger.info("This is an info message");
    logger.warn("This is a warning message");
    logger.error("This is an error message");
    logger.critical("This is a critical message");

    println!("\n2. Macros record the calling function:");
    let port = 8080;
    info!(logger, "Server listening on port {}", port);
    warn!(logger, "Retry attempt {} of {}", 3, 5);

    println!("\n3. Extra fields and error traces:");
    logger
        .event(LogLevel::INFO)
        .field("user_id", 42)
        .field("roles", vec!["admin", "ops"])
        .message("User logged in");

    let err = std::io::Error::new(std::io::ErrorKind::NotFound, "config.toml missing");
    logger.exception(&err, "Startup check failed");

    println!("\n4. Child loggers inherit the level:");
    let child = get_logger("demo.basic.child");
    child.debug(format!("effective level is {}", child.effective_level()));

    listener.stop()?;
    println!("\n=== Example completed successfully! ===");

    Ok(())
}
