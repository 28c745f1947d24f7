//! Custom encoder example
//!
//! Values without a native JSON form are rendered by encoders registered
//! for their exact type; anything else falls back to its `Debug` text.
//!
//! Run with: cargo run --example custom_encoder

use rust_queue_logger::prelude::*;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug)]
struct Money {
    cents: i64,
    currency: &'static str,
}

#[derive(Debug)]
struct Coordinates(f64, f64);

fn main() -> Result<()> {
    register_encoder(|m: &Money| {
        json!(format!("{}.{:02} {}", m.cents / 100, m.cents % 100, m.currency))
    });

    let logger = get_logger("demo.billing");
    logger.set_level(LogLevel::INFO);
    logger.add_handler(Arc::new(QueueHandler::new()));

    let listener = QueueListener::get_or_init(|| {
        QueueListener::builder().stream(StreamTarget::Stdout)
    });
    listener.start()?;

    logger
        .event(LogLevel::INFO)
        .field("amount", FieldValue::opaque(Money { cents: 1999, currency: "EUR" }))
        .field("shipped_to", FieldValue::opaque(Coordinates(52.52, 13.40)))
        .field("when", chrono::Utc::now())
        .message("invoice issued");

    listener.stop()?;
    Ok(())
}
