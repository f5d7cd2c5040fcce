//! Sensor Interchange - Example publisher and consumer
//!
//! This binary demonstrates how to use the interchange library to:
//! - Publish direction frames and heatmaps to a stream
//! - Follow a stream with a consumer and its cursor
//! - Encode metropolis records

use anyhow::{Context, Result};
use sensor_interchange::prelude::*;
use sensor_interchange::BackendKind;
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn example_detections(step: i64) -> Vec<Detection> {
    (0..3)
        .map(|i| {
            Detection::new(
                i.to_string(),
                Point3D::planar(10 * i + step, 20 * i),
                Point3D::planar(1, 0),
            )
        })
        .collect()
}

/// Run in publisher mode - send example frames and a heatmap
fn run_publisher(config: &InterchangeConfig, store: &LogStore) -> Result<()> {
    info!("Starting publisher example");

    let mut publisher = DirectionPublisher::new(store.clone(), &config.streams.direction)
        .with_resolution(config.publish.width, config.publish.height)
        .with_bound(config.publish.bound);
    if let Some(camera_id) = &config.publish.camera_id {
        publisher = publisher.with_camera_id(camera_id);
    }

    for step in 0..5 {
        if publisher.send(example_detections(step)) {
            info!("Sent frame {} to {}", step, publisher.stream());
        } else {
            error!("Failed to send frame {}", step);
        }
    }

    let heatmaps =
        HeatmapPublisher::new(store.clone(), &config.streams.heatmap).with_bound(config.publish.bound);
    let heatmap = Heatmap::new(vec![
        Blob::new(Point2D::new(1, 2), 0.5, 20.0),
        Blob::new(Point2D::new(3, 4), 0.45, 10.0),
    ]);
    if !heatmaps.send(&heatmap) {
        error!("Failed to send heatmap");
    }

    info!("Publisher finished");
    Ok(())
}

/// Run in consumer mode - follow the direction stream
fn run_consumer(config: &InterchangeConfig, store: &LogStore, limit: Option<usize>) -> Result<()> {
    info!("Starting consumer example");

    let consumer: DirectionConsumer = FrameConsumer::new(store.clone(), &config.streams.direction)
        .with_read_timeout(config.read_timeout());
    let mut cursor = consumer.latest_cursor();
    let mut received = 0;

    loop {
        let (frame, next) = consumer.next_after(cursor);
        cursor = next;

        match frame {
            Some(frame) => {
                received += 1;
                info!(
                    "Frame {} from {} with {} detections (cursor {})",
                    frame.id,
                    frame.cameraid,
                    frame.detections.len(),
                    cursor
                );
            }
            None => info!("No frame within {:?}", config.read_timeout()),
        }

        if limit.is_some_and(|limit| received >= limit) {
            break;
        }
    }

    info!("Consumer finished after {} frames", received);
    Ok(())
}

/// Run in metropolis mode - encode a few records
fn run_metropolis(config: &InterchangeConfig, store: &LogStore) -> Result<()> {
    info!("Starting metropolis example");

    let mut encoder = MetropolisEncoder::new(config.publish.sensor_id, config.publish.image_size)
        .with_sink(store.clone(), &config.streams.metropolis)
        .with_bound(config.publish.bound);

    let json = encoder
        .encode(&["person", "forklift"], &[(10, 20, 110, 220), (300, 40, 500, 260)])
        .context("Failed to encode metropolis record")?;
    info!("Encoded {}", json);

    // Mismatched input is reported to the caller, never written
    if let Err(e) = encoder.encode(&["person"], &[]) {
        warn!("Rejected record: {}", e);
    }

    Ok(())
}

/// Run in both mode - consumer thread following a publisher
fn run_both(config: &InterchangeConfig, store: &LogStore) -> Result<()> {
    info!("Starting full interchange example");

    // The consumer's blocking reads must not hold the publisher's connection
    let consumer_config = config.clone();
    let consumer_store = store.reopen().context("Failed to open consumer connection")?;
    let consumer_handle = thread::spawn(move || {
        if let Err(e) = run_consumer(&consumer_config, &consumer_store, Some(5)) {
            error!("Consumer error: {}", e);
        }
    });

    // Give the consumer time to pin its cursor
    thread::sleep(Duration::from_millis(500));

    run_publisher(config, store)?;
    run_metropolis(config, store)?;

    consumer_handle
        .join()
        .map_err(|_| anyhow::anyhow!("Consumer thread panicked"))?;

    Ok(())
}

fn print_usage() {
    println!("Usage: interchange [publish|consume|metropolis|both]");
    println!();
    println!("Modes:");
    println!("  publish    - Send example frames and a heatmap");
    println!("  consume    - Follow the direction stream until interrupted");
    println!("  metropolis - Encode example metropolis records");
    println!("  both       - Consumer thread plus publisher (default)");
    println!();
    println!("Environment variables:");
    println!("  INTERCHANGE__STORE__BACKEND      - redis or memory (default: redis)");
    println!("  INTERCHANGE__STORE__HOST         - Store host (default: localhost)");
    println!("  INTERCHANGE__STORE__PORT         - Store port (default: 6379)");
    println!("  INTERCHANGE__STREAMS__DIRECTION  - Direction stream (default: detection)");
    println!("  INTERCHANGE__STREAMS__HEATMAP    - Heatmap stream (default: heatmap)");
    println!("  INTERCHANGE__STREAMS__METROPOLIS - Metropolis stream (default: metropolis)");
    println!("  INTERCHANGE__PUBLISH__CAMERA_ID  - Camera id stamped on frames");
}

fn main() -> Result<()> {
    // Initialize tracing; RUST_LOG overrides the default level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Sensor Interchange Example");
    info!("==========================");

    let args: Vec<String> = std::env::args().collect();
    let mode = args.get(1).map(|s| s.as_str()).unwrap_or("both");

    if !matches!(mode, "publish" | "consume" | "metropolis" | "both") {
        print_usage();
        return Ok(());
    }

    let config = InterchangeConfig::load().context("Failed to load configuration")?;
    info!(
        "Store: {} ({}:{})",
        config.store.backend.as_str(),
        config.store.host,
        config.store.port
    );
    if config.store.backend == BackendKind::Memory && mode != "both" {
        warn!("In-memory store is private to this process");
    }

    let store = LogStore::connect(&config.store).context("Failed to connect to store")?;

    match mode {
        "publish" => run_publisher(&config, &store)?,
        "consume" => run_consumer(&config, &store, None)?,
        "metropolis" => run_metropolis(&config, &store)?,
        _ => run_both(&config, &store)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_modes_over_memory_store() {
        let mut config = InterchangeConfig::default();
        config.store.backend = BackendKind::Memory;
        config.publish.read_timeout_ms = 100;

        let store = LogStore::connect(&config.store).unwrap();
        assert!(run_publisher(&config, &store).is_ok());
        assert!(run_metropolis(&config, &store).is_ok());
        assert!(run_consumer(&config, &store, Some(0)).is_ok());
    }
}
