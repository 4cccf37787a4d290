//! Check collector reachability and deliver one canned report
//!
//! Run with: cargo run --bin report_check

use rangetest_node::config::Config;
use rangetest_node::report::Reporter;
use rangetest_node::telemetry::TelemetryRecord;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_target(false)
        .init();

    let config = Config::load("config.toml")?;

    let reporter = Reporter::connect(&config.report).await?;
    if !reporter.link_up() {
        anyhow::bail!("Collector at {} is not reachable", config.report.url);
    }

    // Deliver a recognizable test record
    let record = TelemetryRecord {
        sequence: 0,
        device_rssi: -113,
        device_snr: -7,
        spreading_factor: 12,
        frequency_hz: 868_100_000,
        gateway_rssi: 0,
        battery_volts: config.device.battery_volts,
    };

    let outcome = reporter.report(&record).await?;
    println!("Collector answered: {:?}", outcome);

    Ok(())
}
