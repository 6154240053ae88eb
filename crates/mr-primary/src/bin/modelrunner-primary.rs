//! `modelrunner-primary`: the primary node daemon.
//!
//! Loads config, connects to the broker, wires a [`PrimaryHandler`] into
//! a [`Dispatcher`], and runs until `ctrl_c`/SIGTERM, at which point it
//! publishes the two shutdown commands to its own queue and channel and
//! waits for both dispatcher loops to exit.

use anyhow::Context;
use mr_broker::Broker;
use mr_dispatch::Dispatcher;
use mr_primary::{PrimaryConfig, PrimaryHandler};
use mr_proto::Command;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = PrimaryConfig::load().context("loading primary config")?;
    let broker = Broker::connect(&config.redis_url, config.prefix.clone())
        .await
        .context("connecting to broker")?;

    let handler = PrimaryHandler::new(broker.clone(), config.clone());
    let queue_name = handler.completion_queue_name().to_string();
    let channel_names = handler.control_channel_names();
    let own_channel = channel_names[0].clone();

    let dispatcher = Dispatcher::new(broker.clone(), queue_name.clone(), channel_names, handler);
    let handles = dispatcher.run();

    tracing::info!(primary_url = %config.primary_url, "modelrunner-primary started");

    tokio::signal::ctrl_c().await.context("waiting for shutdown signal")?;
    tracing::info!("shutdown signal received, stopping dispatcher loops");

    broker
        .enqueue(&queue_name, &Command::stop_processing_queue())
        .await
        .context("publishing STOP_PROCESSING_QUEUE")?;
    broker
        .publish(&own_channel, &Command::stop_processing_channels())
        .await
        .context("publishing STOP_PROCESSING_CHANNELS")?;

    handles.join().await;
    tracing::info!("modelrunner-primary shut down cleanly");
    Ok(())
}
