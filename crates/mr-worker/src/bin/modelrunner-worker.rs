//! `modelrunner-worker`: the worker node daemon.
//!
//! Loads config for a single bound model, connects to the broker, wires a
//! [`WorkerHandler`] into a [`Dispatcher`] consuming the model's queue and
//! this worker's control channels, and runs until `ctrl_c`, at which point
//! it publishes the two shutdown commands and waits for both dispatcher
//! loops to exit.

use anyhow::Context;
use mr_broker::Broker;
use mr_dispatch::Dispatcher;
use mr_proto::Command;
use mr_worker::{WorkerConfig, WorkerHandler};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = WorkerConfig::load().context("loading worker config")?;
    let broker = Broker::connect(&config.redis_url, config.prefix.clone())
        .await
        .context("connecting to broker")?;

    let handler = WorkerHandler::new(broker.clone(), config.clone());
    let queue_name = handler.work_queue_name().to_string();
    let channel_names = handler.control_channel_names();
    let own_channel = channel_names[0].clone();

    let dispatcher = Dispatcher::new(broker.clone(), queue_name.clone(), channel_names, handler);
    let handles = dispatcher.run();

    tracing::info!(worker_url = %config.worker_url, model = %config.model, "modelrunner-worker started");

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
    tracing::info!("modelrunner-worker shut down cleanly");
    Ok(())
}
