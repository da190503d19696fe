use std::{future::ready, sync::Arc, time::Duration};

use axum::{routing::get, Router};
use common_kafka::kafka_consumer::SingleTopicConsumer;
use feedback_consumer::{
    app_context::AppContext,
    config::Config,
    consumer::Worker,
    server::{serve, setup_metrics_routes},
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

fn setup_tracing() {
    let log_layer: tracing_subscriber::filter::Filtered<
        tracing_subscriber::fmt::Layer<tracing_subscriber::Registry>,
        EnvFilter,
        tracing_subscriber::Registry,
    > = tracing_subscriber::fmt::layer().with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(log_layer).init();
}

pub async fn index() -> &'static str {
    "feedback consumer service"
}

fn start_health_liveness_server(config: &Config, context: Arc<AppContext>) -> JoinHandle<()> {
    let config = config.clone();
    let router = Router::new()
        .route("/", get(index))
        .route("/_readiness", get(index))
        .route(
            "/_liveness",
            get(move || ready(context.liveness.get_status())),
        );
    let router = setup_metrics_routes(router);
    let bind = format!("{}:{}", config.host, config.port);
    tokio::task::spawn(async move {
        serve(router, &bind)
            .await
            .expect("failed to start serving metrics");
    })
}

async fn shutdown_signal() {
    let mut term =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to register SIGTERM handler");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = term.recv() => {},
    }
}

#[tokio::main]
async fn main() {
    setup_tracing();
    info!("Starting up...");

    let config = Config::init_with_defaults().expect("failed to load configuration");
    let context = Arc::new(AppContext::new());

    start_health_liveness_server(&config, context.clone());

    let shutdown = CancellationToken::new();
    let liveness_deadline = Duration::from_secs(config.worker_liveness_deadline_seconds);

    let mut workers = Vec::with_capacity(config.worker_count);
    for i in 0..config.worker_count {
        let consumer = SingleTopicConsumer::new(config.kafka.clone(), config.consumer.clone())
            .expect("failed to create kafka consumer");

        let worker = Worker {
            consumer,
            sink: context.sink.clone(),
            liveness: context.liveness.register(format!("worker-{i}"), liveness_deadline),
            comment_length_limit: config.comment_length_limit,
            shutdown: shutdown.clone(),
        };

        workers.push(tokio::spawn(async move {
            if let Err(e) = worker.run().await {
                error!("worker {} exited: {}", i, e);
            }
        }));
    }

    info!(
        workers = config.worker_count,
        "Consuming from topic {}", config.consumer.kafka_consumer_topic
    );

    shutdown_signal().await;
    info!("Shutting down, waiting for in-flight messages to finish...");
    shutdown.cancel();

    futures::future::join_all(workers).await;
    info!("All workers stopped");
}
