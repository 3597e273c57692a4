// src/main.rs - snake-host: gait controller entry point
use clap::Parser;
use serpent_rs::config::{ActuatorKind, TransportKind};
use serpent_rs::hardware::{Actuator, LogActuator, SerialServoBus};
use serpent_rs::transport::{self, serial::SerialLink, tcp::serve_tcp};
use serpent_rs::{Snake, SnakeError, load_config, run_control_loop, web};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

#[derive(Parser, Debug)]
#[command(name = "snake-host", version, about = "Servo gait controller for a segmented snake robot")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "snake.toml")]
    config: String,

    /// Override the control transport from the config file
    #[arg(short, long, value_enum)]
    transport: Option<TransportKind>,

    /// Log verbosity (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: tracing::Level,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .init();

    tracing::info!("Starting snake-host {}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Loading configuration from: {}", cli.config);

    let mut config = load_config(&cli.config).map_err(|e| {
        tracing::error!("Failed to load config from '{}': {}", cli.config, e);
        Box::new(SnakeError::from(e)) as Box<dyn std::error::Error + Send + Sync + 'static>
    })?;
    if let Some(kind) = cli.transport {
        config.transport.kind = kind;
    }

    tracing::info!(
        "Gait: {} segments, center {}°, ±{}°, tick {} ms",
        config.gait.segments,
        config.gait.center,
        config.gait.angle_limit,
        config.gait.tick_ms
    );

    let actuator: Box<dyn Actuator> = match config.actuator.kind {
        ActuatorKind::Log => Box::new(LogActuator),
        ActuatorKind::Serial => Box::new(
            SerialServoBus::open(&config.actuator.serial, config.actuator.baud).map_err(|e| {
                tracing::error!("Failed to open servo bus {}: {}", config.actuator.serial, e);
                SnakeError::Actuator(e)
            })?,
        ),
    };

    let (requests, receiver) = transport::control_channel(16);

    // Transport setup failures are fatal; later faults only end that task.
    let transport_task = match config.transport.kind {
        TransportKind::Serial => {
            let link = SerialLink::open(&config.transport.serial, config.transport.baud)
                .map_err(SnakeError::from)?;
            tokio::spawn(async move { link.run(requests).await })
        }
        TransportKind::Tcp => {
            let listener = TcpListener::bind(&config.transport.bind).await?;
            tokio::spawn(serve_tcp(listener, requests))
        }
        TransportKind::Http => {
            let listener = TcpListener::bind(&config.transport.bind).await?;
            let router = web::create_router(requests);
            tokio::spawn(web::serve_http(listener, router))
        }
    };
    tokio::spawn(async move {
        match transport_task.await {
            Ok(Ok(())) => tracing::info!("Transport finished"),
            Ok(Err(e)) => tracing::error!("Transport failed: {}", e),
            Err(e) => tracing::error!("Transport task panicked: {}", e),
        }
    });

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received");
        }
        let _ = shutdown_tx.send(());
    });

    let snake = Snake::new(&config);
    let snake = run_control_loop(snake, receiver, actuator, shutdown_rx).await;
    tracing::info!("Stopped after {} messages", snake.msg_count());

    Ok(())
}
