//! Daemon entry point: wire the pipeline, transports, control channel,
//! and HTTP surface together, then run until interrupted.

mod api;
mod apps;
mod config;
mod control;
mod runtime;
mod transport;

use std::path::Path;
use std::sync::atomic::AtomicU8;
use std::sync::Arc;

use log::{debug, info, warn};
use visor_engine::Pipeline;

use crate::api::{ApiState, AppInfo};
use crate::config::{parse_transport_uri, Config};
use crate::transport::{Driver, UdpTransport, WsHub, DEFAULT_BRIGHTNESS};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "visor.toml".to_string());
    let config = Config::load(Path::new(&config_path))?;
    debug!(
        "extras: reactive_face.default_preset={} video_player.max_fps={} video_player.default_video={:?}",
        config.reactive_face.default_preset,
        config.video_player.max_fps,
        config.video_player.default_video
    );

    let brightness = Arc::new(AtomicU8::new(DEFAULT_BRIGHTNESS));

    // Static app registry; listing metadata is captured before the apps
    // move into the pipeline.
    let app_list = apps::registry();
    let infos: Vec<AppInfo> = app_list
        .iter()
        .map(|a| AppInfo {
            name: a.name().to_string(),
            events: a.events(),
            queries: a.queries(),
        })
        .collect();

    let mut pipeline = Pipeline::new(app_list, config.led_strip.led_number);
    let registry = Arc::new(pipeline.apps.build_event_registry());

    let (udp, udp_socket) = if config.system.transport.is_empty() {
        (None, None)
    } else {
        let (host, port) = parse_transport_uri(&config.system.transport)?;
        let udp = UdpTransport::connect(&host, port).await?;
        let socket = udp.socket();
        (Some(udp), Some(socket))
    };
    let ws = config
        .system
        .ws_enabled
        .then(|| WsHub::new(Arc::clone(&brightness)));
    if udp.is_none() && ws.is_none() {
        return Err(
            "no transport configured: set system.transport or enable system.ws_enabled".into(),
        );
    }

    let (ctrl_tx, ctrl_rx) = control::channel();

    let receiver_task = udp_socket
        .map(|socket| transport::spawn_receiver(socket, ctrl_tx.clone(), Arc::clone(&brightness)));

    if let Err(e) = pipeline.activate_app(&config.system.startup_app, false) {
        warn!("startup app not activated: {e}");
    }

    let driver = Driver::new(udp, ws.clone(), Arc::clone(&brightness));
    let loop_task = tokio::spawn(runtime::run(
        pipeline,
        driver,
        ctrl_rx,
        config.system.target_fps,
    ));

    let state = ApiState {
        ctrl: ctrl_tx,
        registry,
        apps: Arc::new(infos),
        brightness,
        ws,
    };
    let listener = tokio::net::TcpListener::bind(&config.system.http_listen).await?;
    info!("http control plane listening on {}", config.system.http_listen);
    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    loop_task.abort();
    if let Some(task) = receiver_task {
        task.abort();
    }
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown requested");
}
