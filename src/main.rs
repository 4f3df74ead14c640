mod app;
mod buffer;
mod config;
mod consumer;
mod decoder;
mod estimator;
mod logger;
mod plotter;
mod trajectory;
mod transport;
mod types;
mod utils;

use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use eframe::egui;
use log::{error, info};

use app::TrajectoryApp;
use buffer::IngestionBuffer;
use config::{AppConfig, ConfigManager};
use consumer::Consumer;
use estimator::DeadReckoner;
use trajectory::TrajectorySink;
use transport::{run_transport, TransportContext};
use types::StatusCell;

const CONFIG_ENV: &str = "SENSETRAIL_CONFIG";

fn native_options(config: &AppConfig) -> eframe::NativeOptions {
    let window = &config.window;
    let hardware_acceleration = if window.hardware_acceleration {
        eframe::HardwareAcceleration::Preferred // 硬件加速优先模式
    } else {
        eframe::HardwareAcceleration::Off
    };

    eframe::NativeOptions {
        vsync: window.vsync,
        hardware_acceleration,
        renderer: eframe::Renderer::Glow, // 使用Glow渲染器获得更好性能
        viewport: egui::ViewportBuilder::default()
            .with_title(window.title.clone())
            .with_inner_size([window.width, window.height])
            .with_resizable(window.resizable),
        ..Default::default()
    }
}

fn main() {
    logger::init_logger();
    info!("Application starting");

    let config_path = env::var(CONFIG_ENV).unwrap_or_else(|_| "config.toml".into());
    let manager = ConfigManager::load_or_default(&config_path);
    let config = manager.get_config().clone();

    let buffer = Arc::new(IngestionBuffer::new(config.consumer.buffer_capacity));
    let status = StatusCell::new();
    let shutdown_signal = Arc::new(AtomicBool::new(false));

    let estimator = DeadReckoner::new(config.estimator.clone(), TrajectorySink::new());
    let (consumer, handle) = Consumer::new(&config.consumer, estimator, Arc::clone(&buffer), status.clone());
    let consumer_thread = match consumer.spawn(config.consumer.tick_interval()) {
        Ok(join) => join,
        Err(e) => {
            error!("Failed to start consumer thread: {}", e);
            std::process::exit(1);
        }
    };

    let transport_ctx = TransportContext {
        buffer: Arc::clone(&buffer),
        status,
        shutdown: Arc::clone(&shutdown_signal),
    };
    let transport_config = config.clone();
    let transport_thread = thread::Builder::new()
        .name("transport".into())
        .spawn(move || {
            if let Err(e) = run_transport(&transport_config, transport_ctx) {
                error!("Transport thread failed: {}", e);
            }
        });
    let transport_thread = match transport_thread {
        Ok(join) => Some(join),
        Err(e) => {
            // 没有数据源也可以查看界面
            error!("Failed to start transport thread: {}", e);
            None
        }
    };

    let ui_handle = handle.clone();
    let ui_config = config.clone();
    if let Err(e) = eframe::run_native(
        &config.window.title,
        native_options(&config),
        Box::new(|_cc| Ok(Box::new(TrajectoryApp::new(ui_handle, ui_config)))),
    ) {
        error!("GUI failed: {}", e);
    }

    // GUI 关闭后，通知后台线程退出
    info!("GUI closed, signaling background threads to shutdown");
    shutdown_signal.store(true, Ordering::Relaxed);
    handle.shutdown();

    if consumer_thread.join().is_err() {
        error!("Consumer thread panicked");
    }
    if let Some(join) = transport_thread {
        match join.join() {
            Ok(()) => info!("Transport thread shut down gracefully"),
            Err(e) => error!("Transport thread panicked: {:?}", e),
        }
    }
}
