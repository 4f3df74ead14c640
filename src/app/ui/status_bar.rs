use chrono::Utc;
use eframe::egui;

use crate::app::app_core::TrajectoryApp;
use crate::utils::format_timestamp;

pub fn render_status_bar(app: &mut TrajectoryApp, ctx: &egui::Context) {
    let reading = app.handle.latest();
    let paused = app.handle.is_paused();

    egui::TopBottomPanel::top("status_bar")
        .min_height(40.0)
        .show(ctx, |ui| {
            ui.add_space(5.0);
            ui.horizontal(|ui| {
                ui.label("Link:");

                let (link_text, link_color) = if reading.status.connected {
                    ("Connected", egui::Color32::from_rgb(0, 150, 0)) // 绿色
                } else {
                    ("Disconnected", egui::Color32::from_rgb(150, 0, 0)) // 红色
                };
                ui.colored_label(link_color, link_text);

                ui.separator();

                let (state_text, state_color) = if paused {
                    ("Paused", egui::Color32::from_rgb(255, 165, 0)) // 橙色
                } else {
                    ("Tracking", egui::Color32::from_rgb(0, 150, 0))
                };
                ui.colored_label(state_color, state_text);

                // 暂停/恢复按钮
                let pause_button_text = if paused { "▶ Resume" } else { "⏸ Pause" };
                if ui.button(pause_button_text).clicked() {
                    app.handle.toggle_pause();
                }

                if ui.button("⟲ Reset").clicked() {
                    app.handle.reset();
                }

                ui.separator();

                match reading.status.last_update {
                    Some(at) => {
                        let age = reading.status.seconds_since_update(Utc::now()).unwrap_or(0.0);
                        ui.label(format!("Last frame: {} ({:.1}s ago)", format_timestamp(at), age));
                    }
                    None => {
                        ui.label("waiting for data...");
                    }
                }

                ui.separator();
                ui.label(format!("Points: {}", app.handle.trajectory_len()));
            });
            ui.add_space(5.0);
        });
}

pub fn render_bottom_status_bar(app: &mut TrajectoryApp, ctx: &egui::Context) {
    let reading = app.handle.latest();
    let stats = app.handle.stats();

    egui::TopBottomPanel::bottom("bottom_status_bar")
        .min_height(25.0)
        .show(ctx, |ui| {
            ui.add_space(3.0);
            ui.horizontal(|ui| {
                if let Some(sample) = reading.sample {
                    ui.monospace(format!(
                        "ACC {:7.3} {:7.3} {:7.3}  GYRO {:7.3} {:7.3} {:7.3}  t={}ms",
                        sample.accel.x, sample.accel.y, sample.accel.z,
                        sample.gyro.x, sample.gyro.y, sample.gyro.z,
                        sample.time
                    ));
                    ui.separator();
                }

                // 右侧：统计信息
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(format!(
                        "processed {} | skipped {} | overwritten {}",
                        stats.processed, stats.skipped, stats.overwritten
                    ));
                });
            });
            ui.add_space(3.0);
        });
}
