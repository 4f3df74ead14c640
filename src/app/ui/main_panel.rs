use eframe::egui;
use crate::app::app_core::TrajectoryApp;

pub fn render_main_panel(app: &mut TrajectoryApp, ctx: &egui::Context) {
    egui::CentralPanel::default().show(ctx, |ui| {
        // 控制面板
        ui.horizontal(|ui| {
            ui.label("Hotkey:");
            ui.colored_label(egui::Color32::from_rgb(0, 150, 0), "SPACE");
            ui.label("Pause / resume");
            ui.colored_label(egui::Color32::from_rgb(0, 150, 0), "R");
            ui.label("Reset trajectory");

            ui.separator();
            ui.label(format!(
                "Range: ±{:.1} m | Trail: {} points",
                app.config.estimator.axis_limit, app.config.plot.trail_points
            ));
        });
        ui.add_space(10.0);

        let points = app.handle.trajectory_window(app.config.plot.trail_points);
        app.plot.ui(ui, &points, &app.config.plot);

        ui.add_space(10.0);
        render_recent_samples(app, ui);
    });
}

fn render_recent_samples(app: &TrajectoryApp, ui: &mut egui::Ui) {
    let samples = app.handle.recent_samples();

    egui::CollapsingHeader::new(format!("Recent samples ({})", samples.len()))
        .default_open(false)
        .show(ui, |ui| {
            egui::ScrollArea::vertical().max_height(160.0).show(ui, |ui| {
                egui::Grid::new("recent_samples").striped(true).show(ui, |ui| {
                    for header in ["time (ms)", "ax", "ay", "az", "gx", "gy", "gz"] {
                        ui.strong(header);
                    }
                    ui.end_row();

                    // 最新的在最上面
                    for sample in samples.iter().rev() {
                        ui.monospace(sample.time.to_string());
                        for v in sample.accel.iter().chain(sample.gyro.iter()) {
                            ui.monospace(format!("{:8.3}", v));
                        }
                        ui.end_row();
                    }
                });
            });
        });
}
