use std::time::Duration;
use eframe::{egui, Frame};
use log::info;

use crate::config::AppConfig;
use crate::consumer::ConsumerHandle;
use crate::plotter::TrajectoryPlot;

pub struct TrajectoryApp {
    // 管道视图
    pub handle: ConsumerHandle,

    pub config: AppConfig,

    pub plot: TrajectoryPlot,
}

impl TrajectoryApp {
    pub fn new(handle: ConsumerHandle, config: AppConfig) -> Self {
        let plot = TrajectoryPlot::new(config.estimator.axis_limit);

        info!("应用启动，等待数据到达...");

        Self { handle, config, plot }
    }

    fn handle_keyboard_input(&mut self, ctx: &egui::Context) {
        let (toggle, reset) = ctx.input(|i| (i.key_pressed(egui::Key::Space), i.key_pressed(egui::Key::R)));

        if toggle {
            self.handle.toggle_pause();
        }
        if reset {
            self.handle.reset();
        }
    }
}

impl eframe::App for TrajectoryApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        // 设置明亮模式主题
        ctx.set_visuals(egui::Visuals::light());

        // 渲染UI组件
        crate::app::ui::render_status_bar(self, ctx);
        crate::app::ui::render_bottom_status_bar(self, ctx);
        crate::app::ui::render_main_panel(self, ctx);

        // 处理键盘输入
        self.handle_keyboard_input(ctx);

        ctx.request_repaint_after(Duration::from_millis(self.config.plot.refresh_ms));
    }
}
