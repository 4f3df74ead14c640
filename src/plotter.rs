use egui::Color32;
use egui_plot::{Line, Plot, PlotBounds, PlotPoints, Points};

use crate::config::PlotConfig;
use crate::types::TrajectoryPoint;

/// 格式化数字为固定宽度的坐标轴标签
fn format_fixed_width_label(value: f64) -> String {
    let abs_value = value.abs();
    if abs_value >= 1000.0 {
        format!("{:-6.1e}", value)
    } else if abs_value >= 100.0 {
        format!("{:-6.0}", value)
    } else if abs_value >= 10.0 {
        format!("{:-6.1}", value)
    } else {
        format!("{:-6.2}", value)
    }
}

fn color(rgb: [u8; 3]) -> Color32 {
    Color32::from_rgb(rgb[0], rgb[1], rgb[2])
}

/// 三维轨迹的二维投影
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    /// 俯视图
    Xy,
    /// 正视图
    Xz,
    /// 侧视图
    Yz,
}

impl Projection {
    pub const ALL: [Projection; 3] = [Projection::Xy, Projection::Xz, Projection::Yz];

    pub fn title(self) -> &'static str {
        match self {
            Projection::Xy => "Top (X / Y)",
            Projection::Xz => "Front (X / Z)",
            Projection::Yz => "Side (Y / Z)",
        }
    }

    pub fn project(self, point: &TrajectoryPoint) -> [f64; 2] {
        match self {
            Projection::Xy => [point.x(), point.y()],
            Projection::Xz => [point.x(), point.z()],
            Projection::Yz => [point.y(), point.z()],
        }
    }
}

/// 以三个投影绘制轨迹末尾部分，并高亮当前位置
#[derive(Debug)]
pub struct TrajectoryPlot {
    axis_limit: f64,
}

impl TrajectoryPlot {
    pub fn new(axis_limit: f64) -> Self {
        Self { axis_limit }
    }

    pub fn ui(&self, ui: &mut egui::Ui, points: &[TrajectoryPoint], config: &PlotConfig) {
        ui.horizontal(|ui| {
            for projection in Projection::ALL {
                ui.vertical(|ui| {
                    ui.label(projection.title());
                    self.plot_projection(ui, projection, points, config);
                });
            }
        });
    }

    fn plot_projection(
        &self,
        ui: &mut egui::Ui,
        projection: Projection,
        points: &[TrajectoryPoint],
        config: &PlotConfig,
    ) {
        let limit = self.axis_limit;
        let projected: Vec<[f64; 2]> = points.iter().map(|p| projection.project(p)).collect();

        Plot::new(projection.title())
            .height(config.plot_height)
            .width(config.plot_height)
            .x_axis_formatter(|v, _| format_fixed_width_label(v.value))
            .y_axis_formatter(|v, _| format_fixed_width_label(v.value))
            .allow_drag(false)
            .allow_zoom(false)
            .allow_scroll(false)
            .show(ui, |plot_ui| {
                // 固定显示范围为限幅区间
                plot_ui.set_plot_bounds(PlotBounds::from_min_max([-limit, -limit], [limit, limit]));

                let Some(head) = projected.last().copied() else {
                    return;
                };

                plot_ui.line(
                    Line::new("trail", PlotPoints::from(projected.clone()))
                        .color(color(config.colors.trail))
                        .width(1.5),
                );
                plot_ui.points(
                    Points::new("position", PlotPoints::from(vec![head]))
                        .radius(4.0)
                        .color(color(config.colors.head)),
                );
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    #[test]
    fn test_projections() {
        let p = TrajectoryPoint::new(Vector3::new(1.0, 2.0, 3.0), 0);
        assert_eq!(Projection::Xy.project(&p), [1.0, 2.0]);
        assert_eq!(Projection::Xz.project(&p), [1.0, 3.0]);
        assert_eq!(Projection::Yz.project(&p), [2.0, 3.0]);
    }

    #[test]
    fn test_labels_are_fixed_width() {
        for value in [0.5, -3.25, 42.0, -150.0, 12345.0] {
            assert!(format_fixed_width_label(value).len() >= 6, "{}", value);
        }
        assert_eq!(format_fixed_width_label(2.5), "  2.50");
    }
}
