//! Painter-drawn charts for the dashboard tabs.

use eframe::egui::{self, Align2, Color32, FontId, Pos2, Rect, Sense, Shape, Stroke, Ui, Vec2};

use super::style;
use crate::survival::Curve;
use crate::views::HazardRatioBar;

const CHART_HEIGHT: f32 = 320.0;
const AXIS_MARGIN: f32 = 48.0;
const BAR_HEIGHT: f32 = 22.0;

/// One labelled curve of a step chart.
pub struct ChartSeries<'a> {
    pub label: &'a str,
    pub curve: &'a Curve,
    pub color: Color32,
}

/// Data-space extent of a chart.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChartBounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl ChartBounds {
    /// Extent covering every point, with the y axis pinned when given.
    pub fn from_curves<'a>(
        curves: impl IntoIterator<Item = &'a Curve>,
        fixed_y: Option<(f64, f64)>,
    ) -> Self {
        let mut bounds = ChartBounds {
            x_min: 0.0,
            x_max: 1.0,
            y_min: 0.0,
            y_max: 1.0,
        };
        let mut x_max = f64::NEG_INFINITY;
        let mut y_max = f64::NEG_INFINITY;
        for point in curves.into_iter().flat_map(|curve| curve.points()) {
            x_max = x_max.max(point.time);
            y_max = y_max.max(point.value);
        }
        if x_max.is_finite() && x_max > 0.0 {
            bounds.x_max = x_max;
        }
        match fixed_y {
            Some((low, high)) => {
                bounds.y_min = low;
                bounds.y_max = high;
            }
            None if y_max.is_finite() && y_max > 0.0 => bounds.y_max = y_max * 1.05,
            None => {}
        }
        bounds
    }

    pub fn to_screen(&self, rect: Rect, x: f64, y: f64) -> Pos2 {
        let fx = ((x - self.x_min) / (self.x_max - self.x_min)).clamp(0.0, 1.0) as f32;
        let fy = ((y - self.y_min) / (self.y_max - self.y_min)).clamp(0.0, 1.0) as f32;
        Pos2::new(
            rect.left() + fx * rect.width(),
            rect.bottom() - fy * rect.height(),
        )
    }
}

/// Expand a curve into the corner points of its step function.
pub fn step_points(curve: &Curve) -> Vec<(f64, f64)> {
    let mut points = Vec::with_capacity(curve.len() * 2);
    let mut previous: Option<f64> = None;
    for point in curve.points() {
        if let Some(value) = previous {
            points.push((point.time, value));
        }
        points.push((point.time, point.value));
        previous = Some(point.value);
    }
    points
}

/// Step chart with optional vertical marker and a legend when several series are drawn.
pub fn step_chart(
    ui: &mut Ui,
    series: &[ChartSeries<'_>],
    fixed_y: Option<(f64, f64)>,
    marker: Option<(f64, &str)>,
    y_label: &str,
) {
    let palette = style::palette();
    let (response, painter) = ui.allocate_painter(
        Vec2::new(ui.available_width(), CHART_HEIGHT),
        Sense::hover(),
    );
    let plot = plot_area(response.rect);
    let bounds = ChartBounds::from_curves(series.iter().map(|s| s.curve), fixed_y);
    painter.rect_filled(plot, 0.0, palette.bg_primary);
    draw_axes(&painter, plot, &bounds, y_label);

    for entry in series {
        let points: Vec<Pos2> = step_points(entry.curve)
            .into_iter()
            .map(|(x, y)| bounds.to_screen(plot, x, y))
            .collect();
        if points.len() >= 2 {
            painter.add(Shape::line(points, Stroke::new(2.0, entry.color)));
        }
    }

    if let Some((time, label)) = marker {
        let top = bounds.to_screen(plot, time, bounds.y_max);
        let bottom = bounds.to_screen(plot, time, bounds.y_min);
        let stroke = Stroke::new(1.0, palette.accent_copper);
        painter.add(Shape::dashed_line(&[top, bottom], stroke, 6.0, 4.0));
        painter.text(
            top + Vec2::new(4.0, 4.0),
            Align2::LEFT_TOP,
            label,
            FontId::proportional(12.0),
            palette.accent_copper,
        );
    }

    if series.len() > 1 {
        let mut cursor = Pos2::new(plot.right() - 140.0, plot.top() + 8.0);
        for entry in series {
            painter.line_segment(
                [cursor, cursor + Vec2::new(18.0, 0.0)],
                Stroke::new(3.0, entry.color),
            );
            painter.text(
                cursor + Vec2::new(24.0, 0.0),
                Align2::LEFT_CENTER,
                entry.label,
                FontId::proportional(12.0),
                palette.text_primary,
            );
            cursor.y += 16.0;
        }
    }
}

/// Horizontal hazard-ratio bars around a reference line at 1.
pub fn hazard_ratio_chart(ui: &mut Ui, bars: &[HazardRatioBar]) {
    let palette = style::palette();
    let height = AXIS_MARGIN + BAR_HEIGHT * 1.5 * bars.len() as f32;
    let (response, painter) =
        ui.allocate_painter(Vec2::new(ui.available_width(), height), Sense::hover());
    let label_width = 140.0;
    let plot = Rect::from_min_max(
        response.rect.min + Vec2::new(label_width, 8.0),
        response.rect.max - Vec2::new(72.0, AXIS_MARGIN * 0.5),
    );
    let max_ratio = bars
        .iter()
        .map(|bar| bar.hazard_ratio)
        .filter(|ratio| ratio.is_finite())
        .fold(1.0_f64, f64::max)
        * 1.1;
    let x = |ratio: f64| plot.left() + (ratio / max_ratio).clamp(0.0, 1.0) as f32 * plot.width();

    for (row, bar) in bars.iter().enumerate() {
        let y = plot.top() + BAR_HEIGHT * 1.5 * row as f32;
        let bar_rect = Rect::from_min_max(
            Pos2::new(plot.left(), y),
            Pos2::new(x(bar.hazard_ratio), y + BAR_HEIGHT),
        );
        painter.rect_filled(bar_rect, 0.0, style::hazard_bar_color(bar.increases_risk));
        painter.text(
            Pos2::new(plot.left() - 8.0, bar_rect.center().y),
            Align2::RIGHT_CENTER,
            bar.covariate.label(),
            FontId::proportional(12.0),
            palette.text_primary,
        );
        painter.text(
            Pos2::new(bar_rect.right() + 6.0, bar_rect.center().y),
            Align2::LEFT_CENTER,
            format!("{:.3}", bar.hazard_ratio),
            FontId::monospace(11.0),
            palette.text_muted,
        );
    }

    let reference = x(1.0);
    painter.add(Shape::dashed_line(
        &[
            Pos2::new(reference, plot.top()),
            Pos2::new(reference, plot.bottom()),
        ],
        Stroke::new(1.0, palette.text_muted),
        4.0,
        4.0,
    ));
    painter.text(
        Pos2::new(reference, plot.bottom() + 4.0),
        Align2::CENTER_TOP,
        "HR = 1",
        FontId::proportional(11.0),
        palette.text_muted,
    );
}

fn plot_area(outer: Rect) -> Rect {
    Rect::from_min_max(
        outer.min + Vec2::new(AXIS_MARGIN, 8.0),
        outer.max - Vec2::new(12.0, AXIS_MARGIN * 0.6),
    )
}

fn draw_axes(painter: &egui::Painter, plot: Rect, bounds: &ChartBounds, y_label: &str) {
    let palette = style::palette();
    let grid = Stroke::new(1.0, palette.grid_soft);
    for step in 0..=4 {
        let fraction = step as f64 / 4.0;
        let y_value = bounds.y_min + (bounds.y_max - bounds.y_min) * fraction;
        let x_value = bounds.x_min + (bounds.x_max - bounds.x_min) * fraction;
        let left = bounds.to_screen(plot, bounds.x_min, y_value);
        let right = bounds.to_screen(plot, bounds.x_max, y_value);
        painter.line_segment([left, right], grid);
        painter.text(
            left - Vec2::new(6.0, 0.0),
            Align2::RIGHT_CENTER,
            format!("{y_value:.2}"),
            FontId::monospace(10.0),
            palette.text_muted,
        );
        let bottom = bounds.to_screen(plot, x_value, bounds.y_min);
        painter.text(
            bottom + Vec2::new(0.0, 4.0),
            Align2::CENTER_TOP,
            format!("{x_value:.0}"),
            FontId::monospace(10.0),
            palette.text_muted,
        );
    }
    let axis = Stroke::new(1.0, palette.grid_strong);
    painter.line_segment([plot.left_bottom(), plot.right_bottom()], axis);
    painter.line_segment([plot.left_bottom(), plot.left_top()], axis);
    painter.text(
        plot.left_top() + Vec2::new(6.0, 2.0),
        Align2::LEFT_TOP,
        y_label,
        FontId::proportional(12.0),
        palette.text_muted,
    );
    painter.text(
        plot.right_bottom() + Vec2::new(0.0, 16.0),
        Align2::RIGHT_TOP,
        "time",
        FontId::proportional(12.0),
        palette.text_muted,
    );
}
