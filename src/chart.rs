//! Chart rendering for the worst-case series.
//!
//! Renders the measured `(n, WC(n))` points, every fitted trend curve
//! extended to the prediction horizon, and the optional resource-budget
//! annotations into a self-contained SVG string. A CSV rendering of the raw
//! series is available for downstream tooling.

use std::fmt::Write as _;

use crate::fitting::TrendFit;

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 560.0;
const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 50.0;

const CURVE_COLORS: [&str; 6] = ["#1f77b4", "#d62728", "#2ca02c", "#9467bd", "#ff7f0e", "#8c564b"];
const SERIES_COLOR: &str = "#222222";
const BUDGET_COLOR: &str = "#b0b0b0";

/// Renders the chart. Budget annotations are drawn as dashed lines:
/// `max_input` vertically, `max_res` horizontally. With an empty series and
/// no fits, only the axes and annotations are rendered.
pub fn render_svg(
    series: &[(f64, f64)],
    fits: &[TrendFit],
    horizon: f64,
    max_input: Option<f64>,
    max_res: Option<f64>,
) -> String {
    let x_max = {
        let mut x = horizon.max(1.0);
        if let Some(input) = max_input {
            x = x.max(input);
        }
        x
    };

    // Sample every curve across the horizon to size the y axis.
    let samples = 128;
    let mut y_max = 1.0_f64;
    for &(_, y) in series {
        y_max = y_max.max(y);
    }
    for fit in fits {
        for i in 0..=samples {
            let x = x_max * i as f64 / samples as f64;
            let y = fit.predict(x);
            if y.is_finite() {
                y_max = y_max.max(y);
            }
        }
    }
    if let Some(res) = max_res {
        y_max = y_max.max(res);
    }
    y_max *= 1.05;

    let plot_w = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_h = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let sx = |x: f64| MARGIN_LEFT + x / x_max * plot_w;
    let sy = |y: f64| MARGIN_TOP + plot_h - y / y_max * plot_h;

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">"#,
        WIDTH, HEIGHT, WIDTH, HEIGHT
    );
    let _ = writeln!(svg, r#"<rect width="{}" height="{}" fill="white"/>"#, WIDTH, HEIGHT);

    // Axes.
    let _ = writeln!(
        svg,
        r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="black"/>"#,
        MARGIN_LEFT,
        MARGIN_TOP + plot_h,
        MARGIN_LEFT + plot_w,
        MARGIN_TOP + plot_h
    );
    let _ = writeln!(
        svg,
        r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="black"/>"#,
        MARGIN_LEFT,
        MARGIN_TOP,
        MARGIN_LEFT,
        MARGIN_TOP + plot_h
    );

    // Ticks and labels.
    let ticks = 5;
    for i in 0..=ticks {
        let x = x_max * i as f64 / ticks as f64;
        let y = y_max * i as f64 / ticks as f64;
        let _ = writeln!(
            svg,
            r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="black"/>"#,
            sx(x),
            MARGIN_TOP + plot_h,
            sx(x),
            MARGIN_TOP + plot_h + 5.0
        );
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" font-size="11" text-anchor="middle">{}</text>"#,
            sx(x),
            MARGIN_TOP + plot_h + 18.0,
            format_tick(x)
        );
        let _ = writeln!(
            svg,
            r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="black"/>"#,
            MARGIN_LEFT - 5.0,
            sy(y),
            MARGIN_LEFT,
            sy(y)
        );
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" font-size="11" text-anchor="end">{}</text>"#,
            MARGIN_LEFT - 8.0,
            sy(y) + 4.0,
            format_tick(y)
        );
    }
    let _ = writeln!(
        svg,
        r#"<text x="{:.1}" y="{:.1}" font-size="12" text-anchor="middle">input size n</text>"#,
        MARGIN_LEFT + plot_w / 2.0,
        HEIGHT - 12.0
    );
    let _ = writeln!(
        svg,
        r#"<text x="16" y="{:.1}" font-size="12" text-anchor="middle" transform="rotate(-90 16 {:.1})">WC(n)</text>"#,
        MARGIN_TOP + plot_h / 2.0,
        MARGIN_TOP + plot_h / 2.0
    );

    // Budget annotations.
    if let Some(input) = max_input {
        let _ = writeln!(
            svg,
            r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{}" stroke-dasharray="6,4"/>"#,
            sx(input),
            MARGIN_TOP,
            sx(input),
            MARGIN_TOP + plot_h,
            BUDGET_COLOR
        );
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" font-size="11" fill="{}">max input</text>"#,
            sx(input) + 4.0,
            MARGIN_TOP + 12.0,
            BUDGET_COLOR
        );
    }
    if let Some(res) = max_res {
        let _ = writeln!(
            svg,
            r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{}" stroke-dasharray="6,4"/>"#,
            MARGIN_LEFT,
            sy(res),
            MARGIN_LEFT + plot_w,
            sy(res),
            BUDGET_COLOR
        );
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" font-size="11" fill="{}">max resource</text>"#,
            MARGIN_LEFT + 4.0,
            sy(res) - 4.0,
            BUDGET_COLOR
        );
    }

    // Fitted curves.
    for (index, fit) in fits.iter().enumerate() {
        let color = CURVE_COLORS[index % CURVE_COLORS.len()];
        let mut points = String::new();
        for i in 0..=samples {
            let x = x_max * i as f64 / samples as f64;
            let y = fit.predict(x);
            if !y.is_finite() || y < 0.0 || y > y_max {
                continue;
            }
            let _ = write!(points, "{:.1},{:.1} ", sx(x), sy(y));
        }
        let _ = writeln!(
            svg,
            r#"<polyline fill="none" stroke="{}" stroke-width="1.5" points="{}"/>"#,
            color,
            points.trim_end()
        );
        let legend_y = MARGIN_TOP + 16.0 * index as f64 + 8.0;
        let _ = writeln!(
            svg,
            r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{}" stroke-width="1.5"/>"#,
            MARGIN_LEFT + 10.0,
            legend_y,
            MARGIN_LEFT + 34.0,
            legend_y,
            color
        );
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" font-size="11">{} (r2 = {:.4})</text>"#,
            MARGIN_LEFT + 40.0,
            legend_y + 4.0,
            fit.kind,
            fit.r_squared
        );
    }

    // Observed series on top.
    for &(x, y) in series {
        let _ = writeln!(
            svg,
            r#"<circle cx="{:.1}" cy="{:.1}" r="3" fill="{}"/>"#,
            sx(x),
            sy(y),
            SERIES_COLOR
        );
    }

    let _ = writeln!(svg, "</svg>");
    svg
}

/// Renders the raw series as CSV with a header line.
pub fn render_csv(series: &[(f64, f64)]) -> String {
    let mut csv = String::from("n,wc\n");
    for &(x, y) in series {
        let _ = writeln!(csv, "{},{}", x, y);
    }
    csv
}

fn format_tick(value: f64) -> String {
    if value >= 1000.0 || value == value.trunc() {
        format!("{:.0}", value)
    } else {
        format!("{:.1}", value)
    }
}
