//! ASCII plotting of weekly trends for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual checks of price movement in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Each weight range is drawn as a line with its own glyph; a legend maps
//! glyphs back to weight ranges.

use chrono::NaiveDate;

use crate::aggregate::WeeklyTrend;
use crate::domain::Metric;
use crate::report::format_thousands;

pub const MAX_WIDTH: usize = 500;
pub const MAX_HEIGHT: usize = 200;

const GLYPHS: &[char] = &['*', '+', 'x', 'o', '#', '@', '%', '&', '=', '~'];

/// Render one metric of a weekly trend as a multi-series line chart.
pub fn render_trend_chart(trend: &WeeklyTrend, metric: Metric, width: usize, height: usize) -> String {
    let width = width.clamp(10, MAX_WIDTH);
    let height = height.clamp(5, MAX_HEIGHT);

    let weeks = trend.weeks();
    let (Some(first), Some(last)) = (weeks.first().copied(), weeks.last().copied()) else {
        return format!("{}: no data to plot\n", metric.display_name());
    };
    let x_span = (last - first).num_days().max(1) as f64;

    let series: Vec<(&str, Vec<(f64, f64)>)> = trend
        .weight_ranges()
        .into_iter()
        .map(|range| {
            let points = trend
                .series(range, metric)
                .into_iter()
                .map(|(week, y)| (days_since(first, week), y))
                .collect();
            (range, points)
        })
        .collect();

    let (y_min, y_max) = y_range(&series).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];
    for (idx, (_, points)) in series.iter().enumerate() {
        let glyph = GLYPHS[idx % GLYPHS.len()];
        draw_series(&mut grid, points, x_span, y_min, y_max, glyph);
    }

    let mut out = String::new();
    out.push_str(&format!(
        "{}: weeks=[{first}, {last}] | y=[{}, {}]\n",
        metric.display_name(),
        format_thousands(y_min),
        format_thousands(y_max),
    ));

    for row in grid {
        let line: String = row.into_iter().collect();
        out.push_str(line.trim_end());
        out.push('\n');
    }

    for (idx, (range, _)) in series.iter().enumerate() {
        out.push_str(&format!("  {} {range}\n", GLYPHS[idx % GLYPHS.len()]));
    }

    out
}

fn days_since(origin: NaiveDate, date: NaiveDate) -> f64 {
    (date - origin).num_days() as f64
}

fn y_range(series: &[(&str, Vec<(f64, f64)>)]) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for (_, points) in series {
        for &(_, y) in points {
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }
    }

    if !(min_y.is_finite() && max_y.is_finite()) {
        return None;
    }
    if max_y > min_y {
        Some((min_y, max_y))
    } else {
        // Flat series: give it some room so it lands mid-chart.
        Some((min_y - 1.0, max_y + 1.0))
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_span: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = (x / x_span).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_series(grid: &mut [Vec<char>], points: &[(f64, f64)], x_span: f64, y_min: f64, y_max: f64, glyph: char) {
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(x, y) in points {
        let px = map_x(x, x_span, width);
        let py = map_y(y, y_min, y_max, height);
        if let Some((x0, y0)) = prev {
            draw_line(grid, x0, y0, px, py, glyph);
        } else {
            grid[py][px] = glyph;
        }
        prev = Some((px, py));
    }
}

/// Integer line drawing (Bresenham-ish). Earlier series win where lines cross.
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && (grid[y0 as usize][x0 as usize] == ' ' || grid[y0 as usize][x0 as usize] == ch)
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
