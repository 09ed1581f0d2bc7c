//! Benchmarks for viewport scrolling over a large synthetic source.
//!
//! Run with: cargo bench
//!
//! Results are saved to `target/criterion/` with HTML reports.
#![allow(clippy::expect_used, clippy::unwrap_used)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tilegrid::source::FnSource;
use tilegrid::{Axis, CellValue, FixedBands, GridConfig, GridController, ScrollOrigin};
use web_time::{Duration, Instant};

const ROWS: u32 = 1_000_000;
const COLUMNS: u32 = 50;

fn grid(bands: FixedBands) -> GridController {
    let source = FnSource::new(COLUMNS, ROWS, |c, r| {
        Some(CellValue::Text(format!("R{}C{}", r + 1, c + 1)))
    });
    let mut grid = GridController::with_source(
        GridConfig::default(),
        Box::new(source),
        1280.0,
        800.0,
    )
    .expect("Failed to create grid");
    grid.set_fixed_bands(bands).expect("Invalid fixed bands");
    grid.render().expect("Failed to render");
    grid
}

/// Full structural build: regions, separators, seeding and fill
fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    for (name, bands) in [
        ("no_fixed", FixedBands::default()),
        ("fixed_all_sides", FixedBands::new(2, 1, 1, 1)),
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(name), &bands, |b, bands| {
            let mut g = grid(*bands);
            b.iter(|| g.render().expect("Failed to render"));
        });
    }
    group.finish();
}

/// Incremental pixel scrolling, one wheel-sized step at a time
fn bench_wheel_steps(c: &mut Criterion) {
    let mut g = grid(FixedBands::default());
    let now = Instant::now();
    c.bench_function("adjust_position_px_down", |b| {
        b.iter(|| {
            g.adjust_position_px(black_box(-120.0), Axis::Vertical, ScrollOrigin::Wheel, now)
                .expect("Failed to scroll")
        });
    });
}

/// Debounced wheel input flushed through the controller clock
fn bench_wheel_debounced(c: &mut Criterion) {
    let mut g = grid(FixedBands::new(1, 1, 0, 0));
    let debounce = g.config().wheel_debounce();
    let mut now = Instant::now();
    c.bench_function("wheel_tick", |b| {
        b.iter(|| {
            g.wheel(0.0, 40.0, now);
            g.wheel(0.0, 40.0, now + Duration::from_millis(2));
            now += debounce;
            g.tick(now).expect("Failed to tick")
        });
    });
}

/// Absolute jumps across the dataset
fn bench_jumps(c: &mut Criterion) {
    let mut g = grid(FixedBands::default());
    let now = Instant::now();
    let mut percent = 0.0;
    c.bench_function("scroll_to_percent", |b| {
        b.iter(|| {
            percent = (percent + 37.0) % 100.0;
            g.scroll_to_percent(None, Some(black_box(percent)), now)
                .expect("Failed to jump");
        });
    });
}

criterion_group!(
    benches,
    bench_render,
    bench_wheel_steps,
    bench_wheel_debounced,
    bench_jumps
);
criterion_main!(benches);
