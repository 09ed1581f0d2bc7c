//! CLI tool for tilegrid - scrolls a synthetic grid and reports what was materialized
//!
//! Usage:
//!   tilegrid_cli <rows> <columns>                    # Report JSON to stdout
//!   tilegrid_cli <rows> <columns> -c config.json     # Use a grid configuration
//!   tilegrid_cli <rows> <columns> -o report.json     # Write the report to a file
//!
//! Logging follows `RUST_LOG` (for example `RUST_LOG=tilegrid=debug`).

#![allow(clippy::exit)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::indexing_slicing)]

use std::env;
use std::fs;
use std::io::{self, Write};

use serde::Serialize;
use tilegrid::source::FnSource;
use tilegrid::{CellValue, GridConfig, GridController, Separators, VisibleRange};
use tracing_subscriber::EnvFilter;
use web_time::{Duration, Instant};

const VIEWPORT_WIDTH: f64 = 1024.0;
const VIEWPORT_HEIGHT: f64 = 768.0;
const WHEEL_STEPS: u32 = 200;
const WHEEL_DELTA: f64 = 120.0;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    step: String,
    visible: Option<VisibleRange>,
    displayed_tiles: usize,
    cached_tiles: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    rows: u32,
    columns: u32,
    separators: Separators,
    snapshots: Vec<Snapshot>,
    max_displayed_tiles: usize,
    max_cached_tiles: usize,
}

fn snapshot(grid: &GridController, step: impl Into<String>) -> Snapshot {
    Snapshot {
        step: step.into(),
        visible: grid.visible_range(),
        displayed_tiles: grid.displayed_tile_count(),
        cached_tiles: grid.cached_tile_count(),
    }
}

fn fail(message: String) -> ! {
    eprintln!("{message}");
    std::process::exit(1);
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: tilegrid_cli <rows> <columns> [-c config.json] [-o report.json]");
        std::process::exit(1);
    }

    let rows: u32 = args[1]
        .parse()
        .unwrap_or_else(|e| fail(format!("Invalid row count {}: {}", args[1], e)));
    let columns: u32 = args[2]
        .parse()
        .unwrap_or_else(|e| fail(format!("Invalid column count {}: {}", args[2], e)));

    let mut config_path = None;
    let mut output_path = None;
    let mut rest = args[3..].iter();
    while let Some(flag) = rest.next() {
        match (flag.as_str(), rest.next()) {
            ("-c", Some(path)) => config_path = Some(path.clone()),
            ("-o", Some(path)) => output_path = Some(path.clone()),
            _ => fail(format!("Unexpected argument: {flag}")),
        }
    }

    let config = match config_path {
        Some(path) => {
            let json = fs::read_to_string(&path)
                .unwrap_or_else(|e| fail(format!("Error reading {path}: {e}")));
            GridConfig::from_json(&json)
                .unwrap_or_else(|e| fail(format!("Error in {path}: {e}")))
        }
        None => GridConfig::default(),
    };

    let source = FnSource::new(columns, rows, |c, r| {
        Some(CellValue::Text(format!("R{}C{}", r + 1, c + 1)))
    });
    let mut grid = GridController::with_source(
        config,
        Box::new(source),
        VIEWPORT_WIDTH,
        VIEWPORT_HEIGHT,
    )
    .unwrap_or_else(|e| fail(format!("Error creating grid: {e}")));
    grid.render()
        .unwrap_or_else(|e| fail(format!("Error rendering grid: {e}")));

    let mut snapshots = vec![snapshot(&grid, "initial")];
    let mut now = Instant::now();
    let debounce = grid.config().wheel_debounce();

    for step in 0..WHEEL_STEPS {
        grid.wheel(0.0, WHEEL_DELTA, now);
        now += debounce;
        grid.tick(now)
            .unwrap_or_else(|e| fail(format!("Error scrolling: {e}")));
        if (step + 1) % 50 == 0 {
            snapshots.push(snapshot(&grid, format!("wheel {}", step + 1)));
        }
    }

    for percent in [25.0, 50.0, 100.0, 0.0] {
        now += Duration::from_millis(1);
        grid.scroll_to_percent(Some(percent / 2.0), Some(percent), now)
            .unwrap_or_else(|e| fail(format!("Error jumping to {percent}%: {e}")));
        snapshots.push(snapshot(&grid, format!("jump {percent}%")));
    }

    let report = Report {
        rows,
        columns,
        separators: grid.separators(),
        max_displayed_tiles: snapshots.iter().map(|s| s.displayed_tiles).max().unwrap_or(0),
        max_cached_tiles: snapshots.iter().map(|s| s.cached_tiles).max().unwrap_or(0),
        snapshots,
    };

    let json = match serde_json::to_string_pretty(&report) {
        Ok(j) => j,
        Err(e) => fail(format!("Error serializing JSON: {e}")),
    };

    match output_path {
        Some(path) => {
            if let Err(e) = fs::write(&path, &json) {
                fail(format!("Error writing {path}: {e}"));
            }
            eprintln!("Written: {path}");
        }
        None => {
            io::stdout().write_all(json.as_bytes()).unwrap();
            println!();
        }
    }
}
