//! Demo command - scripted leak hunt over the synthetic workload.

use super::{render, OutputFormat};
use crate::workload::{self, Workload};
use anyhow::{Context, Result};
use console::style;
use heapview_core::{
    Action, CollectProgressCallback, GrowthRecord, Heap, PanelRequest, PanelResponse, Profiler,
    ProfilerConfig, SortDir, SortField,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;

/// Run the demo: baseline capture, workload rounds, second capture, then
/// drill into the fastest growing kind.
pub fn run(
    config: ProfilerConfig,
    format: OutputFormat,
    rounds: usize,
    requests: usize,
    depth: usize,
) -> Result<()> {
    let heap = Arc::new(Heap::new());
    let mut app = Workload::new(Arc::clone(&heap));
    let mut profiler = Profiler::with_config(Arc::clone(&heap), config);
    workload::register_formatters(profiler.classifier_mut());

    announce(format, "Warming up and capturing a baseline...");
    app.run_round(requests);
    capture(&mut profiler, format)?;

    announce(
        format,
        &format!("Serving {} rounds of {} requests...", rounds, requests),
    );
    for _ in 0..rounds {
        app.run_round(requests);
    }
    let records = capture(&mut profiler, format)?;
    emit(
        &PanelResponse::Leaks {
            records: records.clone(),
        },
        format,
    )?;

    let Some(top) = records.first() else {
        announce(format, "Nothing grew; no cohort to inspect.");
        return Ok(());
    };

    let listing = PanelRequest::new(Action::ListLeakedObjects)
        .with_kind(top.kind.clone())
        .sorted(SortField::Token, SortDir::Asc);
    let response = profiler.dispatch(&listing);
    emit(&response, format)?;

    let first = match &response {
        PanelResponse::Objects { page, .. } => page.entries.first().map(|(token, _)| *token),
        _ => None,
    };
    let Some(token) = first else {
        return Ok(());
    };

    emit(
        &profiler.dispatch(&PanelRequest::new(Action::InspectObject).with_token(token)),
        format,
    )?;

    let mut chain = PanelRequest::new(Action::BackrefGraph).with_token(token);
    chain.depth = depth;
    emit(&profiler.dispatch(&chain), format)?;

    if format == OutputFormat::Text {
        println!();
        println!(
            "{} Served {} requests, {} still held by the response cache.",
            style("ℹ").blue(),
            app.served(),
            app.cached()
        );
    }
    Ok(())
}

fn capture(profiler: &mut Profiler, format: OutputFormat) -> Result<Vec<GrowthRecord>> {
    let pb = if format == OutputFormat::Text {
        ProgressBar::new_spinner()
    } else {
        ProgressBar::hidden()
    };
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .context("Invalid progress template")?,
    );
    pb.set_message("Capturing heap snapshot");

    let pb_clone = pb.clone();
    let progress: &CollectProgressCallback<'_> = &move |current: usize, total: usize, phase: &str| {
        pb_clone.set_message(format!("Collecting ({}/{}): {}", current, total, phase));
        pb_clone.tick();
    };
    let records = profiler
        .capture_and_diff_with_progress(Some(progress))
        .to_vec();
    pb.finish_and_clear();

    if format == OutputFormat::Text {
        let report = profiler.last_collect();
        println!(
            "{} Capture {}: {} live objects, {} reclaimed from cycles",
            style("✓").green(),
            profiler.captures(),
            style(report.reachable).cyan(),
            style(report.reclaimed).yellow()
        );
    }
    Ok(records)
}

fn announce(format: OutputFormat, message: &str) {
    if format == OutputFormat::Text {
        println!("{} {}", style("→").cyan(), message);
    }
}

fn emit(response: &PanelResponse, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Text {
        println!();
    }
    render::print(response, format)
}
