//! Printing panel responses as styled text or JSON.

use super::OutputFormat;
use anyhow::{Context, Result};
use console::style;
use heapview_core::{Action, Inspection, PanelRequest, PanelResponse, RelatedObject, SortField};
use std::fmt::Write;

/// Prints a response in the requested format.
pub fn print(response: &PanelResponse, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let json =
                serde_json::to_string_pretty(response).context("Failed to serialize to JSON")?;
            println!("{}", json);
        }
        OutputFormat::Text => print!("{}", to_text(response)),
    }
    Ok(())
}

/// Renders a response for the terminal.
pub fn to_text(response: &PanelResponse) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_response(&mut out, response);
    out
}

fn write_response(out: &mut String, response: &PanelResponse) -> std::fmt::Result {
    match response {
        PanelResponse::Overview { kinds } => {
            writeln!(out, "{}", style("Most common kinds:").bold())?;
            for (kind, count) in kinds {
                writeln!(out, "  {:>8}  {}", style(count).cyan(), kind)?;
            }
        }
        PanelResponse::Objects { kind, leaked, page } => {
            let title = if *leaked { "New objects" } else { "Objects" };
            writeln!(
                out,
                "{} of {} (page {} of {}, {} total, sorted by {} {})",
                style(title).bold(),
                style(kind).cyan(),
                page.page + 1,
                page.total_pages.max(1),
                page.total_items,
                match page.sort {
                    SortField::Token => "token",
                    SortField::Summary => "summary",
                },
                if page.dir.flag() == 0 { "asc" } else { "desc" },
            )?;
            for (token, summary) in &page.entries {
                writeln!(out, "  {:>16}  {}", style(token).dim(), summary)?;
            }
            if page.is_empty() {
                writeln!(out, "  {}", style("(no objects on this page)").dim())?;
            }
        }
        PanelResponse::Leaks { records } => {
            if records.is_empty() {
                writeln!(
                    out,
                    "{} No growth recorded. Capture again after the workload runs.",
                    style("✓").green()
                )?;
            } else {
                writeln!(out, "{}", style("Growth since previous capture:").bold())?;
                writeln!(out, "  {:>8}  {:>8}  kind", "new", "total")?;
                for record in records {
                    writeln!(
                        out,
                        "  {:>8}  {:>8}  {}",
                        style(format!("+{}", record.new_count)).yellow(),
                        record.total_count,
                        record.kind
                    )?;
                }
            }
        }
        PanelResponse::Inspection(inspection) => write_inspection(out, inspection)?,
        PanelResponse::Graph { graph, dot } => {
            writeln!(
                out,
                "{} {} nodes, {} edges{}",
                style("Reference chain:").bold(),
                graph.nodes.len(),
                graph.edges.len(),
                if graph.truncated { " (truncated)" } else { "" }
            )?;
            write!(out, "{}", dot)?;
        }
        PanelResponse::Redirect { to, reason } => {
            writeln!(
                out,
                "{} {} (back to {})",
                style("→").yellow(),
                reason,
                style(to).cyan()
            )?;
        }
    }
    Ok(())
}

fn write_inspection(out: &mut String, inspection: &Inspection) -> std::fmt::Result {
    writeln!(
        out,
        "{} {} {}",
        style("Object").bold(),
        style(inspection.token).cyan(),
        style(format!("({})", inspection.kind)).dim()
    )?;
    writeln!(out, "  {}", inspection.detail)?;

    writeln!(out, "{}", style("Attributes:").bold())?;
    for (name, value) in &inspection.attributes {
        writeln!(out, "  {} = {}", name, value)?;
    }
    write_related(out, "Referrers:", &inspection.referrers)?;
    write_related(out, "Referents:", &inspection.referents)
}

fn write_related(out: &mut String, title: &str, related: &[RelatedObject]) -> std::fmt::Result {
    writeln!(out, "{}", style(title).bold())?;
    if related.is_empty() {
        writeln!(out, "  {}", style("(none)").dim())?;
    }
    for object in related {
        writeln!(
            out,
            "  {:>16}  {}",
            style(object.token).dim(),
            object.summary
        )?;
    }
    Ok(())
}

/// Follow-up commands for a response, in shell syntax.
pub fn follow_ups(request: &PanelRequest, response: &PanelResponse) -> Vec<String> {
    let mut links = Vec::new();
    if let PanelResponse::Objects { page, .. } = response {
        if page.page + 1 < page.total_pages {
            links.push(shell_line(&request.page_link(page.page + 1)));
        }
        links.push(shell_line(&request.sort_link(SortField::Summary)));
        if let Some((token, _)) = page.entries.first() {
            links.push(shell_line(
                &PanelRequest::new(Action::InspectObject).with_token(*token),
            ));
        }
    }
    links
}

/// Renders a request as a shell command line.
pub fn shell_line(request: &PanelRequest) -> String {
    let mut query = request.to_query().into_iter();
    let mut line = match query.next() {
        Some((_, action)) => action,
        None => String::new(),
    };
    for (key, value) in query {
        line.push(' ');
        line.push_str(key);
        line.push('=');
        line.push_str(&value);
    }
    line
}
