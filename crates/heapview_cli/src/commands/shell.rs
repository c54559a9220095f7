//! Shell command - serve panel actions read from stdin.
//!
//! Each line is an action name followed by `key=value` parameters, e.g.
//! `list-by-type type=Request sort=1 dir=1 page=0`. Two extra commands drive
//! the session itself: `tick [requests]` serves more workload requests and
//! `quit` ends the session.

use super::{render, OutputFormat};
use crate::workload::{self, Workload};
use anyhow::{bail, Result};
use console::style;
use heapview_core::{Action, Heap, PanelRequest, Profiler, ProfilerConfig};
use std::io::{self, BufRead, Write};
use std::sync::Arc;

const DEFAULT_TICK: usize = 100;

/// A parsed shell line.
#[derive(Debug, PartialEq, Eq)]
pub enum ShellCommand {
    Help,
    Quit,
    Tick(usize),
    Panel(PanelRequest),
}

/// Parses one input line. Blank lines and `#` comments give `None`.
pub fn parse_line(line: &str) -> Result<Option<ShellCommand>> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    if head.starts_with('#') {
        return Ok(None);
    }

    let command = match head {
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" => ShellCommand::Quit,
        "tick" => {
            let requests = match words.next() {
                Some(n) => n
                    .parse()
                    .map_err(|_| anyhow::anyhow!("tick expects a number, got '{}'", n))?,
                None => DEFAULT_TICK,
            };
            ShellCommand::Tick(requests)
        }
        action => {
            let mut params = vec![("action".to_string(), action.to_string())];
            for word in words {
                let Some((key, value)) = word.split_once('=') else {
                    bail!("Expected key=value, got '{}'", word);
                };
                params.push((key.to_string(), value.to_string()));
            }
            ShellCommand::Panel(PanelRequest::from_query(&params)?)
        }
    };
    Ok(Some(command))
}

/// Run the shell until `quit` or end of input.
pub fn run(config: ProfilerConfig, format: OutputFormat) -> Result<()> {
    let heap = Arc::new(Heap::new());
    let mut app = Workload::new(Arc::clone(&heap));
    let mut profiler = Profiler::with_config(heap, config);
    workload::register_formatters(profiler.classifier_mut());

    let interactive = console::user_attended() && format == OutputFormat::Text;
    if interactive {
        println!(
            "{} heapview shell. Type {} for commands.",
            style("→").cyan(),
            style("help").cyan()
        );
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        if interactive {
            print!("{} ", style("heapview>").green());
            io::stdout().flush()?;
        }
        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;

        let command = match parse_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                eprintln!("{} {}", style("×").red(), err);
                continue;
            }
        };

        match command {
            ShellCommand::Help => print_help(),
            ShellCommand::Quit => break,
            ShellCommand::Tick(requests) => {
                app.run_round(requests);
                if format == OutputFormat::Text {
                    println!(
                        "{} Served {} requests ({} total)",
                        style("✓").green(),
                        requests,
                        app.served()
                    );
                }
            }
            ShellCommand::Panel(request) => {
                let response = profiler.dispatch(&request);
                render::print(&response, format)?;
                if interactive {
                    for link in render::follow_ups(&request, &response) {
                        println!("  {} {}", style("↪").dim(), style(link).dim());
                    }
                }
            }
        }
    }
    Ok(())
}

fn print_help() {
    println!("{}", style("Panel actions:").bold());
    for action in Action::ALL {
        println!("  {}", action);
    }
    println!("{}", style("Parameters:").bold());
    println!("  type=<kind> id=<token> sort=0|1 dir=0|1 page=<n> depth=<n>");
    println!("{}", style("Session:").bold());
    println!("  tick [requests]   serve more workload requests");
    println!("  quit              leave the shell");
}
