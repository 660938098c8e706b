//! Debug tool: Print clustered lines with their classification
//!
//! Usage: debug_lines [--config <options.json>] <document.json> [page_number]
//!
//! Shows each page's lines with y position, whether the line is a field
//! header, and the games extracted from it.

use schedule_inspector::{LineKind, RawDocument, ScheduleOptions, ScheduleParser};
use std::env;
use std::process;

fn usage(program: &str) -> ! {
    eprintln!(
        "Usage: {} [--config <options.json>] <document.json> [page_number]",
        program
    );
    eprintln!();
    eprintln!("Prints clustered text lines and how each one is classified.");
    eprintln!("If page_number is given, only that page is shown.");
    process::exit(1);
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("debug_lines");

    let mut config = None;
    let mut positional = Vec::new();
    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => match iter.next() {
                Some(path) => config = Some(path.clone()),
                None => usage(program),
            },
            "--help" | "-h" => usage(program),
            _ => positional.push(arg.clone()),
        }
    }

    let Some(input) = positional.first() else {
        usage(program);
    };
    let filter_page: Option<usize> = positional.get(1).and_then(|s| s.parse().ok());

    let options = match config {
        Some(path) => ScheduleOptions::load(&path).unwrap_or_else(|e| {
            eprintln!("Error loading config {}: {}", path, e);
            process::exit(1);
        }),
        None => ScheduleOptions::default(),
    };

    let document: RawDocument = match std::fs::read_to_string(input)
        .map_err(|e| e.to_string())
        .and_then(|data| serde_json::from_str(&data).map_err(|e| e.to_string()))
    {
        Ok(document) => document,
        Err(e) => {
            eprintln!("Error reading document: {}", e);
            process::exit(1);
        }
    };

    let parser = ScheduleParser::new(options);

    for (index, page) in document.pages.iter().enumerate() {
        let page_number = index + 1;
        if filter_page.is_some_and(|p| p != page_number) {
            continue;
        }

        let result = parser.parse_page(page_number, page);

        println!(
            "=== PAGE {} ({:.1} x {:.1}, {} lines, midpoint {:.1}) ===",
            page_number,
            page.width,
            page.height,
            result.lines.len(),
            page.width / 2.0
        );

        for d in result.diagnostics.iter().filter(|d| d.line.is_none()) {
            println!("           !! {:?}", d.kind);
        }

        for (i, (line, kind)) in result.lines.iter().zip(&result.kinds).enumerate() {
            match kind {
                LineKind::Header(state) => {
                    println!("  y={:7.2} HEADER {}", line.y, line.text());
                    for side in [&state.left, &state.right].into_iter().flatten() {
                        println!(
                            "           -> {} @ x={:.2} [{} | {} | {}]",
                            side.name, side.start_x, side.game_duration, side.game_type, side.year
                        );
                    }
                }
                LineKind::Metadata => println!("  y={:7.2} META   {}", line.y, line.text()),
                LineKind::Data { games } => {
                    println!("  y={:7.2} DATA   {} ({} games)", line.y, line.text(), games)
                }
            }
            for d in result.diagnostics.iter().filter(|d| d.line == Some(i)) {
                println!("           !! {:?}", d.kind);
            }
        }
        println!();
    }
}
