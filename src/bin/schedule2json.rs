//! CLI tool for converting an extracted schedule document to game records

use schedule_inspector::{
    run_pipeline, GameStore, JsonFileSource, JsonFileStore, MemoryStore, OverrideTable,
    ScheduleOptions, ScheduleParser, SqliteStore,
};
use std::env;
use std::fs;
use std::process;
use std::time::Instant;

struct Args {
    input: String,
    output: Option<String>,
    store: Option<String>,
    overrides: Option<String>,
    config: Option<String>,
    json: bool,
}

fn usage(program: &str) -> ! {
    eprintln!("Usage: {} <document.json> [options]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --json               Print the full result as JSON");
    eprintln!("  --out <file>         Write the result JSON to a file");
    eprintln!("  --store <path>       Replace stored games (*.sqlite/*.db or a directory)");
    eprintln!("  --overrides <file>   Override table applied after extraction");
    eprintln!("  --config <file>      Layout options (JSON)");
    process::exit(1);
}

fn parse_args() -> Args {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("schedule2json");
    parse_args_from(args.get(1..).unwrap_or(&[])).unwrap_or_else(|| usage(program))
}

/// Parse the arguments after the program name; `None` means print usage
fn parse_args_from(args: &[String]) -> Option<Args> {
    let mut parsed = Args {
        input: String::new(),
        output: None,
        store: None,
        overrides: None,
        config: None,
        json: false,
    };

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--json" => parsed.json = true,
            "--out" => parsed.output = Some(iter.next()?.clone()),
            "--store" => parsed.store = Some(iter.next()?.clone()),
            "--overrides" => parsed.overrides = Some(iter.next()?.clone()),
            "--config" => parsed.config = Some(iter.next()?.clone()),
            "-h" | "--help" => return None,
            other if parsed.input.is_empty() && !other.starts_with("--") => {
                parsed.input = other.to_string()
            }
            _ => return None,
        }
    }

    if parsed.input.is_empty() {
        return None;
    }
    Some(parsed)
}

fn open_store(path: Option<&str>) -> Result<Box<dyn GameStore>, String> {
    match path {
        None => Ok(Box::new(MemoryStore::new())),
        Some(p) if p.ends_with(".sqlite") || p.ends_with(".db") => SqliteStore::open(p)
            .map(|s| Box::new(s) as Box<dyn GameStore>)
            .map_err(|e| e.to_string()),
        Some(p) => JsonFileStore::open(p)
            .map(|s| Box::new(s) as Box<dyn GameStore>)
            .map_err(|e| e.to_string()),
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let args = parse_args();

    let options = match &args.config {
        Some(path) => ScheduleOptions::load(path).unwrap_or_else(|e| {
            eprintln!("Error: cannot read config {}: {}", path, e);
            process::exit(1);
        }),
        None => ScheduleOptions::default(),
    };

    let mut parser = ScheduleParser::new(options);
    if let Some(path) = &args.overrides {
        match OverrideTable::load(path) {
            Ok(table) => parser = parser.with_overrides(table),
            Err(e) => {
                eprintln!("Error: cannot read overrides {}: {}", path, e);
                process::exit(1);
            }
        }
    }

    let mut store = open_store(args.store.as_deref()).unwrap_or_else(|e| {
        eprintln!("Error: cannot open store: {}", e);
        process::exit(1);
    });

    let start = Instant::now();
    let source = JsonFileSource::new(&args.input);

    match run_pipeline(&source, &parser, store.as_mut()) {
        Ok(result) => {
            let elapsed = start.elapsed();

            if args.json || args.output.is_some() {
                let json = match serde_json::to_string_pretty(&result) {
                    Ok(json) => json,
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        process::exit(1);
                    }
                };
                if let Some(output) = &args.output {
                    if let Err(e) = fs::write(output, &json) {
                        eprintln!("Error: cannot write {}: {}", output, e);
                        process::exit(1);
                    }
                }
                if args.json {
                    println!("{}", json);
                    return;
                }
            }

            println!("Schedule Extraction");
            println!("===================");
            println!("File: {}", args.input);
            println!(
                "Document date: {}",
                result.document_date.as_deref().unwrap_or("(none)")
            );
            println!("Games: {}", result.games.len());
            println!("Diagnostics: {}", result.diagnostics.len());
            println!("Processing time: {}ms", elapsed.as_millis());
            println!();

            for game in &result.games {
                println!(
                    "{:<20} {:<15} {:<25} {:<25} {:<6} {:<8} {}",
                    game.field,
                    game.time,
                    game.team1,
                    game.team2,
                    game.year,
                    game.game_duration,
                    game.game_type
                );
            }

            if let Some(store_path) = &args.store {
                println!();
                println!("Stored in: {}", store_path);
            }
        }
        Err(e) => {
            if args.json {
                println!(r#"{{"error":{}}}"#, serde_json::Value::String(e.to_string()));
            } else {
                eprintln!("Error: {}", e);
            }
            process::exit(1);
        }
    }
}
