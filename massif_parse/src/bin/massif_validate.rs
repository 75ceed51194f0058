use massif_parse::ParsedMassif;
use serde::Serialize;
use std::env;
use std::fs::File;
use std::process::ExitCode;

#[derive(Serialize)]
struct Summary<'a> {
    path: &'a str,
    headers: Vec<String>,
    snapshots: usize,
    first_time: Option<u64>,
    last_time: Option<u64>,
}

fn run(path: &str, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let file = File::open(path).map_err(|e| format!("Error opening '{}': {}", path, e))?;
    let massif = ParsedMassif::parse(file, true)
        .map_err(|e| format!("Invalid Massif file '{}': {}", path, e))?;
    let range = massif.time_range();

    if json {
        let summary = Summary {
            path,
            headers: massif
                .headers
                .iter()
                .map(|h| String::from_utf8_lossy(h).into_owned())
                .collect(),
            snapshots: massif.snapshots.len(),
            first_time: range.map(|(first, _)| first),
            last_time: range.map(|(_, last)| last),
        };
        println!("{}", serde_json::to_string(&summary)?);
    } else {
        println!("Valid Massif file: {}", path);
        println!("  Header lines: {}", massif.headers.len());
        println!("  Snapshots: {}", massif.snapshots.len());
        if let Some((first, last)) = range {
            println!("  Time range: {} .. {}", first, last);
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();

    let (path, json) = match args.as_slice() {
        [_, path] => (path, false),
        [_, flag, path] | [_, path, flag] if flag == "--json" => (path, true),
        _ => {
            let program = args.first().map_or("massif_validate", String::as_str);
            eprintln!("Usage: {} [--json] <massif.out>", program);
            return ExitCode::from(2);
        }
    };

    match run(path, json) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
