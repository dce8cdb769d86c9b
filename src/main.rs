//! Development shell for the risk checker core.
//!
//! One action per invocation:
//! - `demo` — render the canned demo prediction, no network
//! - `analyze <image-path>` — prepare the file and call the Space
//! - `theme [light|dark|toggle]` — show or change the persisted theme
//! - `status` — print the session snapshot as JSON

use std::env;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use dermalens::commands::{self, analysis, preferences};
use dermalens::config;
use dermalens::core_state::CoreState;
use dermalens::models::DisplayModel;

fn main() -> ExitCode {
    dermalens::init_tracing();
    let state = dermalens::bootstrap();

    let args: Vec<String> = env::args().skip(1).collect();
    let result = match args.first().map(String::as_str) {
        Some("demo") => {
            print_model(&analysis::run_demo());
            Ok(())
        }
        Some("analyze") => match args.get(1) {
            Some(path) => run_analyze(&state, Path::new(path)),
            None => Err("Usage: dermalens analyze <image-path>".to_string()),
        },
        Some("theme") => run_theme(&state, args.get(1).map(String::as_str)),
        Some("status") => run_status(&state),
        _ => Err(usage()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn run_analyze(state: &Arc<CoreState>, path: &Path) -> Result<(), String> {
    // Start connecting while the image is being prepared.
    analysis::warmup(state);

    let bytes =
        std::fs::read(path).map_err(|e| format!("Cannot read {}: {e}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .to_string();
    let mime = mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();

    let snapshot = analysis::select_image(state, file_name, mime, bytes)?;
    if let Some(meta) = &snapshot.file_meta {
        println!("Selected: {meta}");
    }

    let model = analysis::analyze(state)?;
    print_model(&model);
    Ok(())
}

fn run_theme(state: &CoreState, choice: Option<&str>) -> Result<(), String> {
    let theme = match choice {
        None => preferences::get_theme(state)?,
        Some("toggle") => preferences::toggle_theme(state)?,
        Some(value) => preferences::set_theme(state, value)?,
    };
    println!("{theme}");
    Ok(())
}

fn run_status(state: &CoreState) -> Result<(), String> {
    let snapshot = commands::session_status(state)?;
    let json = serde_json::to_string_pretty(&snapshot).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}

fn print_model(model: &DisplayModel) {
    println!("{}: {}", model.status, model.summary_title);
    println!("{}", model.summary_body);
    println!();
    for chip in &model.chips {
        println!("  [{chip}]");
    }
    println!();
    println!("Recommendations:");
    for rec in &model.recommendations {
        println!("  {} {}", rec.lead, rec.body);
    }
    if let Some(note) = &model.note {
        println!();
        println!("Note: {note}");
    }
    println!();
    println!("Raw response:");
    println!("{}", model.raw_json);
}

fn usage() -> String {
    format!(
        "{} v{}\n\nUsage:\n  dermalens demo\n  dermalens analyze <image-path>\n  dermalens theme [light|dark|toggle]\n  dermalens status",
        config::APP_NAME,
        config::APP_VERSION
    )
}
