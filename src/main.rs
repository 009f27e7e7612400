use std::fs;
use std::path::Path;

use shot_studio::app::{AppConfig, AppState, ConflictChoice, UploadFile, language_name};

/// Files given on the command line are imported into the active project;
/// a variant that already exists is replaced.
fn import_files(state: &mut AppState, paths: &[String]) {
    let mut files = Vec::new();
    for path in paths {
        let name = Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.clone());
        match fs::read(path) {
            Ok(bytes) => files.push(UploadFile::new(&name, bytes)),
            Err(e) => eprintln!("Skipping {}: {}", path, e),
        }
    }
    if files.is_empty() {
        return;
    }

    let mut replace = |_: &str, _: &str, _: &str| ConflictChoice::Replace;
    match state.upload_files(&files, &mut replace) {
        Ok(report) => {
            println!(
                "Imported {} new screenshot(s), {} language variant(s)",
                report.created.len(),
                report.variants.len()
            );
            for failure in &report.failures {
                eprintln!("Could not decode {}: {}", failure.filename, failure.message);
            }
        }
        Err(e) => eprintln!("Import failed: {}", e),
    }
}

fn print_summary(state: &AppState) {
    let project = state.project();
    for meta in state.projects() {
        let marker = if meta.id == project.id { "*" } else { " " };
        println!("{} {} ({} screenshots)", marker, meta.name, meta.screenshot_count);
    }
    let languages: Vec<String> = project.project_languages.iter().map(|l| language_name(l)).collect();
    println!("Languages: {}", languages.join(", "));
    let (width, height) = project.output_size();
    println!("Output: {} {}x{}", project.output_device.display_name(), width, height);
    for (index, missing) in state.missing_images() {
        println!(
            "  {} is missing: {}",
            project.screenshots[index].name,
            missing.join(", ")
        );
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::load();
    let mut state = AppState::open(config);
    state.wait_for_assets();

    if state.record_unreadable() {
        log::error!(
            "Project {} could not be read; it is left untouched in the store",
            state.active_project_id()
        );
        state.decline_migration();
    } else if state.migration_prompt_due() {
        // No interactive prompt here; upgraded records are written back.
        if let Err(e) = state.confirm_migration() {
            log::error!("Could not save the upgraded project: {}", e);
        }
    }

    let paths: Vec<String> = std::env::args().skip(1).collect();
    import_files(&mut state, &paths);

    print_summary(&state);
    state.shutdown();
}
