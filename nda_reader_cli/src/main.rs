use clap::{Arg, Command};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use indicatif_log_bridge::LogWrapper;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use libnda_reader::config::Config;
use libnda_reader::dataset::Dataset;
use libnda_reader::process::process;
use libnda_reader::worker_status::{Stage, WorkerStatus};

fn make_template_config(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    let yaml_str = serde_yaml::to_string(&config)?;
    let mut file = File::create(path)?;
    file.write_all(yaml_str.as_bytes())?;
    Ok(())
}

fn log_dataset(dataset: &Dataset) {
    for entry in dataset.entries() {
        log::info!(
            "{}: channel {}, {} records, {} steps, {} cycles",
            entry.name,
            entry.metadata.channel_name(),
            entry.streams.primary.len(),
            entry.steps.as_ref().map_or(0, |steps| steps.len()),
            entry.cycles.as_ref().map_or(0, |cycles| cycles.len()),
        );
    }
    for (path, e) in dataset.failures() {
        log::warn!("Skipped {}: {e}", path.display());
    }
}

fn main() {
    // Create a cli
    let matches = Command::new("nda_reader_cli")
        .arg_required_else_help(true)
        .subcommand(Command::new("new").about("Make a template configuration yaml file"))
        .arg(
            Arg::new("path")
                .short('p')
                .long("path")
                .required(true)
                .help("Path to the configuration file"),
        )
        .get_matches();

    // Initialize feedback
    let logger = simplelog::TermLogger::new(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );

    let pb_manager = MultiProgress::new();

    if let Err(e) = LogWrapper::new(pb_manager.clone(), logger).try_init() {
        eprintln!("Could not create logging/progress: {e}");
        return;
    }

    // Parse the cli
    let Some(config_path) = matches.get_one::<String>("path").map(PathBuf::from) else {
        log::error!("A configuration path is required");
        return;
    };

    if let Some(("new", _)) = matches.subcommand() {
        log::info!(
            "Making a template config at {}...",
            config_path.to_string_lossy()
        );
        match make_template_config(&config_path) {
            Ok(()) => log::info!("Done."),
            Err(e) => log::error!("Could not write template config: {e}"),
        }
        return;
    }

    // Load our config
    log::info!("Loading config from {}...", config_path.to_string_lossy());
    let config = match Config::read_config_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };
    log::info!("Config successfully loaded.");
    log::info!("Number of files: {}", config.file_paths.len());
    log::info!("Merge: {}", config.merge);
    log::info!("Step boundary: {:?}", config.step_boundary);
    log::info!("Number of workers: {}", config.n_threads);

    // Setup the progress bars, one per worker
    let style = ProgressStyle::with_template("{msg:>12} [{bar:40}] {pos:>3}%")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    let bars: Vec<ProgressBar> = (0..config.n_threads.max(1))
        .map(|_| {
            pb_manager.add(
                ProgressBar::new(100)
                    .with_style(style.clone())
                    .with_message(Stage::Decoding.to_string()),
            )
        })
        .collect();

    let (tx, rx) = mpsc::channel::<WorkerStatus>();
    // Spawn the task!
    let handle = std::thread::spawn(move || process(config, tx));

    // The channel closes once the processor is done with it
    while let Ok(status) = rx.recv() {
        if let Some(bar) = bars.get(status.worker_id) {
            bar.set_message(status.stage.to_string());
            bar.set_position((status.progress * 100.0) as u64);
        }
    }

    for bar in bars.iter() {
        bar.finish();
    }

    match handle.join() {
        Ok(result) => match result {
            Ok(dataset) => {
                log_dataset(&dataset);
                log::info!("Successfully processed data!");
            }
            Err(e) => log::error!("Processing failed with error: {e}"),
        },
        Err(_) => log::error!("Failed to join processing task!"),
    }

    log::info!("Done.");
}
