use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use photo_renamer_core::{
    app_paths, batch_rename, collect_photo_files, inspect_files, load_config, save_config,
    token_catalogue, validate_template, write_archive, AppConfig, ArchiveStrategy,
    BatchMapping, ExifMetadataProvider, FileId, LocalFile,
};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "photo-renamer-cli")]
#[command(about = "Batch-rename photos from their EXIF metadata and pack them into a zip")]
struct Cli {
    /// Increase log output (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Rename(RenameArgs),
    /// List the tokens a template may use.
    Tokens,
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
struct ConfigArgs {
    #[command(subcommand)]
    action: ConfigAction,
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    Show,
    /// Write the default configuration file if none exists.
    Init,
}

#[derive(Debug, Args)]
struct RenameArgs {
    #[arg(long)]
    input: PathBuf,
    #[arg(long)]
    recursive: bool,
    #[arg(long)]
    include_hidden: bool,
    #[arg(long)]
    template: Option<String>,
    #[arg(long)]
    start_counter: Option<u64>,
    #[arg(long)]
    padding: Option<usize>,
    #[arg(long)]
    custom: Option<String>,
    /// Do not append the original extension to new names.
    #[arg(long)]
    no_extension: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
    /// Write the renamed files into this zip (a directory gets the suggested name).
    #[arg(long)]
    archive: Option<PathBuf>,
    #[arg(long, requires = "archive")]
    folder: Option<String>,
    #[arg(long, requires = "archive", value_parser = clap::value_parser!(u32).range(0..=9))]
    compression_level: Option<u32>,
    #[arg(long, requires = "archive")]
    no_manifest: bool,
    #[arg(long, value_enum, default_value_t = StrategyArg::Auto, requires = "archive")]
    strategy: StrategyArg,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    Auto,
    Buffered,
    Streaming,
}

impl From<StrategyArg> for ArchiveStrategy {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::Auto => ArchiveStrategy::Auto,
            StrategyArg::Buffered => ArchiveStrategy::Buffered,
            StrategyArg::Streaming => ArchiveStrategy::Streaming,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Rename(args) => cmd_rename(args),
        Commands::Tokens => cmd_tokens(),
        Commands::Config(config) => match config.action {
            ConfigAction::Show => cmd_config_show(),
            ConfigAction::Init => cmd_config_init(),
        },
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

fn cmd_rename(args: RenameArgs) -> Result<()> {
    let config = load_config()?;
    let template = args.template.clone().unwrap_or_else(|| config.template.clone());
    validate_template(&template)?;

    let mut batch_options = config.batch_options();
    if let Some(start) = args.start_counter {
        batch_options.start_counter = start;
    }
    if let Some(padding) = args.padding {
        batch_options.counter_padding = padding;
    }
    if let Some(custom) = args.custom.clone() {
        batch_options.custom_text = custom;
    }
    if args.no_extension {
        batch_options.preserve_extension = false;
    }

    let recursive = args.recursive || config.recursive_default;
    let include_hidden = args.include_hidden || config.include_hidden_default;
    let (paths, stats) = collect_photo_files(&args.input, recursive, include_hidden)?;
    let candidates = paths
        .iter()
        .map(|path| LocalFile::open(path))
        .collect::<Result<Vec<_>>>()?;

    let inspected = inspect_files(&candidates, &ExifMetadataProvider);
    let mut metadata = HashMap::new();
    let mut files = Vec::with_capacity(candidates.len());
    for (file, inspection) in candidates.into_iter().zip(inspected) {
        if inspection.kind.is_none() {
            continue;
        }
        if let Some(record) = inspection.metadata {
            metadata.insert(FileId(files.len()), record);
        }
        files.push(file);
    }
    let rejected = stats.photo_files - files.len();

    let mapping = batch_rename(&files, &template, &metadata, &batch_options)?;

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&mapping)?),
        OutputFormat::Table => print_table(&mapping),
    }
    eprintln!(
        "scanned={} photos={} rejected={} hidden_skip={} other_skip={} warnings={}",
        stats.scanned_files,
        stats.photo_files,
        rejected,
        stats.skipped_hidden,
        stats.skipped_other,
        mapping.warning_count()
    );

    if let Some(target) = &args.archive {
        let mut archive_options = config.archive_options();
        if let Some(folder) = args.folder.clone() {
            archive_options.folder_prefix = Some(folder);
        }
        if let Some(level) = args.compression_level {
            archive_options.compression_level = level;
        }
        if args.no_manifest {
            archive_options.include_manifest = false;
        }
        archive_options.strategy = args.strategy.into();
        write_zip(target, &files, &mapping, &archive_options)?;
    }

    Ok(())
}

fn write_zip(
    target: &Path,
    files: &[LocalFile],
    mapping: &BatchMapping,
    options: &photo_renamer_core::ArchiveOptions,
) -> Result<()> {
    let (path, named_later) = if target.is_dir() {
        (target.join(".photo-renamer-partial.zip"), true)
    } else {
        (target.to_path_buf(), false)
    };

    let file = File::create(&path)
        .with_context(|| format!("could not create archive: {}", path.display()))?;
    let result = write_archive(BufWriter::new(file), files, mapping, options, &mut |p| {
        log::info!("[{}/{}] {}", p.processed, p.total, p.current)
    });
    let (writer, summary) = match result {
        Ok(done) => done,
        Err(err) => {
            let _ = std::fs::remove_file(&path);
            return Err(err).context("archive creation failed");
        }
    };
    writer
        .into_inner()
        .map_err(|err| err.into_error())
        .with_context(|| format!("could not flush archive: {}", path.display()))?;

    let final_path = if named_later {
        let final_path = target.join(&summary.suggested_filename);
        std::fs::rename(&path, &final_path).with_context(|| {
            format!("could not move archive into place: {}", final_path.display())
        })?;
        final_path
    } else {
        path
    };

    eprintln!(
        "archive written: {} ({} entries)",
        final_path.display(),
        summary.file_count
    );
    Ok(())
}

fn cmd_tokens() -> Result<()> {
    for info in token_catalogue() {
        println!("{:<14} {}", info.token, info.description);
    }
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    let paths = app_paths()?;
    println!("config file: {}", paths.config_path.display());
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let paths = app_paths()?;
    if paths.config_path.exists() {
        println!("config already exists: {}", paths.config_path.display());
        return Ok(());
    }
    save_config(&AppConfig::default())?;
    println!("config written: {}", paths.config_path.display());
    Ok(())
}

fn print_table(mapping: &BatchMapping) {
    println!("original -> renamed");
    for entry in mapping.entries() {
        println!("{} -> {}", entry.original_name, entry.result.filename);
        for warning in &entry.result.warnings {
            println!("    ! {warning}");
        }
    }
}
