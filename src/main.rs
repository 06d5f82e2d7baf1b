//! SizeCap CLI - shrink a folder of images under a byte-size ceiling
//!
//! Asks for a folder (or takes `--input`), then writes a fitted copy of every
//! image into a fresh output folder next to the originals.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use tracing::debug;

use sizecap::{init_with_config, BatchDriver, Config, Profiles, RunSummary, MAX_OUTPUT_BYTES};

/// SizeCap - fit every image in a folder under 8 MiB
#[derive(Parser)]
#[command(
    name = "sizecap",
    version,
    about = "Shrink a folder of images until each one fits under 8 MiB",
    long_about = "SizeCap downsamples every image in a folder step by step until its PNG \
                  encoding is smaller than 8 MiB, and writes the results into a new folder \
                  inside the input folder. Files are processed in batches on a bounded \
                  worker pool."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Folder with images (prompted for when omitted)
    #[arg(short, long, value_name = "PATH")]
    input: Option<PathBuf>,

    /// Configuration file path (.toml or .yaml)
    #[arg(short, long, value_name = "FILE", env = "SIZECAP_CONFIG")]
    config: Option<PathBuf>,

    /// Processing profile name
    #[arg(short, long, value_name = "NAME")]
    profile: Option<String>,

    /// Files per batch
    #[arg(long, value_name = "COUNT")]
    batch_size: Option<usize>,

    /// Downscale factor added per search level
    #[arg(long, value_name = "STEP")]
    step: Option<f32>,

    /// Name of the output folder
    #[arg(long, value_name = "NAME")]
    destination: Option<String>,

    /// Worker threads per batch
    #[arg(long, value_name = "COUNT")]
    parallelism: Option<usize>,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short = 'Q', long, conflicts_with = "verbose")]
    quiet: bool,
}

/// Available subcommands
#[derive(Subcommand)]
enum Commands {
    /// List available processing profiles
    Profiles {
        /// Show the settings of each profile
        #[arg(long)]
        detailed: bool,
    },
    /// Validate configuration file
    Config {
        /// Configuration file to validate
        file: PathBuf,
    },
    /// Generate example configuration file
    ExampleConfig {
        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Use YAML format instead of TOML
        #[arg(long)]
        yaml: bool,
    },
}

fn main() {
    let mut cli = Cli::parse();

    if let Some(command) = cli.command.take() {
        if let Err(e) = handle_subcommand(command, cli.config.as_deref()) {
            eprintln!("{}: {:#}", style("Error").red().bold(), e);
            process::exit(1);
        }
        return;
    }

    if let Err(e) = run(&cli) {
        eprintln!("{}: {:#}", style("Error").red().bold(), e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref(), cli.profile.as_deref())?;

    if cli.quiet {
        config.logging.level = "error".to_string();
    } else if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    init_with_config(&config)?;

    // Logging is up, so rejected environment values get reported
    config.processing.apply_env_overrides();
    apply_cli_overrides(cli, &mut config);
    config.validate()?;
    debug!("Effective settings: {:?}", config.processing);

    let input = match &cli.input {
        Some(path) => path.clone(),
        None => prompt_for_folder()?,
    };

    let summary = BatchDriver::new(config.processing.clone()).run(&input)?;
    print_summary(&summary, cli.json)
}

/// Flags beat every other configuration source
fn apply_cli_overrides(cli: &Cli, config: &mut Config) {
    let settings = &mut config.processing;
    if let Some(batch_size) = cli.batch_size {
        settings.batch_size = batch_size;
    }
    if let Some(step) = cli.step {
        settings.step_of_compression = step;
    }
    if let Some(destination) = &cli.destination {
        settings.destination_folder_name = destination.clone();
    }
    if let Some(parallelism) = cli.parallelism {
        settings.max_degree_of_parallelism = parallelism;
    }
}

/// Ask for the input folder and read one line from stdin
fn prompt_for_folder() -> Result<PathBuf> {
    println!("Please enter the path to folder with images:");
    io::stdout().flush().context("Failed to flush prompt")?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read folder path from stdin")?;

    Ok(PathBuf::from(strip_line_ending(&line)))
}

/// Drop the trailing line ending only; everything else is kept verbatim
fn strip_line_ending(line: &str) -> &str {
    line.strip_suffix('\n')
        .map(|rest| rest.strip_suffix('\r').unwrap_or(rest))
        .unwrap_or(line)
}

/// Handle subcommands
fn handle_subcommand(command: Commands, config_path: Option<&Path>) -> Result<()> {
    match command {
        Commands::Profiles { detailed } => show_profiles(config_path, detailed)?,
        Commands::Config { file } => validate_config_file(&file)?,
        Commands::ExampleConfig { output, yaml } => {
            let output = output.unwrap_or_else(|| sizecap::config::default_config_path(yaml));
            generate_example_config(&output)?;
        }
    }
    Ok(())
}

/// Show available profiles
fn show_profiles(config_path: Option<&Path>, detailed: bool) -> Result<()> {
    let config = match config_path {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    println!("{}", style("Available Processing Profiles:").bold());
    println!();

    let mut names: Vec<&String> = config.profiles.keys().collect();
    names.sort();

    for name in names {
        println!("{}", style(name).cyan().bold());
        if detailed {
            let description = Profiles::describe()
                .iter()
                .find(|(builtin, _)| *builtin == name.as_str())
                .map(|(_, text)| *text);
            if let Some(text) = description {
                println!("  {}", text);
            }
            let profile = config.get_profile(name)?;
            println!("  batch size:  {}", profile.batch_size);
            println!("  step:        {}", profile.step_of_compression);
            println!("  destination: {}", profile.destination_folder_name);
            println!("  workers:     {}", profile.max_degree_of_parallelism);
            println!();
        }
    }

    if !detailed {
        println!();
        println!("Use {} for detailed information", style("--detailed").dim());
    }
    Ok(())
}

/// Validate configuration file
fn validate_config_file(file_path: &Path) -> Result<()> {
    let config = Config::from_file(file_path)
        .with_context(|| format!("Cannot load {}", file_path.display()))?;
    config.validate()?;

    println!("{}: Configuration file is valid", style("Success").green().bold());
    println!("Profiles: {}", config.profiles.len());
    Ok(())
}

/// Generate example configuration file
fn generate_example_config(output_path: &Path) -> Result<()> {
    Config::default().to_file(output_path)?;

    println!(
        "{}: Generated example configuration: {}",
        style("Success").green().bold(),
        output_path.display()
    );
    Ok(())
}

/// Print processing summary
fn print_summary(summary: &RunSummary, json_output: bool) -> Result<()> {
    if json_output {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    let Some(folder) = &summary.output_folder else {
        println!("{}", style("No files to process").yellow());
        return Ok(());
    };

    println!();
    println!("{}", style("Processing Summary:").bold());
    println!("  {}: {}", style("Output").blue(), folder.display());
    println!("  {}: {}", style("Saved").green(), summary.saved);
    if summary.skipped > 0 {
        println!("  {}: {}", style("Skipped").red(), summary.skipped);
    }
    println!(
        "  {}: {} in {} batches",
        style("Files").blue(),
        summary.files_found,
        summary.batches
    );
    println!("  {}: {:.2}s", style("Duration").blue(), summary.elapsed.as_secs_f64());

    if summary.saved > 0 {
        println!(
            "  {}: {:.2}MB written, {} average (limit {:.0} MiB)",
            style("Size").cyan(),
            summary.bytes_written as f64 / 1024.0 / 1024.0,
            summary.average_size_text(),
            MAX_OUTPUT_BYTES as f64 / 1024.0 / 1024.0
        );
        println!(
            "  {}: {:.1} files/sec",
            style("Speed").cyan(),
            summary.files_per_second()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_line_ending() {
        assert_eq!(strip_line_ending("photos\n"), "photos");
        assert_eq!(strip_line_ending("photos\r\n"), "photos");
        assert_eq!(strip_line_ending(" spaced path \n"), " spaced path ");
        assert_eq!(strip_line_ending("no newline"), "no newline");
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "sizecap",
            "--batch-size",
            "9",
            "--destination",
            "Out",
            "--parallelism",
            "3",
        ]);
        let mut config = Config::default();
        apply_cli_overrides(&cli, &mut config);

        assert_eq!(config.processing.batch_size, 9);
        assert_eq!(config.processing.destination_folder_name, "Out");
        assert_eq!(config.processing.max_degree_of_parallelism, 3);
        assert_eq!(config.processing.step_of_compression, 0.1);
    }

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
