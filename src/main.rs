// Mon Aug 24 2026 - Alex

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use esmdig::config::ScanConfig;
use esmdig::memory::MappedFile;
use esmdig::scan::{correlate, AssetStringScanner, ChunkedScanner, ScanResult, Scanner};
use esmdig::utils::logging::LoggingUtils;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::Write;
use std::ops::Range;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(author = "Alex")]
#[command(version = "0.3.0")]
#[command(about = "Structure recovery for ESM records in plugin files and memory captures", long_about = None)]
struct Args {
    /// Plugin file or raw memory capture to scan.
    #[arg(short, long)]
    input: PathBuf,

    #[arg(short, long, default_value = "scan_results.json")]
    output: PathBuf,

    /// Scan the whole file as one buffer instead of chunked windows.
    #[arg(long)]
    whole_buffer: bool,

    /// Byte ranges to skip, as start-end hex pairs (e.g. 0x400-0x800).
    #[arg(long)]
    exclude: Vec<String>,

    /// Disable skip-ahead over confirmed record bodies.
    #[arg(long)]
    no_skip_ahead: bool,

    /// Skip the free-text asset/dialogue pass.
    #[arg(long)]
    no_assets: bool,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[arg(long)]
    no_progress: bool,
}

fn main() {
    let args = Args::parse();
    LoggingUtils::init(args.verbose as usize);

    println!("{}", "ESM Structure Recovery".cyan().bold());
    println!("{}", "=".repeat(50).cyan());
    println!();

    let exclusions = match parse_exclusions(&args.exclude) {
        Ok(e) => e,
        Err(bad) => {
            eprintln!("{} Bad exclusion range: {}", "[!]".red(), bad);
            std::process::exit(1);
        }
    };

    let start_time = Instant::now();
    println!("{} Mapping input: {}", "[*]".blue(), args.input.display());

    let mapped = match MappedFile::open(&args.input) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("{} Failed to map input: {}", "[!]".red(), e);
            std::process::exit(1);
        }
    };
    println!("{} Mapped {} bytes", "[+]".green(), mapped.len());

    let mut config = ScanConfig::default();
    config.skip_ahead = !args.no_skip_ahead;

    let mut result = if args.whole_buffer {
        let scanner = Scanner::new(config.clone());
        let mut result = ScanResult::new();
        scanner.scan_into(mapped.as_slice(), 0, &exclusions, &mut result);
        correlate::correlate_identifiers(
            mapped.as_slice(),
            &mut result,
            config.correlation_window,
        );
        result
    } else {
        run_chunked(&mapped, &config, &exclusions, args.no_progress)
    };

    if !args.no_assets {
        println!("{} Running asset/dialogue string pass...", "[*]".blue());
        AssetStringScanner::new(config.asset_path_limit).scan_into(
            mapped.as_slice(),
            0,
            &mut result,
        );
    }

    print_summary(&result);

    if let Err(e) = save_results(&result, &args.output) {
        eprintln!("{} Failed to save results: {}", "[!]".red(), e);
        std::process::exit(1);
    }
    println!("{} Results saved to: {}", "[+]".green(), args.output.display());

    let elapsed = start_time.elapsed();
    println!();
    println!("{}", "=".repeat(50).cyan());
    println!(
        "{} Scan complete in {:.2}s",
        "[+]".green(),
        elapsed.as_secs_f64()
    );
}

fn run_chunked(
    mapped: &MappedFile,
    config: &ScanConfig,
    exclusions: &[Range<u64>],
    no_progress: bool,
) -> ScanResult {
    let chunked = ChunkedScanner::new(config.clone());

    let bar = if no_progress {
        None
    } else {
        let pb = ProgressBar::new(mapped.len());
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
                .unwrap()
                .progress_chars("#>-"),
        );
        pb.set_message("Scanning...");
        Some(pb)
    };

    let mut cb = |done: u64, _total: u64, found: usize| {
        if let Some(pb) = &bar {
            pb.set_position(done);
            pb.set_message(format!("{} records", found));
        }
    };
    let mut result = chunked.scan_file(mapped, exclusions, Some(&mut cb));
    if let Some(pb) = &bar {
        pb.finish_with_message("Scan done");
    }

    correlate::correlate_identifiers_mapped(
        mapped,
        &mut result,
        config.correlation_window,
        chunked.pool(),
    );
    result
}

fn parse_exclusions(raw: &[String]) -> Result<Vec<Range<u64>>, String> {
    let mut out = Vec::new();
    for range in raw {
        let Some((start, end)) = range.split_once('-') else {
            return Err(range.clone());
        };
        let parse = |s: &str| -> Option<u64> {
            let s = s.trim();
            if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                u64::from_str_radix(hex, 16).ok()
            } else {
                s.parse().ok()
            }
        };
        match (parse(start), parse(end)) {
            (Some(s), Some(e)) if s < e => out.push(s..e),
            _ => return Err(range.clone()),
        }
    }
    Ok(out)
}

fn print_summary(result: &ScanResult) {
    println!();
    println!("{}", "Results Summary".cyan().bold());
    println!("{}", "-".repeat(40).cyan());
    println!(
        "  Main records:    {}",
        result.record_count().to_string().green()
    );
    println!(
        "  Group headers:   {}",
        result.groups.len().to_string().green()
    );
    println!(
        "  Subrecords:      {}",
        result.subrecord_count().to_string().green()
    );
    println!(
        "  Editor IDs:      {}",
        result.editor_ids.len().to_string().green()
    );
    println!(
        "  Setting names:   {}",
        result.setting_names.len().to_string().green()
    );
    println!(
        "  Asset paths:     {}",
        result.asset_paths.len().to_string().green()
    );
    println!(
        "  Dialogue lines:  {}",
        result.dialogue_lines.len().to_string().green()
    );
    println!(
        "  Runtime entries: {}",
        result.runtime_entries.len().to_string().green()
    );
    println!();
}

fn save_results(result: &ScanResult, path: &PathBuf) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(result).context("serializing scan results")?;
    let mut file = File::create(path)
        .with_context(|| format!("creating output file {}", path.display()))?;
    file.write_all(json.as_bytes()).context("writing results")?;
    Ok(())
}
