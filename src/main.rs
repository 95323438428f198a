use clap::{Parser, Subcommand};
use log::LevelFilter;
use std::error::Error;
use std::path::PathBuf;

use snapdiff::canvas::Canvas;
use snapdiff::compare::ComparisonStyle;
use snapdiff::config::{
    DEFAULT_HTML_REPORT_PATH, DEFAULT_RESULT_DIR, DEFAULT_SUMMARY_PATH, Settings, TaskType,
};
use snapdiff::report::{
    ContextData, DefaultReporter, collect_results, merge_into_file, read_results_file,
    results_to_json, write_html_report,
};
use snapdiff::runner::CaptureProcessor;

/// snapdiff - screenshot comparison against golden images
#[derive(Parser, Debug)]
#[command(
    name = "snapdiff",
    about = "Compare screenshots against golden images and aggregate the results",
    after_help = "ENVIRONMENT VARIABLES:\n\
        SNAPDIFF_TASK              none, record, compare, verify, compare-and-record, verify-and-record\n\
        SNAPDIFF_OUTPUT_DIR        Directory for _compare and _actual images\n\
        SNAPDIFF_RESULT_DIR        Directory for per-capture JSON results\n\
        SNAPDIFF_RESIZE_SCALE      Scale applied to captures\n\
        SNAPDIFF_CHANGE_THRESHOLD  Changed pixel ratio tolerated as unchanged\n\
        SNAPDIFF_COMPARISON_STYLE  simple or grid\n\
        SNAPDIFF_PIXEL_FORMAT      argb8888 or rgb565\n\
        SNAPDIFF_IMAGE_FORMAT      png or jpeg\n\
        RUST_LOG                   Log filter (overrides --verbose)"
)]
struct Args {
    /// Log every pipeline step
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify a new image against its golden and write the artifacts
    Compare {
        /// Golden image path
        #[arg(short, long)]
        golden: PathBuf,

        /// Newly captured image
        #[arg(short, long)]
        new: PathBuf,

        /// Task type (defaults to SNAPDIFF_TASK, then compare)
        #[arg(short, long)]
        task: Option<TaskType>,

        /// Directory for _compare and _actual images
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Directory for per-capture JSON results
        #[arg(long)]
        result_dir: Option<PathBuf>,

        /// Changed pixel ratio tolerated as unchanged
        #[arg(long)]
        threshold: Option<f64>,

        /// Scale applied to the new image before comparing and saving
        #[arg(long)]
        resize_scale: Option<f64>,

        /// Layout of the comparison image: simple or grid
        #[arg(long)]
        style: Option<ComparisonStyle>,

        /// Pixels per density-independent pixel (enables the grid layout)
        #[arg(long)]
        density: Option<f32>,

        /// Context data as a JSON object, stored with the result
        #[arg(long)]
        context: Option<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Collect per-capture results into a summary (and optionally HTML)
    Report {
        /// Directory holding per-capture JSON results
        #[arg(short, long, env = "SNAPDIFF_RESULT_DIR", default_value = DEFAULT_RESULT_DIR)]
        results: PathBuf,

        /// Summary JSON to merge into
        #[arg(short, long, default_value = DEFAULT_SUMMARY_PATH)]
        summary: PathBuf,

        /// Also write an HTML report
        #[arg(long)]
        html: bool,

        /// HTML report path
        #[arg(long, default_value = DEFAULT_HTML_REPORT_PATH)]
        html_path: PathBuf,
    },

    /// Merge one summary JSON into another
    Merge {
        /// Summary to read results from
        #[arg(short, long)]
        from: PathBuf,

        /// Summary to merge into (created if missing)
        #[arg(short, long)]
        into: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .init();
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging(args.verbose);

    match args.command {
        Commands::Compare {
            golden,
            new,
            task,
            output_dir,
            result_dir,
            threshold,
            resize_scale,
            style,
            density,
            context,
            json,
        } => {
            let mut settings = Settings::from_env();
            settings = match task {
                Some(task) => settings.task(task),
                None if settings.task == TaskType::None => settings.task(TaskType::Compare),
                None => settings,
            };
            if let Some(dir) = output_dir {
                settings = settings.output_dir(dir);
            }
            if let Some(dir) = result_dir {
                settings = settings.result_dir(dir);
            }
            if let Some(threshold) = threshold {
                settings = settings.change_threshold(threshold);
            }
            if let Some(scale) = resize_scale {
                settings = settings.resize_scale(scale);
            }
            if let Some(style) = style {
                settings = settings.comparison_style(style);
            }
            if let Some(density) = density {
                settings = settings.density(density);
            }

            let context_data: ContextData = match context {
                Some(raw) => serde_json::from_str(&raw)
                    .map_err(|e| format!("--context must be a JSON object: {}", e))?,
                None => ContextData::new(),
            };

            let mut canvas = Canvas::load(&new, settings.pixel_format)?;
            let reporter = DefaultReporter::new(settings.result_dir.clone());
            let processor = CaptureProcessor::new(settings);
            let result = processor.process(&mut canvas, &golden, context_data, &reporter);
            canvas.release();
            let result = result?;

            match result {
                Some(result) if json => println!("{}", serde_json::to_string_pretty(&result)?),
                Some(result) => {
                    println!("{}: {}", result.type_name(), golden.display());
                    if let Some(compare) = result.compare_file() {
                        println!("  Compare: {}", compare.display());
                    }
                    if let Some(actual) = result.actual_file() {
                        println!("  Actual:  {}", actual.display());
                    }
                }
                None => println!("Task is none; nothing to do"),
            }
        }

        Commands::Report {
            results,
            summary,
            html,
            html_path,
        } => {
            let collected = collect_results(&results)?;
            let merged = merge_into_file(&summary, collected)?;
            println!("{}", results_to_json(&merged)?);
            if html {
                write_html_report(&html_path, &merged)?;
                println!("HTML report: {}", html_path.display());
            }
        }

        Commands::Merge { from, into } => {
            let incoming = read_results_file(&from)?;
            let merged = merge_into_file(&into, incoming)?;
            println!(
                "Merged {} into {}: total {}, recorded {}, added {}, changed {}, unchanged {}",
                from.display(),
                into.display(),
                merged.summary.total,
                merged.summary.recorded,
                merged.summary.added,
                merged.summary.changed,
                merged.summary.unchanged
            );
        }
    }

    Ok(())
}
