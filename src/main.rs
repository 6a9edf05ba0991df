//! zepbmerge - pair and merge notification/ZEPB PDF sets, and batch
//! compress PDFs.
//!
//! Command-line boundary over the library pipelines. Ctrl-C requests
//! cooperative cancellation of the running pipeline.

mod cli;

use clap::Parser;
use std::process;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, ScanKind, collect_paths_for_patterns};
use zepbmerge::cancel::CancelToken;
use zepbmerge::compress::{
    CompressFilesOptions, CompressFolderOptions, CompressPipeline, CompressProgress,
    CompressSummary, GhostscriptEngine,
};
use zepbmerge::dictionary::{notification_dictionary, zepb_dictionary};
use zepbmerge::merge::{MergeEvent, MergeOptions, MergePipeline, MergeSummary};
use zepbmerge::output::OutputFormatter;

/// Exit code used when a run was cancelled by the user.
const EXIT_CANCELLED: i32 = 130;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("Error: {err:#}");
            process::exit(1);
        }
    }
}

/// Main application logic. Returns the process exit code.
async fn run(cli: Cli) -> anyhow::Result<i32> {
    match cli.command {
        Command::Merge {
            main,
            insert,
            output,
            recursive_main,
            recursive_insert,
            json,
        } => {
            let formatter = OutputFormatter::new(cli.quiet || json, cli.verbose);
            let token = CancelToken::new();
            spawn_cancel_on_ctrl_c(&token);

            formatter.section(&format!("{} v{}", zepbmerge::NAME, zepbmerge::VERSION));
            formatter.info("Scanning folders and merging matched pairs...");
            formatter.blank_line();

            let pipeline = MergePipeline::new();
            let options = MergeOptions {
                main_folder: main,
                insert_folder: insert,
                output_folder: output,
                recursive_main,
                recursive_insert,
            };

            let summary = pipeline
                .merge(&options, &token, |event| {
                    render_merge_event(&formatter, &event);
                })
                .await;

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                render_merge_summary(&formatter, &summary);
            }

            Ok(exit_code(&summary.errors, summary.canceled))
        }

        Command::Compress {
            input_folder,
            files,
            output,
            quality,
            no_ghostscript,
            json,
        } => {
            let formatter = OutputFormatter::new(cli.quiet || json, cli.verbose);
            let token = CancelToken::new();
            spawn_cancel_on_ctrl_c(&token);

            let pipeline = if no_ghostscript {
                CompressPipeline::with_engine(GhostscriptEngine::disabled())
            } else {
                CompressPipeline::new()
            };

            let on_progress = |progress: CompressProgress| {
                render_compress_progress(&formatter, &progress);
            };

            let summary = match input_folder {
                Some(input_folder) => {
                    let options = CompressFolderOptions {
                        input_folder,
                        output_folder: output,
                        quality,
                    };
                    pipeline
                        .compress_folder(&options, &token, on_progress)
                        .await
                }
                None => {
                    let options = CompressFilesOptions {
                        files: collect_paths_for_patterns(&files)?,
                        output_folder: output,
                        quality,
                    };
                    pipeline.compress_files(&options, &token, on_progress).await
                }
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                render_compress_summary(&formatter, &summary);
            }

            Ok(exit_code(&summary.errors, summary.canceled))
        }

        Command::Scan {
            folder,
            kind,
            recursive,
            json,
        } => {
            let formatter = OutputFormatter::new(cli.quiet || json, cli.verbose);

            let dict = match kind {
                ScanKind::Zepb => zepb_dictionary(&folder, recursive).await,
                ScanKind::Notification => notification_dictionary(&folder, recursive).await,
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&dict)?);
            } else {
                for (code, path) in &dict {
                    formatter.info(&format!("{code} -> {}", path.display()));
                }
                formatter.blank_line();
                formatter.success(&format!("{} file(s) with codes", dict.len()));
            }

            Ok(0)
        }
    }
}

/// Cancel the given token when Ctrl-C is received.
fn spawn_cancel_on_ctrl_c(token: &CancelToken) {
    let token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });
}

fn exit_code(errors: &[String], canceled: bool) -> i32 {
    if canceled {
        EXIT_CANCELLED
    } else if errors.is_empty() {
        0
    } else {
        1
    }
}

fn render_merge_event(formatter: &OutputFormatter, event: &MergeEvent) {
    match event {
        MergeEvent::Unmatched {
            unmatched_notifications,
            unmatched_zepb,
        } => {
            if !unmatched_notifications.is_empty() {
                formatter.warning(&format!(
                    "{} notification(s) without a matching ZEPB",
                    unmatched_notifications.len()
                ));
                for item in unmatched_notifications {
                    formatter.detail(&item.code, &item.file);
                }
            }
            if !unmatched_zepb.is_empty() {
                formatter.warning(&format!(
                    "{} ZEPB document(s) without a matching notification",
                    unmatched_zepb.len()
                ));
                for item in unmatched_zepb {
                    formatter.detail(&item.code, &item.file);
                }
            }
        }
        MergeEvent::Progress {
            current,
            total,
            message,
            ..
        } => {
            formatter.info(&format!("[{current}/{total}] {message}"));
        }
    }
}

fn render_merge_summary(formatter: &OutputFormatter, summary: &MergeSummary) {
    formatter.blank_line();

    if summary.canceled {
        formatter.warning("Merge cancelled");
    }

    formatter.success(&format!(
        "Merged {} of {} pair(s), skipped {}",
        summary.processed, summary.total, summary.skipped
    ));

    if let Some(registry) = &summary.registry {
        formatter.detail("Register", &registry.display().to_string());
    }

    for error in &summary.errors {
        formatter.error(error);
    }
}

fn render_compress_progress(formatter: &OutputFormatter, progress: &CompressProgress) {
    if progress.ok {
        let sizes = match (progress.in_size, progress.out_size) {
            (Some(in_size), Some(out_size)) => format!(" ({in_size} -> {out_size} bytes)"),
            _ => String::new(),
        };
        formatter.info(&format!(
            "[{}/{}] {}{}",
            progress.index, progress.total, progress.name, sizes
        ));
    } else {
        formatter.warning(&format!(
            "[{}/{}] {} failed: {}",
            progress.index,
            progress.total,
            progress.name,
            progress.error.as_deref().unwrap_or("unknown error")
        ));
    }
}

fn render_compress_summary(formatter: &OutputFormatter, summary: &CompressSummary) {
    formatter.blank_line();

    if summary.canceled {
        formatter.warning("Compression cancelled");
    }

    formatter.success(&format!(
        "Compressed {} of {} file(s)",
        summary.files.iter().filter(|f| f.ok).count(),
        summary.total
    ));
    formatter.detail("Engine", &summary.engine_used);

    for error in &summary.errors {
        formatter.error(error);
    }
}
