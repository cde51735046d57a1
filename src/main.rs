//! tiff-uml - Diagrams of the internal structure of TIFF files.

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tokio::io::AsyncWriteExt;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tiff_uml::{
    config::{Cli, Command, DiagramConfig, DumpConfig, DumpFormat, ReportConfig},
    error::ReportError,
    io::FileRangeReader,
    report::{
        generate_report, parse_dump, render_diagram, to_json, MetadataDumper, NativeDumper,
        PlantUmlRenderer, ReportAssembler, TifftoolsDumper,
    },
    thumbnail::{ImageOptimizer, NoopOptimizer, OptipngOptimizer, ThumbnailFetcher},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Diagram(config) => run_diagram(config).await,
        Command::Dump(config) => run_dump(config).await,
    }
}

// =============================================================================
// Diagram Command
// =============================================================================

async fn run_diagram(config: DiagramConfig) -> ExitCode {
    init_logging(config.report.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    match diagram(&config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn diagram(config: &DiagramConfig) -> Result<(), ReportError> {
    let report = build_report(&config.report).await?;

    let renderer = PlantUmlRenderer::new(
        config.plantuml.clone(),
        config.plantuml_args.clone(),
        config.report.timeout(),
    );
    info!(command = ?renderer.command_args(), "Rendering diagram");
    let diagram = render_diagram(&report, &renderer, config.uml.is_some()).await?;

    if let Some(uml) = &config.uml {
        write_file(uml, diagram.document.as_bytes()).await?;
    }
    write_output(config.report.destination().map(|p| p.as_path()), &diagram.rendered).await
}

// =============================================================================
// Dump Command
// =============================================================================

async fn run_dump(config: DumpConfig) -> ExitCode {
    init_logging(config.report.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    match dump(&config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn dump(config: &DumpConfig) -> Result<(), ReportError> {
    let report = build_report(&config.report).await?;
    let output = match config.format {
        DumpFormat::Yaml => report,
        DumpFormat::Json => {
            let mut json = to_json(&parse_dump(&report)?, true)?;
            json.push('\n');
            json
        }
    };
    write_output(
        config.report.destination().map(|p| p.as_path()),
        output.as_bytes(),
    )
    .await
}

// =============================================================================
// Shared
// =============================================================================

/// Dump the source and add the selected thumbnails.
async fn build_report(config: &ReportConfig) -> Result<String, ReportError> {
    let reader = FileRangeReader::open(&config.source).await?;

    let dumper: Box<dyn MetadataDumper> = if config.tifftools {
        Box::new(TifftoolsDumper::new(
            config.tifftools_program.clone(),
            config.dump_args.clone(),
            config.timeout(),
        ))
    } else {
        Box::new(NativeDumper::new(config.max_items, config.max_text))
    };

    let optimizer: Box<dyn ImageOptimizer> = if config.no_optimize {
        Box::new(NoopOptimizer)
    } else {
        Box::new(OptipngOptimizer::new(
            config.optipng.clone(),
            config.timeout(),
        ))
    };

    let assembler = ReportAssembler::new(
        ThumbnailFetcher::with_default_decoders(),
        optimizer,
        config.selection(),
    )
    .with_thumb_range(config.minthumb, config.maxthumb);

    generate_report(&config.source, &reader, dumper.as_ref(), &assembler).await
}

async fn write_file(path: &Path, data: &[u8]) -> Result<(), ReportError> {
    tokio::fs::write(path, data)
        .await
        .map_err(|e| ReportError::Write {
            path: path.display().to_string(),
            message: e.to_string(),
        })
}

async fn write_output(path: Option<&Path>, data: &[u8]) -> Result<(), ReportError> {
    match path {
        Some(path) => {
            write_file(path, data).await?;
            info!(path = %path.display(), bytes = data.len(), "Wrote output");
            Ok(())
        }
        None => {
            let mut stdout = tokio::io::stdout();
            let result = async {
                stdout.write_all(data).await?;
                stdout.flush().await
            }
            .await;
            result.map_err(|e| ReportError::Write {
                path: "<stdout>".to_string(),
                message: e.to_string(),
            })
        }
    }
}

/// Initialize tracing on stderr; `RUST_LOG` overrides the verbosity flag.
fn init_logging(verbose: u8) {
    let env_filter = match verbose {
        0 => "tiff_uml=warn",
        1 => "tiff_uml=info",
        2 => "tiff_uml=debug",
        _ => "tiff_uml=trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
