use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use vigia::{
    capture::PlatformCapture,
    cli::{Cli, ReportFormat},
    context::AuditContext,
    dump,
    report::AuditReport,
    rules,
};

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Render the report and write it to the requested destination
fn export_report(report: &AuditReport, format: ReportFormat, output: Option<&Path>) -> Result<()> {
    let rendered = match format {
        ReportFormat::Text => report.render_text(),
        ReportFormat::Json => report.to_json()?,
    };
    match output {
        Some(path) => std::fs::write(path, rendered)
            .with_context(|| format!("failed to write report to {}", path.display()))?,
        None => print!("{rendered}"),
    }
    Ok(())
}

fn main() -> Result<ExitCode> {
    let args = Cli::parse();
    init_tracing(args.debug);

    let capture = PlatformCapture::from_file(&args.capture)
        .with_context(|| format!("failed to load capture {}", args.capture.display()))?;
    let mut ctx = AuditContext::new();

    if args.dump {
        dump::dump_snapshots(&mut ctx, &capture, &args.dump_dir)?;
        return Ok(ExitCode::SUCCESS);
    }

    let report = rules::run_all(&mut ctx, &capture);
    export_report(&report, args.format, args.output.as_deref())?;

    Ok(if report.passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
