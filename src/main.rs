use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use dream_annotator::{
    app::run_annotate,
    config::{Cli, Command},
    merge::merge_files,
    observability::{Telemetry, tracing as telemetry_tracing},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    std::panic::set_hook(Box::new(|panic_info| {
        let thread = std::thread::current();
        let thread_name = thread.name().unwrap_or("unnamed");
        let message = panic_info
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| {
                panic_info
                    .payload()
                    .downcast_ref::<String>()
                    .map(String::as_str)
            })
            .unwrap_or("unknown panic payload");

        if let Some(location) = panic_info.location() {
            error!(
                thread = thread_name,
                file = location.file(),
                line = location.line(),
                column = location.column(),
                message,
                "panic occurred"
            );
        } else {
            error!(thread = thread_name, message, "panic occurred without location information");
        }
    }));

    let cli = Cli::parse();
    let telemetry = Telemetry::new().context("failed to initialise telemetry")?;

    let result = match &cli.command {
        Command::Annotate(config) => run_annotate(config, &telemetry).await.map(|outcome| {
            info!(
                run_id = %outcome.run_id,
                records = outcome.persisted.records,
                path = %outcome.persisted.path.display(),
                "annotation finished"
            );
        }),
        Command::Merge(config) => merge_files(config).map(|summary| {
            info!(
                total = summary.total,
                path = %summary.output.display(),
                "merge finished"
            );
        }),
    };

    if let Err(err) = &result {
        error!(error = format!("{err:#}"), "run failed");
    }
    telemetry_tracing::shutdown();
    result
}
