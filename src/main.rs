use anyhow::Context;
use clap::Parser;
use std::io::Write;
use icd_scrape::utils::logger;
use icd_scrape::{run_with_config, CliConfig, ScrapeConfig, ScrapeError};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    logger::init_cli_logger(cli.verbose, cli.log_format);
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => fail(e),
    };

    if cli.list_revisions {
        return list_revisions(&config);
    }

    let (revision, output_path) = match (cli.code_revision(), cli.output_path()) {
        (Ok(revision), Ok(path)) => (revision, path.to_string()),
        (Err(e), _) | (_, Err(e)) => fail(e),
    };

    tracing::info!("Starting icd-scrape for {}", revision);
    if config.monitoring.enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    match run_with_config(&config, &revision, &output_path).await {
        Ok(report) => {
            tracing::info!("✅ Scrape completed successfully!");
            println!(
                "✅ Wrote {} codes for {} to {}",
                report.code_set.len(),
                revision,
                report.output_path
            );
            Ok(())
        }
        Err(e) => fail(e),
    }
}

fn list_revisions(config: &ScrapeConfig) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();
    for entry in config.catalog().entries() {
        writeln!(
            stdout,
            "{}:{}\t{}{}\t{}",
            entry.system,
            entry.version,
            config.source.base_url.trim_end_matches('/'),
            entry.path(),
            entry.layout
        )
        .context("writing revision list")?;
    }
    stdout.flush().context("flushing revision list")?;
    Ok(())
}

fn fail(e: ScrapeError) -> ! {
    tracing::error!(
        "❌ {} stage failed: {} (exit code {})",
        e.stage(),
        e,
        e.exit_code()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(e.exit_code());
}
