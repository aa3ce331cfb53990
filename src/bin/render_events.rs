use std::{
    io::{stdout, Write},
    path::PathBuf,
    process::ExitCode,
    time::Duration,
};

use anyhow::{Context, Error};
use clap::Parser;

use meetup_calendar::{
    config,
    fetch::HttpFetcher,
    init_calendar,
    surface::TemplateSurface,
    Feed, Outcome, SystemClock,
};

/// Fill the upcoming events list of a page from the club calendar.
#[derive(Debug, Clone, Parser)]
#[clap(bin_name = "render-events", version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Path to the configuration file
    #[clap(name = "config")]
    config: PathBuf,

    /// HTML page containing the events container
    #[clap(long)]
    template: PathBuf,

    /// Where to write the page; stdout if not given
    #[clap(long)]
    output: Option<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::builder().init();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(Outcome::Failed(_)) => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<Outcome, Error> {
    let config = config::init(&cli.config)?;

    let page = std::fs::read_to_string(&cli.template)
        .with_context(|| format!("reading template {}", cli.template.display()))?;
    let mut surface = TemplateSurface::new(page, &config.calendar.container_id)?;

    let fetcher = match config.calendar.timeout_secs {
        Some(secs) => HttpFetcher::with_timeout(Duration::from_secs(secs)),
        None => HttpFetcher::new(),
    };

    let outcome = init_calendar(
        &fetcher,
        &mut surface,
        &Feed::from(&config.calendar),
        &config.render_options(),
        SystemClock,
    )?;

    match &outcome {
        Outcome::Rendered(count) => log::info!("Rendered {} upcoming events", count),
        Outcome::Empty => log::info!("No upcoming events"),
        Outcome::Failed(e) => log::warn!("Wrote error message to page: {}", e),
    }

    write_page(cli, surface.into_page())?;

    Ok(outcome)
}

fn write_page(cli: &Cli, page: String) -> Result<(), Error> {
    match &cli.output {
        Some(path) => std::fs::write(path, page)
            .with_context(|| format!("writing page {}", path.display()))?,
        None => stdout().write_all(page.as_bytes())?,
    }

    Ok(())
}
