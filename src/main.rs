mod cli;
mod report;

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use clap::Parser;
use cli::{Cli, Commands};
use cragcast::datasources::{DataSource, SnapshotSource, WeatherContext};
use cragcast::logic::{
    AreaAggregator, BatchCoordinator, CancelSignal, DryingStatusCalculator,
    ForecastTimelineBuilder, WorkerPool,
};
use cragcast::{Config, CragError};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Init => run_init(),
        Commands::Check => run_check(&cli),
        Commands::Status { route } => run_status(&cli, route).await,
        Commands::Forecast { route, raw } => run_forecast(&cli, route, *raw).await,
        Commands::Area { area } => run_area(&cli, area).await,
        Commands::Batch {
            areas,
            timeout_secs,
            ids,
        } => run_batch(&cli, *areas, *timeout_secs, ids).await,
    }
}

fn run_init() -> anyhow::Result<()> {
    if Config::exists(None) {
        let path = Config::find_config_path()?;
        println!("Existing config found at {}; it will be overwritten.", path.display());
    }
    Config::setup_interactive().context("Interactive setup failed")?;
    Ok(())
}

fn run_check(cli: &Cli) -> anyhow::Result<()> {
    let config = load_config(cli)?;
    println!("Config OK");
    println!(
        "  lookback {}d, horizon {}d, {} workers",
        config.engine.lookback_days, config.engine.horizon_days, config.batch.workers
    );
    if !config.rock_aliases.is_empty() {
        println!("  {} custom rock aliases", config.rock_aliases.len());
    }

    match snapshot_path(cli) {
        Some(path) => {
            let source = SnapshotSource::from_file(&path)
                .with_context(|| format!("Failed to load snapshot {}", path.display()))?;
            let without_gps = source.routes().filter(|r| r.usable_location().is_none()).count();
            println!("Snapshot OK: {}", path.display());
            println!(
                "  {} routes in {} areas ({} without GPS)",
                source.route_count(),
                source.area_ids().len(),
                without_gps
            );
        }
        None => println!("No snapshot configured (use --snapshot or CRAGCAST_SNAPSHOT)"),
    }
    Ok(())
}

async fn run_status(cli: &Cli, route_id: &str) -> anyhow::Result<()> {
    let config = load_config(cli)?;
    let source = load_snapshot(cli)?;
    let now = evaluation_time(cli)?;

    let route = source.route(route_id).await?;
    let (weather, tree) = route_inputs(&source, &route).await?;

    let calculator = DryingStatusCalculator::new(&config);
    match calculator.compute_status(&route, weather.as_ref(), tree, now) {
        Ok(status) => {
            if cli.json {
                print_json(&status)?;
            } else {
                print!("{}", report::render_status(&route, &status));
            }
        }
        Err(CragError::NotApplicable(_)) => {
            println!("{}: no GPS data, drying status not available", route.display_name());
        }
        Err(e) => return Err(e).context(format!("Failed to compute status for {}", route_id)),
    }
    Ok(())
}

async fn run_forecast(cli: &Cli, route_id: &str, raw: bool) -> anyhow::Result<()> {
    let config = load_config(cli)?;
    let source = load_snapshot(cli)?;
    let now = evaluation_time(cli)?;

    let route = source.route(route_id).await?;
    let (weather, tree) = route_inputs(&source, &route).await?;

    let calculator = DryingStatusCalculator::new(&config);
    let builder = ForecastTimelineBuilder::new(&calculator);
    let periods = match builder.compute_forecast(&route, weather.as_ref(), tree, now) {
        Ok(periods) => periods,
        Err(CragError::NotApplicable(_)) => {
            println!("{}: no GPS data, drying forecast not available", route.display_name());
            return Ok(());
        }
        Err(e) => return Err(e).context(format!("Failed to compute forecast for {}", route_id)),
    };

    let periods = if raw {
        periods
    } else {
        report::consolidate_periods(&periods)
    };

    if cli.json {
        print_json(&periods)?;
    } else {
        print!("{}", report::render_forecast(&route, &periods));
    }
    Ok(())
}

async fn run_area(cli: &Cli, area_id: &str) -> anyhow::Result<()> {
    let config = load_config(cli)?;
    let source = load_snapshot(cli)?;
    let now = evaluation_time(cli)?;

    let routes = source.area_routes(area_id).await?;
    let ctx = WeatherContext::gather(&source, &routes).await;

    let aggregator = AreaAggregator::new(
        Arc::new(DryingStatusCalculator::new(&config)),
        WorkerPool::new(config.batch.workers),
    );
    let cancel = CancelSignal::with_timeout(Duration::from_secs(config.batch.timeout_secs));
    let (outcome, cancelled) = aggregator
        .compute_area_stats_concurrent(area_id, routes, Arc::new(ctx), now, &cancel)
        .await;

    if cli.json {
        print_json(&outcome)?;
    } else {
        print!("{}", report::render_area(&outcome));
        if cancelled {
            println!("Timed out - some routes were not evaluated");
        }
    }
    Ok(())
}

async fn run_batch(
    cli: &Cli,
    areas: bool,
    timeout_secs: Option<u64>,
    ids: &[String],
) -> anyhow::Result<()> {
    let config = load_config(cli)?;
    let source = Arc::new(load_snapshot(cli)?);
    let now = evaluation_time(cli)?;

    let coordinator = BatchCoordinator::new(source, &config);
    let cancel = match timeout_secs {
        Some(secs) => CancelSignal::with_timeout(Duration::from_secs(secs)),
        None => coordinator.default_signal(),
    };

    if areas {
        let result = coordinator.compute_areas(ids, now, &cancel).await?;
        if cli.json {
            print_json(&result)?;
        } else {
            print!("{}", report::render_area_batch(&result));
        }
    } else {
        let result = coordinator.compute_routes(ids, now, &cancel).await?;
        if cli.json {
            print_json(&result)?;
        } else {
            print!("{}", report::render_route_batch(&result));
        }
    }
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    Config::load_or_default(cli.config.clone()).context("Failed to load configuration")
}

fn snapshot_path(cli: &Cli) -> Option<PathBuf> {
    cli.snapshot
        .clone()
        .or_else(|| std::env::var_os("CRAGCAST_SNAPSHOT").map(PathBuf::from))
}

fn load_snapshot(cli: &Cli) -> anyhow::Result<SnapshotSource> {
    let Some(path) = snapshot_path(cli) else {
        bail!("No snapshot given; pass --snapshot <file> or set CRAGCAST_SNAPSHOT");
    };
    SnapshotSource::from_file(&path)
        .with_context(|| format!("Failed to load snapshot {}", path.display()))
}

fn evaluation_time(cli: &Cli) -> anyhow::Result<DateTime<Utc>> {
    match &cli.at {
        Some(at) => Ok(DateTime::parse_from_rfc3339(at)
            .with_context(|| format!("Invalid --at timestamp: {}", at))?
            .with_timezone(&Utc)),
        None => Ok(Utc::now()),
    }
}

async fn route_inputs(
    source: &SnapshotSource,
    route: &cragcast::models::ClimbingRoute,
) -> anyhow::Result<(Option<cragcast::models::LocationWeather>, Option<f64>)> {
    let weather = match route.usable_location() {
        Some(location) => source.weather(&location).await?,
        None => None,
    };
    let tree = source.tree_coverage(route).await?;
    Ok((weather, tree))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
