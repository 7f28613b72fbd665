use std::fs;
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use collection_planner::config::{
    PlannerConfig, parse_batch_size, parse_failure_policy, parse_threshold,
};
use collection_planner::dispatcher::{
    BatchDispatcher, DispatchRequest, EndLocation, FailurePolicy, select_dump_yard,
};
use collection_planner::geofence::Geofence;
use collection_planner::house_list::{HouseListClient, HouseListing};
use collection_planner::model::{Batch, Location};
use collection_planner::optimizer::OptimizerClient;
use collection_planner::playback::Playback;
use collection_planner::progress::{DispatchEvent, LogSink};
use collection_planner::report::{JobSummary, format_distance, render_batch};
use collection_planner::session::{Credentials, SessionParams};
use collection_planner::traits::ProgressSink;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long)]
    debug: bool,

    /// Base URL of the route optimizer (overrides PLANNER_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// House listing endpoint (overrides PLANNER_HOUSE_LIST_URL)
    #[arg(long, global = true)]
    house_list_url: Option<String>,

    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the geofence, houses and dump yards for an identity
    Fetch {
        #[command(flatten)]
        identity: IdentityArgs,

        /// Write the listing here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Split houses into dump-yard trips and optimize each one
    Optimize {
        #[command(flatten)]
        args: OptimizeArgs,
    },
    /// Replay a trip's route path and report visited houses
    Playback {
        /// Batches written by `optimize`
        #[arg(long)]
        batches: PathBuf,

        /// Trip number to replay (1-based)
        #[arg(long, default_value_t = 1)]
        trip: usize,

        /// Listing whose houses are checked for visits
        #[arg(long)]
        listing: Option<PathBuf>,

        #[arg(long)]
        tick_ms: Option<u64>,

        #[arg(long, value_parser = threshold_arg)]
        visit_threshold_km: Option<f64>,
    },
    /// Convert an uploaded geofence text file to the wire form
    Fence {
        file: PathBuf,
    },
}

#[derive(Args)]
struct IdentityArgs {
    #[arg(long)]
    app_id: Option<String>,

    #[arg(long)]
    user_id: Option<String>,

    /// Page URL carrying AppId / UserId / AppName / UserName
    #[arg(long)]
    page_url: Option<String>,
}

impl IdentityArgs {
    fn credentials(&self) -> anyhow::Result<(Credentials, SessionParams)> {
        let mut params = match &self.page_url {
            Some(url) => SessionParams::from_url(url).context("page URL does not parse")?,
            None => SessionParams::default(),
        };
        if let Some(app_id) = &self.app_id {
            params.app_id = Some(app_id.clone());
        }
        if let Some(user_id) = &self.user_id {
            params.user_id = Some(user_id.clone());
        }
        let credentials = params
            .credentials()
            .context("both AppId and UserId are required")?;
        Ok((credentials, params))
    }
}

#[derive(Args)]
struct OptimizeArgs {
    /// Listing file written by `fetch`; fetched live when omitted
    #[arg(long)]
    listing: Option<PathBuf>,

    #[command(flatten)]
    identity: IdentityArgs,

    /// Start of the first trip, as lat,lon
    #[arg(long)]
    start: Option<Location>,

    /// Dump yard by position in the listing (0-based)
    #[arg(long, conflicts_with = "dump")]
    dump_index: Option<usize>,

    /// Dump yard as lat,lon
    #[arg(long)]
    dump: Option<Location>,

    /// End the last trip here instead of at the dump yard, as lat,lon
    #[arg(long, conflicts_with = "return_to_start")]
    end: Option<Location>,

    /// End the last trip back at the start location
    #[arg(long)]
    return_to_start: bool,

    #[arg(long, value_parser = batch_size_arg)]
    batch_size: Option<usize>,

    /// `keep` completed trips or `discard` them when a later trip fails
    #[arg(long, value_parser = failure_policy_arg)]
    on_failure: Option<FailurePolicy>,

    /// Write the annotated batches here
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn threshold_arg(raw: &str) -> Result<f64, String> {
    parse_threshold("--visit-threshold-km", raw).map_err(|e| e.to_string())
}

fn batch_size_arg(raw: &str) -> Result<usize, String> {
    parse_batch_size("--batch-size", raw).map_err(|e| e.to_string())
}

fn failure_policy_arg(raw: &str) -> Result<FailurePolicy, String> {
    parse_failure_policy("--on-failure", raw).map_err(|e| e.to_string())
}

fn main() -> Result<(), anyhow::Error> {
    dotenvy::from_filename("./.env.local").ok();

    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(if cli.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    let mut config = PlannerConfig::from_env()?;
    if let Some(url) = &cli.api_url {
        config.api_url = url.clone();
    }
    if let Some(url) = &cli.house_list_url {
        config.house_list_url = url.clone();
    }
    if let Some(secs) = cli.timeout_secs {
        config.timeout_secs = secs;
    }

    match cli.command {
        Commands::Fetch { identity, output } => {
            let listing = fetch_listing(&config, &identity)?;
            write_json(&listing, output.as_ref())?;
        }
        Commands::Optimize { args } => optimize(config, args)?,
        Commands::Playback {
            batches,
            trip,
            listing,
            tick_ms,
            visit_threshold_km,
        } => {
            if let Some(ms) = tick_ms {
                config.tick_interval = Duration::from_millis(ms);
            }
            if let Some(km) = visit_threshold_km {
                config.visit_threshold_km = km;
            }
            playback(&config, &batches, trip, listing.as_ref())?;
        }
        Commands::Fence { file } => {
            let text = fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let fence = Geofence::from_upload(&text);
            if !fence.is_polygon() {
                warn!(points = fence.len(), "geofence has fewer than three valid points");
            }
            println!("{}", fence.to_wire());
        }
    }

    Ok(())
}

fn fetch_listing(config: &PlannerConfig, identity: &IdentityArgs) -> anyhow::Result<HouseListing> {
    let (credentials, params) = identity.credentials()?;
    if let (Some(app), Some(user)) = (&params.app_name, &params.user_name) {
        info!("{} / {}", app, user);
    }
    let client = HouseListClient::new(config.house_list())?;
    Ok(client.fetch(&credentials)?)
}

fn read_listing(path: &PathBuf) -> anyhow::Result<HouseListing> {
    let body = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(HouseListing::from_json(&body)?)
}

fn write_json<T: serde::Serialize>(value: &T, output: Option<&PathBuf>) -> anyhow::Result<()> {
    let body = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => fs::write(path, body).with_context(|| format!("writing {}", path.display()))?,
        None => println!("{}", body),
    }
    Ok(())
}

fn optimize(mut config: PlannerConfig, args: OptimizeArgs) -> anyhow::Result<()> {
    if let Some(size) = args.batch_size {
        config.batch_size = size;
    }
    if let Some(policy) = args.on_failure {
        config.failure_policy = policy;
    }

    let listing = match &args.listing {
        Some(path) => read_listing(path)?,
        None => fetch_listing(&config, &args.identity)?,
    };

    let dump = select_dump_yard(&listing.dump_yards, args.dump, args.dump_index)?;
    let end = EndLocation::from_choice(args.end, args.return_to_start);

    let mut request = DispatchRequest::new(listing.geofence.clone(), listing.houses)
        .end(end)
        .batch_size(config.batch_size);
    request.start = args.start;
    request.dump = dump;

    let optimizer = OptimizerClient::new(config.optimizer())?;
    let dispatcher = BatchDispatcher::new(optimizer, config.dispatcher());
    let (handle, events) = dispatcher.spawn(request);

    let mut log = LogSink;
    for event in events {
        match event {
            DispatchEvent::Progress(state) => log.on_progress(&state),
            DispatchEvent::Batch(batch) => println!("{}", render_batch(&batch)),
            DispatchEvent::Finished(state) => log.on_finish(&state),
        }
    }

    let report = match handle.join() {
        Ok(result) => result?,
        Err(_) => bail!("dispatch thread panicked"),
    };

    println!("{}", JobSummary::new(&report.batches).render());
    write_json(&report.batches, args.output.as_ref())?;

    if let Some(failure) = report.failure {
        return Err(failure).context("route optimization failed");
    }
    Ok(())
}

fn playback(
    config: &PlannerConfig,
    batches_path: &PathBuf,
    trip: usize,
    listing: Option<&PathBuf>,
) -> anyhow::Result<()> {
    let body = fs::read_to_string(batches_path)
        .with_context(|| format!("reading {}", batches_path.display()))?;
    let batches: Vec<Batch> = serde_json::from_str(&body)?;
    let batch = batches
        .into_iter()
        .find(|b| b.batch_number == trip)
        .with_context(|| format!("no trip #{}", trip))?;

    let houses = match listing {
        Some(path) => read_listing(path)?.houses,
        None => Vec::new(),
    };
    let total_houses = houses.len();

    let mut player = Playback::new(batch.route_path, houses, config.visit_threshold_km);
    player.run(config.tick_interval, |event| {
        for id in &event.newly_visited {
            info!(index = event.index, house = %id, "visited");
        }
        info!(
            index = event.index,
            heading = event.heading_deg.round(),
            "at {} ({} traveled)",
            event.position,
            format_distance(event.traveled_km)
        );
        ControlFlow::Continue(())
    });

    println!(
        "{} of {} houses visited, {} traveled",
        player.detector().visited().len(),
        total_houses,
        format_distance(player.detector().traveled_km())
    );
    Ok(())
}
