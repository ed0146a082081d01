//! Carpet Check-in CLI
//!
//! Drives the check-in pipeline against the mock camera for demos and
//! threshold tuning.

use carpet_checkin::{
    analysis::PatternType,
    capture::{FileConfig, MockCamera, MockScene},
    checkin::{CheckinOutcome, CheckinSession, GateStatusVerifier, MemorySink},
    location::{CarpetDatabase, GeoPoint, LocationContext, LocationThresholdService},
    metrics::MetricsRegistry,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "carpet-checkin")]
#[command(version)]
#[command(about = "Camera-gated pub carpet check-in pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one check-in against the mock camera
    Simulate {
        #[command(flatten)]
        location: LocationArgs,

        /// What the mock camera is pointed at
        #[arg(long, value_enum, default_value_t = SceneArg::Carpet)]
        scene: SceneArg,

        /// Seconds of simulated sampling before giving up
        #[arg(long, default_value_t = 5)]
        seconds: u64,
    },

    /// Print the adaptive thresholds for a location context
    Thresholds {
        #[command(flatten)]
        location: LocationArgs,

        /// Pattern to assume when no venue matches
        #[arg(long)]
        pattern: Option<PatternType>,
    },

    /// List reference venues
    Venues {
        #[arg(long, requires = "lng")]
        lat: Option<f64>,

        #[arg(long, requires = "lat")]
        lng: Option<f64>,

        /// Only venues within this many kilometres of --lat/--lng
        #[arg(long, default_value_t = 0.5)]
        radius_km: f64,
    },

    /// Analyze frames continuously until Ctrl-C
    Watch {
        #[command(flatten)]
        location: LocationArgs,

        #[arg(long, value_enum, default_value_t = SceneArg::Carpet)]
        scene: SceneArg,
    },
}

#[derive(clap::Args)]
struct LocationArgs {
    /// Venue identifier
    #[arg(long)]
    pub_id: Option<String>,

    #[arg(long, requires = "lng")]
    lat: Option<f64>,

    #[arg(long, requires = "lat")]
    lng: Option<f64>,
}

impl LocationArgs {
    fn context(&self) -> LocationContext {
        LocationContext {
            pub_id: self.pub_id.clone(),
            lat: self.lat,
            lng: self.lng,
            pattern_hint: None,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum SceneArg {
    Carpet,
    Wall,
}

impl From<SceneArg> for MockScene {
    fn from(scene: SceneArg) -> Self {
        match scene {
            SceneArg::Carpet => MockScene::Carpet,
            SceneArg::Wall => MockScene::PlainWall,
        }
    }
}

type MockSession = CheckinSession<MockCamera, GateStatusVerifier, MemorySink>;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match FileConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => FileConfig::default(),
    };

    info!("Carpet Check-in v{}", carpet_checkin::VERSION);

    let result = match cli.command {
        Commands::Simulate {
            location,
            scene,
            seconds,
        } => simulate(&config, location.context(), scene.into(), seconds).await,
        Commands::Thresholds { location, pattern } => {
            let mut context = location.context();
            context.pattern_hint = pattern;
            print_thresholds(&config, &context)
        }
        Commands::Venues { lat, lng, radius_km } => {
            list_venues(lat.zip(lng).map(|(lat, lng)| GeoPoint::new(lat, lng)), radius_km);
            Ok(())
        }
        Commands::Watch { location, scene } => {
            watch(&config, location.context(), scene.into()).await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn new_session(config: &FileConfig, scene: MockScene) -> MockSession {
    CheckinSession::new(
        MockCamera::with_scene(scene, 0x5EED),
        config,
        CarpetDatabase::seeded(),
        GateStatusVerifier::default(),
        MemorySink::new(),
    )
}

async fn simulate(
    config: &FileConfig,
    context: LocationContext,
    scene: MockScene,
    seconds: u64,
) -> CliResult {
    let mut session = new_session(config, scene);
    session.update_location(context);
    session.start_camera().await?;

    // Simulated clock: step through sampling ticks without sleeping.
    let t0 = Instant::now();
    let step = Duration::from_millis(config.sampling.metrics_interval_ms / 2).max(Duration::from_millis(1));
    session.handle_orientation(30.0, t0);

    let mut now = t0;
    while now <= t0 + Duration::from_secs(seconds) {
        if let Some(status) = session.tick(now) {
            info!(
                confidence = %status.carpet_confidence,
                score = status.confidence_score,
                failed = ?status.failed_gates,
                "Gate status"
            );
            if session.can_capture() {
                break;
            }
        }
        now += step;
    }

    for result in session.gates().results() {
        println!(
            "{:<20} value={:<10} threshold={:<8} {}",
            result.name,
            result
                .current_value
                .map_or_else(|| "-".to_string(), |v| format!("{v:.2}")),
            result.threshold,
            if result.passed { "PASS" } else { "FAIL" }
        );
    }

    if !session.can_capture() {
        warn!("Gates never all passed; capture stayed locked");
        if let Some(status) = session.status() {
            println!("{}", serde_json::to_string_pretty(status)?);
        }
        return Ok(());
    }

    match session.check_in(now)? {
        CheckinOutcome::CheckedIn(record) => {
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        CheckinOutcome::NotCarpet { reason } => println!("Not a carpet: {reason}"),
        CheckinOutcome::Discarded => println!("Photo discarded"),
    }
    Ok(())
}

fn print_thresholds(config: &FileConfig, context: &LocationContext) -> CliResult {
    let service = LocationThresholdService::new(CarpetDatabase::seeded(), config.thresholds.clone());
    let thresholds = service.derive(context);
    println!("{}", serde_json::to_string_pretty(&thresholds)?);
    Ok(())
}

fn list_venues(point: Option<GeoPoint>, radius_km: f64) {
    let database = CarpetDatabase::seeded();
    match point {
        Some(point) => {
            for (venue, distance) in database.find_within(&point, radius_km) {
                println!(
                    "{:<32} {:>7.3} km  {:<10} {}",
                    venue.pub_id, distance, venue.signature.pattern, venue.description
                );
            }
        }
        None => {
            for venue in database.iter() {
                println!(
                    "{:<32} ({:.4}, {:.4})  {:<10} {}",
                    venue.pub_id,
                    venue.location.lat,
                    venue.location.lng,
                    venue.signature.pattern,
                    venue.description
                );
            }
        }
    }
}

async fn watch(config: &FileConfig, context: LocationContext, scene: MockScene) -> CliResult {
    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || r.store(false, Ordering::SeqCst))?;

    let metrics = MetricsRegistry::new()?;
    let mut session = new_session(config, scene).with_metrics(metrics.clone());
    session.update_location(context);

    #[cfg(feature = "metrics")]
    let state = if config.output.metrics_port != 0 {
        use carpet_checkin::metrics::{MetricsServer, MetricsServerConfig};
        let server = MetricsServer::new(
            MetricsServerConfig::with_port(config.output.metrics_port),
            metrics.clone(),
        );
        let state = server.state();
        tokio::spawn(async move {
            if let Err(e) = server.run().await {
                warn!(error = %e, "Metrics server stopped");
            }
        });
        Some(state)
    } else {
        None
    };

    session.start_camera().await?;
    session.handle_orientation(30.0, Instant::now());

    let mut interval =
        tokio::time::interval(Duration::from_millis(config.sampling.metrics_interval_ms));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    info!("Watching; press Ctrl-C to stop");
    while running.load(Ordering::SeqCst) {
        interval.tick().await;
        let status = session.tick(Instant::now());

        if let Some(status) = &status {
            info!(
                phase = %session.phase(),
                confidence = %status.carpet_confidence,
                score = status.confidence_score,
                capture_unlocked = status.all_gates_passed,
                "Gate status"
            );
        }

        #[cfg(feature = "metrics")]
        if let Some(state) = &state {
            state.write().await.publish(session.phase(), status);
        }
    }

    session.stop_camera();
    info!("Stopped");
    Ok(())
}
