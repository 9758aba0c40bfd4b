//! Smart Surface - exhibit binary
//!
//! Serves the measurement API, or runs a single measurement from the shell.

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use smart_surface::{
    start_web_server, LastMeasurement, SensorConfig, SurfaceEngine, WebConfig, DEFAULT_WEB_PORT,
};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "smart_surface")]
#[command(about = "Smart Surface - ultrasonic surface classification exhibit")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = "Measures distance, shape and absorption of a surface with an ultrasonic \
                        ranger and serves the results as JSON")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Web server bind address
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Web server port
    #[arg(short, long, default_value_t = DEFAULT_WEB_PORT)]
    port: u16,

    /// Never touch GPIO, produce simulated readings
    #[arg(long)]
    simulate: bool,

    /// Ultrasonic trigger pin (BCM)
    #[arg(long, default_value_t = 23)]
    trigger_pin: u8,

    /// Ultrasonic echo pin (BCM)
    #[arg(long, default_value_t = 24)]
    echo_pin: u8,

    /// Buzzer pin (BCM)
    #[arg(long, default_value_t = 18)]
    buzzer_pin: u8,

    /// Push button pin (BCM)
    #[arg(long, default_value_t = 17)]
    button_pin: u8,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web server (default)
    Serve(ServeArgs),

    /// Take one measurement and print it
    Measure(MeasureArgs),

    /// Sound the buzzer
    Beep(BeepArgs),

    /// Show configuration and hardware availability
    Info,
}

#[derive(Args)]
struct ServeArgs {
    /// Static files directory (optional)
    #[arg(long)]
    static_dir: Option<String>,

    /// Disable CORS headers
    #[arg(long)]
    no_cors: bool,

    /// Maximum live-feed WebSocket connections
    #[arg(long, default_value_t = 16)]
    max_connections: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum MeasureKind {
    Distance,
    Shape,
    Material,
}

#[derive(Args)]
struct MeasureArgs {
    /// What to measure
    #[arg(short, long, value_enum, default_value_t = MeasureKind::Distance)]
    kind: MeasureKind,

    /// Number of pings (defaults to 5 for distance, 15 otherwise)
    #[arg(short, long)]
    samples: Option<usize>,

    /// Output format: json or pretty
    #[arg(short, long, default_value = "pretty")]
    format: String,
}

#[derive(Args)]
struct BeepArgs {
    /// Number of beeps
    #[arg(short, long, default_value_t = 1)]
    count: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&cli)?;

    let engine = Arc::new(
        SurfaceEngine::new(sensor_config(&cli)).context("Failed to initialize sensors")?,
    );

    match &cli.command {
        Some(Commands::Serve(args)) => serve_command(&cli, args, engine).await?,
        Some(Commands::Measure(args)) => measure_command(args, engine).await?,
        Some(Commands::Beep(args)) => beep_command(args, engine).await?,
        Some(Commands::Info) => info_command(&engine),
        None => {
            let serve_args = ServeArgs {
                static_dir: None,
                no_cors: false,
                max_connections: 16,
            };
            serve_command(&cli, &serve_args, engine).await?;
        }
    }

    Ok(())
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default();
    tracing::subscriber::set_global_default(build_subscriber(cli, &directives))?;

    Ok(())
}

/// `RUST_LOG` style `directives` refine the level picked by `--verbose`/`--debug`.
fn build_subscriber(
    cli: &Cli,
    directives: &str,
) -> impl tracing::Subscriber + Send + Sync + 'static {
    let level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .parse_lossy(directives);

    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .finish()
}

fn sensor_config(cli: &Cli) -> SensorConfig {
    SensorConfig::default()
        .with_ultrasonic_pins(cli.trigger_pin, cli.echo_pin)
        .with_buzzer_pin(cli.buzzer_pin)
        .with_button_pin(cli.button_pin)
        .with_simulation(cli.simulate)
}

async fn serve_command(
    cli: &Cli,
    args: &ServeArgs,
    engine: Arc<SurfaceEngine>,
) -> anyhow::Result<()> {
    let mut web_config = WebConfig::new(&cli.host, cli.port);

    if let Some(static_dir) = &args.static_dir {
        web_config = web_config.with_static_path(Some(static_dir.clone()));
        info!("Using static files from: {}", static_dir);
    }

    web_config = web_config
        .with_cors(!args.no_cors)
        .with_max_websocket_connections(args.max_connections);

    info!("Web server configuration:");
    info!("  - Bind address: {}", web_config.bind_address());
    info!("  - CORS enabled: {}", web_config.enable_cors);
    info!("  - Max WebSocket connections: {}", args.max_connections);
    info!("  - Simulation: {}", engine.is_simulated());

    start_web_server(web_config, engine).await?;

    Ok(())
}

async fn measure_command(args: &MeasureArgs, engine: Arc<SurfaceEngine>) -> anyhow::Result<()> {
    let config = engine.config();
    let samples = args.samples.unwrap_or(match args.kind {
        MeasureKind::Distance => config.distance_samples,
        MeasureKind::Shape | MeasureKind::Material => config.classification_samples,
    });
    let kind = args.kind;

    let measurement = tokio::task::spawn_blocking(move || match kind {
        MeasureKind::Distance => LastMeasurement::Distance(engine.measure_distance(samples)),
        MeasureKind::Shape => LastMeasurement::Shape(engine.measure_shape(samples)),
        MeasureKind::Material => LastMeasurement::Material(engine.measure_material(samples)),
    })
    .await?;

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&measurement)?),
        "pretty" => print_pretty_measurement(&measurement),
        other => anyhow::bail!("Unsupported format: {}. Use 'json' or 'pretty'", other),
    }

    Ok(())
}

async fn beep_command(args: &BeepArgs, engine: Arc<SurfaceEngine>) -> anyhow::Result<()> {
    let count = args.count;
    let emitted = tokio::task::spawn_blocking(move || engine.trigger_feedback(count)).await?;
    println!("Beeped {} time(s)", emitted);
    Ok(())
}

fn info_command(engine: &SurfaceEngine) {
    let config = engine.config();
    let status = engine.status();

    println!("Smart Surface Information");
    println!("=========================");
    println!();
    println!("Wiring (BCM):");
    println!("  Trigger: GPIO {}", config.pins.trigger);
    println!("  Echo:    GPIO {}", config.pins.echo);
    println!("  Buzzer:  GPIO {}", config.pins.buzzer);
    println!("  Button:  GPIO {}", config.pins.button);
    println!();
    println!("Sampling:");
    println!("  Distance samples:       {}", config.distance_samples);
    println!("  Classification samples: {}", config.classification_samples);
    println!("  Echo timeout:           {} ms", config.echo_timeout_ms);
    println!(
        "  Retries:                {} x {} ms backoff",
        config.retry_attempts, config.retry_backoff_ms
    );
    println!();
    println!("Components:");
    let mark = |ok: bool| if ok { "✓" } else { "✗" };
    println!("  Ultrasonic:  {}", mark(status.components.ultrasonic));
    println!("  Temperature: {}", mark(status.components.temperature));
    println!("  Color:       {}", mark(status.components.color));
    println!("  Buzzer:      {}", mark(status.components.buzzer));
    println!("  Button:      {}", mark(status.components.button));
    println!(
        "  Mode:        {}",
        if status.simulation { "simulation" } else { "hardware" }
    );
    println!();
    println!(
        "Temperature: ambient {:.2}°C, object {:.2}°C",
        status.ambient_temp, status.object_temp
    );

    println!();
    println!("Features compiled:");
    #[cfg(feature = "gpio")]
    println!("  - GPIO support: ✓");
    #[cfg(not(feature = "gpio"))]
    println!("  - GPIO support: ✗");
}

fn print_pretty_measurement(measurement: &LastMeasurement) {
    let samples: Vec<String> = measurement
        .samples()
        .iter()
        .map(|s| s.value().map_or_else(|| "-".to_string(), |v| format!("{:.2}", v)))
        .collect();

    match measurement {
        LastMeasurement::Distance(r) => {
            println!("📏 Distance: {:.2} cm (σ {:.2} cm)", r.mean_cm, r.stddev_cm);
            println!("  Speed of sound: {:.1} m/s", r.speed_m_s);
            println!(
                "  Temperature: ambient {:.2}°C, object {:.2}°C",
                r.ambient_temp_c, r.object_temp_c
            );
            println!("  Absorption: {}", r.absorption);
            println!("  Accuracy: {:.2}%", r.accuracy);
        }
        LastMeasurement::Shape(r) => {
            println!("🔷 Shape: {} (σ {:.2} cm)", r.label, r.stddev_cm);
            println!("  Mean distance: {:.2} cm", r.mean_cm);
            println!("  Accuracy: {:.2}%", r.accuracy);
        }
        LastMeasurement::Material(r) => {
            println!("🧱 Material: {} / {} (σ {:.2} cm)", r.label, r.absorption, r.stddev_cm);
            println!("  Color: rgb({}, {}, {})", r.rgb.r, r.rgb.g, r.rgb.b);
            println!("  Accuracy: {:.2}%", r.accuracy);
        }
    }

    println!("  Samples: [{}]", samples.join(", "));
    println!(
        "  Sparkline: {}",
        smart_surface::display::sparkline(measurement.samples())
    );
    println!("  Source: {}", measurement.source());
}
