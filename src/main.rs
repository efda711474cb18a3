use std::process::ExitCode;

use chrono::{DateTime, Duration, Utc};
use clap::{Args, Parser, Subcommand};

use habpredict::client::{
    HttpPredictionService, JobHandle, JobStatus, LaunchParameters, PollConfig, PollControl,
    PollObserver, Poller, PredictionError, PredictionService, Profile,
};
use habpredict::flight::{normalize, FlightPath, Landmark};

#[derive(Parser)]
#[command(name = "habpredict")]
#[command(about = "Balloon flight prediction client")]
struct Cli {
    /// Base URL of the prediction API
    #[arg(
        long,
        global = true,
        default_value = "https://predict.cusf.co.uk/api/v1"
    )]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a prediction and wait for the flight path
    Run(LaunchArgs),
    /// Submit a prediction and print the job id without waiting
    Submit(LaunchArgs),
    /// Check the progress of a submitted job
    Status { job: String },
    /// Retrieve and summarize the flight path of a completed job
    Fetch { job: String },
}

#[derive(Args)]
struct LaunchArgs {
    /// Flight profile
    #[arg(long, value_enum, default_value_t = Profile::Standard)]
    profile: Profile,
    /// Launch time (RFC 3339, defaults to now)
    #[arg(long)]
    launch_time: Option<DateTime<Utc>>,
    /// Launch latitude in decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    latitude: f64,
    /// Launch longitude in decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    longitude: f64,
    /// Launch altitude in metres
    #[arg(long, default_value_t = 0.0)]
    altitude: f64,
    /// Ascent rate in m/s
    #[arg(long, default_value_t = 5.0)]
    ascent_rate: f64,
    /// Burst altitude in metres (standard profile)
    #[arg(long)]
    burst_altitude: Option<f64>,
    /// Descent rate in m/s (standard profile)
    #[arg(long)]
    descent_rate: Option<f64>,
    /// Float altitude in metres (float profile)
    #[arg(long)]
    float_altitude: Option<f64>,
    /// End of the float simulation (RFC 3339, defaults to launch + 1 day)
    #[arg(long)]
    stop_time: Option<DateTime<Utc>>,
}

impl LaunchArgs {
    fn into_parameters(self) -> LaunchParameters {
        let launch_datetime = self.launch_time.unwrap_or_else(Utc::now);
        let stop_datetime = match self.profile {
            Profile::Float => {
                Some(self.stop_time.unwrap_or(launch_datetime + Duration::days(1)))
            }
            Profile::Standard => self.stop_time,
        };
        LaunchParameters {
            profile: self.profile,
            launch_datetime,
            latitude: self.latitude,
            longitude: self.longitude,
            launch_altitude: self.altitude,
            ascent_rate: self.ascent_rate,
            burst_altitude: self.burst_altitude,
            descent_rate: self.descent_rate,
            float_altitude: self.float_altitude,
            stop_datetime,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    let service = HttpPredictionService::new(&cli.api_url);

    match cli.command {
        Commands::Run(args) => run(service, args.into_parameters()).await,
        Commands::Submit(args) => submit(service, args.into_parameters()).await,
        Commands::Status { job } => status(service, &JobHandle::new(job)).await,
        Commands::Fetch { job } => fetch(service, &JobHandle::new(job)).await,
    }
}

/// Prints each non-terminal status the poll loop reports; the terminal
/// outcome is printed from `wait`.
struct ProgressPrinter;

impl PollObserver for ProgressPrinter {
    fn on_update(&mut self, status: &JobStatus) -> PollControl {
        println!("{}", status);
        PollControl::Continue
    }

    fn on_complete(&mut self, _path: FlightPath) {}

    fn on_error(&mut self, _error: PredictionError) {}
}

async fn run(service: HttpPredictionService, params: LaunchParameters) -> ExitCode {
    let mut poller = Poller::new(service, PollConfig::default());

    let handle = match poller.submit(&params).await {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Submission failed: {}", e);
            return ExitCode::FAILURE;
        }
    };
    println!("Submitted prediction job {}", handle);

    if let Err(e) = poller.start_polling(handle, ProgressPrinter) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    match poller.wait().await {
        Some(Ok(path)) => {
            print_flight_path(&path);
            ExitCode::SUCCESS
        }
        Some(Err(e)) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
        None => {
            eprintln!("Polling stopped before the prediction finished");
            ExitCode::FAILURE
        }
    }
}

async fn submit(service: HttpPredictionService, params: LaunchParameters) -> ExitCode {
    let mut poller = Poller::new(service, PollConfig::default());
    match poller.submit(&params).await {
        Ok(handle) => {
            println!("{}", handle);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Submission failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn status(service: HttpPredictionService, handle: &JobHandle) -> ExitCode {
    let poller = Poller::new(service, PollConfig::default());
    match poller.poll_once(handle).await {
        Ok(status) => {
            println!("{}", status);
            match status {
                JobStatus::Failed { .. } => ExitCode::FAILURE,
                _ => ExitCode::SUCCESS,
            }
        }
        Err(e) => {
            eprintln!("Status check failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn fetch(service: HttpPredictionService, handle: &JobHandle) -> ExitCode {
    let payload = match service
        .flight_path(handle, PollConfig::default().fetch_timeout)
        .await
    {
        Ok(payload) => payload,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match normalize(&payload) {
        Ok(path) => {
            print_flight_path(&path);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Could not normalize flight path: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_flight_path(path: &FlightPath) {
    if let Some(profile) = path.profile {
        println!("Profile:     {}", profile);
    }
    print_landmark("Launch", &path.launch);
    print_landmark("Burst", &path.burst);
    print_landmark("Landing", &path.landing);

    let duration = std::time::Duration::from_secs(path.flight_duration_seconds.max(0) as u64);
    println!("Flight time: {}", humantime::format_duration(duration));
    println!("Range:       {} km", path.range_km);
    println!("Track:       {} points", path.points.len());

    if !path.diagnostics.is_empty() {
        println!("The prediction completed with warnings:");
        for line in &path.diagnostics {
            println!("  {}", line);
        }
    }
}

fn print_landmark(label: &str, mark: &Landmark) {
    println!(
        "{}:{:width$}{:.4}, {:.4} at {:.0} m ({} UTC)",
        label,
        "",
        mark.latitude,
        mark.longitude,
        mark.altitude,
        mark.datetime.format("%H:%M"),
        width = 12 - label.len()
    );
}
