use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

use super::api::{PredictionService, Submission};
use super::error::{PollError, PredictionError, SubmitError};
use super::types::{JobHandle, JobStatus, LaunchParameters, ProgressReport};
use crate::flight::{normalize, FlightPath, RawResultPayload};

/// Tunables of the poll cycle.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Delay before the first status request; the server usually answers
    /// a fresh job quickly.
    pub first_poll_delay: Duration,
    /// Poll cadence in normal latency mode.
    pub poll_interval: Duration,
    /// Timeout of the first status request.
    pub initial_timeout: Duration,
    /// Added to the timeout after each timed-out request, up to the ceiling.
    pub timeout_delta: Duration,
    /// Timeout ceiling; the next timeout past it switches modes.
    pub max_timeout: Duration,
    /// Fixed request timeout in high latency mode.
    pub high_latency_timeout: Duration,
    /// Poll cadence in high latency mode.
    pub high_latency_interval: Duration,
    /// Timeout of the flight path retrieval after completion.
    pub fetch_timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        PollConfig {
            first_poll_delay: Duration::from_millis(100),
            poll_interval: Duration::from_secs(3),
            initial_timeout: Duration::from_millis(500),
            timeout_delta: Duration::from_millis(500),
            max_timeout: Duration::from_secs(2),
            high_latency_timeout: Duration::from_secs(5),
            high_latency_interval: Duration::from_secs(10),
            fetch_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatencyMode {
    Normal,
    HighLatency,
}

#[derive(Debug, Clone, Copy)]
struct AdaptiveState {
    timeout: Duration,
    interval: Duration,
    mode: LatencyMode,
}

impl AdaptiveState {
    fn new(config: &PollConfig) -> Self {
        AdaptiveState {
            timeout: config.initial_timeout,
            interval: config.poll_interval,
            mode: LatencyMode::Normal,
        }
    }

    /// Widens the timeout until the ceiling; the first timeout at the
    /// ceiling switches to high latency mode, once per job. Further
    /// timeouts in that mode are tolerated without escalation.
    fn absorb_timeout(&mut self, config: &PollConfig) {
        match self.mode {
            LatencyMode::Normal if self.timeout < config.max_timeout => {
                let widened = self.timeout + config.timeout_delta;
                log::debug!(
                    "increasing poll timeout from {:?} to {:?}",
                    self.timeout,
                    widened
                );
                self.timeout = widened;
            }
            LatencyMode::Normal => {
                log::info!(
                    "poll timeout ceiling {:?} reached, switching to high latency mode",
                    config.max_timeout
                );
                self.mode = LatencyMode::HighLatency;
                self.timeout = config.high_latency_timeout;
                self.interval = config.high_latency_interval;
            }
            LatencyMode::HighLatency => {}
        }
    }
}

/// Controller phase, driven by submission and the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerPhase {
    Idle,
    Submitting,
    Polling,
    Completed,
    Failed,
}

#[derive(Debug)]
struct Shared {
    phase: PollerPhase,
    last_status: Option<JobStatus>,
    state: AdaptiveState,
}

/// Snapshot of the controller for external inspection.
#[derive(Debug, Clone)]
pub struct PollerStatus {
    pub phase: PollerPhase,
    pub last_status: Option<JobStatus>,
    pub mode: LatencyMode,
    pub timeout: Duration,
    pub interval: Duration,
}

/// Asked of the observer after every non-terminal update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollControl {
    Continue,
    Stop,
}

/// Receives poll cycle events. Exactly one of `on_complete` / `on_error`
/// fires per cycle; neither fires after `stop_polling` has returned.
pub trait PollObserver: Send + 'static {
    fn on_update(&mut self, _status: &JobStatus) -> PollControl {
        PollControl::Continue
    }

    fn on_complete(&mut self, path: FlightPath);

    fn on_error(&mut self, error: PredictionError);
}

struct WorkerHandle {
    stop_tx: oneshot::Sender<()>,
    join: JoinHandle<Option<Result<FlightPath, PredictionError>>>,
}

/// Drives one prediction job at a time: submit, poll with the adaptive
/// timeout policy, fetch the finished result and hand it to the
/// normalizer.
pub struct Poller<S: PredictionService> {
    service: Arc<S>,
    config: PollConfig,
    shared: Arc<StdMutex<Shared>>,
    inline: Option<RawResultPayload>,
    worker: Option<WorkerHandle>,
}

impl<S: PredictionService> Poller<S> {
    pub fn new(service: S, config: PollConfig) -> Self {
        let state = AdaptiveState::new(&config);
        Poller {
            service: Arc::new(service),
            config,
            shared: Arc::new(StdMutex::new(Shared {
                phase: PollerPhase::Idle,
                last_status: None,
                state,
            })),
            inline: None,
            worker: None,
        }
    }

    pub fn status(&self) -> PollerStatus {
        let locked = self.shared.lock().unwrap();
        PollerStatus {
            phase: locked.phase,
            last_status: locked.last_status.clone(),
            mode: locked.state.mode,
            timeout: locked.state.timeout,
            interval: locked.state.interval,
        }
    }

    /// Sends the launch parameters to the service once. On success the
    /// controller holds the job handle's poll cycle configuration; on
    /// failure the error surfaces immediately and nothing is retried.
    pub async fn submit(&mut self, params: &LaunchParameters) -> Result<JobHandle, SubmitError> {
        params.validate()?;
        self.set_phase(PollerPhase::Submitting);

        match self.service.submit(params).await {
            Ok(Submission { handle, inline }) => {
                self.inline = inline;
                let mut locked = self.shared.lock().unwrap();
                locked.state = AdaptiveState::new(&self.config);
                locked.phase = PollerPhase::Polling;
                drop(locked);
                log::info!("submitted prediction job {}", handle);
                Ok(handle)
            }
            Err(err) => {
                self.set_phase(PollerPhase::Failed);
                Err(err)
            }
        }
    }

    /// Issues a single status request with the current adaptive timeout.
    /// A timed-out request updates the adaptive state and comes back as
    /// `PollError::Timeout`; it is never a terminal failure.
    pub async fn poll_once(&self, handle: &JobHandle) -> Result<JobStatus, PollError> {
        if self.inline.is_some() {
            // the service answered at submit time, there is nothing to poll
            self.shared.lock().unwrap().last_status = Some(JobStatus::Completed);
            return Ok(JobStatus::Completed);
        }
        poll_request(self.service.as_ref(), &self.config, &self.shared, handle)
            .await
            .map(|report| report.status())
    }

    /// Spawns the poll loop for a submitted job. The observer sees every
    /// non-terminal status, then exactly one terminal callback; the loop
    /// is torn down after either.
    pub fn start_polling<O: PollObserver>(
        &mut self,
        handle: JobHandle,
        observer: O,
    ) -> Result<(), PredictionError> {
        if self.worker.is_some() {
            return Err(PredictionError::AlreadyPolling);
        }

        let (stop_tx, stop_rx) = oneshot::channel();
        let join = tokio::spawn(run_poll_loop(
            self.service.clone(),
            self.config.clone(),
            self.shared.clone(),
            handle,
            self.inline.take(),
            observer,
            stop_rx,
        ));
        self.worker = Some(WorkerHandle { stop_tx, join });
        Ok(())
    }

    /// Cancels the poll loop. Idempotent, safe after natural
    /// termination; once this returns, no observer callback fires even
    /// if a status request was in flight.
    pub async fn stop_polling(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.stop_tx.send(());
            let _ = worker.join.await;
        }
        let mut locked = self.shared.lock().unwrap();
        if !matches!(locked.phase, PollerPhase::Completed | PollerPhase::Failed) {
            locked.phase = PollerPhase::Idle;
        }
    }

    /// Awaits the poll loop's terminal result. `None` when the loop was
    /// stopped (or never started) instead of reaching a terminal state.
    pub async fn wait(&mut self) -> Option<Result<FlightPath, PredictionError>> {
        let worker = self.worker.take()?;
        worker.join.await.unwrap_or(None)
    }

    fn set_phase(&self, phase: PollerPhase) {
        self.shared.lock().unwrap().phase = phase;
    }
}

/// One status request at the current adaptive timeout, folding a timeout
/// back into the adaptive state.
async fn poll_request<S: PredictionService>(
    service: &S,
    config: &PollConfig,
    shared: &StdMutex<Shared>,
    handle: &JobHandle,
) -> Result<ProgressReport, PollError> {
    let timeout = shared.lock().unwrap().state.timeout;
    match service.progress(handle, timeout).await {
        Ok(report) => {
            shared.lock().unwrap().last_status = Some(report.status());
            Ok(report)
        }
        Err(PollError::Timeout) => {
            log::debug!("status poll for {} timed out", handle);
            shared.lock().unwrap().state.absorb_timeout(config);
            Err(PollError::Timeout)
        }
        Err(err) => Err(err),
    }
}

async fn run_poll_loop<S: PredictionService, O: PollObserver>(
    service: Arc<S>,
    config: PollConfig,
    shared: Arc<StdMutex<Shared>>,
    handle: JobHandle,
    inline: Option<RawResultPayload>,
    mut observer: O,
    mut stop_rx: oneshot::Receiver<()>,
) -> Option<Result<FlightPath, PredictionError>> {
    let (payload, report) = match inline {
        Some(payload) => (payload, None),
        None => {
            let mut first_tick = true;
            let report = loop {
                let delay = if first_tick {
                    first_tick = false;
                    config.first_poll_delay
                } else {
                    shared.lock().unwrap().state.interval
                };
                let next = Instant::now() + delay;

                tokio::select! {
                    _ = &mut stop_rx => return None,
                    _ = sleep_until(next) => {}
                }

                // a response that arrives for a stopped cycle is discarded
                // along with the in-flight request
                let polled = tokio::select! {
                    _ = &mut stop_rx => return None,
                    res = poll_request(service.as_ref(), &config, &shared, &handle) => res,
                };

                match polled {
                    Ok(report) => match report.status() {
                        JobStatus::Failed { description } => {
                            shared.lock().unwrap().phase = PollerPhase::Failed;
                            log::error!("prediction job {} failed: {}", handle, description);
                            let err = PredictionError::RemoteJob(description);
                            observer.on_error(err.clone());
                            return Some(Err(err));
                        }
                        JobStatus::Completed => break report,
                        status => {
                            log::debug!("job {}: {}", handle, status);
                            if observer.on_update(&status) == PollControl::Stop {
                                shared.lock().unwrap().phase = PollerPhase::Idle;
                                return None;
                            }
                        }
                    },
                    // absorbed by the adaptive policy inside poll_request
                    Err(PollError::Timeout) => {}
                    Err(err) => log::warn!("status poll for {} failed: {}", handle, err),
                }
            };

            log::info!("prediction job {} finished, retrieving flight path", handle);
            let fetched = tokio::select! {
                _ = &mut stop_rx => return None,
                res = service.flight_path(&handle, config.fetch_timeout) => res,
            };

            match fetched {
                Ok(payload) => (payload, Some(report)),
                Err(err) => {
                    shared.lock().unwrap().phase = PollerPhase::Failed;
                    let err = PredictionError::ResultFetch(err);
                    log::error!("{}", err);
                    observer.on_error(err.clone());
                    return Some(Err(err));
                }
            }
        }
    };

    match normalize(&payload) {
        Ok(mut path) => {
            if let Some(report) = report {
                for line in &report.pred_output {
                    log::info!("predictor output: {}", line);
                }
                if let Some(run_time) = &report.run_time {
                    log::info!("prediction run timestamp: {}", run_time);
                }
                if let Some(dataset) = &report.dataset {
                    log::info!("wind dataset: {}", dataset);
                }
                if report.warnings {
                    log::warn!("prediction completed with warnings");
                    path.diagnostics = report.pred_output.clone();
                }
            }
            let mut locked = shared.lock().unwrap();
            locked.phase = PollerPhase::Completed;
            locked.last_status = Some(JobStatus::Completed);
            drop(locked);
            observer.on_complete(path.clone());
            Some(Ok(path))
        }
        Err(err) => {
            shared.lock().unwrap().phase = PollerPhase::Failed;
            let err = PredictionError::Normalize(err);
            log::error!("{}", err);
            observer.on_error(err.clone());
            Some(Err(err))
        }
    }
}
