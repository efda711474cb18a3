mod api;
mod error;
mod poller;
mod types;

pub use api::{HttpPredictionService, PredictionService, Submission};
pub use error::{FetchError, PollError, PredictionError, SubmitError};
pub use poller::{
    LatencyMode, PollConfig, PollControl, PollObserver, Poller, PollerPhase, PollerStatus,
};
pub use types::{JobHandle, JobStatus, LaunchParameters, Profile, ProgressReport};
