mod error;
mod normalize;
mod types;

pub use error::NormalizeError;
pub use normalize::{normalize, normalize_with, RowPolicy};
pub use types::{FlightPath, Landmark, Leg, RawResultPayload, TrackPoint, TrajectorySample};
