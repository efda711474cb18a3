//! Client for a remote balloon flight prediction service: submits launch
//! parameters, watches the asynchronous compute job with an adaptive
//! polling policy, and normalizes the result into a canonical flight path.

pub mod client;
pub mod flight;
pub mod geo;
