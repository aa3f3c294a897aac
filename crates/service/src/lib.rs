//! Synchronous façade of the lesson preview pipeline.
//!
//! Request handlers call [`PreviewService`] to turn video links into
//! displayable URLs. The service is fail-soft: apart from rejecting an
//! empty link it always answers with a URL, degrading to the configured
//! placeholder whenever the store, the queue, or the probe misbehave.

pub mod config;
pub mod dispatch;
pub mod probe;
pub mod service;

pub use config::PreviewConfig;
pub use probe::{HttpProbe, ProbeError, ReqwestProbe};
pub use service::PreviewService;
