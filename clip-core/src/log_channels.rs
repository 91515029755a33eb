//! Tracing targets for the three log channels.
//!
//! Every log line in the workspace names one of these as its `target:` so the
//! binary can route each channel to its own file.

/// General session progress: discovery, downloads, comments, pacing.
pub const SESSION: &str = "session";

/// Failures of any kind.
pub const ERRORS: &str = "errors";

/// Hosting platform traffic: authorization and upload progress.
pub const YOUTUBE: &str = "youtube";
