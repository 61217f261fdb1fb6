// vidcheck: session client for the video authenticity analysis service.
//
// Submits a video (by URL or upload), follows the per-stage results on the
// backend's live stream, and pushes normalized state into a display sink.

pub mod aggregate;
pub mod client;
pub mod config;
pub mod display;
pub mod error;
pub mod id;
pub mod link;
pub mod normalize;
pub mod session;
pub mod stage;
pub mod submit;
pub mod transport;

pub use aggregate::{Aggregator, progress, resolve_heatmap};
pub use client::SessionClient;
pub use config::{ClientConfig, DEFAULT_BASE_URL, ReconnectPolicy};
pub use display::{ConnectionLabel, DisplaySink, PLACEHOLDER, Tone, format_score};
pub use error::{Error, Result};
pub use id::AnalysisId;
pub use link::{CloseReason, LinkState};
pub use normalize::{StageEvent, normalize, normalize_inline};
pub use session::{AnalysisSession, SessionStatus};
pub use stage::{AudioResult, FinalResult, MetadataResult, Score, Stage, StageResult, TaskStates, VideoResult};
pub use submit::{Acknowledgement, AnalysisInput, HttpSubmitter, Submitter, VideoFile};
pub use transport::{Dialer, WebSocketDialer};
