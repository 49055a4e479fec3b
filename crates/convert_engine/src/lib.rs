//! Conversion engine: service client, status polling and effect execution.
mod artifact;
mod client;
mod engine;
mod filename;
mod persist;
mod poll;
mod types;
mod wire;

pub use artifact::ArtifactFetcher;
pub use client::{ClientSettings, JobService, ReqwestJobClient};
pub use engine::EngineHandle;
pub use filename::artifact_filename;
pub use persist::{ensure_output_dir, PersistError, StagedFile};
pub use poll::{
    start_polling, ChannelStatusSink, PollLoop, PollSession, PollSettings, PollState, StatusSink,
};
pub use types::{
    ArtifactError, ClientError, EngineEvent, FormatOption, LookupError, MediaInfo, PollEvent,
    SubmissionError, TransportError,
};
