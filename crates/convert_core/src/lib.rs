//! Convert core: job domain types and the pure per-job view state machine.
mod effect;
mod msg;
mod state;
mod status;
mod update;
mod view_model;

pub use effect::Effect;
pub use msg::Msg;
pub use state::{AppState, JobPanel, Outcome, Phase, SourceSpec, Tone};
pub use status::{JobHandle, JobId, JobKey, JobRequest, JobStatus};
pub use update::update;
pub use view_model::{AppViewModel, JobRowView, CONNECTION_LOST_TEXT};
