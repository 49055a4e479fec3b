use std::collections::HashMap;

use chrono::Local;
use convert_core::{AppViewModel, JobKey, JobRowView, Outcome, Tone};

const BAR_WIDTH: usize = 20;

/// Turns view snapshots into terminal lines, emitting a row only when its
/// text changed since the previous frame.
#[derive(Debug, Default)]
pub struct Renderer {
    last: HashMap<JobKey, String>,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame(&mut self, view: &AppViewModel) -> Vec<String> {
        let width = view
            .jobs
            .iter()
            .map(|job| job.key.format_selector().len())
            .max()
            .unwrap_or(0);

        let mut lines = Vec::new();
        for job in &view.jobs {
            let line = format_job_row(job, width);
            if self.last.get(&job.key) != Some(&line) {
                self.last.insert(job.key.clone(), line.clone());
                lines.push(line);
            }
        }
        lines
    }
}

/// Prefix a line with the local wall-clock time.
pub fn stamped(line: &str) -> String {
    format!("{} {line}", Local::now().format("%H:%M:%S"))
}

fn format_job_row(job: &JobRowView, width: usize) -> String {
    let mut row = format!(
        "[{key:<width$}] {bar} {status}",
        key = job.key.format_selector(),
        bar = progress_bar(job),
        status = job.status_text
    );
    if let Some(location) = &job.saved_to {
        row.push_str(&format!(" -> {location}"));
    } else if let Some(artifact_ref) = job.artifact_ref.as_deref() {
        row.push_str(&format!(" ({artifact_ref})"));
    }
    if let Some(detail) = &job.detail {
        row.push_str(&format!(" [{detail}]"));
    }
    if job.action_enabled && job.outcome().is_some_and(|o| o != Outcome::Completed) {
        row.push_str(&format!(" ({} available)", job.action_label));
    }
    row
}

fn progress_bar(job: &JobRowView) -> String {
    if job.tone == Tone::Indeterminate {
        return format!("[{}]", "~".repeat(BAR_WIDTH));
    }
    let filled = usize::from(job.percent.min(100)) * BAR_WIDTH / 100;
    let fill = if job.tone == Tone::Error { '!' } else { '#' };
    format!(
        "[{}{}] {:>3}%",
        fill.to_string().repeat(filled),
        " ".repeat(BAR_WIDTH - filled),
        job.percent
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use convert_core::{update, AppState, JobHandle, JobId, JobStatus, Msg, SourceSpec};
    use pretty_assertions::assert_eq;

    fn running_state() -> AppState {
        let (state, _) = update(
            AppState::new(),
            Msg::SourceLoaded {
                source: SourceSpec::new("abc"),
                formats: vec!["mp4".into(), "m4a".into()],
            },
        );
        let key = JobKey::new("mp4");
        let (state, _) = update(state, Msg::StartClicked { key: key.clone() });
        let (state, _) = update(
            state,
            Msg::Submitted {
                key,
                handle: JobHandle::new("t1"),
            },
        );
        state
    }

    fn status(state: AppState, status: JobStatus) -> AppState {
        update(
            state,
            Msg::Status {
                key: JobKey::new("mp4"),
                job_id: JobId::new("t1"),
                status,
            },
        )
        .0
    }

    #[test]
    fn renders_only_changed_rows() {
        let mut renderer = Renderer::new();
        let state = running_state();

        let first = renderer.frame(&state.view());
        assert_eq!(first.len(), 2);
        assert!(renderer.frame(&state.view()).is_empty());

        let state = status(
            state,
            JobStatus::Running {
                percentage: Some(50),
                label: "Downloading".into(),
            },
        );
        let lines = renderer.frame(&state.view());
        assert_eq!(
            lines,
            vec![format!(
                "[mp4] [{}{}]  50% 50% - Downloading",
                "#".repeat(10),
                " ".repeat(10)
            )]
        );
    }

    #[test]
    fn failed_rows_offer_retry() {
        let mut renderer = Renderer::new();
        let state = status(
            running_state(),
            JobStatus::Failed {
                reason: "unsupported codec".into(),
            },
        );

        let lines = renderer.frame(&state.view());
        assert!(lines[1].contains("Failed: unsupported codec"), "{lines:?}");
        assert!(lines[1].ends_with("(Retry available)"), "{lines:?}");
    }

    #[test]
    fn queued_rows_show_indeterminate_bar() {
        let mut renderer = Renderer::new();
        let state = status(running_state(), JobStatus::Queued);

        let lines = renderer.frame(&state.view());
        assert!(lines[1].contains(&"~".repeat(BAR_WIDTH)));
        assert!(lines[1].ends_with("Queued"));
    }

    #[test]
    fn completed_rows_show_artifact() {
        let mut renderer = Renderer::new();
        let state = status(
            running_state(),
            JobStatus::Completed {
                artifact_ref: "/dl/t1".into(),
            },
        );

        let lines = renderer.frame(&state.view());
        assert!(lines[1].ends_with("Completed (/dl/t1)"), "{lines:?}");
    }

    #[test]
    fn stamped_lines_keep_text() {
        assert!(stamped("hello").ends_with(" hello"));
    }
}
