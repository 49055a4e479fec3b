use std::collections::HashSet;
use std::time::Duration;

use convert_core::{update, AppState, AppViewModel, Effect, JobKey, Msg, Outcome, SourceSpec};
use convert_engine::EngineEvent;
use engine_logging::{engine_info, engine_warn};
use tokio::sync::mpsc::UnboundedReceiver;

use super::effects::{event_to_msg, EffectRunner};
use super::ui::render::{stamped, Renderer};

const TICK: Duration = Duration::from_millis(250);

/// How each row ended.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub completed: usize,
    pub unsuccessful: Vec<(JobKey, String)>,
}

impl RunSummary {
    fn from_view(view: &AppViewModel) -> Self {
        let mut summary = Self::default();
        for job in &view.jobs {
            match job.outcome() {
                Some(Outcome::Completed) => summary.completed += 1,
                _ => summary
                    .unsuccessful
                    .push((job.key.clone(), job.status_text.clone())),
            }
        }
        summary
    }

    pub fn all_completed(&self) -> bool {
        self.unsuccessful.is_empty()
    }
}

/// Owns the state and drives it with engine events.
pub struct App {
    state: AppState,
    runner: EffectRunner,
    renderer: Renderer,
    auto_save: bool,
    save_requested: HashSet<JobKey>,
    saves_pending: HashSet<JobKey>,
    output: Vec<String>,
}

impl App {
    pub fn new(runner: EffectRunner, auto_save: bool) -> Self {
        Self {
            state: AppState::new(),
            runner,
            renderer: Renderer::new(),
            auto_save,
            save_requested: HashSet::new(),
            saves_pending: HashSet::new(),
            output: Vec::new(),
        }
    }

    /// Load the source and press every row's action once.
    pub fn start(&mut self, source: SourceSpec, formats: Vec<String>) {
        self.dispatch(Msg::SourceLoaded { source, formats });
        let keys: Vec<JobKey> = self.state.view().jobs.into_iter().map(|job| job.key).collect();
        for key in keys {
            self.dispatch(Msg::StartClicked { key });
        }
    }

    pub fn dispatch(&mut self, msg: Msg) {
        match &msg {
            Msg::ArtifactSaved { key, .. } | Msg::ArtifactFailed { key, .. } => {
                self.saves_pending.remove(key);
            }
            _ => {}
        }

        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        let was_dirty = state.consume_dirty();
        self.state = state;

        for effect in &effects {
            if let Effect::RetrieveArtifact { key, .. } = effect {
                self.saves_pending.insert(key.clone());
            }
        }
        self.runner.enqueue(effects);

        if was_dirty {
            let view = self.state.view();
            self.output.extend(self.renderer.frame(&view));
            self.request_saves(&view);
        }
    }

    pub fn handle_event(&mut self, event: EngineEvent) {
        self.dispatch(event_to_msg(event));
    }

    /// Lines rendered since the last call.
    pub fn take_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.output)
    }

    /// Nothing is running and no download is outstanding.
    pub fn is_settled(&self) -> bool {
        self.state.view().all_settled() && self.saves_pending.is_empty()
    }

    pub fn interrupt(&mut self) {
        self.saves_pending.clear();
        self.dispatch(Msg::CancelAll);
        self.runner.shutdown();
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary::from_view(&self.state.view())
    }

    pub fn active_sessions(&self) -> usize {
        self.runner.active_sessions()
    }

    fn request_saves(&mut self, view: &AppViewModel) {
        if !self.auto_save {
            return;
        }
        let ready: Vec<JobKey> = view
            .jobs
            .iter()
            .filter(|job| job.outcome() == Some(Outcome::Completed))
            .filter(|job| self.save_requested.insert(job.key.clone()))
            .map(|job| job.key.clone())
            .collect();
        for key in ready {
            self.dispatch(Msg::SaveClicked { key });
        }
    }
}

/// Drive `app` until every row settles or the user interrupts.
pub async fn run(
    mut app: App,
    mut events: UnboundedReceiver<EngineEvent>,
    source: SourceSpec,
    formats: Vec<String>,
) -> RunSummary {
    app.start(source, formats);
    print_lines(app.take_output());

    let mut tick = tokio::time::interval(TICK);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    while !app.is_settled() {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => app.handle_event(event),
                None => break,
            },
            result = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                if let Err(err) = result {
                    engine_warn!("Failed to listen for ctrl-c: {err}");
                    continue;
                }
                engine_warn!("Interrupted; cancelling {} poll sessions", app.active_sessions());
                app.interrupt();
            }
            _ = tick.tick() => app.dispatch(Msg::Tick),
        }
        print_lines(app.take_output());
    }

    let summary = app.summary();
    engine_info!(
        "Run finished: {} completed, {} not completed",
        summary.completed,
        summary.unsuccessful.len()
    );
    summary
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{}", stamped(&line));
    }
}
