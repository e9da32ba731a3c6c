//! Workflow driver.
//!
//! [`Studio`] owns the [`WorkflowState`], feeds user actions through
//! [`transition`] and runs the effects it asks for. Analysis and generation
//! are spawned as background tasks; user methods return as soon as the work
//! is started, and the completions are fed back in through
//! [`Studio::advance`], [`Studio::settle`] or the [`Studio::run`] loop.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::{Id, JoinSet};
use tracing::{debug, Instrument};
use uuid::Uuid;

use rns_genai::{SceneAnalyzer, VideoGenerator};
use rns_media::{ingest_file, PlaybackRegistry};
use rns_models::{GenerationStatus, MediaAsset, MediaKind};

use crate::config::StudioConfig;
use crate::credential::CredentialProvider;
use crate::error::StudioError;
use crate::logging::WorkflowLogger;
use crate::orchestrator::GenerationOrchestrator;
use crate::progress;
use crate::workflow::{transition, Effect, TaskId, WorkflowEvent, WorkflowState};

type StatusSubscriber = Option<mpsc::UnboundedSender<GenerationStatus>>;

/// A user action for [`Studio::run`].
#[derive(Debug, Clone)]
pub enum StudioCommand {
    SelectVideo { path: PathBuf, mime_type: Option<String> },
    SelectImage { path: PathBuf, mime_type: Option<String> },
    Generate,
    SelectCredential,
    Retry,
    Reset,
}

/// Drives one subject-swap workflow.
pub struct Studio {
    state: WorkflowState,
    analyzer: Arc<dyn SceneAnalyzer>,
    orchestrator: Arc<GenerationOrchestrator>,
    registry: Arc<PlaybackRegistry>,
    credentials: Arc<dyn CredentialProvider>,
    subscriber: StatusSubscriber,
    logger: WorkflowLogger,
    /// Running analyses and generations; each yields its final event
    tasks: JoinSet<WorkflowEvent>,
    /// Event to report if a task dies before yielding one
    on_abort: HashMap<Id, WorkflowEvent>,
    progress_tx: mpsc::UnboundedSender<WorkflowEvent>,
    progress_rx: mpsc::UnboundedReceiver<WorkflowEvent>,
}

impl Studio {
    pub fn new(
        analyzer: Arc<dyn SceneAnalyzer>,
        generator: Arc<dyn VideoGenerator>,
        credentials: Arc<dyn CredentialProvider>,
        registry: Arc<PlaybackRegistry>,
        config: StudioConfig,
    ) -> Self {
        let state = WorkflowState::new(credentials.has_credential());
        let orchestrator = GenerationOrchestrator::new(generator, registry.clone(), config);
        let (progress_tx, progress_rx) = mpsc::unbounded_channel();

        Self {
            state,
            analyzer,
            orchestrator: Arc::new(orchestrator),
            registry,
            credentials,
            subscriber: None,
            logger: WorkflowLogger::new(Uuid::new_v4()),
            tasks: JoinSet::new(),
            on_abort: HashMap::new(),
            progress_tx,
            progress_rx,
        }
    }

    /// Receive every status change from now on. Replaces any earlier
    /// subscriber.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<GenerationStatus> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscriber = Some(tx);
        rx
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn registry(&self) -> &Arc<PlaybackRegistry> {
        &self.registry
    }

    pub fn workflow_id(&self) -> Uuid {
        self.logger.workflow_id()
    }

    /// Whether an analysis or generation is still running.
    pub fn is_working(&self) -> bool {
        !self.tasks.is_empty()
    }

    /// Read a base video from disk and start analysing it.
    pub async fn select_video(
        &mut self,
        path: impl AsRef<Path>,
        mime_type: Option<&str>,
    ) -> &WorkflowState {
        self.select_file(path.as_ref(), MediaKind::BaseVideo, mime_type)
            .await
    }

    /// Read a target image from disk.
    pub async fn select_image(
        &mut self,
        path: impl AsRef<Path>,
        mime_type: Option<&str>,
    ) -> &WorkflowState {
        self.select_file(path.as_ref(), MediaKind::TargetImage, mime_type)
            .await
    }

    /// Hand over an asset that was ingested elsewhere. Its playback handle
    /// becomes owned by the workflow.
    pub async fn load_media(&mut self, asset: MediaAsset) -> &WorkflowState {
        self.dispatch(WorkflowEvent::MediaSelected(asset)).await
    }

    /// Start a generation with the current analysis and target image.
    pub async fn generate(&mut self) -> &WorkflowState {
        self.dispatch(WorkflowEvent::GenerateRequested).await
    }

    /// Ask the credential provider for a key.
    pub async fn select_credential(&mut self) -> &WorkflowState {
        self.run_effect(Effect::SelectCredential).await;
        &self.state
    }

    pub async fn retry(&mut self) -> &WorkflowState {
        self.dispatch(WorkflowEvent::Retry).await
    }

    /// Drop all media, analysis and results and start over. Work still
    /// running finishes in the background and its results are discarded.
    pub async fn reset(&mut self) -> &WorkflowState {
        self.dispatch(WorkflowEvent::Reset).await;
        self.logger = WorkflowLogger::new(Uuid::new_v4());
        &self.state
    }

    pub async fn execute(&mut self, command: StudioCommand) -> &WorkflowState {
        match command {
            StudioCommand::SelectVideo { path, mime_type } => {
                self.select_video(path, mime_type.as_deref()).await
            }
            StudioCommand::SelectImage { path, mime_type } => {
                self.select_image(path, mime_type.as_deref()).await
            }
            StudioCommand::Generate => self.generate().await,
            StudioCommand::SelectCredential => self.select_credential().await,
            StudioCommand::Retry => self.retry().await,
            StudioCommand::Reset => self.reset().await,
        }
    }

    /// Apply the next progress update or completion. Returns `false` when
    /// nothing is running.
    pub async fn advance(&mut self) -> bool {
        match self.next_completion().await {
            Some(event) => {
                self.dispatch(event).await;
                true
            }
            None => false,
        }
    }

    /// Wait until all background work has finished and been applied.
    pub async fn settle(&mut self) -> &WorkflowState {
        while self.advance().await {}
        &self.state
    }

    /// Serve commands until the sender is dropped, applying completions as
    /// they arrive in between. Remaining work is settled before returning.
    pub async fn run(mut self, mut commands: mpsc::Receiver<StudioCommand>) -> Self {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => {
                        self.execute(command).await;
                    }
                    None => break,
                },
                Some(event) = self.next_completion(), if self.is_working() => {
                    self.dispatch(event).await;
                }
            }
        }

        self.settle().await;
        self
    }

    async fn next_completion(&mut self) -> Option<WorkflowEvent> {
        loop {
            if self.tasks.is_empty() {
                return self.progress_rx.try_recv().ok();
            }

            tokio::select! {
                biased;
                Some(event) = self.progress_rx.recv() => return Some(event),
                joined = self.tasks.join_next_with_id() => match joined {
                    Some(Ok((id, event))) => {
                        self.on_abort.remove(&id);
                        return Some(event);
                    }
                    Some(Err(e)) => {
                        self.logger.failed(&e);
                        if let Some(event) = self.on_abort.remove(&e.id()) {
                            return Some(event);
                        }
                    }
                    None => {}
                },
            }
        }
    }

    async fn select_file(
        &mut self,
        path: &Path,
        kind: MediaKind,
        mime_type: Option<&str>,
    ) -> &WorkflowState {
        let event = match ingest_file(path, kind, mime_type, &self.registry).await {
            Ok(asset) => WorkflowEvent::MediaSelected(asset),
            Err(e) => {
                let err = StudioError::from(e);
                self.logger.rejected(&err);
                WorkflowEvent::MediaRejected {
                    kind,
                    message: err.to_string(),
                }
            }
        };
        self.dispatch(event).await
    }

    async fn dispatch(&mut self, event: WorkflowEvent) -> &WorkflowState {
        let mut events = VecDeque::from([event]);

        while let Some(event) = events.pop_front() {
            let effects = self.apply(event);
            for effect in effects {
                if let Some(follow_up) = self.run_effect(effect).await {
                    events.push_back(follow_up);
                }
            }
        }

        &self.state
    }

    /// Apply one event and notify the subscriber if the visible status changed.
    fn apply(&mut self, event: WorkflowEvent) -> Vec<Effect> {
        let before = self.state.status.clone();
        let next = transition(&self.state, event);
        self.state = next.state;

        let status = &self.state.status;
        if status.stage != before.stage || status.message != before.message {
            debug!(stage = %status.stage, message = %status.message, "Workflow status changed");
            if let Some(tx) = &self.subscriber {
                // Subscriber may have gone away; the state is still authoritative
                let _ = tx.send(status.clone());
            }
        }

        next.effects
    }

    async fn run_effect(&mut self, effect: Effect) -> Option<WorkflowEvent> {
        match effect {
            Effect::Analyze { task, video } => {
                self.spawn_analysis(task, video);
                None
            }

            Effect::Generate {
                task,
                prompt,
                reference,
            } => {
                self.spawn_generation(task, prompt, reference);
                None
            }

            Effect::SelectCredential => match self.credentials.select_credential().await {
                Ok(()) => Some(WorkflowEvent::CredentialSelected),
                Err(e) => {
                    self.logger.rejected(&e);
                    None
                }
            },

            Effect::Revoke(handle) => {
                if let Err(e) = self.registry.revoke(&handle) {
                    debug!(handle = %handle, "Handle already released: {}", e);
                }
                None
            }
        }
    }

    fn spawn_analysis(&mut self, task: TaskId, video: Arc<MediaAsset>) {
        let analyzer = self.analyzer.clone();
        let logger = self.logger.task("analysis");
        let span = logger.span();

        let handle = self.tasks.spawn(
            async move {
                logger.started(&video.name);
                match analyzer.analyze(&video.payload, &video.mime_type).await {
                    Ok(result) => {
                        logger.finished(&result.environment);
                        WorkflowEvent::AnalysisSucceeded { task, result }
                    }
                    Err(e) => {
                        let err = StudioError::from_analysis(e);
                        logger.failed(&err);
                        WorkflowEvent::AnalysisFailed {
                            task,
                            message: err.to_string(),
                        }
                    }
                }
            }
            .instrument(span),
        );

        self.on_abort.insert(
            handle.id(),
            WorkflowEvent::AnalysisFailed {
                task,
                message: "analysis task stopped".to_string(),
            },
        );
    }

    fn spawn_generation(&mut self, task: TaskId, prompt: String, reference: Arc<MediaAsset>) {
        let orchestrator = self.orchestrator.clone();
        let forward = self.progress_tx.clone();
        let logger = self.logger.task("generation");
        let span = logger.span();

        let handle = self.tasks.spawn(
            async move {
                logger.started(&prompt);
                let (sender, mut rx) = progress::channel();

                let run = orchestrator.generate(&prompt, Some(reference.as_ref()), sender);
                let relay = async {
                    while let Some(event) = rx.recv().await {
                        if let Some(message) = event.message() {
                            logger.progress(message);
                            let _ = forward.send(WorkflowEvent::GenerationProgress {
                                task,
                                message: message.to_string(),
                            });
                        }
                    }
                };
                let (result, ()) = tokio::join!(run, relay);

                match result {
                    Ok(handle) => {
                        logger.finished(&handle.to_string());
                        WorkflowEvent::GenerationSucceeded { task, handle }
                    }
                    Err(err) => {
                        logger.failed(&err);
                        WorkflowEvent::GenerationFailed {
                            task,
                            message: err.user_message(),
                            credential_invalid: err.is_credential(),
                        }
                    }
                }
            }
            .instrument(span),
        );

        self.on_abort.insert(
            handle.id(),
            WorkflowEvent::GenerationFailed {
                task,
                message: StudioError::generation("generation task stopped").user_message(),
                credential_invalid: false,
            },
        );
    }
}
