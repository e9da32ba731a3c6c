//! Workflow state machine.
//!
//! `idle → analyzing → configuring → generating → completed | error`, with
//! `error → configuring` on retry and a reset back to `idle` from anywhere.
//!
//! [`transition`] is pure: it never performs I/O. Side effects (remote calls,
//! handle revocation, credential prompts) come back as [`Effect`]s for the
//! driver to run. An event that is not valid in the current state leaves the
//! state untouched and yields no effects, except that a media asset or result
//! handle the state will not adopt is handed back for revocation.
//!
//! Remote work runs in the background, so each `Analyze` and `Generate`
//! effect carries a task number and its completion events echo it back.
//! Completions from a task the state no longer waits on are stale.

use std::sync::Arc;

use tracing::debug;

use rns_models::{
    display_prompt, finalize_prompt, AnalysisResult, GenerationStatus, MediaAsset, MediaKind,
    PlaybackHandle, Stage, WorkflowStep, REFERENCE_SUBJECT,
};

use crate::error::{ANALYSIS_MESSAGE, CREDENTIAL_MESSAGE};

pub const ANALYZING_MESSAGE: &str = "Analyzing cinematic scene context...";
pub const ANALYSIS_COMPLETE_MESSAGE: &str = "Analysis complete.";
pub const GENERATING_MESSAGE: &str = "Initializing neural rendering engine...";
pub const COMPLETED_MESSAGE: &str = "Processing finished!";
pub const RETRY_MESSAGE: &str = "Ready to generate.";

/// Identifies one background analysis or generation.
pub type TaskId = u64;

/// Everything the workflow owns.
#[derive(Debug, Clone, Default)]
pub struct WorkflowState {
    pub status: GenerationStatus,
    pub step: WorkflowStep,
    pub base_video: Option<Arc<MediaAsset>>,
    pub target_image: Option<Arc<MediaAsset>>,
    pub analysis: Option<AnalysisResult>,
    pub result: Option<PlaybackHandle>,
    pub has_credential: bool,
    /// Last task started; survives reset so numbers are never reused
    pub task: TaskId,
}

impl WorkflowState {
    pub fn new(has_credential: bool) -> Self {
        Self {
            has_credential,
            ..Default::default()
        }
    }

    pub fn stage(&self) -> Stage {
        self.status.stage
    }

    /// Prompt shown while configuring, with the placeholder filled in.
    pub fn display_prompt(&self) -> Option<String> {
        self.analysis
            .as_ref()
            .map(|a| display_prompt(&a.suggested_prompt))
    }

    /// Whether a generation request would be accepted right now,
    /// credential aside.
    pub fn can_generate(&self) -> bool {
        self.stage() == Stage::Configuring
            && self.analysis.is_some()
            && self.target_image.is_some()
    }

    /// Every playback handle the state currently owns.
    pub fn handles(&self) -> Vec<PlaybackHandle> {
        self.base_video
            .iter()
            .chain(self.target_image.iter())
            .map(|asset| asset.playback.clone())
            .chain(self.result.iter().cloned())
            .collect()
    }

    fn awaiting(&self, stage: Stage, task: TaskId) -> bool {
        self.stage() == stage && self.task == task
    }

    fn next_task(&mut self) -> TaskId {
        self.task += 1;
        self.task
    }

    fn set_status(&mut self, status: GenerationStatus) {
        self.step = WorkflowStep::for_stage(status.stage, self.step);
        self.status = status;
    }
}

/// Inputs to the state machine: user actions and completed async work.
#[derive(Debug, Clone)]
pub enum WorkflowEvent {
    /// A file was read; its kind decides the slot
    MediaSelected(MediaAsset),
    /// A file could not be read
    MediaRejected { kind: MediaKind, message: String },
    AnalysisSucceeded { task: TaskId, result: AnalysisResult },
    AnalysisFailed { task: TaskId, message: String },
    /// User asked to generate
    GenerateRequested,
    CredentialSelected,
    GenerationProgress { task: TaskId, message: String },
    GenerationSucceeded { task: TaskId, handle: PlaybackHandle },
    GenerationFailed {
        task: TaskId,
        message: String,
        credential_invalid: bool,
    },
    /// User asked to try again after an error
    Retry,
    /// User discarded everything
    Reset,
}

impl WorkflowEvent {
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowEvent::MediaSelected(_) => "media_selected",
            WorkflowEvent::MediaRejected { .. } => "media_rejected",
            WorkflowEvent::AnalysisSucceeded { .. } => "analysis_succeeded",
            WorkflowEvent::AnalysisFailed { .. } => "analysis_failed",
            WorkflowEvent::GenerateRequested => "generate_requested",
            WorkflowEvent::CredentialSelected => "credential_selected",
            WorkflowEvent::GenerationProgress { .. } => "generation_progress",
            WorkflowEvent::GenerationSucceeded { .. } => "generation_succeeded",
            WorkflowEvent::GenerationFailed { .. } => "generation_failed",
            WorkflowEvent::Retry => "retry",
            WorkflowEvent::Reset => "reset",
        }
    }
}

/// Side effects requested by a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Run scene analysis on the base video
    Analyze { task: TaskId, video: Arc<MediaAsset> },
    /// Run a generation with a finalized prompt
    Generate {
        task: TaskId,
        prompt: String,
        reference: Arc<MediaAsset>,
    },
    /// Prompt for a credential instead of generating
    SelectCredential,
    /// Release a playback handle
    Revoke(PlaybackHandle),
}

/// Result of applying one event.
#[derive(Debug, Clone)]
pub struct Transition {
    pub state: WorkflowState,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn to(state: WorkflowState) -> Self {
        Self {
            state,
            effects: Vec::new(),
        }
    }

    fn with(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    fn with_all(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

fn ignored(state: &WorkflowState, event: &'static str) -> Transition {
    debug!(stage = %state.stage(), event, "Ignoring event not valid in current stage");
    Transition::to(state.clone())
}

fn start_analysis(mut next: WorkflowState, video: Arc<MediaAsset>) -> Transition {
    let task = next.next_task();
    next.set_status(GenerationStatus::analyzing(ANALYZING_MESSAGE));
    Transition::to(next).with(Effect::Analyze { task, video })
}

/// Apply `event` to `state`.
pub fn transition(state: &WorkflowState, event: WorkflowEvent) -> Transition {
    let stage = state.stage();
    let name = event.name();

    match event {
        // Intake only starts a workflow; a loaded one must be reset first
        WorkflowEvent::MediaSelected(asset) => match asset.kind {
            MediaKind::BaseVideo if stage != Stage::Idle => {
                ignored(state, name).with(Effect::Revoke(asset.playback))
            }
            MediaKind::BaseVideo => {
                let mut next = state.clone();
                let video = Arc::new(asset);
                next.base_video = Some(video.clone());
                start_analysis(next, video)
            }
            MediaKind::TargetImage if stage == Stage::Generating => {
                ignored(state, name).with(Effect::Revoke(asset.playback))
            }
            MediaKind::TargetImage => {
                let mut next = state.clone();
                let superseded = next.target_image.replace(Arc::new(asset));
                Transition::to(next)
                    .with_all(superseded.map(|old| Effect::Revoke(old.playback.clone())))
            }
        },

        WorkflowEvent::MediaRejected { kind, message } => {
            if stage.is_busy() {
                return ignored(state, name);
            }
            let mut next = state.clone();
            let label = match kind {
                MediaKind::BaseVideo => "video",
                MediaKind::TargetImage => "image",
            };
            next.status = state
                .status
                .with_message(format!("Could not read the selected {}: {}", label, message));
            Transition::to(next)
        }

        WorkflowEvent::AnalysisSucceeded { task, result }
            if state.awaiting(Stage::Analyzing, task) =>
        {
            let mut next = state.clone();
            next.analysis = Some(result);
            next.set_status(GenerationStatus::configuring(ANALYSIS_COMPLETE_MESSAGE));
            Transition::to(next)
        }

        WorkflowEvent::AnalysisFailed { task, .. } if state.awaiting(Stage::Analyzing, task) => {
            let mut next = state.clone();
            next.set_status(GenerationStatus::error(ANALYSIS_MESSAGE));
            Transition::to(next)
        }

        WorkflowEvent::GenerateRequested => {
            if !state.can_generate() {
                return ignored(state, name);
            }
            if !state.has_credential {
                return Transition::to(state.clone()).with(Effect::SelectCredential);
            }
            let (Some(analysis), Some(reference)) = (&state.analysis, &state.target_image) else {
                return ignored(state, name);
            };

            let prompt = finalize_prompt(&analysis.suggested_prompt, REFERENCE_SUBJECT);
            let reference = reference.clone();
            let mut next = state.clone();
            let task = next.next_task();
            next.set_status(GenerationStatus::generating(GENERATING_MESSAGE));

            Transition::to(next).with(Effect::Generate {
                task,
                prompt,
                reference,
            })
        }

        WorkflowEvent::CredentialSelected => {
            let mut next = state.clone();
            next.has_credential = true;
            Transition::to(next)
        }

        WorkflowEvent::GenerationProgress { task, message }
            if state.awaiting(Stage::Generating, task) =>
        {
            let mut next = state.clone();
            next.status = state.status.with_message(message);
            Transition::to(next)
        }

        WorkflowEvent::GenerationSucceeded { task, handle } => {
            if !state.awaiting(Stage::Generating, task) {
                return ignored(state, name).with(Effect::Revoke(handle));
            }
            let mut next = state.clone();
            next.result = Some(handle);
            next.set_status(GenerationStatus::completed(COMPLETED_MESSAGE));
            Transition::to(next)
        }

        WorkflowEvent::GenerationFailed {
            task,
            message,
            credential_invalid,
        } if state.awaiting(Stage::Generating, task) => {
            let mut next = state.clone();
            if credential_invalid {
                next.has_credential = false;
                next.set_status(GenerationStatus::error(CREDENTIAL_MESSAGE));
            } else {
                next.set_status(GenerationStatus::error(message));
            }
            Transition::to(next)
        }

        WorkflowEvent::Retry if stage == Stage::Error => {
            let mut next = state.clone();
            if next.analysis.is_some() {
                next.set_status(GenerationStatus::configuring(RETRY_MESSAGE));
                Transition::to(next)
            } else if let Some(video) = next.base_video.clone() {
                start_analysis(next, video)
            } else {
                next.set_status(GenerationStatus::idle());
                Transition::to(next)
            }
        }

        WorkflowEvent::Reset => {
            let revoked = state.handles().into_iter().map(Effect::Revoke);
            let next = WorkflowState {
                task: state.task,
                ..WorkflowState::new(state.has_credential)
            };
            Transition::to(next).with_all(revoked)
        }

        _ => ignored(state, name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rns_models::{EncodedPayload, PlaybackHandle};

    fn asset(kind: MediaKind) -> MediaAsset {
        MediaAsset {
            name: match kind {
                MediaKind::BaseVideo => "clip.mp4".to_string(),
                MediaKind::TargetImage => "car.png".to_string(),
            },
            kind,
            size_bytes: 3,
            mime_type: match kind {
                MediaKind::BaseVideo => "video/mp4".to_string(),
                MediaKind::TargetImage => "image/png".to_string(),
            },
            playback: PlaybackHandle::new(),
            payload: EncodedPayload::encode(b"abc"),
        }
    }

    fn desert() -> AnalysisResult {
        AnalysisResult {
            environment: "desert".to_string(),
            subjects: "car".to_string(),
            lighting: "bright".to_string(),
            cinematography: "wide shot".to_string(),
            original_car: "red sedan".to_string(),
            suggested_prompt: "A wide shot of [TARGET_CAR] in the desert".to_string(),
        }
    }

    fn apply(state: &WorkflowState, event: WorkflowEvent) -> WorkflowState {
        transition(state, event).state
    }

    fn analyzed(state: &WorkflowState) -> WorkflowEvent {
        WorkflowEvent::AnalysisSucceeded {
            task: state.task,
            result: desert(),
        }
    }

    fn succeeded(state: &WorkflowState, handle: PlaybackHandle) -> WorkflowEvent {
        WorkflowEvent::GenerationSucceeded {
            task: state.task,
            handle,
        }
    }

    fn failed(state: &WorkflowState, message: &str, credential_invalid: bool) -> WorkflowEvent {
        WorkflowEvent::GenerationFailed {
            task: state.task,
            message: message.to_string(),
            credential_invalid,
        }
    }

    fn analyzing() -> WorkflowState {
        apply(
            &WorkflowState::new(true),
            WorkflowEvent::MediaSelected(asset(MediaKind::BaseVideo)),
        )
    }

    fn configuring(has_credential: bool, with_image: bool) -> WorkflowState {
        let mut state = WorkflowState::new(has_credential);
        state = apply(&state, WorkflowEvent::MediaSelected(asset(MediaKind::BaseVideo)));
        state = apply(&state, analyzed(&state));
        if with_image {
            state = apply(&state, WorkflowEvent::MediaSelected(asset(MediaKind::TargetImage)));
        }
        state
    }

    fn generating() -> WorkflowState {
        apply(&configuring(true, true), WorkflowEvent::GenerateRequested)
    }

    fn completed() -> WorkflowState {
        let state = generating();
        apply(&state, succeeded(&state, PlaybackHandle::new()))
    }

    fn same(a: &WorkflowState, b: &WorkflowState) -> bool {
        a.status == b.status
            && a.step == b.step
            && a.analysis == b.analysis
            && a.result == b.result
            && a.has_credential == b.has_credential
            && a.base_video == b.base_video
            && a.target_image == b.target_image
            && a.task == b.task
    }

    #[test]
    fn test_video_selection_starts_analysis() {
        let video = asset(MediaKind::BaseVideo);
        let t = transition(&WorkflowState::default(), WorkflowEvent::MediaSelected(video.clone()));

        assert_eq!(t.state.stage(), Stage::Analyzing);
        assert_eq!(t.state.step, WorkflowStep::AnalyzeAndTarget);
        assert_eq!(
            t.effects,
            vec![Effect::Analyze {
                task: 1,
                video: Arc::new(video)
            }]
        );
    }

    #[test]
    fn test_analysis_success_moves_to_configuring() {
        let state = configuring(true, false);
        assert_eq!(state.stage(), Stage::Configuring);
        assert_eq!(
            state.display_prompt().as_deref(),
            Some("A wide shot of Your New Car in the desert")
        );
    }

    #[test]
    fn test_analysis_failure_moves_to_error() {
        let state = analyzing();
        let state = apply(
            &state,
            WorkflowEvent::AnalysisFailed {
                task: state.task,
                message: "quota".to_string(),
            },
        );

        assert_eq!(state.stage(), Stage::Error);
        assert_eq!(state.status.message, ANALYSIS_MESSAGE);
        assert!(state.analysis.is_none());
    }

    #[test]
    fn test_stale_analysis_is_ignored() {
        let state = analyzing();
        let t = transition(
            &state,
            WorkflowEvent::AnalysisSucceeded {
                task: state.task - 1,
                result: desert(),
            },
        );

        assert!(same(&t.state, &state));
        assert!(t.effects.is_empty());
    }

    #[test]
    fn test_generate_requires_analysis() {
        let mut state = WorkflowState::new(true);
        state.target_image = Some(Arc::new(asset(MediaKind::TargetImage)));
        state.status = GenerationStatus::configuring("");
        assert!(!state.can_generate());

        let t = transition(&state, WorkflowEvent::GenerateRequested);
        assert!(same(&t.state, &state));
        assert!(t.effects.is_empty());
    }

    #[test]
    fn test_generate_requires_target_image() {
        let state = configuring(true, false);
        assert!(!state.can_generate());

        let t = transition(&state, WorkflowEvent::GenerateRequested);
        assert!(same(&t.state, &state));
        assert!(t.effects.is_empty());
    }

    #[test]
    fn test_generate_without_credential_selects_credential() {
        let state = configuring(false, true);
        let t = transition(&state, WorkflowEvent::GenerateRequested);

        assert_eq!(t.state.stage(), Stage::Configuring);
        assert_eq!(t.effects, vec![Effect::SelectCredential]);

        let after = apply(&t.state, WorkflowEvent::CredentialSelected);
        assert!(after.has_credential);
        assert_eq!(after.stage(), Stage::Configuring);
    }

    #[test]
    fn test_generate_finalizes_prompt() {
        let state = configuring(true, true);
        assert!(state.can_generate());
        let t = transition(&state, WorkflowEvent::GenerateRequested);

        assert_eq!(t.state.stage(), Stage::Generating);
        assert_eq!(t.state.step, WorkflowStep::Generate);
        assert_eq!(t.state.task, state.task + 1);
        match &t.effects[..] {
            [Effect::Generate {
                task,
                prompt,
                reference,
            }] => {
                assert_eq!(*task, t.state.task);
                assert_eq!(prompt, "A wide shot of the provided vehicle reference in the desert");
                assert_eq!(reference.kind, MediaKind::TargetImage);
            }
            other => panic!("unexpected effects: {other:?}"),
        }
    }

    #[test]
    fn test_second_generate_while_generating_is_ignored() {
        let state = generating();
        let t = transition(&state, WorkflowEvent::GenerateRequested);
        assert!(same(&t.state, &state));
        assert!(t.effects.is_empty());
    }

    #[test]
    fn test_progress_updates_message_only() {
        let state = generating();
        let state = apply(
            &state,
            WorkflowEvent::GenerationProgress {
                task: state.task,
                message: "frames.".to_string(),
            },
        );
        assert_eq!(state.stage(), Stage::Generating);
        assert_eq!(state.status.message, "frames.");

        let idle = apply(
            &WorkflowState::default(),
            WorkflowEvent::GenerationProgress {
                task: 0,
                message: "x".to_string(),
            },
        );
        assert_eq!(idle.stage(), Stage::Idle);
        assert_eq!(idle.status.message, "");
    }

    #[test]
    fn test_generation_success_completes() {
        let handle = PlaybackHandle::new();
        let state = generating();
        let state = apply(&state, succeeded(&state, handle.clone()));

        assert_eq!(state.stage(), Stage::Completed);
        assert_eq!(state.result, Some(handle));
    }

    #[test]
    fn test_late_result_is_revoked() {
        let generating = generating();
        let reset = apply(&generating, WorkflowEvent::Reset);
        let handle = PlaybackHandle::new();

        let t = transition(&reset, succeeded(&generating, handle.clone()));
        assert_eq!(t.state.stage(), Stage::Idle);
        assert!(t.state.result.is_none());
        assert_eq!(t.effects, vec![Effect::Revoke(handle)]);
    }

    #[test]
    fn test_result_from_superseded_generation_is_revoked() {
        let first = generating();
        let failed_first = apply(&first, failed(&first, "boom", false));
        let retried = apply(&failed_first, WorkflowEvent::Retry);
        let second = apply(&retried, WorkflowEvent::GenerateRequested);
        let handle = PlaybackHandle::new();

        let t = transition(&second, succeeded(&first, handle.clone()));
        assert_eq!(t.state.stage(), Stage::Generating);
        assert_eq!(t.effects, vec![Effect::Revoke(handle)]);
    }

    #[test]
    fn test_credential_failure_clears_flag() {
        let state = generating();
        let state = apply(&state, failed(&state, "ignored", true));

        assert_eq!(state.stage(), Stage::Error);
        assert!(!state.has_credential);
        assert_eq!(state.status.message, CREDENTIAL_MESSAGE);
        assert_eq!(state.step, WorkflowStep::Generate);
    }

    #[test]
    fn test_retry_returns_to_configuring() {
        let state = generating();
        let failed = apply(&state, failed(&state, "Generation failed: boom", false));
        assert_eq!(failed.status.message, "Generation failed: boom");

        let t = transition(&failed, WorkflowEvent::Retry);
        assert_eq!(t.state.stage(), Stage::Configuring);
        assert_eq!(t.state.step, WorkflowStep::AnalyzeAndTarget);
        assert!(t.effects.is_empty());
    }

    #[test]
    fn test_retry_after_analysis_failure_reanalyzes() {
        let state = analyzing();
        let failed = apply(
            &state,
            WorkflowEvent::AnalysisFailed {
                task: state.task,
                message: "x".to_string(),
            },
        );

        let t = transition(&failed, WorkflowEvent::Retry);
        assert_eq!(t.state.stage(), Stage::Analyzing);
        assert_eq!(t.state.task, failed.task + 1);
        assert!(matches!(t.effects[..], [Effect::Analyze { .. }]));
    }

    #[test]
    fn test_retry_outside_error_is_ignored() {
        let state = configuring(true, true);
        let t = transition(&state, WorkflowEvent::Retry);
        assert!(same(&t.state, &state));
    }

    #[test]
    fn test_new_video_after_intake_is_handed_back() {
        for state in [configuring(true, true), completed()] {
            let video = asset(MediaKind::BaseVideo);
            let t = transition(&state, WorkflowEvent::MediaSelected(video.clone()));

            assert!(same(&t.state, &state));
            assert_eq!(t.effects, vec![Effect::Revoke(video.playback)]);
        }
    }

    #[test]
    fn test_new_image_supersedes_old_image() {
        let state = configuring(true, true);
        let old = state.target_image.clone().unwrap().playback.clone();

        let t = transition(&state, WorkflowEvent::MediaSelected(asset(MediaKind::TargetImage)));
        assert_eq!(t.effects, vec![Effect::Revoke(old)]);
        assert_eq!(t.state.stage(), Stage::Configuring);
    }

    #[test]
    fn test_image_during_generation_is_handed_back() {
        let state = generating();
        let image = asset(MediaKind::TargetImage);
        let t = transition(&state, WorkflowEvent::MediaSelected(image.clone()));

        assert!(same(&t.state, &state));
        assert_eq!(t.effects, vec![Effect::Revoke(image.playback)]);
    }

    #[test]
    fn test_rejected_media_reports_without_stage_change() {
        let state = configuring(true, false);
        let next = apply(
            &state,
            WorkflowEvent::MediaRejected {
                kind: MediaKind::TargetImage,
                message: "permission denied".to_string(),
            },
        );

        assert_eq!(next.stage(), Stage::Configuring);
        assert_eq!(next.status.message, "Could not read the selected image: permission denied");
    }

    #[test]
    fn test_reset_revokes_everything() {
        let completed = completed();
        let handles = completed.handles();
        assert_eq!(handles.len(), 3);

        let t = transition(&completed, WorkflowEvent::Reset);
        assert_eq!(t.state.stage(), Stage::Idle);
        assert_eq!(t.state.step, WorkflowStep::Upload);
        assert!(t.state.handles().is_empty());
        assert!(t.state.has_credential);
        assert_eq!(t.state.task, completed.task);
        assert_eq!(
            t.effects,
            handles.into_iter().map(Effect::Revoke).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_stage_only_moves_forward_except_retry_and_reset() {
        let order = |s: Stage| match s {
            Stage::Idle => 0,
            Stage::Analyzing => 1,
            Stage::Configuring => 2,
            Stage::Generating => 3,
            Stage::Completed | Stage::Error => 4,
        };

        let mut state = WorkflowState::new(true);
        let script: [fn(&WorkflowState) -> WorkflowEvent; 10] = [
            |_| WorkflowEvent::MediaSelected(asset(MediaKind::BaseVideo)),
            analyzed,
            |_| WorkflowEvent::MediaSelected(asset(MediaKind::TargetImage)),
            |_| WorkflowEvent::GenerateRequested,
            |s| WorkflowEvent::GenerationProgress {
                task: s.task,
                message: "a".to_string(),
            },
            analyzed,
            |_| WorkflowEvent::MediaSelected(asset(MediaKind::BaseVideo)),
            |s| succeeded(s, PlaybackHandle::new()),
            |_| WorkflowEvent::MediaSelected(asset(MediaKind::BaseVideo)),
            |_| WorkflowEvent::GenerateRequested,
        ];
        for event in script {
            let next = apply(&state, event(&state));
            assert!(order(next.stage()) >= order(state.stage()));
            state = next;
        }
        assert_eq!(state.stage(), Stage::Completed);
    }
}
