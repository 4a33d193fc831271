//! Generation job lifecycle against the in-memory store and a scripted
//! queue.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use serde_json::{json, Value};
use vstudio_core::endpoints::{build_input, GenerateRequest};
use vstudio_core::event_types;
use vstudio_core::media::{MediaMetadata, MediaStatus, MediaType};
use vstudio_core::polling::{PollCadence, QueueState};
use vstudio_core::project::AspectRatio;
use vstudio_core::session::GenerateData;
use vstudio_db::models::media_item::{CreateMediaItem, UpdateMediaItem};
use vstudio_db::models::project::CreateProject;
use vstudio_db::{EntityStore, MemoryStore};
use vstudio_events::EventBus;
use vstudio_jobs::{JobConfig, JobError, JobManager, PollOutcome, Poller};
use vstudio_queue::{MetadataError, MetadataExtractor, QueueClient, QueueError};

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

/// Queue answering status calls from a script. Once the script runs out
/// every call returns `fallback`.
struct ScriptedQueue {
    reject_submit: bool,
    script: Mutex<VecDeque<Result<QueueState, String>>>,
    fallback: QueueState,
    result: Result<Value, String>,
    submitted: Mutex<Vec<(String, Value)>>,
    status_calls: AtomicU32,
    result_calls: AtomicU32,
}

impl ScriptedQueue {
    fn new(fallback: QueueState) -> Self {
        Self {
            reject_submit: false,
            script: Mutex::new(VecDeque::new()),
            fallback,
            result: Ok(json!({"video": {"url": "https://cdn/out.mp4"}})),
            submitted: Mutex::new(Vec::new()),
            status_calls: AtomicU32::new(0),
            result_calls: AtomicU32::new(0),
        }
    }

    fn script(self, steps: Vec<Result<QueueState, String>>) -> Self {
        *self.script.lock().unwrap() = steps.into();
        self
    }

    fn result(mut self, result: Result<Value, String>) -> Self {
        self.result = result;
        self
    }

    fn rejecting() -> Self {
        Self {
            reject_submit: true,
            ..Self::new(QueueState::Queued)
        }
    }

    fn status_calls(&self) -> u32 {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueueClient for ScriptedQueue {
    async fn submit(&self, endpoint_id: &str, input: &Value) -> Result<String, QueueError> {
        if self.reject_submit {
            return Err(QueueError::InvalidResponse("quota exceeded".into()));
        }
        let mut submitted = self.submitted.lock().unwrap();
        submitted.push((endpoint_id.to_string(), input.clone()));
        Ok(format!("req-{}", submitted.len()))
    }

    async fn status(&self, _: &str, _: &str) -> Result<QueueState, QueueError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().unwrap().pop_front() {
            Some(Ok(state)) => Ok(state),
            Some(Err(message)) => Err(QueueError::InvalidResponse(message)),
            None => Ok(self.fallback),
        }
    }

    async fn result(&self, _: &str, _: &str) -> Result<Value, QueueError> {
        self.result_calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone().map_err(QueueError::Generation)
    }
}

struct FixedMetadata {
    fail: bool,
    calls: AtomicU32,
}

impl FixedMetadata {
    fn new() -> Self {
        Self {
            fail: false,
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl MetadataExtractor for FixedMetadata {
    async fn extract(&self, _: &str) -> Result<MediaMetadata, MetadataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(MetadataError::MissingMedia);
        }
        Ok(MediaMetadata {
            duration: Some(8.0),
            fps: Some(24.0),
            ..Default::default()
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Harness {
    store: Arc<MemoryStore>,
    queue: Arc<ScriptedQueue>,
    metadata: Arc<FixedMetadata>,
    events: Arc<EventBus>,
    project_id: i64,
}

impl Harness {
    async fn new(queue: ScriptedQueue) -> Self {
        let store = Arc::new(MemoryStore::new());
        let project = store
            .create_project(&CreateProject::new("Trailer"))
            .await
            .unwrap();
        Self {
            store,
            queue: Arc::new(queue),
            metadata: Arc::new(FixedMetadata::new()),
            events: Arc::new(EventBus::default()),
            project_id: project.id,
        }
    }

    fn poller(&self, config: JobConfig) -> Poller {
        Poller::new(
            self.store.clone(),
            self.queue.clone(),
            self.metadata.clone(),
            self.events.clone(),
            config,
        )
    }

    fn manager(&self, config: JobConfig) -> Arc<JobManager> {
        JobManager::new(self.poller(config))
    }

    async fn pending(&self, media_type: MediaType) -> i64 {
        self.store
            .create_media(&CreateMediaItem::generated(
                self.project_id,
                media_type,
                "fal-ai/hunyuan-video",
                "req-x",
                json!({"prompt": "a lighthouse"}),
            ))
            .await
            .unwrap()
            .id
    }
}

fn fast_config(max_poll_attempts: u32) -> JobConfig {
    JobConfig {
        cadence: PollCadence {
            default: Duration::from_millis(1),
            video: Duration::from_millis(1),
        },
        max_poll_attempts,
        ..Default::default()
    }
}

fn slow_config() -> JobConfig {
    JobConfig {
        cadence: PollCadence {
            default: Duration::from_secs(60),
            video: Duration::from_secs(60),
        },
        ..Default::default()
    }
}

fn video_request() -> GenerateRequest {
    GenerateRequest {
        endpoint_id: "fal-ai/hunyuan-video".into(),
        media_type: MediaType::Video,
        input: json!({"prompt": "a lighthouse at dusk", "aspect_ratio": "16:9"}),
    }
}

async fn wait_until_idle(manager: &JobManager) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while manager.active_count().await > 0 {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("pollers did not settle");
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

#[tokio::test]
async fn submit_persists_pending_item_and_starts_polling() {
    let h = Harness::new(ScriptedQueue::new(QueueState::Queued)).await;
    let manager = h.manager(slow_config());
    let mut rx = h.events.subscribe();

    let item = manager.submit(h.project_id, &video_request()).await.unwrap();

    assert_eq!(item.status, MediaStatus::Pending);
    assert_eq!(item.queue_ref(), Some(("fal-ai/hunyuan-video", "req-1")));
    assert!(manager.is_tracking(item.id).await);
    assert_eq!(rx.recv().await.unwrap().event_type, event_types::MEDIA_SUBMITTED);

    manager.shutdown().await;
}

#[tokio::test]
async fn submit_sends_built_input_unchanged() {
    let h = Harness::new(ScriptedQueue::new(QueueState::Queued)).await;
    let manager = h.manager(slow_config());

    let data = GenerateData {
        prompt: "Welcome back".into(),
        ..GenerateData::default()
    };
    let request = build_input(
        "fal-ai/playht/tts/v3",
        MediaType::Voiceover,
        AspectRatio::Landscape,
        &data,
    );
    let item = manager.submit(h.project_id, &request).await.unwrap();

    let input = item.input().unwrap();
    assert_eq!(*input, request.input);
    assert_eq!(input["input"], "Welcome back");
    assert!(input.get("prompt").is_none());
    assert_eq!(input["voice"], "Dexter (English (US)/American)");
    assert_eq!(h.queue.submitted.lock().unwrap()[0].1, *input);

    manager.shutdown().await;
}

#[tokio::test]
async fn submit_does_not_reapply_endpoint_mapping() {
    let h = Harness::new(ScriptedQueue::new(QueueState::Queued)).await;
    let manager = h.manager(slow_config());

    // Hand-built input for a catalog endpoint is sent as given.
    let request = GenerateRequest {
        endpoint_id: "fal-ai/playht/tts/v3".into(),
        media_type: MediaType::Voiceover,
        input: json!({"prompt": "raw"}),
    };
    let item = manager.submit(h.project_id, &request).await.unwrap();

    assert_eq!(item.input(), Some(&json!({"prompt": "raw"})));
    assert_eq!(h.queue.submitted.lock().unwrap()[0].1, json!({"prompt": "raw"}));

    manager.shutdown().await;
}

#[tokio::test]
async fn unknown_endpoint_input_passes_through() {
    let h = Harness::new(ScriptedQueue::new(QueueState::Queued)).await;
    let manager = h.manager(slow_config());

    let request = GenerateRequest {
        endpoint_id: "acme/new-model".into(),
        media_type: MediaType::Image,
        input: json!({"prompt": "a fox"}),
    };
    let item = manager.submit(h.project_id, &request).await.unwrap();
    assert_eq!(item.input(), Some(&json!({"prompt": "a fox"})));

    manager.shutdown().await;
}

#[tokio::test]
async fn rejected_submission_creates_nothing() {
    let h = Harness::new(ScriptedQueue::rejecting()).await;
    let manager = h.manager(slow_config());
    let before = h.store.revision().await;

    let result = manager.submit(h.project_id, &video_request()).await;

    assert_matches!(result, Err(JobError::Submit(_)));
    assert_eq!(h.store.revision().await, before);
    assert!(h.store.media_by_project(h.project_id).await.unwrap().is_empty());
    assert_eq!(manager.active_count().await, 0);
}

#[tokio::test]
async fn submit_to_missing_project_never_reaches_queue() {
    let h = Harness::new(ScriptedQueue::new(QueueState::Queued)).await;
    let manager = h.manager(slow_config());

    let result = manager.submit(9_999, &video_request()).await;

    assert_matches!(result, Err(JobError::ProjectNotFound(9_999)));
    assert!(h.queue.submitted.lock().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Uploads
// ---------------------------------------------------------------------------

#[tokio::test]
async fn uploaded_video_is_completed_with_metadata() {
    let h = Harness::new(ScriptedQueue::new(QueueState::Queued)).await;
    let manager = h.manager(slow_config());
    let mut rx = h.events.subscribe();

    let item = manager
        .register_upload(h.project_id, "video/mp4", "https://cdn/clip.mp4")
        .await
        .unwrap();

    assert_eq!(item.media_type, MediaType::Video);
    assert_eq!(item.status, MediaStatus::Completed);
    assert_eq!(item.resolve_media_url(), Some("https://cdn/clip.mp4"));
    assert_eq!(item.resolve_duration_ms(), Some(8_000));
    assert_eq!(h.metadata.calls.load(Ordering::SeqCst), 1);

    let stored = h.store.find_media(item.id).await.unwrap().unwrap();
    assert_eq!(stored.resolve_duration_ms(), Some(8_000));
    assert_eq!(rx.recv().await.unwrap().event_type, event_types::MEDIA_UPLOADED);
    assert_eq!(
        rx.recv().await.unwrap().event_type,
        event_types::MEDIA_METADATA_UPDATED
    );
    assert!(!manager.is_tracking(item.id).await);
    assert!(h.queue.submitted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn uploaded_audio_becomes_music() {
    let h = Harness::new(ScriptedQueue::new(QueueState::Queued)).await;
    let manager = h.manager(slow_config());

    let item = manager
        .register_upload(h.project_id, "audio/mpeg", "https://cdn/song.mp3")
        .await
        .unwrap();

    assert_eq!(item.media_type, MediaType::Music);
    assert_eq!(item.resolve_duration_ms(), Some(8_000));
}

#[tokio::test]
async fn uploaded_image_skips_metadata() {
    let h = Harness::new(ScriptedQueue::new(QueueState::Queued)).await;
    let manager = h.manager(slow_config());

    let item = manager
        .register_upload(h.project_id, "image/png", "https://cdn/still.png")
        .await
        .unwrap();

    assert_eq!(item.media_type, MediaType::Image);
    assert!(item.metadata.is_none());
    assert_eq!(h.metadata.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn upload_metadata_failure_keeps_the_item() {
    let mut h = Harness::new(ScriptedQueue::new(QueueState::Queued)).await;
    h.metadata = Arc::new(FixedMetadata {
        fail: true,
        calls: AtomicU32::new(0),
    });
    let manager = h.manager(slow_config());

    let item = manager
        .register_upload(h.project_id, "video/webm", "https://cdn/clip.webm")
        .await
        .unwrap();

    assert_eq!(item.status, MediaStatus::Completed);
    assert!(item.metadata.is_none());
    assert!(h.store.find_media(item.id).await.unwrap().is_some());
}

#[tokio::test]
async fn unsupported_upload_is_rejected_before_storing() {
    let h = Harness::new(ScriptedQueue::new(QueueState::Queued)).await;
    let manager = h.manager(slow_config());

    assert_matches!(
        manager
            .register_upload(h.project_id, "application/pdf", "https://cdn/doc.pdf")
            .await,
        Err(JobError::InvalidUpload(_))
    );
    assert_matches!(
        manager.register_upload(h.project_id, "video/mp4", "  ").await,
        Err(JobError::InvalidUpload(_))
    );
    assert_matches!(
        manager
            .register_upload(h.project_id + 99, "video/mp4", "https://cdn/clip.mp4")
            .await,
        Err(JobError::ProjectNotFound(_))
    );
    assert!(h.store.media_by_project(h.project_id).await.unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Single poll cycles
// ---------------------------------------------------------------------------

#[tokio::test]
async fn repeated_cycles_with_same_answer_write_once() {
    let h = Harness::new(ScriptedQueue::new(QueueState::InProgress)).await;
    let poller = h.poller(fast_config(10));
    let id = h.pending(MediaType::Video).await;

    let start = h.store.revision().await;
    assert_eq!(poller.poll_once(id).await.unwrap(), PollOutcome::Pending);
    let after_first = h.store.revision().await;
    assert_eq!(after_first, start + 1);

    assert_eq!(poller.poll_once(id).await.unwrap(), PollOutcome::Pending);
    assert_eq!(poller.poll_once(id).await.unwrap(), PollOutcome::Pending);
    assert_eq!(h.store.revision().await, after_first);

    let item = h.store.find_media(id).await.unwrap().unwrap();
    assert_eq!(item.status, MediaStatus::Running);
}

#[tokio::test]
async fn queued_answer_changes_nothing() {
    let h = Harness::new(ScriptedQueue::new(QueueState::Queued)).await;
    let poller = h.poller(fast_config(10));
    let id = h.pending(MediaType::Image).await;
    let before = h.store.revision().await;

    assert_eq!(poller.poll_once(id).await.unwrap(), PollOutcome::Pending);
    assert_eq!(h.store.revision().await, before);
}

#[tokio::test]
async fn terminal_items_are_not_polled() {
    let h = Harness::new(ScriptedQueue::new(QueueState::Completed)).await;
    let poller = h.poller(fast_config(10));
    let id = h.pending(MediaType::Image).await;
    h.store
        .update_media(id, &UpdateMediaItem::status(MediaStatus::Failed))
        .await
        .unwrap();
    let before = h.store.revision().await;

    assert_eq!(
        poller.poll_once(id).await.unwrap(),
        PollOutcome::Finished(MediaStatus::Failed)
    );
    assert_eq!(h.queue.status_calls(), 0);
    assert_eq!(h.store.revision().await, before);
}

#[tokio::test]
async fn deleted_item_ends_polling() {
    let h = Harness::new(ScriptedQueue::new(QueueState::InProgress)).await;
    let poller = h.poller(fast_config(10));
    let id = h.pending(MediaType::Video).await;
    h.store.delete_media(id).await.unwrap();

    assert_eq!(poller.poll_once(id).await.unwrap(), PollOutcome::Gone);
    assert_eq!(h.queue.status_calls(), 0);
}

#[tokio::test]
async fn completed_video_gets_output_and_metadata() {
    let h = Harness::new(ScriptedQueue::new(QueueState::Completed)).await;
    let poller = h.poller(fast_config(10));
    let id = h.pending(MediaType::Video).await;
    let mut rx = h.events.subscribe();

    assert_eq!(
        poller.poll_once(id).await.unwrap(),
        PollOutcome::Finished(MediaStatus::Completed)
    );

    let item = h.store.find_media(id).await.unwrap().unwrap();
    assert_eq!(item.status, MediaStatus::Completed);
    assert_eq!(item.resolve_media_url(), Some("https://cdn/out.mp4"));
    assert_eq!(item.resolve_duration_ms(), Some(8_000));
    assert_eq!(item.metadata.as_ref().and_then(|m| m.fps), Some(24.0));

    assert_eq!(rx.recv().await.unwrap().event_type, event_types::MEDIA_COMPLETED);
    assert_eq!(
        rx.recv().await.unwrap().event_type,
        event_types::MEDIA_METADATA_UPDATED
    );
}

#[tokio::test]
async fn completed_image_skips_metadata() {
    let queue = ScriptedQueue::new(QueueState::Completed)
        .result(Ok(json!({"images": [{"url": "https://cdn/a.png"}]})));
    let h = Harness::new(queue).await;
    let poller = h.poller(fast_config(10));
    let id = h.pending(MediaType::Image).await;

    poller.poll_once(id).await.unwrap();

    let item = h.store.find_media(id).await.unwrap().unwrap();
    assert_eq!(item.status, MediaStatus::Completed);
    assert!(item.metadata.is_none());
    assert_eq!(h.metadata.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn metadata_failure_keeps_item_completed() {
    let mut h = Harness::new(ScriptedQueue::new(QueueState::Completed)).await;
    h.metadata = Arc::new(FixedMetadata {
        fail: true,
        calls: AtomicU32::new(0),
    });
    let poller = h.poller(fast_config(10));
    let id = h.pending(MediaType::Video).await;

    poller.poll_once(id).await.unwrap();

    let item = h.store.find_media(id).await.unwrap().unwrap();
    assert_eq!(item.status, MediaStatus::Completed);
    assert!(item.metadata.is_none());
}

#[tokio::test]
async fn failed_result_marks_item_failed() {
    let queue =
        ScriptedQueue::new(QueueState::Completed).result(Err("content policy violation".into()));
    let h = Harness::new(queue).await;
    let poller = h.poller(fast_config(10));
    let id = h.pending(MediaType::Music).await;
    let mut rx = h.events.subscribe();

    assert_eq!(
        poller.poll_once(id).await.unwrap(),
        PollOutcome::Finished(MediaStatus::Failed)
    );
    let item = h.store.find_media(id).await.unwrap().unwrap();
    assert_eq!(item.status, MediaStatus::Failed);
    assert!(item.output().is_none());
    assert_eq!(rx.recv().await.unwrap().event_type, event_types::MEDIA_FAILED);
}

#[tokio::test]
async fn status_error_is_reported_without_writes() {
    let queue = ScriptedQueue::new(QueueState::Queued).script(vec![Err("502".into())]);
    let h = Harness::new(queue).await;
    let poller = h.poller(fast_config(10));
    let id = h.pending(MediaType::Video).await;
    let before = h.store.revision().await;

    assert_matches!(poller.poll_once(id).await, Err(JobError::Queue(_)));
    assert_eq!(h.store.revision().await, before);
}

// ---------------------------------------------------------------------------
// Polling tasks
// ---------------------------------------------------------------------------

#[tokio::test]
async fn poller_runs_item_to_completion() {
    let queue = ScriptedQueue::new(QueueState::Completed).script(vec![
        Ok(QueueState::Queued),
        Ok(QueueState::InProgress),
        Ok(QueueState::InProgress),
    ]);
    let h = Harness::new(queue).await;
    let manager = h.manager(fast_config(50));

    let item = manager.submit(h.project_id, &video_request()).await.unwrap();
    wait_until_idle(&manager).await;

    let item = h.store.find_media(item.id).await.unwrap().unwrap();
    assert_eq!(item.status, MediaStatus::Completed);
    assert_eq!(h.queue.status_calls(), 4);
    assert_eq!(h.queue.result_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn item_times_out_after_max_attempts() {
    let h = Harness::new(ScriptedQueue::new(QueueState::Queued)).await;
    let manager = h.manager(fast_config(3));

    let item = manager.submit(h.project_id, &video_request()).await.unwrap();
    wait_until_idle(&manager).await;

    let item = h.store.find_media(item.id).await.unwrap().unwrap();
    assert_eq!(item.status, MediaStatus::Failed);
    assert_eq!(h.queue.status_calls(), 3);
}

#[tokio::test]
async fn transport_errors_count_as_attempts() {
    let queue = ScriptedQueue::new(QueueState::Queued)
        .script(vec![Err("timeout".into()), Err("timeout".into())]);
    let h = Harness::new(queue).await;
    let manager = h.manager(fast_config(2));

    let item = manager.submit(h.project_id, &video_request()).await.unwrap();
    wait_until_idle(&manager).await;

    let item = h.store.find_media(item.id).await.unwrap().unwrap();
    assert_eq!(item.status, MediaStatus::Failed);
}

#[tokio::test]
async fn one_failing_item_does_not_affect_another() {
    let queue = ScriptedQueue::new(QueueState::Completed)
        .script(vec![Err("boom".into())])
        .result(Ok(json!({"images": [{"url": "https://cdn/a.png"}]})));
    let h = Harness::new(queue).await;
    let manager = h.manager(fast_config(1));

    let first = h.pending(MediaType::Image).await;
    let second = h.pending(MediaType::Image).await;
    manager.resume().await.unwrap();
    wait_until_idle(&manager).await;

    let statuses = [
        h.store.find_media(first).await.unwrap().unwrap().status,
        h.store.find_media(second).await.unwrap().unwrap().status,
    ];
    assert!(statuses.contains(&MediaStatus::Failed));
    assert!(statuses.contains(&MediaStatus::Completed));
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[tokio::test]
async fn tracking_is_idempotent() {
    let h = Harness::new(ScriptedQueue::new(QueueState::Queued)).await;
    let manager = h.manager(slow_config());
    let id = h.pending(MediaType::Video).await;
    let item = h.store.find_media(id).await.unwrap().unwrap();

    assert!(manager.track(&item).await);
    assert!(!manager.track(&item).await);
    assert_eq!(manager.active_count().await, 1);

    manager.shutdown().await;
}

#[tokio::test]
async fn uploaded_and_settled_items_are_not_tracked() {
    let h = Harness::new(ScriptedQueue::new(QueueState::Queued)).await;
    let manager = h.manager(slow_config());

    let uploaded = h
        .store
        .create_media(&CreateMediaItem::uploaded(
            h.project_id,
            MediaType::Music,
            "https://cdn/song.mp3",
        ))
        .await
        .unwrap();
    assert!(!manager.track(&uploaded).await);

    let id = h.pending(MediaType::Image).await;
    let failed = h
        .store
        .update_media(id, &UpdateMediaItem::status(MediaStatus::Failed))
        .await
        .unwrap()
        .unwrap();
    assert!(!manager.track(&failed).await);
    assert_eq!(manager.active_count().await, 0);
}

#[tokio::test]
async fn resume_tracks_only_in_flight_items() {
    let h = Harness::new(ScriptedQueue::new(QueueState::Queued)).await;
    let manager = h.manager(slow_config());

    let a = h.pending(MediaType::Video).await;
    let b = h.pending(MediaType::Image).await;
    let done = h.pending(MediaType::Image).await;
    h.store
        .update_media(done, &UpdateMediaItem::completed(json!({"images": []})))
        .await
        .unwrap();

    assert_eq!(manager.resume().await.unwrap(), 2);
    assert!(manager.is_tracking(a).await);
    assert!(manager.is_tracking(b).await);
    assert!(!manager.is_tracking(done).await);

    // A second resume finds everything already tracked.
    assert_eq!(manager.resume().await.unwrap(), 0);

    manager.shutdown().await;
}

#[tokio::test]
async fn stop_leaves_item_pending() {
    let h = Harness::new(ScriptedQueue::new(QueueState::Queued)).await;
    let manager = h.manager(slow_config());
    let item = manager.submit(h.project_id, &video_request()).await.unwrap();

    assert!(manager.stop(item.id).await);
    assert!(!manager.stop(item.id).await);
    assert_eq!(manager.active_count().await, 0);

    let item = h.store.find_media(item.id).await.unwrap().unwrap();
    assert_eq!(item.status, MediaStatus::Pending);
}

#[tokio::test]
async fn stop_project_only_touches_that_project() {
    let h = Harness::new(ScriptedQueue::new(QueueState::Queued)).await;
    let manager = h.manager(slow_config());
    let other = h
        .store
        .create_project(&CreateProject::new("Other"))
        .await
        .unwrap();

    manager.submit(h.project_id, &video_request()).await.unwrap();
    manager.submit(h.project_id, &video_request()).await.unwrap();
    let kept = manager.submit(other.id, &video_request()).await.unwrap();

    assert_eq!(manager.stop_project(h.project_id).await, 2);
    assert_eq!(manager.active_count().await, 1);
    assert!(manager.is_tracking(kept.id).await);

    manager.shutdown().await;
}

#[tokio::test]
async fn shutdown_stops_everything_and_refuses_new_work() {
    let h = Harness::new(ScriptedQueue::new(QueueState::Queued)).await;
    let manager = h.manager(slow_config());
    manager.submit(h.project_id, &video_request()).await.unwrap();

    manager.shutdown().await;
    assert_eq!(manager.active_count().await, 0);

    let id = h.pending(MediaType::Video).await;
    let item = h.store.find_media(id).await.unwrap().unwrap();
    assert!(!manager.track(&item).await);
}
