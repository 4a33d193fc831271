//! Timeline operations against the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use vstudio_core::editing::{ResizeEdge, TimelineScale};
use vstudio_core::error::CoreError;
use vstudio_core::event_types;
use vstudio_core::media::{MediaMetadata, MediaType};
use vstudio_core::project::AspectRatio;
use vstudio_core::timeline::{KeyframeData, KeyframeKind, TrackType};
use vstudio_db::models::keyframe::CreateKeyframe;
use vstudio_db::models::media_item::{CreateMediaItem, UpdateMediaItem};
use vstudio_db::models::project::{CreateProject, UpdateProject};
use vstudio_db::models::track::CreateTrack;
use vstudio_db::{EntityStore, MemoryStore};
use vstudio_events::EventBus;
use vstudio_timeline::{CompositionWatcher, TimelineError, TimelineService};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Fixture {
    store: Arc<MemoryStore>,
    events: Arc<EventBus>,
    service: Arc<TimelineService>,
    project_id: i64,
}

async fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let events = Arc::new(EventBus::default());
    let service = Arc::new(TimelineService::new(store.clone(), events.clone()));
    let project = store
        .create_project(&CreateProject::new("Product launch"))
        .await
        .unwrap();
    Fixture {
        store,
        events,
        service,
        project_id: project.id,
    }
}

impl Fixture {
    async fn uploaded(&self, media_type: MediaType, url: &str) -> i64 {
        self.store
            .create_media(&CreateMediaItem::uploaded(self.project_id, media_type, url))
            .await
            .unwrap()
            .id
    }

    async fn with_duration(&self, media_id: i64, seconds: f64) {
        self.store
            .update_media(
                media_id,
                &UpdateMediaItem::metadata(MediaMetadata {
                    duration: Some(seconds),
                    ..Default::default()
                }),
            )
            .await
            .unwrap();
    }

    async fn track(&self, track_type: TrackType) -> i64 {
        self.store
            .create_track(&CreateTrack::for_type(self.project_id, track_type))
            .await
            .unwrap()
            .id
    }

    async fn place(&self, track_id: i64, media_id: i64, timestamp: i64, duration: i64) -> i64 {
        self.store
            .create_keyframe(&CreateKeyframe {
                track_id,
                timestamp,
                duration,
                data: KeyframeData {
                    media_id,
                    kind: KeyframeKind::Image,
                    prompt: None,
                },
            })
            .await
            .unwrap()
            .id
    }
}

/// 1 px = 10 ms.
fn scale() -> TimelineScale {
    TimelineScale::new(1_000.0, 10.0)
}

// ---------------------------------------------------------------------------
// Add to track
// ---------------------------------------------------------------------------

#[tokio::test]
async fn appends_after_existing_keyframes() {
    let f = fixture().await;
    let track = f.track(TrackType::Video).await;
    let a = f.uploaded(MediaType::Image, "https://cdn/a.png").await;
    let b = f.uploaded(MediaType::Image, "https://cdn/b.png").await;
    f.place(track, a, 0, 5_000).await;
    f.place(track, b, 5_001, 5_000).await;

    let c = f.uploaded(MediaType::Image, "https://cdn/c.png").await;
    let keyframe = f.service.add_to_track(c).await.unwrap();

    assert_eq!(keyframe.track_id, track);
    assert_eq!(keyframe.timestamp, 10_002);
    assert_eq!(keyframe.duration, 5_000);
    assert_eq!(keyframe.data.kind, KeyframeKind::Image);

    let composition = f.service.load_composition(f.project_id).await.unwrap();
    assert_eq!(composition.item_count(), 3);
    // Last end 15_002 ms plus 5 s of tail, rounded up.
    assert_eq!(composition.duration_secs, 21);
    assert_eq!(composition.duration_in_frames, 21 * 30);
}

#[tokio::test]
async fn concurrent_placements_share_one_track_without_overlap() {
    let f = fixture().await;
    let mut media = Vec::new();
    for i in 0..6 {
        media.push(f.uploaded(MediaType::Image, &format!("https://cdn/{i}.png")).await);
    }

    let placed = futures::future::join_all(media.iter().map(|id| f.service.add_to_track(*id))).await;
    let placed: Vec<_> = placed.into_iter().map(Result::unwrap).collect();

    let tracks = f.store.tracks_by_project(f.project_id).await.unwrap();
    assert_eq!(tracks.len(), 1);
    assert!(placed.iter().all(|k| k.track_id == tracks[0].id));

    let keyframes = f.store.keyframes_by_track(tracks[0].id).await.unwrap();
    assert_eq!(keyframes.len(), 6);
    for pair in keyframes.windows(2) {
        assert!(pair[0].end() < pair[1].timestamp, "{:?} overlaps {:?}", pair[0], pair[1]);
    }
}

#[tokio::test]
async fn first_placement_creates_locked_track_of_media_type() {
    let f = fixture().await;
    let song = f.uploaded(MediaType::Music, "https://cdn/song.mp3").await;
    let mut rx = f.events.subscribe();

    let keyframe = f.service.add_to_track(song).await.unwrap();

    assert_eq!(keyframe.timestamp, 0);
    let track = f.store.find_track(keyframe.track_id).await.unwrap().unwrap();
    assert_eq!(track.track_type, TrackType::Music);
    assert_eq!(track.label, "music");
    assert!(track.locked);

    assert_eq!(rx.recv().await.unwrap().event_type, event_types::TRACK_CREATED);
    assert_eq!(rx.recv().await.unwrap().event_type, event_types::KEYFRAME_CREATED);

    // A second placement reuses the track.
    let again = f.service.add_to_track(song).await.unwrap();
    assert_eq!(again.track_id, track.id);
    assert_eq!(f.store.tracks_by_project(f.project_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn images_and_videos_share_the_video_track() {
    let f = fixture().await;
    let image = f.uploaded(MediaType::Image, "https://cdn/a.png").await;
    let clip = f.uploaded(MediaType::Video, "https://cdn/b.mp4").await;

    let first = f.service.add_to_track(image).await.unwrap();
    let second = f.service.add_to_track(clip).await.unwrap();

    assert_eq!(first.track_id, second.track_id);
    assert_eq!(second.data.kind, KeyframeKind::Video);
}

#[tokio::test]
async fn placement_uses_media_length_and_prompt() {
    let f = fixture().await;
    let voice = f
        .store
        .create_media(&CreateMediaItem::generated(
            f.project_id,
            MediaType::Voiceover,
            "fal-ai/playht/tts/v3",
            "req-1",
            json!({"prompt": "Welcome to the show"}),
        ))
        .await
        .unwrap();
    f.store
        .update_media(
            voice.id,
            &UpdateMediaItem::completed(json!({"audio": {"url": "https://cdn/v.mp3", "duration": 3.4}})),
        )
        .await
        .unwrap();

    let keyframe = f.service.add_to_track(voice.id).await.unwrap();

    assert_eq!(keyframe.duration, 3_400);
    assert_eq!(keyframe.data.prompt.as_deref(), Some("Welcome to the show"));
}

#[tokio::test]
async fn pending_media_cannot_be_placed() {
    let f = fixture().await;
    let pending = f
        .store
        .create_media(&CreateMediaItem::generated(
            f.project_id,
            MediaType::Video,
            "fal-ai/hunyuan-video",
            "req-1",
            json!({"prompt": "waves"}),
        ))
        .await
        .unwrap();

    assert_matches!(
        f.service.add_to_track(pending.id).await,
        Err(TimelineError::Core(CoreError::MediaNotReady { status: "pending", .. }))
    );
    assert!(f.store.tracks_by_project(f.project_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_media_is_not_found() {
    let f = fixture().await;
    assert_matches!(
        f.service.add_to_track(404).await,
        Err(TimelineError::Core(CoreError::NotFound { entity: "media", id: 404 }))
    );
}

// ---------------------------------------------------------------------------
// Edit gestures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn move_is_clamped_at_previous_keyframe() {
    let f = fixture().await;
    let track = f.track(TrackType::Video).await;
    let media = f.uploaded(MediaType::Image, "https://cdn/a.png").await;
    f.place(track, media, 0, 5_000).await;
    let second = f.place(track, media, 6_000, 3_000).await;
    let mut rx = f.events.subscribe();

    let mut gesture = f.service.begin_move(second, scale()).await.unwrap();
    assert_eq!(gesture.update(-200.0).timestamp, 5_000);

    let edit = gesture.finish().unwrap();
    let saved = f.service.commit_edit(&edit).await.unwrap().unwrap();

    assert_eq!(saved.timestamp, 5_000);
    assert_eq!(saved.duration, 3_000);
    assert_eq!(rx.recv().await.unwrap().event_type, event_types::KEYFRAME_UPDATED);
}

#[tokio::test]
async fn resize_is_capped_by_media_length() {
    let f = fixture().await;
    let track = f.track(TrackType::Music).await;
    let song = f.uploaded(MediaType::Music, "https://cdn/song.mp3").await;
    f.with_duration(song, 8.0).await;
    let keyframe = f.place(track, song, 0, 5_000).await;

    let mut gesture = f
        .service
        .begin_resize(keyframe, ResizeEdge::Right, scale())
        .await
        .unwrap();
    assert_eq!(gesture.update(500.0).duration, 8_000);

    let saved = f
        .service
        .commit_edit(&gesture.finish().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(saved.duration, 8_000);
    assert_eq!(saved.timestamp, 0);
}

#[tokio::test]
async fn resize_rounds_on_release() {
    let f = fixture().await;
    let track = f.track(TrackType::Video).await;
    let clip = f.uploaded(MediaType::Video, "https://cdn/clip.mp4").await;
    let keyframe = f.place(track, clip, 0, 5_000).await;

    let mut gesture = f
        .service
        .begin_resize(keyframe, ResizeEdge::Right, scale())
        .await
        .unwrap();
    assert_eq!(gesture.update(123.0).duration, 6_230);
    let edit = gesture.finish().unwrap();
    assert_eq!(edit.duration, 6_200);
}

#[tokio::test]
async fn right_resize_stops_at_next_keyframe() {
    let f = fixture().await;
    let track = f.track(TrackType::Video).await;
    let still = f.uploaded(MediaType::Image, "https://cdn/a.png").await;
    let first = f.place(track, still, 0, 5_000).await;
    let second = f.place(track, still, 6_000, 5_000).await;

    let mut gesture = f
        .service
        .begin_resize(first, ResizeEdge::Right, scale())
        .await
        .unwrap();
    // 600 px = 6000 ms, well past the second keyframe's start.
    assert_eq!(gesture.update(600.0).duration, 6_000);

    let saved = f
        .service
        .commit_edit(&gesture.finish().unwrap())
        .await
        .unwrap()
        .unwrap();
    let next = f.store.find_keyframe(second).await.unwrap().unwrap();
    assert_eq!(saved.end(), 6_000);
    assert!(saved.end() <= next.timestamp);
}

#[tokio::test]
async fn cancelled_gesture_writes_nothing() {
    let f = fixture().await;
    let track = f.track(TrackType::Video).await;
    let clip = f.uploaded(MediaType::Video, "https://cdn/clip.mp4").await;
    let keyframe = f.place(track, clip, 0, 5_000).await;
    let before = f.store.revision().await;

    let mut gesture = f.service.begin_move(keyframe, scale()).await.unwrap();
    gesture.update(300.0);
    gesture.cancel();

    assert_eq!(f.store.revision().await, before);
}

#[tokio::test]
async fn commit_for_deleted_keyframe_is_a_no_op() {
    let f = fixture().await;
    let track = f.track(TrackType::Video).await;
    let clip = f.uploaded(MediaType::Video, "https://cdn/clip.mp4").await;
    let keyframe = f.place(track, clip, 0, 5_000).await;

    let mut gesture = f.service.begin_move(keyframe, scale()).await.unwrap();
    gesture.update(100.0);
    let edit = gesture.finish().unwrap();
    f.service.delete_keyframe(keyframe).await.unwrap();

    assert!(f.service.commit_edit(&edit).await.unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Deletes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn deleting_keyframe_keeps_media_and_neighbors() {
    let f = fixture().await;
    let track = f.track(TrackType::Video).await;
    let media = f.uploaded(MediaType::Image, "https://cdn/a.png").await;
    let first = f.place(track, media, 0, 5_000).await;
    f.place(track, media, 5_001, 5_000).await;

    assert!(f.service.delete_keyframe(first).await.unwrap());
    assert!(!f.service.delete_keyframe(first).await.unwrap());

    let remaining = f.store.keyframes_by_track(track).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].timestamp, 5_001);
    assert!(f.store.find_media(media).await.unwrap().is_some());
}

#[tokio::test]
async fn deleting_media_removes_only_its_keyframes() {
    let f = fixture().await;
    let video_track = f.track(TrackType::Video).await;
    let music_track = f.track(TrackType::Music).await;
    let doomed = f.uploaded(MediaType::Image, "https://cdn/a.png").await;
    let kept = f.uploaded(MediaType::Image, "https://cdn/b.png").await;
    let song = f.uploaded(MediaType::Music, "https://cdn/song.mp3").await;

    f.place(video_track, doomed, 0, 5_000).await;
    let survivor = f.place(video_track, kept, 5_001, 5_000).await;
    f.place(video_track, doomed, 10_002, 5_000).await;
    let song_kf = f.place(music_track, song, 0, 5_000).await;
    let mut rx = f.events.subscribe();

    assert_eq!(f.service.delete_media_item(doomed).await.unwrap(), 2);

    assert!(f.store.find_media(doomed).await.unwrap().is_none());
    let video = f.store.keyframes_by_track(video_track).await.unwrap();
    assert_eq!(video.iter().map(|k| k.id).collect::<Vec<_>>(), vec![survivor]);
    assert!(f.store.find_keyframe(song_kf).await.unwrap().is_some());

    let mut seen = Vec::new();
    while let Ok(event) = rx.try_recv() {
        seen.push(event.event_type);
    }
    assert_eq!(
        seen.iter().filter(|t| *t == event_types::KEYFRAME_DELETED).count(),
        2
    );
    assert_eq!(seen.last().map(String::as_str), Some(event_types::MEDIA_DELETED));
}

// ---------------------------------------------------------------------------
// Composition
// ---------------------------------------------------------------------------

#[tokio::test]
async fn composition_follows_project_aspect_ratio() {
    let f = fixture().await;
    f.service
        .update_project(
            f.project_id,
            &UpdateProject {
                aspect_ratio: Some(AspectRatio::Portrait),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let composition = f.service.load_composition(f.project_id).await.unwrap();
    assert!(composition.height > composition.width);
    assert_eq!(composition.duration_secs, 5);
    assert!(composition.layers.is_empty());
}

#[tokio::test]
async fn composition_of_missing_project_is_not_found() {
    let f = fixture().await;
    assert_matches!(
        f.service.load_composition(77).await,
        Err(TimelineError::Core(CoreError::NotFound { entity: "project", .. }))
    );
}

#[tokio::test]
async fn watcher_republishes_after_timeline_changes() {
    let f = fixture().await;
    let cancel = CancellationToken::new();
    let (mut rx, handle) =
        CompositionWatcher::spawn(f.service.clone(), f.project_id, cancel.clone())
            .await
            .unwrap();
    assert_eq!(rx.borrow().item_count(), 0);

    let clip = f.uploaded(MediaType::Video, "https://cdn/clip.mp4").await;
    f.service.add_to_track(clip).await.unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
        while rx.borrow_and_update().item_count() == 0 {
            rx.changed().await.unwrap();
        }
    })
    .await
    .expect("composition was not refreshed");
    assert_eq!(rx.borrow().preload_urls(), vec!["https://cdn/clip.mp4"]);

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
}
