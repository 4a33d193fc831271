//! Per-project editor session state.
//!
//! One [`StudioSession`] exists per open project. Every change goes through
//! [`StudioSession::apply`], so the state is easy to reason about and to
//! reset when the user switches projects.

use serde::{Deserialize, Serialize};

use crate::media::MediaType;
use crate::types::{DbId, Millis};

/// Default requested length for generated audio, in seconds.
pub const DEFAULT_GENERATE_DURATION_SECS: u32 = 30;

/// Whether the preview is running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerState {
    Playing,
    #[default]
    Paused,
}

/// Contents of the generate form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateData {
    pub prompt: String,
    /// Reference image url.
    pub image: Option<String>,
    pub video_url: Option<String>,
    pub audio_url: Option<String>,
    /// Requested length in seconds.
    pub duration: u32,
    pub voice: String,
}

impl Default for GenerateData {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            image: None,
            video_url: None,
            audio_url: None,
            duration: DEFAULT_GENERATE_DURATION_SECS,
            voice: String::new(),
        }
    }
}

/// Partial update of [`GenerateData`]. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GenerateDataPatch {
    pub prompt: Option<String>,
    pub image: Option<Option<String>>,
    pub video_url: Option<Option<String>>,
    pub audio_url: Option<Option<String>>,
    pub duration: Option<u32>,
    pub voice: Option<String>,
}

impl GenerateData {
    pub fn patch(&mut self, patch: GenerateDataPatch) {
        if let Some(prompt) = patch.prompt {
            self.prompt = prompt;
        }
        if let Some(image) = patch.image {
            self.image = image;
        }
        if let Some(video_url) = patch.video_url {
            self.video_url = video_url;
        }
        if let Some(audio_url) = patch.audio_url {
            self.audio_url = audio_url;
        }
        if let Some(duration) = patch.duration {
            self.duration = duration;
        }
        if let Some(voice) = patch.voice {
            self.voice = voice;
        }
    }
}

/// Every change the editor can make to its session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    SetProject(DbId),
    SetProjectDialogOpen(bool),
    SetPlayerState(PlayerState),
    SetPlayerTimestamp(Millis),
    OpenGenerateDialog(Option<MediaType>),
    CloseGenerateDialog,
    SetGenerateMediaType(MediaType),
    SelectMedia(Option<DbId>),
    /// Add the keyframe to the selection, or remove it if already selected.
    ToggleKeyframe(DbId),
    ClearKeyframeSelection,
    PatchGenerateData(GenerateDataPatch),
    ResetGenerateData,
    SetExportDialogOpen(bool),
}

/// Editor state for one project.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudioSession {
    /// `None` until a project is created or loaded.
    pub project_id: Option<DbId>,
    pub project_dialog_open: bool,
    pub player_state: PlayerState,
    /// Current preview position, in milliseconds.
    pub player_timestamp: Millis,
    pub generate_dialog_open: bool,
    pub generate_media_type: MediaType,
    pub selected_media_id: Option<DbId>,
    pub selected_keyframes: Vec<DbId>,
    pub generate_data: GenerateData,
    pub export_dialog_open: bool,
}

impl StudioSession {
    /// Fresh session. The project dialog starts open when there is no
    /// project to show.
    pub fn new(project_id: Option<DbId>) -> Self {
        Self {
            project_id,
            project_dialog_open: project_id.is_none(),
            player_state: PlayerState::Paused,
            player_timestamp: 0,
            generate_dialog_open: false,
            generate_media_type: MediaType::Image,
            selected_media_id: None,
            selected_keyframes: Vec::new(),
            generate_data: GenerateData::default(),
            export_dialog_open: false,
        }
    }

    pub fn apply(&mut self, action: SessionAction) {
        match action {
            SessionAction::SetProject(project_id) => {
                if self.project_id != Some(project_id) {
                    *self = Self::new(Some(project_id));
                }
            }
            SessionAction::SetProjectDialogOpen(open) => self.project_dialog_open = open,
            SessionAction::SetPlayerState(state) => self.player_state = state,
            SessionAction::SetPlayerTimestamp(ts) => self.player_timestamp = ts.max(0),
            SessionAction::OpenGenerateDialog(media_type) => {
                self.generate_dialog_open = true;
                if let Some(media_type) = media_type {
                    self.generate_media_type = media_type;
                }
            }
            SessionAction::CloseGenerateDialog => self.generate_dialog_open = false,
            SessionAction::SetGenerateMediaType(media_type) => {
                self.generate_media_type = media_type
            }
            SessionAction::SelectMedia(media_id) => self.selected_media_id = media_id,
            SessionAction::ToggleKeyframe(id) => {
                if let Some(pos) = self.selected_keyframes.iter().position(|k| *k == id) {
                    self.selected_keyframes.remove(pos);
                } else {
                    self.selected_keyframes.push(id);
                }
            }
            SessionAction::ClearKeyframeSelection => self.selected_keyframes.clear(),
            SessionAction::PatchGenerateData(patch) => self.generate_data.patch(patch),
            SessionAction::ResetGenerateData => self.generate_data = GenerateData::default(),
            SessionAction::SetExportDialogOpen(open) => self.export_dialog_open = open,
        }
    }

    pub fn is_keyframe_selected(&self, id: DbId) -> bool {
        self.selected_keyframes.contains(&id)
    }

    /// Drop references to a keyframe that no longer exists.
    pub fn forget_keyframe(&mut self, id: DbId) {
        self.selected_keyframes.retain(|k| *k != id);
    }

    /// Drop references to a media item that no longer exists.
    pub fn forget_media(&mut self, id: DbId) {
        if self.selected_media_id == Some(id) {
            self.selected_media_id = None;
        }
    }
}

impl Default for StudioSession {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_dialog_opens_without_project() {
        assert!(StudioSession::new(None).project_dialog_open);
        assert!(!StudioSession::new(Some(3)).project_dialog_open);
    }

    #[test]
    fn toggling_a_keyframe_twice_deselects_it() {
        let mut s = StudioSession::new(Some(1));
        s.apply(SessionAction::ToggleKeyframe(5));
        s.apply(SessionAction::ToggleKeyframe(6));
        assert!(s.is_keyframe_selected(5));
        s.apply(SessionAction::ToggleKeyframe(5));
        assert_eq!(s.selected_keyframes, vec![6]);
    }

    #[test]
    fn switching_project_resets_state() {
        let mut s = StudioSession::new(Some(1));
        s.apply(SessionAction::ToggleKeyframe(5));
        s.apply(SessionAction::SetPlayerTimestamp(4_000));
        s.apply(SessionAction::SetProject(2));
        assert_eq!(s, StudioSession::new(Some(2)));
    }

    #[test]
    fn setting_same_project_keeps_state() {
        let mut s = StudioSession::new(Some(1));
        s.apply(SessionAction::ToggleKeyframe(5));
        s.apply(SessionAction::SetProject(1));
        assert!(s.is_keyframe_selected(5));
    }

    #[test]
    fn open_generate_dialog_keeps_type_when_unspecified() {
        let mut s = StudioSession::default();
        s.apply(SessionAction::OpenGenerateDialog(Some(MediaType::Music)));
        s.apply(SessionAction::CloseGenerateDialog);
        s.apply(SessionAction::OpenGenerateDialog(None));
        assert!(s.generate_dialog_open);
        assert_eq!(s.generate_media_type, MediaType::Music);
    }

    #[test]
    fn generate_data_patch_and_reset() {
        let mut s = StudioSession::default();
        s.apply(SessionAction::PatchGenerateData(GenerateDataPatch {
            prompt: Some("sunset".into()),
            image: Some(Some("https://cdn/a.png".into())),
            ..Default::default()
        }));
        assert_eq!(s.generate_data.prompt, "sunset");
        assert_eq!(s.generate_data.duration, DEFAULT_GENERATE_DURATION_SECS);

        s.apply(SessionAction::PatchGenerateData(GenerateDataPatch {
            image: Some(None),
            ..Default::default()
        }));
        assert_eq!(s.generate_data.image, None);
        assert_eq!(s.generate_data.prompt, "sunset");

        s.apply(SessionAction::ResetGenerateData);
        assert_eq!(s.generate_data, GenerateData::default());
    }

    #[test]
    fn forgetting_deleted_entities_clears_selection() {
        let mut s = StudioSession::new(Some(1));
        s.apply(SessionAction::ToggleKeyframe(9));
        s.apply(SessionAction::SelectMedia(Some(4)));
        s.forget_keyframe(9);
        s.forget_media(4);
        assert!(s.selected_keyframes.is_empty());
        assert_eq!(s.selected_media_id, None);
    }
}
