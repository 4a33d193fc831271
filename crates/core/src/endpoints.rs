//! Catalog of generation endpoints and request-input construction.

use std::sync::LazyLock;

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::media::MediaType;
use crate::project::AspectRatio;
use crate::session::GenerateData;

/// Default endpoint for extracting duration/fps/frames from a media file.
pub const METADATA_ENDPOINT: &str = "fal-ai/ffmpeg-api/metadata";

/// Suffix selecting the image-conditioned variant of a video endpoint.
pub const IMAGE_TO_VIDEO_SUFFIX: &str = "/image-to-video";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Kind of media an endpoint takes as input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Image,
    Video,
    Audio,
}

impl AssetKind {
    /// Request key the asset url is sent under unless overridden.
    pub fn default_key(self) -> &'static str {
        match self {
            Self::Image => "image_url",
            Self::Video => "video_url",
            Self::Audio => "audio_url",
        }
    }
}

/// An input asset slot of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InputAsset {
    pub kind: AssetKind,
    pub key: &'static str,
}

impl InputAsset {
    const fn new(kind: AssetKind, key: &'static str) -> Self {
        Self { kind, key }
    }
}

/// A generation endpoint offered to users.
#[derive(Debug, Clone, Serialize)]
pub struct EndpointInfo {
    pub endpoint_id: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    /// Media type the endpoint produces.
    pub category: MediaType,
    pub input_assets: Vec<InputAsset>,
    /// Renames applied to request keys, e.g. `prompt -> input`.
    pub input_map: Vec<(&'static str, &'static str)>,
    /// Values sent with every request unless the caller overrides them.
    pub initial_input: Map<String, Value>,
}

impl EndpointInfo {
    fn new(
        endpoint_id: &'static str,
        label: &'static str,
        description: &'static str,
        category: MediaType,
    ) -> Self {
        Self {
            endpoint_id,
            label,
            description,
            category,
            input_assets: Vec::new(),
            input_map: Vec::new(),
            initial_input: Map::new(),
        }
    }

    fn assets(mut self, assets: &[InputAsset]) -> Self {
        self.input_assets = assets.to_vec();
        self
    }

    fn map(mut self, from: &'static str, to: &'static str) -> Self {
        self.input_map.push((from, to));
        self
    }

    fn initial(mut self, input: Value) -> Self {
        if let Value::Object(map) = input {
            self.initial_input = map;
        }
        self
    }

    pub fn accepts(&self, kind: AssetKind) -> bool {
        self.input_assets.iter().any(|a| a.kind == kind)
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

const IMAGE: InputAsset = InputAsset::new(AssetKind::Image, "image_url");
const VIDEO: InputAsset = InputAsset::new(AssetKind::Video, "video_url");
const AUDIO: InputAsset = InputAsset::new(AssetKind::Audio, "audio_url");

static CATALOG: LazyLock<Vec<EndpointInfo>> = LazyLock::new(|| {
    vec![
        EndpointInfo::new(
            "fal-ai/flux/dev",
            "Flux Dev",
            "Generate an image from a text prompt",
            MediaType::Image,
        ),
        EndpointInfo::new(
            "fal-ai/flux/schnell",
            "Flux Schnell",
            "Generate an image from a text prompt",
            MediaType::Image,
        ),
        EndpointInfo::new(
            "fal-ai/flux-pro/v1.1-ultra",
            "Flux Pro 1.1 Ultra",
            "Generate an image from a text prompt",
            MediaType::Image,
        ),
        EndpointInfo::new(
            "fal-ai/stable-diffusion-v35-large",
            "Stable Diffusion 3.5 Large",
            "Image quality, typography, complex prompt understanding",
            MediaType::Image,
        ),
        EndpointInfo::new(
            "fal-ai/minimax/video-01-live",
            "Minimax Video 01 Live",
            "High quality video, realistic motion and physics",
            MediaType::Video,
        )
        .assets(&[IMAGE]),
        EndpointInfo::new(
            "fal-ai/hunyuan-video",
            "Hunyuan",
            "High visual quality, motion diversity and text alignment",
            MediaType::Video,
        ),
        EndpointInfo::new(
            "fal-ai/kling-video/v1.5/pro",
            "Kling 1.5 Pro",
            "High quality video",
            MediaType::Video,
        )
        .assets(&[IMAGE]),
        EndpointInfo::new(
            "fal-ai/luma-dream-machine",
            "Luma Dream Machine 1.5",
            "High quality video",
            MediaType::Video,
        )
        .assets(&[IMAGE]),
        EndpointInfo::new(
            "fal-ai/minimax-music",
            "Minimax Music",
            "High-quality, diverse musical compositions",
            MediaType::Music,
        )
        .assets(&[InputAsset::new(AssetKind::Audio, "reference_audio_url")]),
        EndpointInfo::new(
            "fal-ai/mmaudio-v2",
            "MMAudio V2",
            "Synchronized audio for a video and/or text input",
            MediaType::Video,
        )
        .assets(&[VIDEO]),
        EndpointInfo::new(
            "fal-ai/sync-lipsync",
            "sync.so lipsync 1.8.0",
            "Lipsync animation driven by an audio track",
            MediaType::Video,
        )
        .assets(&[VIDEO, AUDIO]),
        EndpointInfo::new(
            "fal-ai/stable-audio",
            "Stable Audio",
            "Music creation with high-quality tracks",
            MediaType::Music,
        ),
        EndpointInfo::new(
            "fal-ai/playht/tts/v3",
            "PlayHT TTS v3",
            "Fluent and faithful speech with flow matching",
            MediaType::Voiceover,
        )
        .map("prompt", "input")
        .initial(json!({ "voice": "Dexter (English (US)/American)" })),
        EndpointInfo::new(
            "fal-ai/playai/tts/dialog",
            "PlayAI Text-to-Speech Dialog",
            "Natural-sounding multi-speaker dialogues",
            MediaType::Voiceover,
        )
        .map("prompt", "input")
        .initial(json!({
            "voices": [
                { "voice": "Jennifer (English (US)/American)", "turn_prefix": "Speaker 1: " },
                { "voice": "Furio (English (IT)/Italian)", "turn_prefix": "Speaker 2: " }
            ]
        })),
        EndpointInfo::new(
            "fal-ai/f5-tts",
            "F5 TTS",
            "Fluent and faithful speech with flow matching",
            MediaType::Voiceover,
        )
        .map("prompt", "gen_text")
        .initial(json!({
            "ref_audio_url": "https://github.com/SWivid/F5-TTS/raw/21900ba97d5020a5a70bcc9a0575dc7dec5021cb/tests/ref_audio/test_en_1_ref_short.wav",
            "ref_text": "Some call me nature, others call me mother nature.",
            "model_type": "F5-TTS",
            "remove_silence": true
        })),
    ]
});

/// Every endpoint offered to users.
pub fn catalog() -> &'static [EndpointInfo] {
    &CATALOG
}

/// Endpoints producing `category`.
pub fn endpoints_for(category: MediaType) -> impl Iterator<Item = &'static EndpointInfo> {
    catalog().iter().filter(move |e| e.category == category)
}

/// Look up an endpoint by id. The image-to-video variant of a video
/// endpoint resolves to its base entry.
pub fn find_endpoint(endpoint_id: &str) -> Option<&'static EndpointInfo> {
    let base = endpoint_id
        .strip_suffix(IMAGE_TO_VIDEO_SUFFIX)
        .unwrap_or(endpoint_id);
    catalog().iter().find(|e| e.endpoint_id == base)
}

// ---------------------------------------------------------------------------
// Input construction
// ---------------------------------------------------------------------------

/// Rename top-level keys of `input` according to `input_map`. Keys without
/// a mapping are kept. Non-object inputs pass through untouched.
pub fn map_input_keys(input: Value, input_map: &[(&str, &str)]) -> Value {
    let Value::Object(map) = input else {
        return input;
    };
    let renamed = map
        .into_iter()
        .map(|(key, value)| {
            let target = input_map
                .iter()
                .find(|(from, _)| *from == key)
                .map(|(_, to)| (*to).to_string())
                .unwrap_or(key);
            (target, value)
        })
        .collect();
    Value::Object(renamed)
}

/// Fill in endpoint defaults under `input`, then apply key renames.
///
/// Values present in `input` win over the endpoint's initial input.
/// Unknown endpoints get `input` unchanged.
pub fn apply_endpoint_defaults(endpoint: Option<&EndpointInfo>, input: Value) -> Value {
    let Some(endpoint) = endpoint else {
        return input;
    };
    let merged = match input {
        Value::Object(fields) => {
            let mut merged = endpoint.initial_input.clone();
            merged.extend(fields);
            Value::Object(merged)
        }
        other => other,
    };
    map_input_keys(merged, &endpoint.input_map)
}

/// A fully built generation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerateRequest {
    pub endpoint_id: String,
    pub media_type: MediaType,
    pub input: Value,
}

/// Build the request for `endpoint_id` from the generate form.
///
/// Video endpoints given a reference image switch to their image-to-video
/// variant. Only music requests carry a length (`seconds_total`).
pub fn build_input(
    endpoint_id: &str,
    media_type: MediaType,
    aspect_ratio: AspectRatio,
    data: &GenerateData,
) -> GenerateRequest {
    let mut input = Map::new();
    input.insert("prompt".into(), Value::String(data.prompt.clone()));

    match media_type {
        MediaType::Image => {
            input.insert("image_size".into(), json!(image_size(aspect_ratio)));
        }
        MediaType::Video => {
            input.insert("aspect_ratio".into(), json!(aspect_ratio.as_str()));
        }
        MediaType::Music => {
            input.insert("seconds_total".into(), json!(data.duration));
        }
        MediaType::Voiceover => {
            if !data.voice.is_empty() {
                input.insert("voice".into(), json!(data.voice));
            }
        }
    }

    let endpoint = find_endpoint(endpoint_id);
    let asset_key = |kind: AssetKind| {
        endpoint
            .and_then(|e| e.input_assets.iter().find(|a| a.kind == kind))
            .map_or(kind.default_key(), |a| a.key)
    };
    for (kind, value) in [
        (AssetKind::Image, &data.image),
        (AssetKind::Video, &data.video_url),
        (AssetKind::Audio, &data.audio_url),
    ] {
        if let Some(url) = value.as_deref().filter(|u| !u.is_empty()) {
            input.insert(asset_key(kind).to_string(), json!(url));
        }
    }

    let uses_image = data.image.as_deref().is_some_and(|u| !u.is_empty());
    let endpoint_id = if uses_image
        && media_type == MediaType::Video
        && !endpoint_id.ends_with(IMAGE_TO_VIDEO_SUFFIX)
    {
        format!("{endpoint_id}{IMAGE_TO_VIDEO_SUFFIX}")
    } else {
        endpoint_id.to_string()
    };

    GenerateRequest {
        endpoint_id,
        media_type,
        input: apply_endpoint_defaults(endpoint, Value::Object(input)),
    }
}

fn image_size(aspect_ratio: AspectRatio) -> &'static str {
    match aspect_ratio {
        AspectRatio::Landscape => "landscape_16_9",
        AspectRatio::Portrait => "portrait_16_9",
        AspectRatio::Square => "square_hd",
    }
}
