use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Opaque input identifier, stable across refreshes
pub type InputKey = String;

/// Input position label (`number` attribute), only meaningful within one snapshot
pub type InputNumber = String;

/// Number of overlay slots exposed by the mixer
pub const OVERLAY_SLOTS: usize = 4;

/// Mixer version information (`<version>`, `<edition>`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MixerInfo {
    pub version: String,
    pub edition: String,
}

/// Top-level mixer status flags and bus assignments
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Status {
    pub recording: bool,
    pub streaming: bool,
    pub external: bool,
    pub fullscreen: bool,

    /// Number of the input on the program bus
    pub active: Option<InputNumber>,

    /// Number of the input on preview
    pub preview: Option<InputNumber>,

    /// Secondary mixes: mix number -> number of the input active on it
    pub mixes: BTreeMap<u32, InputNumber>,
}

/// Input type as reported by the mixer
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InputType {
    Video,
    VideoList,
    Audio,
    Colour,
    Mix,
    Capture,
    /// Graphics template
    GT,
    Other(String),
}

impl InputType {
    pub fn as_str(&self) -> &str {
        match self {
            InputType::Video => "Video",
            InputType::VideoList => "VideoList",
            InputType::Audio => "Audio",
            InputType::Colour => "Colour",
            InputType::Mix => "Mix",
            InputType::Capture => "Capture",
            InputType::GT => "GT",
            InputType::Other(name) => name,
        }
    }

    /// Media inputs that respond to `PlayPause`
    pub fn is_media(&self) -> bool {
        matches!(self, InputType::Video | InputType::VideoList | InputType::Audio)
    }
}

impl From<&str> for InputType {
    fn from(value: &str) -> Self {
        match value {
            "Video" => InputType::Video,
            "VideoList" => InputType::VideoList,
            "Audio" => InputType::Audio,
            "Colour" => InputType::Colour,
            "Mix" => InputType::Mix,
            "Capture" => InputType::Capture,
            "GT" => InputType::GT,
            other => InputType::Other(other.to_string()),
        }
    }
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for InputType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Playback state of an input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InputState {
    Running,
    Paused,
    Completed,
    Unknown,
}

impl From<&str> for InputState {
    fn from(value: &str) -> Self {
        match value {
            "Running" => InputState::Running,
            "Paused" => InputState::Paused,
            "Completed" => InputState::Completed,
            _ => InputState::Unknown,
        }
    }
}

/// Audio bus identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AudioBus {
    Master,
    A,
    B,
    C,
    D,
    E,
    F,
    G,
}

impl AudioBus {
    pub const ALL: [AudioBus; 8] = [
        AudioBus::Master,
        AudioBus::A,
        AudioBus::B,
        AudioBus::C,
        AudioBus::D,
        AudioBus::E,
        AudioBus::F,
        AudioBus::G,
    ];

    /// Code used in the `audiobusses` attribute and in `AudioBusOn/Off` values
    pub fn code(self) -> &'static str {
        match self {
            AudioBus::Master => "M",
            AudioBus::A => "A",
            AudioBus::B => "B",
            AudioBus::C => "C",
            AudioBus::D => "D",
            AudioBus::E => "E",
            AudioBus::F => "F",
            AudioBus::G => "G",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        AudioBus::ALL.into_iter().find(|bus| bus.code() == code)
    }

    /// Element name under `<audio>`
    pub(crate) fn element_name(self) -> &'static str {
        match self {
            AudioBus::Master => "master",
            AudioBus::A => "busA",
            AudioBus::B => "busB",
            AudioBus::C => "busC",
            AudioBus::D => "busD",
            AudioBus::E => "busE",
            AudioBus::F => "busF",
            AudioBus::G => "busG",
        }
    }

    /// Name shown when the mixer does not provide one
    pub fn default_name(self) -> &'static str {
        match self {
            AudioBus::Master => "Master",
            other => other.code(),
        }
    }
}

/// Item list of a `VideoList` input
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Playlist {
    /// Item paths in list order
    pub items: Vec<String>,

    /// 1-based index of the selected item
    pub selected_index: u32,
}

/// One source known to the mixer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Input {
    pub key: InputKey,
    pub number: InputNumber,
    pub kind: InputType,
    pub title: String,
    pub state: InputState,

    /// Playback position in milliseconds
    pub position_ms: Option<u64>,

    /// Clip duration in milliseconds
    pub duration_ms: Option<u64>,

    /// Volume 0-100
    pub volume: Option<f64>,

    /// `None` when the input has no `muted` attribute
    pub muted: Option<bool>,

    /// Buses this input is routed to
    pub audio_buses: Vec<AudioBus>,

    pub playlist: Option<Playlist>,
}

impl Input {
    pub fn is_muted(&self) -> bool {
        self.muted.unwrap_or(false)
    }

    pub fn is_on_bus(&self, bus: AudioBus) -> bool {
        self.audio_buses.contains(&bus)
    }

    /// Whether the mixer reports any audio data for this input
    pub fn has_audio(&self) -> bool {
        !self.audio_buses.is_empty() || self.volume.is_some() || self.muted.is_some()
    }

    /// Graphics templates titled like a timer carry countdown controls
    pub fn is_countdown_timer(&self) -> bool {
        self.kind == InputType::GT && self.title.to_lowercase().contains("timer")
    }

    /// Duration, with a missing value counted as zero
    pub fn duration_or_zero(&self) -> u64 {
        self.duration_ms.unwrap_or(0)
    }
}

/// Master output audio levels
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MasterAudio {
    pub volume: Option<f64>,
    pub muted: bool,
    pub meter_f1: Option<f64>,
    pub meter_f2: Option<f64>,
}

/// Transition button configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub number: u32,
    pub effect: String,
    pub duration_ms: u64,
}
