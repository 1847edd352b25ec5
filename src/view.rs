//! Render-ready projections of a [`StateDocument`]
//!
//! Everything here is a pure function of the document passed in. Display
//! transforms (truncation, time formatting, labels) never feed back into
//! matching: comparisons always use the raw `number` and `key` values.

use crate::document::StateDocument;
use crate::types::{
    AudioBus, Input, InputKey, InputNumber, InputState, InputType, MasterAudio, OVERLAY_SLOTS,
};
use serde::Serialize;

/// Titles longer than this are truncated for display
pub const TITLE_DISPLAY_LIMIT: usize = 30;

/// Characters of a mix title shown on its routing button
pub const MIX_LABEL_LEN: usize = 5;

/// Buses offered as toggles on each input row
pub const ROW_BUSES: [AudioBus; 4] = [AudioBus::Master, AudioBus::A, AudioBus::B, AudioBus::C];

/// Countdown presets offered for timer graphics, in minutes
pub const TIMER_PRESET_MINUTES: [u32; 13] = [1, 2, 3, 5, 7, 10, 15, 20, 25, 30, 40, 45, 60];

/// A secondary mix column, one per `Mix` input
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MixColumn {
    /// 1-based column index, also the `Mix` parameter for routing
    pub index: u32,
    pub number: InputNumber,
    pub key: InputKey,
    pub title: String,
}

/// Routing button of one row in one mix column
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MixRoute {
    pub mix_index: u32,
    pub active: bool,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlayToggleKind {
    /// Media clip: `PlayPause`
    PlayPause,
    /// Live capture: `LivePlayPause`
    LivePlayPause,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlayToggle {
    pub kind: PlayToggleKind,
    pub paused: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BusToggle {
    pub bus: AudioBus,
    pub label: String,
    pub on: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioControls {
    pub muted: bool,
    pub buses: Vec<BusToggle>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaylistEntry {
    /// 1-based, as sent with `SelectIndex`
    pub index: u32,
    /// File name without directories
    pub name: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountdownControls {
    pub preset_minutes: Vec<u32>,
}

/// Everything needed to render one input row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputRow {
    pub key: InputKey,
    pub number: InputNumber,
    pub kind: InputType,
    /// Truncated title, display only
    pub title: String,
    pub state: InputState,
    pub program_active: bool,
    pub preview_active: bool,
    /// One entry per mix column; `None` where the row is that mix itself
    pub mix_cells: Vec<Option<MixRoute>>,
    pub queue_play: bool,
    pub restart: bool,
    pub play_toggle: Option<PlayToggle>,
    pub position: String,
    pub duration: String,
    pub volume: Option<f64>,
    pub audio: Option<AudioControls>,
    /// Slot flags, `None` where overlay controls do not apply
    pub overlays: Option<[bool; OVERLAY_SLOTS]>,
    pub playlist: Option<Vec<PlaylistEntry>>,
    pub countdown: Option<CountdownControls>,
}

/// Summary figures for a status header
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub version: String,
    pub edition: String,
    pub total_inputs: usize,
    pub running_inputs: usize,
    pub recording: bool,
    pub streaming: bool,
    pub external: bool,
    pub master: Option<MasterAudio>,
}

/// Format milliseconds as `HH:MM:SS`
///
/// `None` and zero render as `00:00:00`. Hours are not wrapped.
pub fn format_hms(ms: Option<u64>) -> String {
    let seconds = ms.unwrap_or(0) / 1000;
    let minutes = seconds / 60;
    let hours = minutes / 60;
    format!("{:02}:{:02}:{:02}", hours, minutes % 60, seconds % 60)
}

/// Truncate a title to [`TITLE_DISPLAY_LIMIT`] characters plus an ellipsis
pub fn truncate_title(title: &str) -> String {
    if title.chars().count() > TITLE_DISPLAY_LIMIT {
        let mut short: String = title.chars().take(TITLE_DISPLAY_LIMIT).collect();
        short.push('…');
        short
    } else {
        title.to_string()
    }
}

/// `Mix` inputs as columns, 1-based in order of appearance
pub fn mix_matrix(doc: Option<&StateDocument>) -> Vec<MixColumn> {
    let Some(doc) = doc else {
        return Vec::new();
    };
    doc.mix_inputs()
        .zip(1..)
        .map(|(input, index)| MixColumn {
            index,
            number: input.number.clone(),
            key: input.key.clone(),
            title: input.title.clone(),
        })
        .collect()
}

/// Which overlay slots `input` currently occupies
pub fn overlay_assignment(doc: &StateDocument, input: &Input) -> [bool; OVERLAY_SLOTS] {
    let mut slots = [false; OVERLAY_SLOTS];
    for (slot, occupant) in slots.iter_mut().zip(doc.overlays()) {
        *slot = occupant.as_deref() == Some(input.number.as_str());
    }
    slots
}

/// One row per input, in mixer order
pub fn input_rows(doc: Option<&StateDocument>) -> Vec<InputRow> {
    let Some(doc) = doc else {
        return Vec::new();
    };

    let columns = mix_matrix(Some(doc));
    let bus_names = doc.audio_bus_names();
    let status = doc.status();

    doc.inputs()
        .iter()
        .map(|input| {
            let misc = !matches!(input.kind, InputType::Colour | InputType::Mix);
            let duration = input.duration_or_zero();

            let mix_cells = columns
                .iter()
                .map(|column| {
                    if input.kind == InputType::Mix && input.key == column.key {
                        return None;
                    }
                    let active = status
                        .mixes
                        .get(&(column.index + 1))
                        .is_some_and(|number| *number == input.number);
                    Some(MixRoute {
                        mix_index: column.index,
                        active,
                        label: column.title.chars().take(MIX_LABEL_LEN).collect(),
                    })
                })
                .collect();

            let play_kind = match input.kind {
                InputType::Capture => Some(PlayToggleKind::LivePlayPause),
                ref kind if kind.is_media() => Some(PlayToggleKind::PlayPause),
                _ => None,
            };
            let play_toggle = play_kind
                .filter(|_| misc && (duration > 0 || input.kind == InputType::Capture))
                .map(|kind| PlayToggle {
                    kind,
                    paused: input.state == InputState::Paused,
                });

            let audible = input.kind != InputType::Colour;
            let audio = (audible && input.has_audio()).then(|| {
                AudioControls {
                    muted: input.is_muted(),
                    buses: ROW_BUSES
                        .iter()
                        .map(|bus| BusToggle {
                            bus: *bus,
                            label: bus_names
                                .get(bus)
                                .cloned()
                                .unwrap_or_else(|| bus.default_name().to_string()),
                            on: input.is_on_bus(*bus),
                        })
                        .collect(),
                }
            });

            let playlist = input
                .playlist
                .as_ref()
                .filter(|list| !list.items.is_empty())
                .map(|list| {
                    list.items
                        .iter()
                        .zip(1..)
                        .map(|(path, index)| PlaylistEntry {
                            index,
                            name: file_name(path).to_string(),
                            selected: index == list.selected_index,
                        })
                        .collect()
                });

            InputRow {
                key: input.key.clone(),
                number: input.number.clone(),
                kind: input.kind.clone(),
                title: truncate_title(&input.title),
                state: input.state,
                program_active: status.active.as_deref() == Some(input.number.as_str()),
                preview_active: status.preview.as_deref() == Some(input.number.as_str()),
                mix_cells,
                queue_play: misc,
                restart: misc && duration > 0,
                play_toggle,
                position: format_hms(input.position_ms),
                duration: format_hms(input.duration_ms),
                volume: input.volume.filter(|_| audible),
                audio,
                overlays: (input.kind != InputType::Colour)
                    .then(|| overlay_assignment(doc, input)),
                playlist,
                countdown: input.is_countdown_timer().then(|| CountdownControls {
                    preset_minutes: TIMER_PRESET_MINUTES.to_vec(),
                }),
            }
        })
        .collect()
}

/// Header summary; placeholders when there is no document
pub fn dashboard(doc: Option<&StateDocument>) -> Dashboard {
    match doc {
        Some(doc) => Dashboard {
            version: doc.config().version.clone(),
            edition: doc.config().edition.clone(),
            total_inputs: doc.inputs().len(),
            running_inputs: doc
                .inputs()
                .iter()
                .filter(|input| input.state == InputState::Running)
                .count(),
            recording: doc.status().recording,
            streaming: doc.status().streaming,
            external: doc.status().external,
            master: doc.master_audio().cloned(),
        },
        None => Dashboard {
            version: crate::document::MISSING.to_string(),
            edition: crate::document::MISSING.to_string(),
            total_inputs: 0,
            running_inputs: 0,
            recording: false,
            streaming: false,
            external: false,
            master: None,
        },
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_hms(text: &str) -> u64 {
        let parts: Vec<u64> = text.split(':').map(|p| p.parse().unwrap()).collect();
        parts[0] * 3600 + parts[1] * 60 + parts[2]
    }

    fn scenario() -> StateDocument {
        StateDocument::parse(
            r#"<vmix><inputs>
                <input key="k1" number="1" type="Video" title="Clip" duration="5000"/>
                <input key="k2" number="2" type="Mix" title="Screen"/>
            </inputs><active>1</active></vmix>"#,
        )
        .unwrap()
    }

    #[test]
    fn format_hms_round_trips_whole_seconds() {
        for ms in [0u64, 999, 1000, 59_999, 61_500, 3_599_999, 3_600_000, 95_360, 400_000_123] {
            assert_eq!(parse_hms(&format_hms(Some(ms))), ms / 1000, "ms = {}", ms);
        }
        assert_eq!(format_hms(None), "00:00:00");
        assert_eq!(format_hms(Some(0)), "00:00:00");
        assert_eq!(format_hms(Some(95_360)), "00:01:35");
        assert_eq!(format_hms(Some(3_723_000)), "01:02:03");
    }

    #[test]
    fn truncation_is_character_based() {
        let exact = "a".repeat(30);
        assert_eq!(truncate_title(&exact), exact);

        let long = "ж".repeat(31);
        let short = truncate_title(&long);
        assert_eq!(short.chars().count(), 31);
        assert!(short.ends_with('…'));
    }

    #[test]
    fn program_flag_matches_active_number() {
        let doc = scenario();
        let rows = input_rows(Some(&doc));
        assert!(rows[0].program_active);
        assert!(!rows[1].program_active);
        assert_eq!(rows.iter().filter(|r| r.program_active).count(), 1);

        let doc = StateDocument::parse(
            r#"<vmix><inputs><input key="k1" number="1"/></inputs><active>9</active></vmix>"#,
        )
        .unwrap();
        assert!(input_rows(Some(&doc)).iter().all(|r| !r.program_active));
    }

    #[test]
    fn mix_input_cannot_route_to_itself() {
        let doc = scenario();
        let columns = mix_matrix(Some(&doc));
        assert_eq!(columns.len(), 1);
        assert_eq!(columns[0].index, 1);
        assert_eq!(columns[0].key, "k2");

        let rows = input_rows(Some(&doc));
        assert!(rows[0].mix_cells[0].is_some());
        assert_eq!(rows[1].mix_cells, vec![None]);
    }

    #[test]
    fn mix_activity_uses_next_mix_number() {
        let doc = StateDocument::bundled().unwrap();
        let rows = input_rows(Some(&doc));
        // Column 1 ("Stage Screen") reads <mix number="2">, active input 1
        let route = rows[0].mix_cells[0].as_ref().unwrap();
        assert_eq!(route.mix_index, 1);
        assert!(route.active);
        assert_eq!(route.label, "Stage");
        // Column 2 ("Stream Mix") reads <mix number="3">, active input 2
        assert!(rows[1].mix_cells[1].as_ref().unwrap().active);
        assert!(!rows[0].mix_cells[1].as_ref().unwrap().active);
    }

    #[test]
    fn colour_and_mix_rows_lose_misc_controls() {
        let doc = StateDocument::bundled().unwrap();
        let rows = input_rows(Some(&doc));
        let colour = rows.iter().find(|r| r.kind == InputType::Colour).unwrap();
        assert!(!colour.queue_play);
        assert!(colour.audio.is_none());
        assert!(colour.overlays.is_none());

        let mix = rows.iter().find(|r| r.kind == InputType::Mix).unwrap();
        assert!(!mix.queue_play);
        assert!(!mix.restart);
        assert!(mix.play_toggle.is_none());
    }

    #[test]
    fn colour_rows_hide_volume() {
        let doc = StateDocument::parse(
            r#"<vmix><inputs>
                <input key="c" number="1" type="Colour" title="Black" volume="100" muted="False"/>
                <input key="v" number="2" type="Video" title="Clip" volume="80"/>
            </inputs></vmix>"#,
        )
        .unwrap();
        let rows = input_rows(Some(&doc));
        assert_eq!(rows[0].volume, None);
        assert!(rows[0].audio.is_none());
        assert_eq!(rows[1].volume, Some(80.0));
    }

    #[test]
    fn media_and_capture_rows_get_play_toggles() {
        let doc = StateDocument::bundled().unwrap();
        let rows = input_rows(Some(&doc));

        let clip = &rows[0];
        assert!(clip.restart);
        assert_eq!(
            clip.play_toggle,
            Some(PlayToggle {
                kind: PlayToggleKind::PlayPause,
                paused: true
            })
        );
        assert_eq!(clip.duration, "00:01:35");

        let camera = &rows[1];
        assert!(!camera.restart);
        assert_eq!(
            camera.play_toggle.map(|t| t.kind),
            Some(PlayToggleKind::LivePlayPause)
        );
        assert!(camera.program_active);
    }

    #[test]
    fn audio_controls_use_bus_names() {
        let doc = StateDocument::bundled().unwrap();
        let rows = input_rows(Some(&doc));
        let audio = rows[1].audio.as_ref().unwrap();
        assert!(audio.muted);
        let labels: Vec<&str> = audio.buses.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["Master", "Stream", "B", "C"]);
        let on: Vec<bool> = audio.buses.iter().map(|b| b.on).collect();
        assert_eq!(on, vec![true, true, false, false]);
    }

    #[test]
    fn overlays_playlist_and_countdown() {
        let doc = StateDocument::bundled().unwrap();
        let rows = input_rows(Some(&doc));

        let lower_third = rows.iter().find(|r| r.number == "5").unwrap();
        assert_eq!(lower_third.overlays, Some([true, false, false, false]));
        assert!(lower_third.countdown.is_none());

        let timer = rows.iter().find(|r| r.number == "4").unwrap();
        assert_eq!(timer.overlays, Some([false; 4]));
        assert_eq!(
            timer.countdown.as_ref().unwrap().preset_minutes,
            TIMER_PRESET_MINUTES.to_vec()
        );

        let list = rows[2].playlist.as_ref().unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list[1].name, "break_loop.mp4");
        assert!(list[1].selected);
        assert!(!list[0].selected);
    }

    #[test]
    fn no_document_means_no_rows() {
        assert!(input_rows(None).is_empty());
        assert!(mix_matrix(None).is_empty());
        assert_eq!(dashboard(None).version, "-");
    }

    #[test]
    fn dashboard_counts_running_inputs() {
        let doc = StateDocument::bundled().unwrap();
        let summary = dashboard(Some(&doc));
        assert_eq!(summary.total_inputs, 8);
        assert_eq!(summary.running_inputs, 1);
        assert!(!summary.recording);
        assert_eq!(summary.master.unwrap().volume, Some(100.0));
    }

    #[test]
    fn rows_are_deterministic() {
        let doc = StateDocument::bundled().unwrap();
        assert_eq!(input_rows(Some(&doc)), input_rows(Some(&doc)));
    }
}
