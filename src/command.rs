//! Command catalog
//!
//! Each user intent maps to a [`CommandPlan`]: the ordered calls to issue and
//! the settle delay to wait before re-reading state. Plans that depend on the
//! current state (mute, bus and overlay toggles) are computed from the
//! document as it was before dispatch.

use crate::document::StateDocument;
use crate::protocol::{Function, FunctionCall};
use crate::types::{AudioBus, InputKey, OVERLAY_SLOTS};
use std::time::Duration;

/// Fade duration used for program and mix routing
pub const FADE_DURATION_MS: u32 = 500;

/// Transition layer index passed with routing fades
pub const FADE_INDEX: u32 = 2;

/// Gap between the steps of a countdown update
pub const COUNTDOWN_STEP_GAP: Duration = Duration::from_millis(200);

const ROUTE_SETTLE: Duration = Duration::from_millis(600);
const QUEUE_PLAY_SETTLE: Duration = Duration::from_millis(800);
const BUS_SETTLE: Duration = Duration::from_millis(400);
const OVERLAY_OFF_SETTLE: Duration = Duration::from_millis(550);
const QUICK_SETTLE: Duration = Duration::from_millis(200);

/// A user intent against one input
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Fade the input onto the program bus
    SendToProgram { input: InputKey },
    /// Fade the input onto a secondary mix (1-based mix column index)
    SendToMix { input: InputKey, mix: u32 },
    Restart { input: InputKey },
    /// Flip the input's mute state
    ToggleAudio { input: InputKey },
    /// Flip the input's routing to one audio bus
    ToggleBus { input: InputKey, bus: AudioBus },
    /// Put the input in or take it out of an overlay slot (1-4)
    ToggleOverlay { input: InputKey, slot: u8 },
    /// Select a playlist item (1-based)
    SelectIndex { input: InputKey, index: u32 },
    PlayPause { input: InputKey },
    LivePlayPause { input: InputKey },
    /// Restart, unmute, fade to program, then play
    QueuePlay { input: InputKey },
    StartCountdown { input: InputKey },
    PauseCountdown { input: InputKey },
    StopCountdown { input: InputKey },
    /// Stop the countdown, set it to `minutes`, optionally start it again
    SetCountdown {
        input: InputKey,
        minutes: f64,
        start: bool,
    },
}

/// One step of a plan
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Call(FunctionCall),
    Wait(Duration),
}

/// Ordered steps plus the delay before the follow-up refresh
#[derive(Debug, Clone, PartialEq)]
pub struct CommandPlan {
    pub steps: Vec<Step>,
    pub settle: Duration,
}

impl CommandPlan {
    fn single(call: FunctionCall, settle: Duration) -> Self {
        Self {
            steps: vec![Step::Call(call)],
            settle,
        }
    }

    /// Calls in issue order, waits skipped
    pub fn calls(&self) -> impl Iterator<Item = &FunctionCall> {
        self.steps.iter().filter_map(|step| match step {
            Step::Call(call) => Some(call),
            Step::Wait(_) => None,
        })
    }
}

impl Command {
    /// Key of the input this command targets
    pub fn input(&self) -> &str {
        match self {
            Command::SendToProgram { input }
            | Command::SendToMix { input, .. }
            | Command::Restart { input }
            | Command::ToggleAudio { input }
            | Command::ToggleBus { input, .. }
            | Command::ToggleOverlay { input, .. }
            | Command::SelectIndex { input, .. }
            | Command::PlayPause { input }
            | Command::LivePlayPause { input }
            | Command::QueuePlay { input }
            | Command::StartCountdown { input }
            | Command::PauseCountdown { input }
            | Command::StopCountdown { input }
            | Command::SetCountdown { input, .. } => input,
        }
    }

    /// Short label for logs and notifications
    pub fn label(&self) -> &'static str {
        match self {
            Command::SendToProgram { .. } => "send to program",
            Command::SendToMix { .. } => "send to mix",
            Command::Restart { .. } => "restart",
            Command::ToggleAudio { .. } => "toggle audio",
            Command::ToggleBus { .. } => "toggle audio bus",
            Command::ToggleOverlay { .. } => "toggle overlay",
            Command::SelectIndex { .. } => "select list item",
            Command::PlayPause { .. } => "play/pause",
            Command::LivePlayPause { .. } => "live play/pause",
            Command::QueuePlay { .. } => "queue and play",
            Command::StartCountdown { .. } => "start countdown",
            Command::PauseCountdown { .. } => "pause countdown",
            Command::StopCountdown { .. } => "stop countdown",
            Command::SetCountdown { .. } => "set countdown",
        }
    }

    /// Build the plan against the state known before dispatch
    pub fn plan(&self, doc: Option<&StateDocument>) -> CommandPlan {
        let key = self.input();
        let call = |function| FunctionCall::new(function).with_input(key);

        match self {
            Command::SendToProgram { .. } => CommandPlan::single(fade(key, 0), ROUTE_SETTLE),
            Command::SendToMix { mix, .. } => CommandPlan::single(fade(key, *mix), ROUTE_SETTLE),
            Command::Restart { .. } => CommandPlan::single(call(Function::Restart), QUICK_SETTLE),
            Command::ToggleAudio { .. } => {
                let muted = doc
                    .and_then(|d| d.input_by_key(key))
                    .is_some_and(|input| input.is_muted());
                let function = if muted {
                    Function::AudioOn
                } else {
                    Function::AudioOff
                };
                CommandPlan::single(call(function), QUICK_SETTLE)
            }
            Command::ToggleBus { bus, .. } => {
                let on_bus = doc
                    .and_then(|d| d.input_by_key(key))
                    .is_some_and(|input| input.is_on_bus(*bus));
                let function = if on_bus {
                    Function::AudioBusOff
                } else {
                    Function::AudioBusOn
                };
                CommandPlan::single(call(function).with_param("Value", bus.code()), BUS_SETTLE)
            }
            Command::ToggleOverlay { slot, .. } => {
                let slot = clamp_slot(*slot);
                let settle = if overlay_turning_off(doc, key, slot) {
                    OVERLAY_OFF_SETTLE
                } else {
                    QUICK_SETTLE
                };
                CommandPlan::single(call(Function::OverlayInput(slot)), settle)
            }
            Command::SelectIndex { index, .. } => CommandPlan::single(
                call(Function::SelectIndex).with_param("Value", index),
                QUICK_SETTLE,
            ),
            Command::PlayPause { .. } => CommandPlan::single(call(Function::PlayPause), QUICK_SETTLE),
            Command::LivePlayPause { .. } => {
                CommandPlan::single(call(Function::LivePlayPause), QUICK_SETTLE)
            }
            Command::QueuePlay { .. } => CommandPlan {
                steps: vec![
                    Step::Call(call(Function::Restart)),
                    Step::Call(call(Function::AudioOn)),
                    Step::Call(fade(key, 0)),
                    Step::Call(call(Function::Play)),
                ],
                settle: QUEUE_PLAY_SETTLE,
            },
            Command::StartCountdown { .. } => {
                CommandPlan::single(call(Function::StartCountdown), QUICK_SETTLE)
            }
            Command::PauseCountdown { .. } => {
                CommandPlan::single(call(Function::PauseCountdown), QUICK_SETTLE)
            }
            Command::StopCountdown { .. } => {
                CommandPlan::single(call(Function::StopCountdown), QUICK_SETTLE)
            }
            Command::SetCountdown { minutes, start, .. } => {
                let mut steps = vec![
                    Step::Call(call(Function::StopCountdown)),
                    Step::Wait(COUNTDOWN_STEP_GAP),
                    Step::Call(
                        call(Function::SetCountdown).with_param("Value", countdown_value(*minutes)),
                    ),
                ];
                if *start {
                    steps.push(Step::Wait(COUNTDOWN_STEP_GAP));
                    steps.push(Step::Call(call(Function::StartCountdown)));
                }
                CommandPlan {
                    steps,
                    settle: QUICK_SETTLE,
                }
            }
        }
    }
}

fn fade(key: &str, mix: u32) -> FunctionCall {
    FunctionCall::new(Function::Fade)
        .with_input(key)
        .with_param("Mix", mix)
        .with_param("Duration", FADE_DURATION_MS)
        .with_param("Index", FADE_INDEX)
}

fn clamp_slot(slot: u8) -> u8 {
    if (1..=OVERLAY_SLOTS as u8).contains(&slot) {
        slot
    } else {
        1
    }
}

/// True when the input already occupies `slot`, so the toggle removes it
fn overlay_turning_off(doc: Option<&StateDocument>, key: &str, slot: u8) -> bool {
    let Some(doc) = doc else {
        return false;
    };
    let Some(input) = doc.input_by_key(key) else {
        return false;
    };
    !input.number.is_empty() && doc.overlay_slot_of(&input.number) == Some(slot as usize)
}

/// Convert a minute count to the `HH:MM:SS` countdown value
///
/// Negative and NaN inputs clamp to zero.
pub fn countdown_value(minutes: f64) -> String {
    let seconds = (minutes * 60.0).floor();
    let total = if seconds.is_nan() || seconds < 0.0 {
        0
    } else {
        seconds as u64
    };
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}
