use std::fmt;

/// Mixer API function names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Fade,
    Restart,
    Play,
    PlayPause,
    LivePlayPause,
    AudioOn,
    AudioOff,
    AudioBusOn,
    AudioBusOff,
    /// `OverlayInput1` .. `OverlayInput4`, toggles the input in that slot
    OverlayInput(u8),
    SelectIndex,
    StartCountdown,
    PauseCountdown,
    StopCountdown,
    SetCountdown,
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Function::Fade => f.write_str("Fade"),
            Function::Restart => f.write_str("Restart"),
            Function::Play => f.write_str("Play"),
            Function::PlayPause => f.write_str("PlayPause"),
            Function::LivePlayPause => f.write_str("LivePlayPause"),
            Function::AudioOn => f.write_str("AudioOn"),
            Function::AudioOff => f.write_str("AudioOff"),
            Function::AudioBusOn => f.write_str("AudioBusOn"),
            Function::AudioBusOff => f.write_str("AudioBusOff"),
            Function::OverlayInput(slot) => write!(f, "OverlayInput{}", slot),
            Function::SelectIndex => f.write_str("SelectIndex"),
            Function::StartCountdown => f.write_str("StartCountdown"),
            Function::PauseCountdown => f.write_str("PauseCountdown"),
            Function::StopCountdown => f.write_str("StopCountdown"),
            Function::SetCountdown => f.write_str("SetCountdown"),
        }
    }
}

/// One call against the mixer's function endpoint
///
/// Encoded as `?Function=<name>&Input=<key>&...`; parameters keep the order
/// they were added in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionCall {
    function: Function,
    params: Vec<(&'static str, String)>,
}

impl FunctionCall {
    /// Create a call with no parameters
    pub fn new(function: Function) -> Self {
        Self {
            function,
            params: Vec::new(),
        }
    }

    /// Set the target input key
    pub fn with_input(self, key: impl Into<String>) -> Self {
        self.with_param("Input", key.into())
    }

    /// Add a named parameter (`Mix`, `Duration`, `Index`, `Value`)
    pub fn with_param(mut self, name: &'static str, value: impl ToString) -> Self {
        self.params.push((name, value.to_string()));
        self
    }

    pub fn function(&self) -> Function {
        self.function
    }

    /// Value of a parameter, if set
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Query pairs, `Function` first
    pub fn query(&self) -> Vec<(String, String)> {
        std::iter::once(("Function".to_string(), self.function.to_string()))
            .chain(
                self.params
                    .iter()
                    .map(|(key, value)| (key.to_string(), value.clone())),
            )
            .collect()
    }
}
