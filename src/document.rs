use crate::error::Result;
use crate::types::{
    AudioBus, Input, InputState, InputType, MasterAudio, MixerInfo, Playlist, Status, Transition,
    OVERLAY_SLOTS,
};
use roxmltree::Node;
use std::collections::BTreeMap;

/// Placeholder for missing config values
pub const MISSING: &str = "-";

/// Snapshot compiled into the crate, used as the default fallback source
pub(crate) const BUNDLED_SNAPSHOT: &str = include_str!("../assets/fallback.xml");

/// Parsed mixer state
///
/// A `StateDocument` is built once from the mixer's XML and never mutated.
/// String-typed booleans and enums are converted here; nothing past this
/// layer sees raw attribute text except [`StateDocument::raw`].
#[derive(Debug, Clone)]
pub struct StateDocument {
    info: MixerInfo,
    status: Status,
    inputs: Vec<Input>,
    bus_names: BTreeMap<AudioBus, String>,
    overlays: [Option<String>; OVERLAY_SLOTS],
    transitions: Vec<Transition>,
    master_audio: Option<MasterAudio>,
    raw: String,
}

impl StateDocument {
    /// Parse a state document
    ///
    /// Malformed XML is an error. A well-formed document with missing
    /// elements still parses; absent fields take their defaults.
    pub fn parse(xml: &str) -> Result<Self> {
        let doc = roxmltree::Document::parse(xml)?;
        let root = doc.root_element();

        let info = MixerInfo {
            version: child_text(root, "version").unwrap_or_else(|| MISSING.to_string()),
            edition: child_text(root, "edition").unwrap_or_else(|| MISSING.to_string()),
        };

        let inputs: Vec<Input> = child(root, "inputs")
            .map(|inputs| elements(inputs, "input").map(parse_input).collect())
            .unwrap_or_default();

        let mut overlays: [Option<String>; OVERLAY_SLOTS] = Default::default();
        if let Some(node) = child(root, "overlays") {
            for overlay in elements(node, "overlay") {
                let slot = overlay.attribute("number").and_then(|n| n.parse::<usize>().ok());
                if let Some(slot @ 1..=OVERLAY_SLOTS) = slot {
                    overlays[slot - 1] = text_of(overlay);
                }
            }
        }

        let transitions = child(root, "transitions")
            .map(|node| {
                elements(node, "transition")
                    .map(|t| Transition {
                        number: parse_attr(t, "number").unwrap_or(0),
                        effect: t.attribute("effect").unwrap_or_default().to_string(),
                        duration_ms: parse_attr(t, "duration").unwrap_or(0),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let audio = child(root, "audio");
        let mut bus_names = BTreeMap::new();
        if let Some(audio) = audio {
            for bus in AudioBus::ALL {
                let name = child(audio, bus.element_name())
                    .and_then(|n| n.attribute("name"))
                    .filter(|name| !name.is_empty());
                if let Some(name) = name {
                    bus_names.insert(bus, name.to_string());
                }
            }
        }

        let master_audio = audio.and_then(|a| child(a, "master")).map(|master| MasterAudio {
            volume: parse_attr(master, "volume"),
            muted: master.attribute("muted") == Some("True"),
            meter_f1: parse_attr(master, "meterF1"),
            meter_f2: parse_attr(master, "meterF2"),
        });

        let mixes = elements(root, "mix")
            .filter_map(|mix| {
                let number = parse_attr::<u32>(mix, "number")?;
                let active = child_text(mix, "active")?;
                Some((number, active))
            })
            .collect();

        let status = Status {
            recording: flag(root, "recording"),
            streaming: flag(root, "streaming"),
            external: flag(root, "external"),
            fullscreen: flag(root, "fullscreen"),
            active: child_text(root, "active"),
            preview: child_text(root, "preview"),
            mixes,
        };

        tracing::debug!(
            "Parsed state document: {} inputs, version {}",
            inputs.len(),
            info.version
        );

        Ok(Self {
            info,
            status,
            inputs,
            bus_names,
            overlays,
            transitions,
            master_audio,
            raw: xml.to_string(),
        })
    }

    /// The snapshot shipped with the crate
    pub fn bundled() -> Result<Self> {
        Self::parse(BUNDLED_SNAPSHOT)
    }

    pub fn config(&self) -> &MixerInfo {
        &self.info
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    /// Inputs in mixer order
    pub fn inputs(&self) -> &[Input] {
        &self.inputs
    }

    pub fn input_by_key(&self, key: &str) -> Option<&Input> {
        self.inputs.iter().find(|input| input.key == key)
    }

    /// Inputs of type `Mix`, in order of appearance
    pub fn mix_inputs(&self) -> impl Iterator<Item = &Input> {
        self.inputs.iter().filter(|input| input.kind == InputType::Mix)
    }

    /// Display names for every bus, defaulted where the mixer has none
    pub fn audio_bus_names(&self) -> BTreeMap<AudioBus, String> {
        AudioBus::ALL
            .into_iter()
            .map(|bus| {
                let name = self
                    .bus_names
                    .get(&bus)
                    .cloned()
                    .unwrap_or_else(|| bus.default_name().to_string());
                (bus, name)
            })
            .collect()
    }

    /// Occupant input number of each overlay slot
    pub fn overlays(&self) -> &[Option<String>; OVERLAY_SLOTS] {
        &self.overlays
    }

    /// 1-based slot currently holding `number`, if any
    pub fn overlay_slot_of(&self, number: &str) -> Option<usize> {
        self.overlays
            .iter()
            .position(|occupant| occupant.as_deref() == Some(number))
            .map(|idx| idx + 1)
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn master_audio(&self) -> Option<&MasterAudio> {
        self.master_audio.as_ref()
    }

    /// Source XML text
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

fn parse_input(node: Node) -> Input {
    let kind = InputType::from(node.attribute("type").unwrap_or_default());

    let playlist = (kind == InputType::VideoList).then(|| Playlist {
        items: child(node, "list")
            .map(|list| {
                elements(list, "item")
                    .map(|item| item.text().unwrap_or_default().trim().to_string())
                    .collect()
            })
            .unwrap_or_default(),
        selected_index: parse_attr(node, "selectedIndex").unwrap_or(1),
    });

    Input {
        key: node.attribute("key").unwrap_or_default().to_string(),
        number: node.attribute("number").unwrap_or_default().to_string(),
        kind,
        title: node.attribute("title").unwrap_or_default().to_string(),
        state: InputState::from(node.attribute("state").unwrap_or_default()),
        position_ms: parse_attr(node, "position"),
        duration_ms: parse_attr(node, "duration"),
        volume: parse_attr(node, "volume"),
        muted: node.attribute("muted").map(|m| m == "True"),
        audio_buses: node
            .attribute("audiobusses")
            .unwrap_or_default()
            .split(',')
            .filter_map(|code| AudioBus::from_code(code.trim()))
            .collect(),
        playlist,
    }
}

fn elements<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |n| n.is_element() && n.tag_name().name() == name)
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

fn text_of(node: Node) -> Option<String> {
    node.text()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn child_text(node: Node, name: &str) -> Option<String> {
    child(node, name).and_then(text_of)
}

/// `"True"` is the only true value; anything else, including absence, is false
fn flag(node: Node, name: &str) -> bool {
    child(node, name).and_then(|n| n.text()) == Some("True")
}

fn parse_attr<T: std::str::FromStr>(node: Node, name: &str) -> Option<T> {
    node.attribute(name).and_then(|value| value.trim().parse().ok())
}
