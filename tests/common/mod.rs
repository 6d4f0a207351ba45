//! Shared recording doubles for the integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use dialogue_engine::core::audio::{AudioBackend, PlaybackId};
use dialogue_engine::core::config::DialogueConfig;
use dialogue_engine::core::director::DialogueDirector;
use dialogue_engine::core::motion::{CameraRig, FocusHost, MotionController, Orientation};
use dialogue_engine::core::presentation::{
    ChoiceSlot, ChoiceTrigger, PortraitSurface, PresentationBundle, Surface, TextSurface,
};
use dialogue_engine::schema::partner::{AudioClip, ConversationPartner, Portrait};
use dialogue_engine::schema::story::StoryDocument;

#[derive(Debug, Default)]
pub struct Record {
    pub visible: bool,
    pub destroyed: bool,
    pub text: String,
    pub trigger: Option<ChoiceTrigger>,
    pub portrait: Option<String>,
}

/// A UI element that remembers what was written to it.
#[derive(Clone, Default)]
pub struct Element(pub Rc<RefCell<Record>>);

impl Element {
    pub fn text(&self) -> String {
        self.0.borrow().text.clone()
    }
    pub fn visible(&self) -> bool {
        self.0.borrow().visible
    }
    pub fn destroyed(&self) -> bool {
        self.0.borrow().destroyed
    }
    pub fn trigger(&self) -> Option<ChoiceTrigger> {
        self.0.borrow().trigger
    }
}

impl Surface for Element {
    fn set_visible(&mut self, visible: bool) {
        self.0.borrow_mut().visible = visible;
    }
    fn destroy(&mut self) {
        self.0.borrow_mut().destroyed = true;
    }
}

impl TextSurface for Element {
    fn set_text(&mut self, text: &str) {
        self.0.borrow_mut().text = text.to_string();
    }
}

impl PortraitSurface for Element {
    fn show_portrait(&mut self, portrait: &Portrait, _bobbing: bool) {
        self.0.borrow_mut().portrait = Some(portrait.image.clone());
    }
}

impl ChoiceSlot for Element {
    fn set_label(&mut self, label: &str) {
        self.0.borrow_mut().text = label.to_string();
    }
    fn attach(&mut self, trigger: ChoiceTrigger) {
        self.0.borrow_mut().trigger = Some(trigger);
    }
}

pub struct Ui {
    pub panel: Element,
    pub text: Element,
    pub portrait: Element,
    pub slots: Vec<Element>,
}

impl Ui {
    pub fn new(slots: usize) -> (Ui, PresentationBundle) {
        let ui = Ui {
            panel: Element::default(),
            text: Element::default(),
            portrait: Element::default(),
            slots: (0..slots).map(|_| Element::default()).collect(),
        };
        let bundle = PresentationBundle {
            panel: Some(Box::new(ui.panel.clone())),
            text: Some(Box::new(ui.text.clone())),
            portrait: Some(Box::new(ui.portrait.clone())),
            choices: ui
                .slots
                .iter()
                .map(|s| Box::new(s.clone()) as Box<dyn ChoiceSlot>)
                .collect(),
        };
        (ui, bundle)
    }

    /// Labels of the visible choice slots, in slot order.
    pub fn labels(&self) -> Vec<String> {
        self.slots
            .iter()
            .filter(|s| s.visible())
            .map(|s| s.text())
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct MotionRecord {
    pub enabled: bool,
    pub baseline: Option<Orientation>,
    pub focused: bool,
}

#[derive(Clone, Default)]
pub struct Player(pub Rc<RefCell<MotionRecord>>);

impl MotionController for Player {
    fn set_enabled(&mut self, enabled: bool) {
        self.0.borrow_mut().enabled = enabled;
    }
    fn is_enabled(&self) -> bool {
        self.0.borrow().enabled
    }
    fn resync_orientation(&mut self, baseline: Orientation) {
        self.0.borrow_mut().baseline = Some(baseline);
    }
}

impl FocusHost for Player {
    fn set_dialogue_focus(&mut self, focused: bool) {
        self.0.borrow_mut().focused = focused;
    }
}

#[derive(Clone, Default)]
pub struct Camera(pub Rc<RefCell<Orientation>>);

impl CameraRig for Camera {
    fn orientation(&self) -> Orientation {
        *self.0.borrow()
    }
}

#[derive(Clone, Default)]
pub struct Speaker {
    pub log: Rc<RefCell<Vec<String>>>,
    issued: Rc<RefCell<u64>>,
}

impl AudioBackend for Speaker {
    fn play(&mut self, clip: &AudioClip, looping: bool) -> PlaybackId {
        let verb = if looping { "loop" } else { "play" };
        self.log.borrow_mut().push(format!("{} {}", verb, clip.name));
        let mut issued = self.issued.borrow_mut();
        *issued += 1;
        PlaybackId(*issued)
    }

    fn stop(&mut self, playback: PlaybackId) {
        self.log.borrow_mut().push(format!("stop {}", playback.0));
    }
}

pub struct Rig {
    pub director: DialogueDirector,
    pub ui: Ui,
    pub player: Player,
    pub camera: Camera,
    pub speaker: Speaker,
}

pub fn rig(config: DialogueConfig, slots: usize) -> Rig {
    let (ui, bundle) = Ui::new(slots);
    let player = Player::default();
    player.0.borrow_mut().enabled = true;
    let camera = Camera::default();
    let speaker = Speaker::default();

    let director = DialogueDirector::builder()
        .config(config)
        .presentation(bundle)
        .audio_backend(speaker.clone())
        .motion_controller(player.clone())
        .focus_host(player.clone())
        .camera(camera.clone())
        .build()
        .unwrap();

    Rig {
        director,
        ui,
        player,
        camera,
        speaker,
    }
}

/// Config with a fixed auto delay and no per-signal debounce. Every value
/// is exact in binary so frame deltas add up to it without drift.
pub fn test_config() -> DialogueConfig {
    DialogueConfig {
        auto_advance_delay_secs: (1.0, 1.0),
        input_cooldown_secs: 0.25,
        signal_debounce_secs: 0.0,
        exit_delay_secs: 0.25,
        ..DialogueConfig::default()
    }
}

pub fn fixture(name: &str) -> StoryDocument {
    let path = format!("tests/fixtures/{}.ron", name);
    let source = std::fs::read_to_string(&path).unwrap();
    StoryDocument::new(name, source)
}

pub fn partner(name: &str, document: StoryDocument) -> ConversationPartner {
    ConversationPartner::new(name).with_document(document)
}

pub fn secs(s: f32) -> Duration {
    Duration::from_secs_f32(s)
}
