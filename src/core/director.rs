/// The dialogue director: one conversation at a time, from entry to
/// teardown.
///
/// Drives the narrative interpreter, writes its output to the active
/// presentation binding, paces lines (manual, auto-advance or choice),
/// sequences music and hands player control over and back.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::cell::Cell;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::audio::{AudioBackend, AudioPhase, AudioSequencer, SilentBackend};
use crate::core::config::{ConfigError, DialogueConfig};
use crate::core::input_gate::InputGate;
use crate::core::motion::{CameraRig, Detached, FocusHost, MotionController, MotionHandoff};
use crate::core::presentation::{
    BindingHandle, ChoiceTrigger, PresentationBundle, PresentationStage,
};
use crate::core::scheduler::{Scheduler, TimerId};
use crate::core::script::ScriptLoader;
use crate::schema::partner::{AudioClip, ConversationPartner};
use crate::schema::story::{is_auto_advance, NarrativeInterpreter, StoryChoice, StoryLoader};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No conversation.
    Idle,
    /// The interpreter is producing the next line.
    Advancing,
    /// Choices are on screen.
    Choosing,
    /// A line tagged `auto` is on screen; it moves on by itself.
    AutoWaiting,
    /// A plain line is on screen, waiting for one advance signal.
    AwaitingInput,
    /// Outro started, teardown pending.
    Exiting,
}

/// What happened to an `enter_dialogue` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnterOutcome {
    Started,
    /// Another conversation is running; nothing changed.
    AlreadyActive,
    MissingDocument,
    LoadFailed,
}

/// Notifications for the host, collected with
/// [`DialogueDirector::drain_events`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogueEvent {
    Entered { partner: String },
    LineShown { text: String, tags: Vec<String> },
    ChoicesShown { labels: Vec<String>, dropped: usize },
    ChoiceMade { index: usize },
    Exiting,
    Exited { partner: String },
}

/// Read-only view of whether a conversation is running. Clone it into any
/// system that must stand down while the player is talking.
#[derive(Debug, Clone)]
pub struct DialogueActivity(Rc<Cell<bool>>);

impl DialogueActivity {
    pub fn is_active(&self) -> bool {
        self.0.get()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionTimer {
    AutoAdvance { epoch: u64 },
    Teardown { epoch: u64 },
}

struct Session {
    partner: String,
    outro: Option<AudioClip>,
    interpreter: Box<dyn NarrativeInterpreter>,
    state: SessionState,
    waiting_for_advance: bool,
    epoch: u64,
    binding: Option<BindingHandle>,
    auto_timer: Option<TimerId>,
    choices_shown: usize,
}

/// Outcome of pulling one step from the interpreter.
enum Step {
    Auto,
    Choices(Vec<StoryChoice>),
    Await,
    Exit,
}

pub struct DialogueDirector {
    config: DialogueConfig,
    loader: Box<dyn StoryLoader>,
    stage: PresentationStage,
    gate: InputGate,
    audio: AudioSequencer,
    motion: MotionHandoff,
    timers: Scheduler<SessionTimer>,
    rng: StdRng,
    session: Option<Session>,
    epoch: u64,
    activity: Rc<Cell<bool>>,
    events: Vec<DialogueEvent>,
}

/// Builder for constructing a `DialogueDirector`.
pub struct DialogueDirectorBuilder {
    config: Option<DialogueConfig>,
    config_path: Option<String>,
    loader: Option<Box<dyn StoryLoader>>,
    presentation: Option<PresentationBundle>,
    audio: Option<Box<dyn AudioBackend>>,
    controller: Option<Box<dyn MotionController>>,
    camera: Option<Box<dyn CameraRig>>,
    focus: Option<Box<dyn FocusHost>>,
}

impl DialogueDirector {
    pub fn builder() -> DialogueDirectorBuilder {
        DialogueDirectorBuilder {
            config: None,
            config_path: None,
            loader: None,
            presentation: None,
            audio: None,
            controller: None,
            camera: None,
            focus: None,
        }
    }

    /// Start a conversation with `partner`.
    ///
    /// Rejected without side effects while another conversation runs, or
    /// when the partner's document is missing or unreadable. A document
    /// with nothing to show exits straight away.
    pub fn enter_dialogue(&mut self, partner: ConversationPartner) -> EnterOutcome {
        if let Some(active) = &self.session {
            debug!(partner = %partner.name, active = %active.partner, "dialogue already active");
            return EnterOutcome::AlreadyActive;
        }

        let ConversationPartner {
            name,
            document,
            portrait,
            audio,
            presentation,
        } = partner;

        let Some(document) = document else {
            warn!(partner = %name, "partner has no narrative document");
            return EnterOutcome::MissingDocument;
        };
        let interpreter = match self.loader.load(&document) {
            Ok(interpreter) => interpreter,
            Err(err) => {
                warn!(partner = %name, error = %err, "failed to load narrative document");
                return EnterOutcome::LoadFailed;
            }
        };

        let binding = presentation.and_then(|bundle| match self.stage.bind(bundle) {
            Ok(handle) => Some(handle),
            Err(err) => {
                warn!(partner = %name, error = %err, "custom presentation rejected, using default");
                None
            }
        });

        self.stage.clear_text();
        self.stage.hide_choices();
        self.stage.show();
        self.stage
            .render_portrait(portrait.as_ref(), self.config.portrait_bobbing);

        self.gate.arm(self.config.input_cooldown());
        self.audio
            .start(audio.intro.as_ref(), audio.loop_clip.as_ref());
        self.motion.take_control();
        self.activity.set(true);

        self.epoch += 1;
        info!(partner = %name, document = %document.name, "dialogue started");
        self.events.push(DialogueEvent::Entered {
            partner: name.clone(),
        });
        self.session = Some(Session {
            partner: name,
            outro: audio.outro,
            interpreter,
            state: SessionState::Advancing,
            waiting_for_advance: false,
            epoch: self.epoch,
            binding,
            auto_timer: None,
            choices_shown: 0,
        });

        self.advance();
        EnterOutcome::Started
    }

    /// Player asks for the next line. Accepted only while a plain line is
    /// waiting and the input gate is open.
    pub fn submit_advance(&mut self) -> bool {
        let Some(session) = &self.session else {
            return false;
        };
        if session.state != SessionState::AwaitingInput {
            debug!(state = ?session.state, "advance ignored");
            return false;
        }
        if !self.gate.accept() {
            debug!("advance dropped: input locked");
            return false;
        }
        self.advance();
        true
    }

    /// Player picks the choice shown in slot `index`.
    pub fn choose_option(&mut self, index: usize) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if session.state != SessionState::Choosing {
            debug!(state = ?session.state, index, "choice ignored");
            return false;
        }
        if self.gate.is_locked() {
            debug!(index, "choice dropped: input locked");
            return false;
        }
        if index >= session.choices_shown {
            warn!(
                partner = %session.partner,
                index,
                available = session.choices_shown,
                "choice index out of range"
            );
            return false;
        }

        self.gate.accept();
        session.interpreter.choose_choice_index(index);
        self.events.push(DialogueEvent::ChoiceMade { index });
        self.advance();
        true
    }

    /// Selection coming from a choice slot's attached trigger.
    pub fn trigger(&mut self, trigger: ChoiceTrigger) -> bool {
        self.choose_option(trigger.slot)
    }

    /// Advance every timer by one frame.
    pub fn tick(&mut self, dt: Duration) {
        self.gate.tick(dt);
        self.audio.tick(dt);

        for timer in self.timers.advance(dt) {
            match timer {
                SessionTimer::AutoAdvance { epoch } => {
                    if self.is_current(epoch, SessionState::AutoWaiting) {
                        if let Some(session) = self.session.as_mut() {
                            session.auto_timer = None;
                        }
                        self.advance();
                    } else {
                        debug!(epoch, "stale auto-advance");
                    }
                }
                SessionTimer::Teardown { epoch } => {
                    if self.is_current(epoch, SessionState::Exiting) {
                        self.teardown();
                    } else {
                        debug!(epoch, "stale teardown");
                    }
                }
            }
        }
    }

    pub fn state(&self) -> SessionState {
        self.session
            .as_ref()
            .map_or(SessionState::Idle, |s| s.state)
    }

    pub fn is_dialogue_active(&self) -> bool {
        self.session.is_some()
    }

    /// A shareable, read-only handle on [`is_dialogue_active`](Self::is_dialogue_active).
    pub fn activity(&self) -> DialogueActivity {
        DialogueActivity(Rc::clone(&self.activity))
    }

    pub fn is_input_locked(&self) -> bool {
        self.session.is_some() && self.gate.is_locked()
    }

    pub fn waiting_for_advance(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.waiting_for_advance)
    }

    pub fn partner(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.partner.as_str())
    }

    pub fn audio_phase(&self) -> AudioPhase {
        self.audio.phase()
    }

    pub fn is_default_presentation(&self) -> bool {
        self.stage.is_default_active()
    }

    pub fn motion_enabled(&self) -> bool {
        self.motion.controller_enabled()
    }

    pub fn config(&self) -> &DialogueConfig {
        &self.config
    }

    pub fn drain_events(&mut self) -> Vec<DialogueEvent> {
        std::mem::take(&mut self.events)
    }

    fn is_current(&self, epoch: u64, state: SessionState) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.epoch == epoch && s.state == state)
    }

    fn advance(&mut self) {
        let step = {
            let Some(session) = self.session.as_mut() else {
                return;
            };
            if session.state == SessionState::Exiting {
                return;
            }
            session.state = SessionState::Advancing;
            session.waiting_for_advance = false;
            session.choices_shown = 0;
            if let Some(timer) = session.auto_timer.take() {
                self.timers.cancel(timer);
            }

            let interpreter = &mut session.interpreter;
            let mut auto = false;
            let mut shown = false;
            if interpreter.can_continue() {
                let line = interpreter.continue_story();
                let tags = interpreter.current_tags();
                auto = is_auto_advance(&tags);
                shown = true;

                self.stage.render_line(&line);
                self.stage.hide_choices();

                let mut tags: Vec<String> = tags.into_iter().collect();
                tags.sort();
                debug!(partner = %session.partner, %line, ?tags, "line");
                self.events.push(DialogueEvent::LineShown { text: line, tags });
            }

            // A document may end right on a choice point: choices are still
            // offered even though nothing is left to continue.
            let choices = if auto {
                Vec::new()
            } else {
                interpreter.current_choices()
            };
            if auto {
                Step::Auto
            } else if !choices.is_empty() {
                Step::Choices(choices)
            } else if shown {
                Step::Await
            } else {
                Step::Exit
            }
        };

        match step {
            Step::Auto => self.wait_auto(),
            Step::Choices(choices) => self.show_choices(choices),
            Step::Await => self.set_state(SessionState::AwaitingInput),
            Step::Exit => self.exit(),
        }
    }

    fn wait_auto(&mut self) {
        let delay = self.config.sample_auto_delay(&mut self.rng);
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.state = SessionState::AutoWaiting;
        session.auto_timer = Some(self.timers.schedule(
            delay,
            SessionTimer::AutoAdvance {
                epoch: session.epoch,
            },
        ));
        debug!(?delay, "auto-advance scheduled");
    }

    fn show_choices(&mut self, choices: Vec<StoryChoice>) {
        let labels: Vec<String> = choices.into_iter().map(|c| c.text).collect();
        let render = self.stage.render_choices(&labels);

        let Some(session) = self.session.as_mut() else {
            return;
        };
        if render.dropped > 0 {
            warn!(
                partner = %session.partner,
                given = labels.len(),
                capacity = render.shown,
                "more choices than the UI can show"
            );
        }
        // Nothing the player could pick: leave rather than wait forever.
        if render.shown == 0 {
            self.exit();
            return;
        }
        session.state = SessionState::Choosing;
        session.choices_shown = render.shown;

        let mut labels = labels;
        labels.truncate(render.shown);
        self.events.push(DialogueEvent::ChoicesShown {
            labels,
            dropped: render.dropped,
        });
    }

    fn set_state(&mut self, state: SessionState) {
        if let Some(session) = self.session.as_mut() {
            session.state = state;
            session.waiting_for_advance = state == SessionState::AwaitingInput;
        }
    }

    fn exit(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.state == SessionState::Exiting {
            return;
        }
        session.state = SessionState::Exiting;
        session.waiting_for_advance = false;
        if let Some(timer) = session.auto_timer.take() {
            self.timers.cancel(timer);
        }

        self.audio.stop(session.outro.as_ref());
        self.timers.schedule(
            self.config.exit_delay(),
            SessionTimer::Teardown {
                epoch: session.epoch,
            },
        );
        debug!(partner = %session.partner, "dialogue exiting");
        self.events.push(DialogueEvent::Exiting);
    }

    fn teardown(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        self.stage.clear_text();
        self.stage.hide();
        if let Some(handle) = session.binding {
            self.stage.unbind(handle);
        }
        self.gate.release();
        self.activity.set(false);
        self.motion.release_control();

        info!(partner = %session.partner, "dialogue ended");
        self.events.push(DialogueEvent::Exited {
            partner: session.partner,
        });
    }
}

impl DialogueDirectorBuilder {
    pub fn config(mut self, config: DialogueConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Load the config from a RON file at build time. Takes precedence
    /// over [`config`](Self::config).
    pub fn config_file(mut self, path: &str) -> Self {
        self.config_path = Some(path.to_string());
        self
    }

    /// Defaults to [`ScriptLoader`].
    pub fn loader(mut self, loader: impl StoryLoader + 'static) -> Self {
        self.loader = Some(Box::new(loader));
        self
    }

    /// The process-wide default presentation.
    pub fn presentation(mut self, bundle: PresentationBundle) -> Self {
        self.presentation = Some(bundle);
        self
    }

    pub fn audio_backend(mut self, backend: impl AudioBackend + 'static) -> Self {
        self.audio = Some(Box::new(backend));
        self
    }

    pub fn motion_controller(mut self, controller: impl MotionController + 'static) -> Self {
        self.controller = Some(Box::new(controller));
        self
    }

    pub fn camera(mut self, camera: impl CameraRig + 'static) -> Self {
        self.camera = Some(Box::new(camera));
        self
    }

    pub fn focus_host(mut self, focus: impl FocusHost + 'static) -> Self {
        self.focus = Some(Box::new(focus));
        self
    }

    pub fn build(self) -> Result<DialogueDirector, BuildError> {
        let config = match self.config_path {
            Some(ref path) => DialogueConfig::load_from_ron(Path::new(path))?,
            None => {
                let config = self.config.unwrap_or_default();
                config.validate()?;
                config
            }
        };

        let motion = MotionHandoff::new(
            self.controller
                .unwrap_or_else(|| Box::new(Detached::default())),
            self.camera.unwrap_or_else(|| Box::new(Detached::default())),
            self.focus.unwrap_or_else(|| Box::new(Detached::default())),
            config.look_limit_degrees,
        );

        let stage = PresentationStage::new(self.presentation.unwrap_or_default());
        if stage.capacity() == 0 {
            warn!("default presentation has no choice slots; choice points will end the dialogue");
        }

        Ok(DialogueDirector {
            loader: self.loader.unwrap_or_else(|| Box::new(ScriptLoader)),
            stage,
            gate: InputGate::new(config.signal_debounce()),
            audio: AudioSequencer::new(
                self.audio.unwrap_or_else(|| Box::new(SilentBackend::default())),
            ),
            motion,
            timers: Scheduler::new(),
            rng: StdRng::seed_from_u64(config.seed),
            session: None,
            epoch: 0,
            activity: Rc::new(Cell::new(false)),
            events: Vec::new(),
            config,
        })
    }
}
