/// Dialogue Preview — play a RON script in the terminal.
///
/// Usage: dialogue_preview <script.ron> [--config <config.ron>] [--slots <n>]
///                         [--intro <secs>] [--loop] [--outro <secs>]
///
/// Controls:
///   <enter>   — advance a waiting line
///   <number>  — pick a choice (1-based)
///   quit      — leave the preview
///
/// Time is simulated at 60 frames per second and skipped forward whenever
/// the conversation is waiting on a timer, so auto-advancing lines play
/// without delay.

use dialogue_engine::core::audio::{AudioBackend, PlaybackId};
use dialogue_engine::core::config::DialogueConfig;
use dialogue_engine::core::director::{DialogueDirector, DialogueEvent, SessionState};
use dialogue_engine::core::presentation::{ChoiceSlot, ChoiceTrigger, PresentationBundle, Surface};
use dialogue_engine::schema::partner::{AudioClip, AudioSet, ConversationPartner};
use dialogue_engine::schema::story::StoryDocument;
use std::cell::RefCell;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process;
use std::rc::Rc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const FRAME: Duration = Duration::from_micros(16_667);
const MAX_IDLE_FRAMES: u32 = 60 * 60;

/// Typed choice numbers, in slot order, mapped to the trigger each slot
/// was given.
type Keypad = Rc<RefCell<Vec<ChoiceTrigger>>>;

/// A choice button; labels are printed from events.
struct ConsoleSlot {
    keypad: Keypad,
}

impl Surface for ConsoleSlot {
    fn set_visible(&mut self, _visible: bool) {}
}

impl ChoiceSlot for ConsoleSlot {
    fn set_label(&mut self, _label: &str) {}
    fn attach(&mut self, trigger: ChoiceTrigger) {
        self.keypad.borrow_mut().push(trigger);
    }
}

#[derive(Default)]
struct ConsoleAudio {
    issued: u64,
}

impl AudioBackend for ConsoleAudio {
    fn play(&mut self, clip: &AudioClip, looping: bool) -> PlaybackId {
        let mode = if looping { "looping" } else { "once" };
        println!("  ♪ {} ({})", clip.name, mode);
        self.issued += 1;
        PlaybackId(self.issued)
    }

    fn stop(&mut self, _playback: PlaybackId) {}
}

struct Options {
    script: String,
    config: Option<String>,
    slots: usize,
    audio: AudioSet,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    let options = parse_args(&args);

    let source = match std::fs::read_to_string(&options.script) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("ERROR: cannot read '{}': {}", options.script, e);
            process::exit(1);
        }
    };
    let name = Path::new(&options.script)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("script")
        .to_string();

    let config = match options.config {
        Some(ref path) => match DialogueConfig::load_from_ron(Path::new(path)) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("ERROR: {}", e);
                process::exit(1);
            }
        },
        None => DialogueConfig::default(),
    };

    let keypad = Keypad::default();
    let bundle = PresentationBundle {
        choices: (0..options.slots)
            .map(|_| {
                Box::new(ConsoleSlot {
                    keypad: Rc::clone(&keypad),
                }) as Box<dyn ChoiceSlot>
            })
            .collect(),
        ..PresentationBundle::default()
    };

    let mut director = match DialogueDirector::builder()
        .config(config)
        .presentation(bundle)
        .audio_backend(ConsoleAudio::default())
        .build()
    {
        Ok(d) => d,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            process::exit(1);
        }
    };

    let partner = ConversationPartner::new(name.clone())
        .with_document(StoryDocument::new(name, source))
        .with_audio(options.audio);
    director.enter_dialogue(partner);

    let stdin = io::stdin();
    let mut input = stdin.lock().lines();

    loop {
        settle(&mut director);
        print_events(&mut director);

        match director.state() {
            SessionState::Idle => break,
            SessionState::AwaitingInput => prompt("  [enter] "),
            SessionState::Choosing => prompt("  choose> "),
            _ => continue,
        }

        let Some(Ok(line)) = input.next() else {
            break;
        };
        let line = line.trim();
        if line == "quit" || line == "q" {
            break;
        }

        let accepted = match director.state() {
            SessionState::Choosing => match line.parse::<usize>() {
                Ok(n) if n > 0 => {
                    let trigger = keypad.borrow().get(n - 1).copied();
                    trigger.is_some_and(|t| director.trigger(t))
                }
                _ => {
                    println!("  (enter a choice number)");
                    true
                }
            },
            _ => director.submit_advance(),
        };
        if !accepted {
            println!("  (input not accepted yet)");
        }
    }

    println!("-- end --");
}

/// Run frames until the conversation needs the player, or has ended and
/// the music has finished.
fn settle(director: &mut DialogueDirector) {
    for _ in 0..MAX_IDLE_FRAMES {
        let waiting = matches!(
            director.state(),
            SessionState::AwaitingInput | SessionState::Choosing
        );
        if waiting && !director.is_input_locked() {
            return;
        }
        if director.state() == SessionState::Idle {
            return;
        }
        director.tick(FRAME);
    }
}

fn print_events(director: &mut DialogueDirector) {
    for event in director.drain_events() {
        match event {
            DialogueEvent::Entered { partner } => println!("== {} ==", partner),
            DialogueEvent::LineShown { text, tags } => {
                if tags.is_empty() {
                    println!("{}", text);
                } else {
                    println!("{}    #{}", text, tags.join(" #"));
                }
            }
            DialogueEvent::ChoicesShown { labels, dropped } => {
                for (i, label) in labels.iter().enumerate() {
                    println!("  {}) {}", i + 1, label);
                }
                if dropped > 0 {
                    println!("  ({} more choice(s) did not fit)", dropped);
                }
            }
            DialogueEvent::ChoiceMade { .. } | DialogueEvent::Exiting => {}
            DialogueEvent::Exited { partner } => println!("== {} leaves ==", partner),
        }
    }
}

fn prompt(text: &str) {
    print!("{}", text);
    let _ = io::stdout().flush();
}

fn parse_args(args: &[String]) -> Options {
    let mut options = Options {
        script: args[1].clone(),
        config: None,
        slots: 4,
        audio: AudioSet::default(),
    };

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--config" if i + 1 < args.len() => {
                i += 1;
                options.config = Some(args[i].clone());
            }
            "--slots" if i + 1 < args.len() => {
                i += 1;
                options.slots = args[i].parse().unwrap_or(4);
            }
            "--intro" if i + 1 < args.len() => {
                i += 1;
                let secs = args[i].parse().unwrap_or(2.0);
                options.audio.intro = Some(AudioClip::new("intro", secs));
            }
            "--loop" => {
                options.audio.loop_clip = Some(AudioClip::new("loop", 30.0));
            }
            "--outro" if i + 1 < args.len() => {
                i += 1;
                let secs = args[i].parse().unwrap_or(1.0);
                options.audio.outro = Some(AudioClip::new("outro", secs));
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                process::exit(1);
            }
        }
        i += 1;
    }

    options
}

fn print_usage() {
    println!("Dialogue Preview — play a RON script in the terminal");
    println!();
    println!("Usage: dialogue_preview <script.ron> [options]");
    println!();
    println!("Options:");
    println!("  --config <path>   Director config (RON)");
    println!("  --slots <n>       Number of choice buttons (default 4)");
    println!("  --intro <secs>    Play an intro clip of this length");
    println!("  --loop            Loop background music after the intro");
    println!("  --outro <secs>    Play an outro clip of this length on exit");
}
