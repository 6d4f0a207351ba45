/// Audio sequencer — intro, loop and outro music around a conversation.

use std::time::Duration;
use tracing::debug;

use crate::core::scheduler::{Scheduler, TimerId};
use crate::schema::partner::AudioClip;

/// Handle to one playing clip, issued by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaybackId(pub u64);

/// The sound device the sequencer drives.
pub trait AudioBackend {
    fn play(&mut self, clip: &AudioClip, looping: bool) -> PlaybackId;
    fn stop(&mut self, playback: PlaybackId);
}

/// A backend that plays nothing. Used when the host has no audio.
#[derive(Debug, Default)]
pub struct SilentBackend {
    issued: u64,
}

impl AudioBackend for SilentBackend {
    fn play(&mut self, _clip: &AudioClip, _looping: bool) -> PlaybackId {
        self.issued += 1;
        PlaybackId(self.issued)
    }

    fn stop(&mut self, _playback: PlaybackId) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioPhase {
    Idle,
    PlayingIntro,
    Looping,
    PlayingOutro,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AudioCue {
    IntroFinished { sequence: u64 },
    OutroFinished { sequence: u64 },
}

/// Plays an intro clip to completion, then loops the background clip until
/// stopped, then plays an optional outro once.
///
/// Clip waits are timers on the sequencer's own clock, so text pacing is
/// never held up by music.
pub struct AudioSequencer {
    backend: Box<dyn AudioBackend>,
    phase: AudioPhase,
    timers: Scheduler<AudioCue>,
    pending_wait: Option<TimerId>,
    pending_loop: Option<AudioClip>,
    current: Option<PlaybackId>,
    sequence: u64,
}

impl AudioSequencer {
    pub fn new(backend: Box<dyn AudioBackend>) -> Self {
        Self {
            backend,
            phase: AudioPhase::Idle,
            timers: Scheduler::new(),
            pending_wait: None,
            pending_loop: None,
            current: None,
            sequence: 0,
        }
    }

    pub fn phase(&self) -> AudioPhase {
        self.phase
    }

    /// Begin a new sequence, cutting off whatever was playing.
    pub fn start(&mut self, intro: Option<&AudioClip>, loop_clip: Option<&AudioClip>) {
        self.halt();

        match intro {
            Some(intro) => {
                debug!(clip = %intro.name, "audio intro");
                self.current = Some(self.backend.play(intro, false));
                self.pending_loop = loop_clip.cloned();
                self.phase = AudioPhase::PlayingIntro;
                self.pending_wait = Some(self.timers.schedule(
                    intro.length(),
                    AudioCue::IntroFinished {
                        sequence: self.sequence,
                    },
                ));
            }
            None => self.begin_loop(loop_clip.cloned()),
        }
    }

    /// End the sequence: cancel a pending intro wait, stop the loop and play
    /// the outro once if there is one.
    pub fn stop(&mut self, outro: Option<&AudioClip>) {
        self.halt();

        if let Some(outro) = outro {
            debug!(clip = %outro.name, "audio outro");
            self.current = Some(self.backend.play(outro, false));
            self.phase = AudioPhase::PlayingOutro;
            self.pending_wait = Some(self.timers.schedule(
                outro.length(),
                AudioCue::OutroFinished {
                    sequence: self.sequence,
                },
            ));
        }
    }

    pub fn tick(&mut self, dt: Duration) {
        for cue in self.timers.advance(dt) {
            match cue {
                AudioCue::IntroFinished { sequence } if sequence == self.sequence => {
                    self.pending_wait = None;
                    if let Some(intro) = self.current.take() {
                        self.backend.stop(intro);
                    }
                    let next = self.pending_loop.take();
                    self.begin_loop(next);
                }
                AudioCue::OutroFinished { sequence } if sequence == self.sequence => {
                    self.pending_wait = None;
                    self.current = None;
                    self.phase = AudioPhase::Idle;
                }
                stale => debug!(?stale, "dropping stale audio cue"),
            }
        }
    }

    fn begin_loop(&mut self, loop_clip: Option<AudioClip>) {
        match loop_clip {
            Some(clip) => {
                debug!(clip = %clip.name, "audio loop");
                self.current = Some(self.backend.play(&clip, true));
                self.phase = AudioPhase::Looping;
            }
            None => self.phase = AudioPhase::Idle,
        }
    }

    /// Stop playback and invalidate every outstanding cue.
    fn halt(&mut self) {
        self.sequence += 1;
        if let Some(wait) = self.pending_wait.take() {
            self.timers.cancel(wait);
        }
        if let Some(playing) = self.current.take() {
            self.backend.stop(playing);
        }
        self.pending_loop = None;
        self.phase = AudioPhase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Play(String, bool),
        Stop(u64),
    }

    #[derive(Default, Clone)]
    struct Recorder {
        calls: Rc<RefCell<Vec<Call>>>,
        issued: Rc<RefCell<u64>>,
    }

    impl AudioBackend for Recorder {
        fn play(&mut self, clip: &AudioClip, looping: bool) -> PlaybackId {
            self.calls
                .borrow_mut()
                .push(Call::Play(clip.name.clone(), looping));
            let mut issued = self.issued.borrow_mut();
            *issued += 1;
            PlaybackId(*issued)
        }

        fn stop(&mut self, playback: PlaybackId) {
            self.calls.borrow_mut().push(Call::Stop(playback.0));
        }
    }

    fn setup() -> (AudioSequencer, Rc<RefCell<Vec<Call>>>) {
        let rec = Recorder::default();
        let calls = rec.calls.clone();
        (AudioSequencer::new(Box::new(rec)), calls)
    }

    fn secs(s: f32) -> Duration {
        Duration::from_secs_f32(s)
    }

    #[test]
    fn intro_then_loop() {
        let (mut seq, calls) = setup();
        let intro = AudioClip::new("intro", 2.0);
        let bg = AudioClip::new("bg", 10.0);

        seq.start(Some(&intro), Some(&bg));
        assert_eq!(seq.phase(), AudioPhase::PlayingIntro);

        seq.tick(secs(1.5));
        assert_eq!(seq.phase(), AudioPhase::PlayingIntro);

        seq.tick(secs(0.5));
        assert_eq!(seq.phase(), AudioPhase::Looping);
        assert_eq!(
            *calls.borrow(),
            vec![
                Call::Play("intro".into(), false),
                Call::Stop(1),
                Call::Play("bg".into(), true),
            ]
        );
    }

    #[test]
    fn loop_without_intro_starts_immediately() {
        let (mut seq, calls) = setup();
        seq.start(None, Some(&AudioClip::new("bg", 5.0)));
        assert_eq!(seq.phase(), AudioPhase::Looping);
        assert_eq!(*calls.borrow(), vec![Call::Play("bg".into(), true)]);
    }

    #[test]
    fn stop_during_intro_cancels_loop() {
        let (mut seq, calls) = setup();
        seq.start(
            Some(&AudioClip::new("intro", 2.0)),
            Some(&AudioClip::new("bg", 10.0)),
        );
        seq.stop(Some(&AudioClip::new("outro", 1.0)));
        assert_eq!(seq.phase(), AudioPhase::PlayingOutro);

        // The intro wait would have fired here.
        seq.tick(secs(2.5));
        assert_eq!(seq.phase(), AudioPhase::Idle);
        assert!(!calls
            .borrow()
            .iter()
            .any(|c| matches!(c, Call::Play(name, true) if name == "bg")));
    }

    #[test]
    fn outro_plays_once_then_idles() {
        let (mut seq, calls) = setup();
        seq.start(None, Some(&AudioClip::new("bg", 10.0)));
        seq.stop(Some(&AudioClip::new("outro", 1.0)));
        assert_eq!(
            calls.borrow().last(),
            Some(&Call::Play("outro".into(), false))
        );
        seq.tick(secs(1.0));
        assert_eq!(seq.phase(), AudioPhase::Idle);
    }

    #[test]
    fn restart_never_overlaps() {
        let (mut seq, calls) = setup();
        seq.start(None, Some(&AudioClip::new("first", 10.0)));
        seq.start(None, Some(&AudioClip::new("second", 10.0)));
        assert_eq!(
            *calls.borrow(),
            vec![
                Call::Play("first".into(), true),
                Call::Stop(1),
                Call::Play("second".into(), true),
            ]
        );
    }

    #[test]
    fn stop_without_outro_is_silent() {
        let (mut seq, _) = setup();
        seq.start(None, Some(&AudioClip::new("bg", 10.0)));
        seq.stop(None);
        assert_eq!(seq.phase(), AudioPhase::Idle);
    }

    #[test]
    fn empty_sequence_stays_idle() {
        let (mut seq, calls) = setup();
        seq.start(None, None);
        assert_eq!(seq.phase(), AudioPhase::Idle);
        assert!(calls.borrow().is_empty());
    }
}
