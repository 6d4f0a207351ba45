/// RON-authored branching scripts and an interpreter that runs them.
///
/// A script is a set of named knots. Each knot holds lines, then either a
/// set of choices or a `next` knot to flow into. Lines carry inline tags
/// the way Ink does: `"We should go. #auto #speaker:mara"`.

use rustc_hash::FxHashSet;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::schema::story::{
    NarrativeInterpreter, StoryChoice, StoryDocument, StoryError, StoryLoader,
};

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("start knot '{0}' is not defined")]
    UnknownStart(String),
}

/// One line of text and the tags written after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptLine {
    pub text: String,
    pub tags: FxHashSet<String>,
}

impl ScriptLine {
    /// Split `"text #tag1 #tag2"` into text and tags.
    pub fn parse(raw: &str) -> ScriptLine {
        let mut parts = raw.split('#');
        let text = parts.next().unwrap_or_default().trim().to_string();
        let tags = parts
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        ScriptLine { text, tags }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptChoice {
    pub text: String,
    /// Knot to jump to. `None` ends the story.
    pub divert: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Knot {
    pub name: String,
    pub lines: Vec<ScriptLine>,
    pub choices: Vec<ScriptChoice>,
    pub next: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub start: String,
    pub knots: HashMap<String, Knot>,
}

// On-disk shape; converted into the types above after parsing.

#[derive(Debug, Deserialize)]
#[serde(rename = "Choice")]
struct RonChoice {
    text: String,
    #[serde(default)]
    divert: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename = "Knot")]
struct RonKnot {
    #[serde(default)]
    lines: Vec<String>,
    #[serde(default)]
    choices: Vec<RonChoice>,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename = "Script")]
struct RonScript {
    start: String,
    knots: HashMap<String, RonKnot>,
}

impl Script {
    pub fn load_from_ron(path: &Path) -> Result<Script, ScriptError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<Script, ScriptError> {
        let raw: RonScript = ron::from_str(input)?;
        if !raw.knots.contains_key(&raw.start) {
            return Err(ScriptError::UnknownStart(raw.start));
        }

        let knots = raw
            .knots
            .into_iter()
            .map(|(name, knot)| {
                let knot = Knot {
                    name: name.clone(),
                    lines: knot.lines.iter().map(|l| ScriptLine::parse(l)).collect(),
                    choices: knot
                        .choices
                        .into_iter()
                        .map(|c| ScriptChoice {
                            text: c.text,
                            divert: c.divert,
                        })
                        .collect(),
                    next: knot.next,
                };
                (name, knot)
            })
            .collect();

        Ok(Script {
            start: raw.start,
            knots,
        })
    }

    pub fn knot(&self, name: &str) -> Option<&Knot> {
        self.knots.get(name)
    }
}

/// Interpreter position within a [`Script`].
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    script: Script,
    knot: Option<String>,
    line: usize,
    tags: FxHashSet<String>,
}

impl ScriptRunner {
    pub fn new(script: Script) -> Self {
        let start = script.start.clone();
        let mut runner = Self {
            script,
            knot: None,
            line: 0,
            tags: FxHashSet::default(),
        };
        runner.enter(Some(start));
        runner
    }

    /// Name of the knot being read, or `None` once the story has ended.
    pub fn current_knot(&self) -> Option<&str> {
        self.knot.as_deref()
    }

    fn current(&self) -> Option<&Knot> {
        self.knot.as_deref().and_then(|name| self.script.knot(name))
    }

    fn lines_exhausted(&self) -> bool {
        self.current().map_or(true, |k| self.line >= k.lines.len())
    }

    /// Jump to `target`, then follow `next` links through knots that have
    /// nothing left to say. Each knot is visited at most once per call so
    /// an empty cycle ends the story instead of spinning.
    fn enter(&mut self, target: Option<String>) {
        self.knot = target;
        self.line = 0;

        let mut visited = FxHashSet::default();
        while let Some(name) = self.knot.clone() {
            let Some(knot) = self.script.knot(&name) else {
                debug!(knot = %name, "divert to unknown knot ends the story");
                self.knot = None;
                break;
            };
            if self.line < knot.lines.len() || !knot.choices.is_empty() {
                break;
            }
            if !visited.insert(name) {
                self.knot = None;
                break;
            }
            self.knot = knot.next.clone();
            self.line = 0;
        }
    }
}

impl NarrativeInterpreter for ScriptRunner {
    fn can_continue(&self) -> bool {
        !self.lines_exhausted()
    }

    fn continue_story(&mut self) -> String {
        let Some(line) = self
            .current()
            .and_then(|k| k.lines.get(self.line))
            .cloned()
        else {
            self.tags.clear();
            return String::new();
        };

        self.line += 1;
        self.tags = line.tags;

        if self.lines_exhausted() {
            let follow = self
                .current()
                .filter(|k| k.choices.is_empty())
                .map(|k| k.next.clone());
            if let Some(next) = follow {
                self.enter(next);
            }
        }

        line.text
    }

    fn current_tags(&self) -> FxHashSet<String> {
        self.tags.clone()
    }

    fn current_choices(&self) -> Vec<StoryChoice> {
        if !self.lines_exhausted() {
            return Vec::new();
        }
        self.current()
            .map(|k| {
                k.choices
                    .iter()
                    .map(|c| StoryChoice {
                        text: c.text.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn choose_choice_index(&mut self, index: usize) {
        let divert = self
            .current()
            .filter(|_| self.lines_exhausted())
            .and_then(|k| k.choices.get(index))
            .map(|c| c.divert.clone());

        match divert {
            Some(target) => {
                self.tags.clear();
                self.enter(target);
            }
            None => debug!(index, "no such choice at current position"),
        }
    }
}

/// [`StoryLoader`] for documents whose source is a RON script.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptLoader;

impl StoryLoader for ScriptLoader {
    fn load(&self, document: &StoryDocument) -> Result<Box<dyn NarrativeInterpreter>, StoryError> {
        if document.source.trim().is_empty() {
            return Err(StoryError::EmptyDocument(document.name.clone()));
        }
        let script = Script::parse_ron(&document.source).map_err(|e| StoryError::Malformed {
            name: document.name.clone(),
            reason: e.to_string(),
        })?;
        Ok(Box::new(ScriptRunner::new(script)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GREETING: &str = r#"Script(
        start: "hello",
        knots: {
            "hello": Knot(
                lines: ["Hello", "Pick one"],
                choices: [
                    Choice(text: "Yes", divert: Some("yes")),
                    Choice(text: "No"),
                ],
            ),
            "yes": Knot(
                lines: ["Good. #auto", "Follow me."],
                next: Some("farewell"),
            ),
            "farewell": Knot(lines: ["Bye #speaker:warden #mood:calm"]),
        },
    )"#;

    fn runner(src: &str) -> ScriptRunner {
        ScriptRunner::new(Script::parse_ron(src).unwrap())
    }

    #[test]
    fn parse_inline_tags() {
        let line = ScriptLine::parse("  Run!  #auto #speaker:mara ");
        assert_eq!(line.text, "Run!");
        assert_eq!(line.tags.len(), 2);
        assert!(line.tags.contains("auto"));
        assert!(line.tags.contains("speaker:mara"));
    }

    #[test]
    fn parse_line_without_tags() {
        let line = ScriptLine::parse("Just words.");
        assert_eq!(line.text, "Just words.");
        assert!(line.tags.is_empty());
    }

    #[test]
    fn unknown_start_is_rejected() {
        let err = Script::parse_ron(r#"Script(start: "nowhere", knots: {})"#).unwrap_err();
        assert!(matches!(err, ScriptError::UnknownStart(s) if s == "nowhere"));
    }

    #[test]
    fn choices_appear_after_lines() {
        let mut r = runner(GREETING);
        assert!(r.can_continue());
        assert_eq!(r.continue_story(), "Hello");
        assert!(r.current_choices().is_empty());
        assert_eq!(r.continue_story(), "Pick one");
        assert!(!r.can_continue());
        let labels: Vec<_> = r.current_choices().into_iter().map(|c| c.text).collect();
        assert_eq!(labels, vec!["Yes", "No"]);
    }

    #[test]
    fn divert_and_follow_next() {
        let mut r = runner(GREETING);
        r.continue_story();
        r.continue_story();
        r.choose_choice_index(0);
        assert_eq!(r.continue_story(), "Good.");
        assert!(r.current_tags().contains("auto"));
        assert_eq!(r.continue_story(), "Follow me.");
        assert_eq!(r.current_knot(), Some("farewell"));
        assert_eq!(r.continue_story(), "Bye");
        assert!(r.current_tags().contains("mood:calm"));
        assert!(!r.can_continue());
        assert!(r.current_choices().is_empty());
    }

    #[test]
    fn choice_without_divert_ends() {
        let mut r = runner(GREETING);
        r.continue_story();
        r.continue_story();
        r.choose_choice_index(1);
        assert!(!r.can_continue());
        assert!(r.current_choices().is_empty());
        assert_eq!(r.current_knot(), None);
    }

    #[test]
    fn out_of_range_choice_is_ignored() {
        let mut r = runner(GREETING);
        r.continue_story();
        r.continue_story();
        r.choose_choice_index(9);
        assert_eq!(r.current_choices().len(), 2);
    }

    #[test]
    fn choose_before_choices_are_visible_does_nothing() {
        let mut r = runner(GREETING);
        r.choose_choice_index(0);
        assert_eq!(r.continue_story(), "Hello");
    }

    #[test]
    fn empty_knot_cycle_terminates() {
        let mut r = runner(
            r#"Script(
                start: "a",
                knots: {
                    "a": Knot(next: Some("b")),
                    "b": Knot(next: Some("a")),
                },
            )"#,
        );
        assert!(!r.can_continue());
        assert!(r.current_choices().is_empty());
        assert_eq!(r.continue_story(), "");
    }

    #[test]
    fn dangling_divert_ends_story() {
        let mut r = runner(
            r#"Script(
                start: "a",
                knots: {
                    "a": Knot(choices: [Choice(text: "Go", divert: Some("missing"))]),
                },
            )"#,
        );
        assert!(!r.can_continue());
        r.choose_choice_index(0);
        assert_eq!(r.current_knot(), None);
    }

    #[test]
    fn loader_rejects_empty_and_malformed() {
        let loader = ScriptLoader;
        assert!(matches!(
            loader.load(&StoryDocument::new("blank", "  ")),
            Err(StoryError::EmptyDocument(_))
        ));
        assert!(matches!(
            loader.load(&StoryDocument::new("junk", "not ron")),
            Err(StoryError::Malformed { .. })
        ));
        assert!(loader.load(&StoryDocument::new("ok", GREETING)).is_ok());
    }
}
