use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reserved line tag: display the line, wait, then continue on its own.
pub const AUTO_TAG: &str = "auto";

/// A compiled narrative document, already loaded into memory.
///
/// The engine never looks inside `source`; it hands the document to a
/// [`StoryLoader`] which produces a running interpreter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryDocument {
    pub name: String,
    pub source: String,
}

impl StoryDocument {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }
}

/// A choice offered by the interpreter at the current position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryChoice {
    pub text: String,
}

#[derive(Debug, Error)]
pub enum StoryError {
    #[error("document '{0}' is empty")]
    EmptyDocument(String),
    #[error("document '{name}' could not be parsed: {reason}")]
    Malformed { name: String, reason: String },
}

/// A running narrative interpreter over one document.
///
/// Mirrors the primitives of an Ink-style story runtime: lines are pulled
/// with [`continue_story`](Self::continue_story) while
/// [`can_continue`](Self::can_continue) holds, after which any pending
/// choices are exposed and resolved with
/// [`choose_choice_index`](Self::choose_choice_index).
pub trait NarrativeInterpreter {
    fn can_continue(&self) -> bool;

    /// Produce the next line of text and advance past it.
    fn continue_story(&mut self) -> String;

    /// Tags attached to the most recently produced line.
    fn current_tags(&self) -> FxHashSet<String>;

    fn current_choices(&self) -> Vec<StoryChoice>;

    /// Resolve a pending choice. `index` must be below
    /// `current_choices().len()`.
    fn choose_choice_index(&mut self, index: usize);
}

/// Creates interpreters from documents.
pub trait StoryLoader {
    fn load(&self, document: &StoryDocument) -> Result<Box<dyn NarrativeInterpreter>, StoryError>;
}

/// Returns true if the tag set marks a line for timed auto-advance.
pub fn is_auto_advance(tags: &FxHashSet<String>) -> bool {
    tags.contains(AUTO_TAG)
}
