//! Dialogue Engine — conversation orchestration for narrative games.
//!
//! Runs one branching conversation at a time on top of an Ink-style story
//! interpreter: paces lines with manual, timed and choice-driven
//! advancement, renders through a swappable set of UI surfaces, sequences
//! intro/loop/outro music, and hands player movement control over for the
//! length of the conversation.

pub mod core;
pub mod schema;
