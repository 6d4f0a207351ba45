use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use super::story::StoryDocument;
use crate::core::presentation::PresentationBundle;

/// A sound asset the audio backend already knows how to play, with its
/// playback length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioClip {
    pub name: String,
    pub length_secs: f32,
}

impl AudioClip {
    pub fn new(name: impl Into<String>, length_secs: f32) -> Self {
        Self {
            name: name.into(),
            length_secs,
        }
    }

    /// Playback length; negative or NaN lengths count as zero.
    pub fn length(&self) -> Duration {
        Duration::try_from_secs_f32(self.length_secs).unwrap_or(Duration::ZERO)
    }
}

/// The three-phase music set played around a conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioSet {
    #[serde(default)]
    pub intro: Option<AudioClip>,
    #[serde(default, rename = "loop")]
    pub loop_clip: Option<AudioClip>,
    #[serde(default)]
    pub outro: Option<AudioClip>,
}

impl AudioSet {
    pub fn is_empty(&self) -> bool {
        self.intro.is_none() && self.loop_clip.is_none() && self.outro.is_none()
    }
}

/// Portrait image reference shown next to the dialogue text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Portrait {
    pub image: String,
}

/// Serializable description of a partner, minus any custom presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartnerProfile {
    pub name: String,
    #[serde(default)]
    pub document: Option<StoryDocument>,
    #[serde(default)]
    pub portrait: Option<Portrait>,
    #[serde(default)]
    pub audio: AudioSet,
}

/// Someone (or something) the player can talk to.
///
/// Handed to the director by value; it stays untouched for the whole
/// session apart from the presentation bundle, which the director takes
/// ownership of.
pub struct ConversationPartner {
    pub name: String,
    pub document: Option<StoryDocument>,
    pub portrait: Option<Portrait>,
    pub audio: AudioSet,
    pub presentation: Option<PresentationBundle>,
}

impl ConversationPartner {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            document: None,
            portrait: None,
            audio: AudioSet::default(),
            presentation: None,
        }
    }

    pub fn with_document(mut self, document: StoryDocument) -> Self {
        self.document = Some(document);
        self
    }

    pub fn with_portrait(mut self, image: impl Into<String>) -> Self {
        self.portrait = Some(Portrait {
            image: image.into(),
        });
        self
    }

    pub fn with_audio(mut self, audio: AudioSet) -> Self {
        self.audio = audio;
        self
    }

    pub fn with_presentation(mut self, bundle: PresentationBundle) -> Self {
        self.presentation = Some(bundle);
        self
    }
}

impl From<PartnerProfile> for ConversationPartner {
    fn from(profile: PartnerProfile) -> Self {
        Self {
            name: profile.name,
            document: profile.document,
            portrait: profile.portrait,
            audio: profile.audio,
            presentation: None,
        }
    }
}

impl fmt::Debug for ConversationPartner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversationPartner")
            .field("name", &self.name)
            .field("document", &self.document.as_ref().map(|d| &d.name))
            .field("portrait", &self.portrait)
            .field("audio", &self.audio)
            .field("custom_presentation", &self.presentation.is_some())
            .finish()
    }
}
