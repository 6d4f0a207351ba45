/// Presentation binding — the UI surfaces receiving dialogue output.
///
/// A process-wide default binding lives for the whole game. A partner may
/// bring its own bundle, which replaces the default for one conversation
/// and is destroyed when that conversation ends.

use std::fmt;
use thiserror::Error;

use crate::schema::partner::Portrait;

/// Anything that can be shown, hidden and torn down.
pub trait Surface {
    fn set_visible(&mut self, visible: bool);

    /// Release the underlying UI element. Only called on surfaces owned by
    /// a session-scoped binding.
    fn destroy(&mut self) {}
}

pub trait TextSurface: Surface {
    fn set_text(&mut self, text: &str);
}

pub trait PortraitSurface: Surface {
    fn show_portrait(&mut self, portrait: &Portrait, bobbing: bool);
}

/// One selectable choice button.
pub trait ChoiceSlot: Surface {
    fn set_label(&mut self, label: &str);

    /// Called once at bind time. The slot keeps the trigger and reports it
    /// back when the player picks it.
    fn attach(&mut self, trigger: ChoiceTrigger);
}

/// Identifies the slot a selection came from. Each slot receives its own
/// trigger carrying a fixed index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChoiceTrigger {
    pub slot: usize,
}

/// Surfaces supplied by the caller, named by role.
#[derive(Default)]
pub struct PresentationBundle {
    pub panel: Option<Box<dyn Surface>>,
    pub text: Option<Box<dyn TextSurface>>,
    pub portrait: Option<Box<dyn PortraitSurface>>,
    pub choices: Vec<Box<dyn ChoiceSlot>>,
}

impl fmt::Debug for PresentationBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresentationBundle")
            .field("panel", &self.panel.is_some())
            .field("text", &self.text.is_some())
            .field("portrait", &self.portrait.is_some())
            .field("choices", &self.choices.len())
            .finish()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiscoveryError {
    #[error("presentation bundle has no text surface")]
    MissingText,
    #[error("presentation bundle has no choice slots")]
    NoChoiceSlots,
}

impl PresentationBundle {
    fn validate(&self) -> Result<(), DiscoveryError> {
        if self.text.is_none() {
            return Err(DiscoveryError::MissingText);
        }
        if self.choices.is_empty() {
            return Err(DiscoveryError::NoChoiceSlots);
        }
        Ok(())
    }
}

struct PresentationBinding {
    panel: Option<Box<dyn Surface>>,
    text: Option<Box<dyn TextSurface>>,
    portrait: Option<Box<dyn PortraitSurface>>,
    choices: Vec<Box<dyn ChoiceSlot>>,
    owns_lifetime: bool,
}

impl PresentationBinding {
    fn from_bundle(bundle: PresentationBundle, owns_lifetime: bool) -> Self {
        let mut choices = bundle.choices;
        for (slot, choice) in choices.iter_mut().enumerate() {
            choice.attach(ChoiceTrigger { slot });
        }
        Self {
            panel: bundle.panel,
            text: bundle.text,
            portrait: bundle.portrait,
            choices,
            owns_lifetime,
        }
    }

    fn set_visible(&mut self, visible: bool) {
        if let Some(panel) = self.panel.as_mut() {
            panel.set_visible(visible);
        }
        if let Some(text) = self.text.as_mut() {
            text.set_visible(visible);
        }
        if !visible {
            if let Some(portrait) = self.portrait.as_mut() {
                portrait.set_visible(false);
            }
            for choice in &mut self.choices {
                choice.set_visible(false);
            }
        }
    }

    fn destroy(mut self) {
        debug_assert!(self.owns_lifetime);
        for choice in &mut self.choices {
            choice.destroy();
        }
        if let Some(mut portrait) = self.portrait.take() {
            portrait.destroy();
        }
        if let Some(mut text) = self.text.take() {
            text.destroy();
        }
        if let Some(mut panel) = self.panel.take() {
            panel.destroy();
        }
    }
}

/// Proof that a custom binding is installed. Not clonable: handing it back
/// to [`PresentationStage::unbind`] is the only way to restore the default.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "dropping the handle leaves the custom binding installed"]
pub struct BindingHandle(u64);

/// Result of writing a choice set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChoiceRender {
    pub shown: usize,
    pub dropped: usize,
}

/// Owns the default binding and at most one custom binding, and routes
/// every write to whichever is active.
pub struct PresentationStage {
    default: PresentationBinding,
    custom: Option<(u64, PresentationBinding)>,
    next_handle: u64,
}

impl PresentationStage {
    /// The default bundle is installed as-is; missing surfaces simply make
    /// the matching writes no-ops.
    pub fn new(default: PresentationBundle) -> Self {
        let mut default = PresentationBinding::from_bundle(default, false);
        default.set_visible(false);
        Self {
            default,
            custom: None,
            next_handle: 0,
        }
    }

    /// Install a session-scoped bundle in place of the default.
    ///
    /// A bundle lacking a text surface or choice slots is rejected and its
    /// surfaces are destroyed; the default stays active.
    pub fn bind(&mut self, bundle: PresentationBundle) -> Result<BindingHandle, DiscoveryError> {
        if let Err(err) = bundle.validate() {
            PresentationBinding::from_bundle(bundle, true).destroy();
            return Err(err);
        }

        let binding = PresentationBinding::from_bundle(bundle, true);
        if let Some((_, previous)) = self.custom.take() {
            previous.destroy();
        }
        self.default.set_visible(false);

        self.next_handle += 1;
        self.custom = Some((self.next_handle, binding));
        Ok(BindingHandle(self.next_handle))
    }

    /// Tear down the custom binding and fall back to the default. A handle
    /// from an already-replaced binding is ignored.
    pub fn unbind(&mut self, handle: BindingHandle) {
        match self.custom.take() {
            Some((id, binding)) if id == handle.0 => {
                binding.destroy();
            }
            other => self.custom = other,
        }
    }

    pub fn is_default_active(&self) -> bool {
        self.custom.is_none()
    }

    pub fn capacity(&self) -> usize {
        self.active().choices.len()
    }

    pub fn show(&mut self) {
        self.active_mut().set_visible(true);
    }

    pub fn hide(&mut self) {
        self.active_mut().set_visible(false);
    }

    pub fn render_line(&mut self, line: &str) {
        if let Some(text) = self.active_mut().text.as_mut() {
            text.set_text(line);
        }
    }

    pub fn clear_text(&mut self) {
        self.render_line("");
    }

    /// Fill the first slots with `labels` and hide the rest. Labels beyond
    /// capacity are dropped and counted.
    pub fn render_choices<S: AsRef<str>>(&mut self, labels: &[S]) -> ChoiceRender {
        let slots = &mut self.active_mut().choices;
        let shown = labels.len().min(slots.len());

        for (slot, label) in slots.iter_mut().zip(labels) {
            slot.set_label(label.as_ref());
            slot.set_visible(true);
        }
        for slot in slots.iter_mut().skip(shown) {
            slot.set_visible(false);
        }

        ChoiceRender {
            shown,
            dropped: labels.len() - shown,
        }
    }

    pub fn hide_choices(&mut self) {
        for slot in &mut self.active_mut().choices {
            slot.set_visible(false);
        }
    }

    pub fn render_portrait(&mut self, portrait: Option<&Portrait>, bobbing: bool) {
        let Some(surface) = self.active_mut().portrait.as_mut() else {
            return;
        };
        match portrait {
            Some(portrait) => {
                surface.show_portrait(portrait, bobbing);
                surface.set_visible(true);
            }
            None => surface.set_visible(false),
        }
    }

    fn active(&self) -> &PresentationBinding {
        self.custom.as_ref().map_or(&self.default, |(_, b)| b)
    }

    fn active_mut(&mut self) -> &mut PresentationBinding {
        match self.custom.as_mut() {
            Some((_, binding)) => binding,
            None => &mut self.default,
        }
    }
}
