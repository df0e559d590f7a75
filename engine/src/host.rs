//! The abstract host surface.
//!
//! The engine never talks to a concrete input-method framework. After each
//! key event it leaves its visible state in a [`HostContext`]; the platform
//! glue reads the context and maps it onto whatever wire protocol it
//! speaks. Inbound host signals (focus, surrounding text, properties) are
//! methods on the engine itself.

use typebooster_core::keymap::KeyEvent;

/// One candidate as shown to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayCandidate {
    pub text: String,
    /// Short annotation: emoji name, code point, remaining compose keys.
    pub annotation: Option<String>,
    /// Came from the user database, so it can be deleted from the list.
    pub deletable: bool,
}

/// Surrounding text as reported by the host.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurroundingText {
    pub text: String,
    /// Cursor position in characters.
    pub cursor: usize,
    pub anchor: usize,
}

/// A user-visible property the host may render as a menu/status item.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub key: &'static str,
    pub label: String,
    pub state: bool,
}

/// Everything the host needs to render after one event.
///
/// `commit_text`, `forwarded` and `delete_surrounding` are per-event and
/// cleared when the next event starts; the rest is current state.
#[derive(Debug, Clone, Default)]
pub struct HostContext {
    pub commit_text: String,
    pub preedit_text: String,
    pub preedit_cursor: usize,
    pub preedit_visible: bool,
    pub candidates: Vec<DisplayCandidate>,
    pub candidate_cursor: Option<usize>,
    pub candidates_visible: bool,
    pub auxiliary_text: String,
    pub auxiliary_visible: bool,
    /// Key events the engine did not consume, in order.
    pub forwarded: Vec<KeyEvent>,
    /// Delete n characters starting at a character offset relative to the
    /// cursor (negative is before it).
    pub delete_surrounding: Option<(i64, usize)>,
    /// One-shot user notices (database quarantine and the like).
    pub notices: Vec<String>,
    pub properties: Vec<Property>,
}

impl HostContext {
    /// Reset the per-event outputs; called at the start of each key event.
    pub fn clear_transient(&mut self) {
        self.commit_text.clear();
        self.forwarded.clear();
        self.delete_surrounding = None;
    }

    pub fn clear_all(&mut self) {
        *self = HostContext {
            notices: std::mem::take(&mut self.notices),
            ..HostContext::default()
        };
    }
}
