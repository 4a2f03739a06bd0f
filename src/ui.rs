//! UI surface the submission handler drives.
//!
//! The handler never looks elements up by id; it receives a
//! [`ResultsView`] at construction and mutates only through it.
//! [`MemoryView`] is a complete in-process implementation used by the CLI
//! and by tests.

use std::sync::{Mutex, MutexGuard};

/// Fixed user-facing message for any failed attempt.
pub const ERROR_NOTICE_TEXT: &str = "Erro ao carregar. Tente novamente mais tarde";

/// Class attached to error notice nodes.
pub const ERROR_NOTICE_CLASS: &str = "error";

/// A visible error node appended to the results container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorNotice {
    pub class: String,
    pub text: String,
}

impl Default for ErrorNotice {
    fn default() -> Self {
        Self {
            class: ERROR_NOTICE_CLASS.to_string(),
            text: ERROR_NOTICE_TEXT.to_string(),
        }
    }
}

/// Handles onto the elements a submission touches: the loading indicator,
/// the result-value element, the results visibility toggle and the results
/// container.
pub trait ResultsView: Send + Sync {
    fn set_loading(&self, visible: bool);

    /// Replace the text of the result-value element.
    fn set_result_text(&self, text: &str);

    fn set_results_visible(&self, visible: bool);

    /// Append to the results container without touching existing content.
    fn append_error(&self, notice: ErrorNotice);

    fn scroll_results_into_view(&self) {}
}

/// A child of the results container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultsNode {
    Text { text: String },
    Error(ErrorNotice),
}

/// Snapshot of everything the view holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UiState {
    pub loading: bool,
    pub results_visible: bool,
    pub result_text: String,
    pub results_children: Vec<ResultsNode>,
    pub loading_shown: usize,
    pub loading_hidden: usize,
    pub scrolled: usize,
}

impl UiState {
    pub fn error_present(&self) -> bool {
        self.results_children
            .iter()
            .any(|n| matches!(n, ResultsNode::Error(_)))
    }

    pub fn error_count(&self) -> usize {
        self.results_children
            .iter()
            .filter(|n| matches!(n, ResultsNode::Error(_)))
            .count()
    }
}

/// Mutex-backed view. Every mutation is one short critical section.
#[derive(Debug, Default)]
pub struct MemoryView {
    state: Mutex<UiState>,
}

impl MemoryView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with existing content already in the results container.
    pub fn with_children(children: Vec<ResultsNode>) -> Self {
        Self {
            state: Mutex::new(UiState {
                results_children: children,
                ..UiState::default()
            }),
        }
    }

    pub fn snapshot(&self) -> UiState {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, UiState> {
        // A panic in another holder leaves plain data behind; keep going.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ResultsView for MemoryView {
    fn set_loading(&self, visible: bool) {
        let mut state = self.lock();
        state.loading = visible;
        if visible {
            state.loading_shown += 1;
        } else {
            state.loading_hidden += 1;
        }
    }

    fn set_result_text(&self, text: &str) {
        self.lock().result_text = text.to_string();
    }

    fn set_results_visible(&self, visible: bool) {
        self.lock().results_visible = visible;
    }

    fn append_error(&self, notice: ErrorNotice) {
        self.lock().results_children.push(ResultsNode::Error(notice));
    }

    fn scroll_results_into_view(&self) {
        self.lock().scrolled += 1;
    }
}
