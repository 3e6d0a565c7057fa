use roomrug::app::{SelectImageError, StudioState};
use roomrug::domain::{GenerationStatus, SlotKind};

use super::{GENERATE_LABEL, GENERATING_LABEL};

/// What the right-hand pane shows for a given snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ResultPane {
    Loading,
    Placeholder,
    Image,
    /// Finished without an image to show; the error banner explains why.
    Empty,
}

pub(super) fn result_pane(state: &StudioState) -> ResultPane {
    if state.status() == GenerationStatus::Loading {
        ResultPane::Loading
    } else if state.result().is_some() {
        ResultPane::Image
    } else if state.status() == GenerationStatus::Idle {
        ResultPane::Placeholder
    } else {
        ResultPane::Empty
    }
}

pub(super) fn generate_button_label(status: GenerationStatus) -> &'static str {
    if status == GenerationStatus::Loading {
        GENERATING_LABEL
    } else {
        GENERATE_LABEL
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct SlotErrorState {
    pub(super) slot: SlotKind,
    pub(super) message: String,
}

impl SlotErrorState {
    pub(super) fn new(slot: SlotKind, message: impl Into<String>) -> Self {
        Self {
            slot,
            message: message.into(),
        }
    }

    pub(super) fn from_select_error(slot: SlotKind, error: &SelectImageError) -> Self {
        Self::new(slot, error.user_message())
    }
}
