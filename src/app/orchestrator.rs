//! Upload / generate / result lifecycle as a pure state machine.
//!
//! [`StudioState`] is an immutable snapshot. Every transition borrows the
//! current snapshot and returns the next one, so rendering never mutates state
//! directly and the whole lifecycle can be exercised without a window.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::{
    CompositeImage, CompositeRequest, GENERATION_FAILED_MESSAGE, GenerationError,
    GenerationStatus, ImagePayload, ImageSlot, ModelRef, PreviewLease, SlotKind,
};

const DOWNLOAD_FILE_PREFIX: &str = "ai-rug-design";
const REQUEST_ID_PREFIX: &str = "roomrug-req";

/// Monotonic sequence number attached to one generation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GenerationTicket(u64);

impl GenerationTicket {
    pub fn value(self) -> u64 {
        self.0
    }
}

#[derive(Debug)]
pub struct TicketIssuer {
    next: AtomicU64,
}

impl TicketIssuer {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    pub fn issue(&self) -> GenerationTicket {
        GenerationTicket(self.next.fetch_add(1, Ordering::SeqCst))
    }
}

impl Default for TicketIssuer {
    fn default() -> Self {
        Self::new()
    }
}

/// Inputs captured when a generation starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationJob {
    pub ticket: GenerationTicket,
    pub scene: ImagePayload,
    pub rug: ImagePayload,
}

impl GenerationJob {
    pub fn request_id(&self) -> String {
        format!("{REQUEST_ID_PREFIX}-{}", self.ticket.value())
    }

    pub fn into_request(self, model: ModelRef, prompt: impl Into<String>) -> CompositeRequest {
        CompositeRequest {
            request_id: self.request_id(),
            model,
            scene: self.scene,
            rug: self.rug,
            prompt: prompt.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub file_name: String,
    pub image: CompositeImage,
}

pub fn download_file_name(unix_millis: i64) -> String {
    format!("{DOWNLOAD_FILE_PREFIX}-{unix_millis}.png")
}

#[derive(Debug, Clone, Default)]
pub struct StudioState {
    scene: ImageSlot,
    rug: ImageSlot,
    result: Option<CompositeImage>,
    status: GenerationStatus,
    error_message: Option<String>,
    active_ticket: Option<GenerationTicket>,
}

impl StudioState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scene(&self) -> &ImageSlot {
        &self.scene
    }

    pub fn rug(&self) -> &ImageSlot {
        &self.rug
    }

    pub fn slot(&self, kind: SlotKind) -> &ImageSlot {
        match kind {
            SlotKind::Scene => &self.scene,
            SlotKind::Rug => &self.rug,
        }
    }

    pub fn result(&self) -> Option<&CompositeImage> {
        self.result.as_ref()
    }

    pub fn status(&self) -> GenerationStatus {
        self.status
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn active_ticket(&self) -> Option<GenerationTicket> {
        self.active_ticket
    }

    /// Holds iff both slots carry a file, whatever the current status.
    pub fn can_generate(&self) -> bool {
        self.scene.file().is_some() && self.rug.file().is_some()
    }

    pub fn select_scene(&self, payload: ImagePayload, preview: PreviewLease) -> Self {
        self.select(SlotKind::Scene, payload, preview)
    }

    pub fn select_rug(&self, payload: ImagePayload, preview: PreviewLease) -> Self {
        self.select(SlotKind::Rug, payload, preview)
    }

    pub fn select(&self, kind: SlotKind, payload: ImagePayload, preview: PreviewLease) -> Self {
        let mut next = self.clone();
        match kind {
            SlotKind::Scene => next.scene = self.scene.select(payload, preview),
            SlotKind::Rug => next.rug = self.rug.select(payload, preview),
        }
        next
    }

    // Clearing an input never touches status, result or error message.
    pub fn clear_scene(&self) -> Self {
        self.clear(SlotKind::Scene)
    }

    pub fn clear_rug(&self) -> Self {
        self.clear(SlotKind::Rug)
    }

    pub fn clear(&self, kind: SlotKind) -> Self {
        let mut next = self.clone();
        match kind {
            SlotKind::Scene => next.scene = self.scene.clear(),
            SlotKind::Rug => next.rug = self.rug.clear(),
        }
        next
    }

    /// Enters `Loading` and hands back the job to run, or `None` when a slot is empty.
    pub fn begin_generation(&self, ticket: GenerationTicket) -> Option<(Self, GenerationJob)> {
        let (Some(scene), Some(rug)) = (self.scene.file(), self.rug.file()) else {
            return None;
        };

        let job = GenerationJob {
            ticket,
            scene: scene.clone(),
            rug: rug.clone(),
        };
        let next = Self {
            status: GenerationStatus::Loading,
            error_message: None,
            result: None,
            active_ticket: Some(ticket),
            ..self.clone()
        };
        Some((next, job))
    }

    pub fn is_current(&self, ticket: GenerationTicket) -> bool {
        self.active_ticket == Some(ticket)
    }

    /// Applies the outcome of `ticket`. Outcomes of superseded tickets are discarded.
    pub fn complete_generation(
        &self,
        ticket: GenerationTicket,
        outcome: Result<CompositeImage, GenerationError>,
    ) -> Self {
        if !self.is_current(ticket) {
            log::warn!(
                "discarding stale generation result: ticket={} active={:?}",
                ticket.value(),
                self.active_ticket.map(GenerationTicket::value)
            );
            return self.clone();
        }

        match outcome {
            Ok(image) => Self {
                status: GenerationStatus::Success,
                result: Some(image),
                error_message: None,
                active_ticket: None,
                ..self.clone()
            },
            Err(error) => {
                log::error!(
                    "generation failed: ticket={} {}",
                    ticket.value(),
                    error.diagnostic_message()
                );
                Self {
                    status: GenerationStatus::Error,
                    result: None,
                    error_message: Some(GENERATION_FAILED_MESSAGE.to_string()),
                    active_ticket: None,
                    ..self.clone()
                }
            }
        }
    }

    pub fn download_request(&self, unix_millis: i64) -> Option<DownloadRequest> {
        self.result.as_ref().map(|image| DownloadRequest {
            file_name: download_file_name(unix_millis),
            image: image.clone(),
        })
    }
}
