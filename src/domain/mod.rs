mod composite_contract;
mod errors;
mod image_slot;
mod preview;

pub use composite_contract::{
    CompositeImage, CompositeRequest, GenerationStatus, ModelRef, encode_base64,
};
pub use errors::{GENERATION_FAILED_MESSAGE, GenerationError, GenerationErrorCategory};
pub use image_slot::{ImagePayload, ImageSlot, SlotKind, SlotSelection};
pub use preview::{PreviewLease, PreviewReference, PreviewRegistry};
