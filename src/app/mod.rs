mod download;
mod generation_job_manager;
mod generation_service;
mod image_selection;
mod orchestrator;

pub use download::{Clock, DownloadError, DownloadUseCase};
pub use generation_job_manager::{
    CompositeSettings, GenerationJobManager, GenerationJobState, GenerationJobUpdate,
};
pub use generation_service::GenerationService;
pub use image_selection::{
    FileImageLoader, ImageFileLoader, ImageSelectionUseCase, SelectImageCommand,
    SelectImageError, SelectImageOutcome,
};
pub use orchestrator::{
    DownloadRequest, GenerationJob, GenerationTicket, StudioState, TicketIssuer,
    download_file_name,
};
