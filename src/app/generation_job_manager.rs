use std::any::Any;
use std::collections::{BTreeMap, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;

use crate::domain::{CompositeImage, GenerationError, ModelRef};
use crate::infra::gemini::{DEFAULT_COMPOSITE_PROMPT, DEFAULT_GEMINI_MODEL};

use super::GenerationService;
use super::orchestrator::{GenerationJob, GenerationTicket};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeSettings {
    pub model: ModelRef,
    pub prompt: String,
}

impl Default for CompositeSettings {
    fn default() -> Self {
        Self {
            model: ModelRef::new("gemini", DEFAULT_GEMINI_MODEL),
            prompt: DEFAULT_COMPOSITE_PROMPT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerationJobState {
    #[default]
    Idle,
    Running,
    Succeeded,
    Failed,
    /// A newer job was submitted before this one finished; its outcome is dropped.
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationJobUpdate {
    pub ticket: GenerationTicket,
    pub request_id: String,
    pub state: GenerationJobState,
    pub result: Option<CompositeImage>,
    pub error: Option<GenerationError>,
}

impl GenerationJobUpdate {
    fn running(ticket: GenerationTicket, request_id: String) -> Self {
        Self {
            ticket,
            request_id,
            state: GenerationJobState::Running,
            result: None,
            error: None,
        }
    }

    fn succeeded(ticket: GenerationTicket, request_id: String, result: CompositeImage) -> Self {
        Self {
            ticket,
            request_id,
            state: GenerationJobState::Succeeded,
            result: Some(result),
            error: None,
        }
    }

    fn failed(ticket: GenerationTicket, request_id: String, error: GenerationError) -> Self {
        Self {
            ticket,
            request_id,
            state: GenerationJobState::Failed,
            result: None,
            error: Some(error),
        }
    }

    fn superseded(ticket: GenerationTicket, request_id: String) -> Self {
        Self {
            ticket,
            request_id,
            state: GenerationJobState::Superseded,
            result: None,
            error: None,
        }
    }

    /// Converts a finished update into the outcome the studio state consumes.
    pub fn outcome(&self) -> Option<Result<CompositeImage, GenerationError>> {
        match self.state {
            GenerationJobState::Succeeded => self.result.clone().map(Ok),
            GenerationJobState::Failed => Some(Err(self
                .error
                .clone()
                .unwrap_or_else(|| GenerationError::internal("failed job carried no error")))),
            _ => None,
        }
    }
}

/// Runs composite calls off the UI thread.
///
/// Every submitted job gets its own provider call, so a second click while a
/// call is in flight issues a second request. Only the most recently submitted
/// ticket may report `Succeeded` or `Failed`; older completions are reported as
/// `Superseded`.
pub struct GenerationJobManager {
    command_tx: mpsc::Sender<WorkerMessage>,
    shared: Arc<Mutex<SharedState>>,
    worker_handle: Mutex<Option<thread::JoinHandle<()>>>,
}

impl GenerationJobManager {
    pub fn new(
        service: GenerationService,
        settings: CompositeSettings,
    ) -> Result<Self, GenerationError> {
        let shared = Arc::new(Mutex::new(SharedState::default()));
        let (command_tx, command_rx) = mpsc::channel();
        let worker_tx = command_tx.clone();
        let worker_shared = Arc::clone(&shared);

        let handle = thread::Builder::new()
            .name("roomrug-generation-worker".to_string())
            .spawn(move || worker_loop(service, settings, command_rx, worker_tx, worker_shared))
            .map_err(|error| {
                GenerationError::internal(format!(
                    "failed to start generation worker thread: {error}"
                ))
            })?;

        Ok(Self {
            command_tx,
            shared,
            worker_handle: Mutex::new(Some(handle)),
        })
    }

    pub fn submit(&self, job: GenerationJob) -> Result<GenerationTicket, GenerationError> {
        let ticket = job.ticket;
        self.command_tx
            .send(WorkerMessage::Start { job })
            .map_err(|error| {
                GenerationError::internal(format!(
                    "failed to submit generation job to worker queue: {error}"
                ))
            })?;
        Ok(ticket)
    }

    pub fn state(&self) -> GenerationJobState {
        self.shared
            .lock()
            .expect("generation job state lock poisoned")
            .state
    }

    pub fn latest_update(&self) -> Option<GenerationJobUpdate> {
        self.shared
            .lock()
            .expect("generation job state lock poisoned")
            .latest
            .clone()
    }

    pub fn drain_updates(&self) -> Vec<GenerationJobUpdate> {
        let mut shared = self
            .shared
            .lock()
            .expect("generation job state lock poisoned");
        shared.updates.drain(..).collect()
    }
}

impl Drop for GenerationJobManager {
    fn drop(&mut self) {
        let _ = self.command_tx.send(WorkerMessage::Shutdown);

        if let Some(handle) = self
            .worker_handle
            .lock()
            .expect("generation worker handle lock poisoned")
            .take()
        {
            let _ = handle.join();
        }
    }
}

#[derive(Default)]
struct SharedState {
    state: GenerationJobState,
    latest: Option<GenerationJobUpdate>,
    updates: VecDeque<GenerationJobUpdate>,
}

enum WorkerMessage {
    Start {
        job: GenerationJob,
    },
    Completion {
        ticket: GenerationTicket,
        request_id: String,
        result: Result<CompositeImage, GenerationError>,
    },
    Shutdown,
}

fn worker_loop(
    service: GenerationService,
    settings: CompositeSettings,
    command_rx: mpsc::Receiver<WorkerMessage>,
    command_tx: mpsc::Sender<WorkerMessage>,
    shared: Arc<Mutex<SharedState>>,
) {
    let mut in_flight: BTreeMap<GenerationTicket, thread::JoinHandle<()>> = BTreeMap::new();
    let mut latest_ticket: Option<GenerationTicket> = None;
    let mut shutdown_requested = false;

    while let Ok(message) = command_rx.recv() {
        match message {
            WorkerMessage::Start { job } => {
                let ticket = job.ticket;
                let request = job.into_request(settings.model.clone(), settings.prompt.clone());

                if shutdown_requested {
                    push_update(
                        &shared,
                        GenerationJobUpdate::superseded(ticket, request.request_id),
                    );
                    continue;
                }

                latest_ticket = Some(latest_ticket.map_or(ticket, |latest| latest.max(ticket)));
                let request_id = request.request_id.clone();
                let service_for_thread = service.clone();
                let tx_for_thread = command_tx.clone();
                let request_id_for_thread = request_id.clone();

                log::info!(
                    "starting composite request {request_id} (in flight: {})",
                    in_flight.len() + 1
                );
                let handle = thread::spawn(move || {
                    let result = panic::catch_unwind(AssertUnwindSafe(|| {
                        service_for_thread.compose(request)
                    }))
                    .unwrap_or_else(|payload| {
                        Err(GenerationError::internal(format!(
                            "composite provider panicked: {}",
                            panic_message(payload.as_ref())
                        )))
                    });
                    let _ = tx_for_thread.send(WorkerMessage::Completion {
                        ticket,
                        request_id: request_id_for_thread,
                        result,
                    });
                });
                in_flight.insert(ticket, handle);
                push_update(&shared, GenerationJobUpdate::running(ticket, request_id));
            }
            WorkerMessage::Completion {
                ticket,
                request_id,
                result,
            } => {
                if let Some(handle) = in_flight.remove(&ticket) {
                    let _ = handle.join();
                }

                if shutdown_requested || latest_ticket != Some(ticket) {
                    log::debug!("composite request {request_id} finished after being superseded");
                    push_update(
                        &shared,
                        GenerationJobUpdate::superseded(ticket, request_id),
                    );
                } else {
                    match result {
                        Ok(image) => {
                            log::info!(
                                "composite request {request_id} succeeded ({} bytes)",
                                image.bytes().len()
                            );
                            push_update(
                                &shared,
                                GenerationJobUpdate::succeeded(ticket, request_id, image),
                            );
                        }
                        Err(error) => {
                            log::warn!("composite request {request_id} failed: {error}");
                            push_update(
                                &shared,
                                GenerationJobUpdate::failed(ticket, request_id, error),
                            );
                        }
                    }
                }

                if shutdown_requested && in_flight.is_empty() {
                    break;
                }
            }
            WorkerMessage::Shutdown => {
                shutdown_requested = true;
                if in_flight.is_empty() {
                    break;
                }
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

fn push_update(shared: &Arc<Mutex<SharedState>>, update: GenerationJobUpdate) {
    let mut shared = shared
        .lock()
        .expect("generation job state lock poisoned during update");
    // A superseded completion must not overwrite the state of the newer job.
    if update.state != GenerationJobState::Superseded {
        shared.state = update.state;
        shared.latest = Some(update.clone());
    }
    shared.updates.push_back(update);
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex, mpsc};
    use std::thread;
    use std::time::{Duration, Instant};

    use crate::app::orchestrator::{GenerationJob, TicketIssuer};
    use crate::domain::{CompositeImage, CompositeRequest, GenerationError, ImagePayload};
    use crate::infra::gemini::ImageCompositeProvider;

    use super::{
        CompositeSettings, GenerationJobManager, GenerationJobState, GenerationService,
    };

    struct DelayedProvider {
        delays: Arc<Mutex<VecDeque<Duration>>>,
        fail_requests: Arc<Mutex<Vec<String>>>,
        calls: AtomicUsize,
    }

    impl DelayedProvider {
        fn new(delays: impl IntoIterator<Item = Duration>) -> Self {
            Self {
                delays: Arc::new(Mutex::new(delays.into_iter().collect())),
                fail_requests: Arc::new(Mutex::new(Vec::new())),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl ImageCompositeProvider for DelayedProvider {
        fn provider_id(&self) -> &str {
            "gemini"
        }

        fn supports_model(&self, model_id: &str) -> bool {
            model_id.starts_with("gemini-")
        }

        fn compose(&self, request: &CompositeRequest) -> Result<CompositeImage, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let delay = self
                .delays
                .lock()
                .expect("delay queue lock poisoned")
                .pop_front()
                .unwrap_or(Duration::from_millis(0));
            thread::sleep(delay);

            let mut fail_requests = self.fail_requests.lock().expect("fail queue lock poisoned");
            if let Some(index) = fail_requests
                .iter()
                .position(|id| id == &request.request_id)
            {
                fail_requests.remove(index);
                return Err(GenerationError::transport("NetworkError"));
            }

            CompositeImage::from_data_uri("data:image/png;base64,AAA")
        }
    }

    struct BlockingProvider {
        entered: Arc<AtomicBool>,
        release_rx: Arc<Mutex<mpsc::Receiver<()>>>,
    }

    impl ImageCompositeProvider for BlockingProvider {
        fn provider_id(&self) -> &str {
            "gemini"
        }

        fn supports_model(&self, _model_id: &str) -> bool {
            true
        }

        fn compose(&self, _request: &CompositeRequest) -> Result<CompositeImage, GenerationError> {
            self.entered.store(true, Ordering::SeqCst);
            let _ = self
                .release_rx
                .lock()
                .expect("release channel lock poisoned")
                .recv();
            CompositeImage::from_data_uri("data:image/png;base64,AAA")
        }
    }

    struct PanickingProvider;

    impl ImageCompositeProvider for PanickingProvider {
        fn provider_id(&self) -> &str {
            "gemini"
        }

        fn supports_model(&self, _model_id: &str) -> bool {
            true
        }

        fn compose(&self, _request: &CompositeRequest) -> Result<CompositeImage, GenerationError> {
            panic!("provider exploded");
        }
    }

    fn job(issuer: &TicketIssuer) -> GenerationJob {
        GenerationJob {
            ticket: issuer.issue(),
            scene: ImagePayload::new("roomA.jpg", "image/jpeg", vec![0xff_u8, 0xd8]),
            rug: ImagePayload::new("rugB.jpg", "image/jpeg", vec![0xff_u8, 0xd8]),
        }
    }

    fn manager_with_provider(provider: Arc<dyn ImageCompositeProvider>) -> GenerationJobManager {
        GenerationJobManager::new(GenerationService::new(provider), CompositeSettings::default())
            .expect("job manager should start worker")
    }

    fn wait_for(
        manager: &GenerationJobManager,
        predicate: impl Fn(GenerationJobState) -> bool,
        timeout: Duration,
    ) {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if predicate(manager.state()) {
                return;
            }
            thread::sleep(Duration::from_millis(5));
        }

        panic!("condition was not met within {:?}", timeout);
    }

    #[test]
    fn submit_runs_provider_on_background_thread() {
        let entered = Arc::new(AtomicBool::new(false));
        let (release_tx, release_rx) = mpsc::channel();
        let manager = manager_with_provider(Arc::new(BlockingProvider {
            entered: Arc::clone(&entered),
            release_rx: Arc::new(Mutex::new(release_rx)),
        }));
        let issuer = TicketIssuer::new();

        let start = Instant::now();
        let ticket = manager.submit(job(&issuer)).expect("submit should succeed");
        assert!(
            start.elapsed() < Duration::from_millis(50),
            "submit should return without waiting for the provider"
        );

        let wait_start = Instant::now();
        while wait_start.elapsed() < Duration::from_millis(200) && !entered.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(entered.load(Ordering::SeqCst));
        assert_eq!(manager.state(), GenerationJobState::Running);

        release_tx.send(()).expect("release should succeed");
        wait_for(
            &manager,
            |state| state == GenerationJobState::Succeeded,
            Duration::from_millis(500),
        );

        let latest = manager.latest_update().expect("latest update after success");
        assert_eq!(latest.ticket, ticket);
        assert_eq!(latest.request_id, format!("roomrug-req-{}", ticket.value()));
        assert_eq!(
            latest.outcome().map(|outcome| outcome.map(|image| image.data_uri().to_string())),
            Some(Ok("data:image/png;base64,AAA".to_string()))
        );
    }

    #[test]
    fn failed_job_reports_error() {
        let provider = DelayedProvider::new([Duration::from_millis(5)]);
        provider
            .fail_requests
            .lock()
            .expect("fail queue lock poisoned")
            .push("roomrug-req-1".to_string());
        let manager = manager_with_provider(Arc::new(provider));
        let issuer = TicketIssuer::new();

        manager.submit(job(&issuer)).expect("submit should succeed");
        wait_for(
            &manager,
            |state| state == GenerationJobState::Failed,
            Duration::from_millis(500),
        );

        let latest = manager.latest_update().expect("latest update should exist");
        assert!(matches!(latest.error, Some(GenerationError::Transport { .. })));
        assert!(matches!(latest.outcome(), Some(Err(GenerationError::Transport { .. }))));
    }

    #[test]
    fn overlapping_jobs_each_call_provider_and_only_latest_is_reported() {
        let provider = Arc::new(DelayedProvider::new([
            Duration::from_millis(150),
            Duration::from_millis(10),
        ]));
        let manager = manager_with_provider(provider.clone());
        let issuer = TicketIssuer::new();

        let first = manager.submit(job(&issuer)).expect("first submit");
        thread::sleep(Duration::from_millis(10));
        let second = manager.submit(job(&issuer)).expect("second submit");

        wait_for(
            &manager,
            |state| state == GenerationJobState::Succeeded,
            Duration::from_millis(700),
        );
        thread::sleep(Duration::from_millis(250));

        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        let latest = manager.latest_update().expect("latest update");
        assert_eq!(latest.ticket, second);
        assert_eq!(manager.state(), GenerationJobState::Succeeded);

        let updates = manager.drain_updates();
        assert!(updates.iter().any(|update| {
            update.ticket == first && update.state == GenerationJobState::Superseded
        }));
        assert!(!updates.iter().any(|update| {
            update.ticket == first && update.state == GenerationJobState::Succeeded
        }));
    }

    #[test]
    fn drop_waits_for_in_flight_calls() {
        let provider = Arc::new(DelayedProvider::new([Duration::from_millis(150)]));
        let manager = manager_with_provider(provider.clone());
        let issuer = TicketIssuer::new();

        manager.submit(job(&issuer)).expect("submit should succeed");
        wait_for(
            &manager,
            |state| state == GenerationJobState::Running,
            Duration::from_millis(300),
        );

        let drop_started_at = Instant::now();
        drop(manager);

        assert!(drop_started_at.elapsed() >= Duration::from_millis(100));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_provider_fails_job_and_drop_still_returns() {
        let manager = manager_with_provider(Arc::new(PanickingProvider));
        let issuer = TicketIssuer::new();

        manager.submit(job(&issuer)).expect("submit should succeed");
        wait_for(
            &manager,
            |state| state == GenerationJobState::Failed,
            Duration::from_millis(500),
        );

        let latest = manager.latest_update().expect("latest update should exist");
        assert!(matches!(
            latest.error,
            Some(GenerationError::Internal { ref message }) if message.contains("provider exploded")
        ));

        let drop_started_at = Instant::now();
        drop(manager);
        assert!(drop_started_at.elapsed() < Duration::from_secs(1));
    }
}
