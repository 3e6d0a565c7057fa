use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use gpui::{
    Context, ExternalPaths, Image, IntoElement, ObjectFit, PathPromptOptions, Render,
    StyledImage, Task, Timer, Window, div, img, prelude::*, px,
};
use gpui_component::{
    Disableable,
    button::{Button, ButtonVariants as _},
    label::Label,
    scroll::ScrollableElement,
};
use roomrug::{
    app::{
        DownloadUseCase, GenerationJobManager, GenerationJobState, GenerationJobUpdate,
        ImageSelectionUseCase, SelectImageCommand, StudioState, TicketIssuer,
    },
    domain::{GenerationStatus, ImagePayload, SlotKind},
};

use super::backend::build_generation_backend;
use super::state::{ResultPane, SlotErrorState, generate_button_label, result_pane};
use super::theme::StudioTheme;
use super::upload_control::{UploadPanel, render_upload_panel};
use super::utils::{
    display_file_name_from_path, dropped_path_to_load, image_format_for_mime,
    log_generation_submission,
};
use super::{
    APP_SUBTITLE, APP_TITLE, DOWNLOAD_LABEL, JOB_UPDATE_POLL_INTERVAL_MS,
    RESULT_LOADING_HINT, RESULT_LOADING_TITLE, RESULT_PANE_MIN_HEIGHT_PX, RESULT_READY_HINT,
    RESULT_READY_TITLE, RESULT_TITLE, UPLOAD_DROP_ERROR_MESSAGE, UPLOAD_FILE_PICKER_PROMPT,
};

pub(super) struct StudioWindow {
    state: StudioState,
    selection: ImageSelectionUseCase,
    download: DownloadUseCase,
    tickets: TicketIssuer,
    generation_job_manager: Arc<GenerationJobManager>,
    preview_textures: HashMap<u64, Arc<Image>>,
    result_texture: Option<Arc<Image>>,
    slot_errors: Vec<SlotErrorState>,
    download_notice: Option<Result<String, String>>,
    startup_notice: Option<String>,
    _update_poll_task: Task<()>,
    _file_picker_task: Task<()>,
}

impl StudioWindow {
    pub(super) fn new(_window: &mut Window, _cx: &mut Context<Self>) -> Self {
        let backend = build_generation_backend();
        let download = DownloadUseCase::from_env();
        log::info!("downloads go to {}", download.directory().display());

        Self {
            state: StudioState::new(),
            selection: ImageSelectionUseCase::new(),
            download,
            tickets: TicketIssuer::new(),
            generation_job_manager: backend.job_manager,
            preview_textures: HashMap::new(),
            result_texture: None,
            slot_errors: Vec::new(),
            download_notice: None,
            startup_notice: backend.startup_notice,
            _update_poll_task: Task::ready(()),
            _file_picker_task: Task::ready(()),
        }
    }

    pub(super) fn on_select_file_clicked(
        &mut self,
        slot: SlotKind,
        window: &mut Window,
        cx: &mut Context<Self>,
    ) {
        // NOTE: gpui::PathPromptOptions (v0.2.2) does not expose extension-based file filters.
        let receiver = cx.prompt_for_paths(PathPromptOptions {
            files: true,
            directories: false,
            multiple: false,
            prompt: Some(UPLOAD_FILE_PICKER_PROMPT.into()),
        });

        self._file_picker_task = cx.spawn_in(window, async move |view, window| {
            let Ok(result) = receiver.await else {
                return;
            };

            match result {
                Ok(Some(paths)) => {
                    if let Some(path) = paths.into_iter().next() {
                        let _ = view.update_in(window, |view, _window, cx| {
                            view.set_slot_file(slot, path.to_string_lossy().to_string(), cx);
                        });
                    }
                }
                Ok(None) => {}
                Err(error) => {
                    let message = format!("无法打开文件选择窗口：{error}");
                    let _ = view.update_in(window, |view, _window, cx| {
                        view.upsert_slot_error(SlotErrorState::new(slot, message));
                        cx.notify();
                    });
                }
            }
        });
    }

    pub(super) fn on_slot_drop(
        &mut self,
        slot: SlotKind,
        paths: &ExternalPaths,
        cx: &mut Context<Self>,
    ) {
        let Some(path) = dropped_path_to_load(paths) else {
            self.upsert_slot_error(SlotErrorState::new(slot, UPLOAD_DROP_ERROR_MESSAGE));
            cx.notify();
            return;
        };

        self.set_slot_file(slot, path, cx);
    }

    pub(super) fn on_clear_slot_clicked(&mut self, slot: SlotKind, cx: &mut Context<Self>) {
        self.clear_slot_error(slot);
        match self
            .selection
            .execute(&self.state, SelectImageCommand::Clear { slot })
        {
            Ok((next, _)) => self.state = next,
            Err(error) => {
                self.upsert_slot_error(SlotErrorState::from_select_error(slot, &error));
            }
        }
        self.evict_released_previews();
        cx.notify();
    }

    fn set_slot_file(&mut self, slot: SlotKind, path: String, cx: &mut Context<Self>) {
        self.clear_slot_error(slot);
        match self.selection.execute(
            &self.state,
            SelectImageCommand::Select {
                slot,
                path: path.clone(),
            },
        ) {
            Ok((next, _)) => {
                self.state = next;
                self.cache_preview(slot);
            }
            Err(error) => {
                log::warn!(
                    "could not load {}: {error}",
                    display_file_name_from_path(&path)
                );
                self.upsert_slot_error(SlotErrorState::from_select_error(slot, &error));
            }
        }
        self.evict_released_previews();
        cx.notify();
    }

    fn cache_preview(&mut self, slot: SlotKind) {
        let slot_state = self.state.slot(slot);
        let (Some(reference), Some(payload)) = (slot_state.preview_reference(), slot_state.file())
        else {
            return;
        };
        if let Some(texture) = texture_for_payload(payload) {
            self.preview_textures.insert(reference.id, texture);
        }
    }

    fn evict_released_previews(&mut self) {
        let live = self.selection.live_previews();
        self.preview_textures.retain(|id, _| live.contains(id));
    }

    fn preview_for(&self, slot: SlotKind) -> Option<Arc<Image>> {
        self.state
            .slot(slot)
            .preview_reference()
            .and_then(|reference| self.preview_textures.get(&reference.id).cloned())
    }

    fn upsert_slot_error(&mut self, error: SlotErrorState) {
        if let Some(existing) = self
            .slot_errors
            .iter_mut()
            .find(|existing| existing.slot == error.slot)
        {
            *existing = error;
        } else {
            self.slot_errors.push(error);
        }
    }

    fn clear_slot_error(&mut self, slot: SlotKind) {
        self.slot_errors.retain(|existing| existing.slot != slot);
    }

    fn slot_error_for(&self, slot: SlotKind) -> Option<String> {
        self.slot_errors
            .iter()
            .find(|error| error.slot == slot)
            .map(|error| error.message.clone())
    }

    fn on_generate_clicked(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        let ticket = self.tickets.issue();
        let Some((next, job)) = self.state.begin_generation(ticket) else {
            return;
        };
        self.state = next;
        self.download_notice = None;
        self.sync_result_texture();

        log_generation_submission(&job);

        match self.generation_job_manager.submit(job) {
            Ok(_) => self.start_update_polling(window, cx),
            Err(error) => self.state = self.state.complete_generation(ticket, Err(error)),
        }

        cx.notify();
    }

    fn on_download_clicked(&mut self, cx: &mut Context<Self>) {
        self.download_notice = match self.download.save(&self.state) {
            Ok(Some(path)) => Some(Ok(format!("已保存到 {}", path.display()))),
            Ok(None) => None,
            Err(error) => {
                log::error!("download failed: {error}");
                Some(Err(error.user_message()))
            }
        };
        cx.notify();
    }

    fn start_update_polling(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        self._update_poll_task = cx.spawn_in(window, async move |view, window| {
            loop {
                Timer::after(Duration::from_millis(JOB_UPDATE_POLL_INTERVAL_MS)).await;
                let keep_polling = match view
                    .update_in(window, |view, _window, cx| view.poll_generation_updates(cx))
                {
                    Ok(keep_polling) => keep_polling,
                    Err(_) => break,
                };

                if !keep_polling {
                    break;
                }
            }
        });
    }

    fn poll_generation_updates(&mut self, cx: &mut Context<Self>) -> bool {
        let updates = self.generation_job_manager.drain_updates();
        if !updates.is_empty() {
            for update in updates {
                self.apply_generation_update(update);
            }
            self.sync_result_texture();
            cx.notify();
        }

        self.state.status() == GenerationStatus::Loading
    }

    fn apply_generation_update(&mut self, update: GenerationJobUpdate) {
        match update.state {
            GenerationJobState::Succeeded | GenerationJobState::Failed => {
                if let Some(outcome) = update.outcome() {
                    self.state = self.state.complete_generation(update.ticket, outcome);
                }
            }
            GenerationJobState::Idle
            | GenerationJobState::Running
            | GenerationJobState::Superseded => {}
        }
    }

    fn sync_result_texture(&mut self) {
        self.result_texture = self.state.result().and_then(|image| {
            let format = image_format_for_mime(image.mime_type())?;
            Some(Arc::new(Image::from_bytes(format, image.bytes().to_vec())))
        });
    }

    fn render_result_pane(&self, theme: &StudioTheme, cx: &mut Context<Self>) -> impl IntoElement + use<> {
        let colors = theme.colors;
        let body = match result_pane(&self.state) {
            ResultPane::Loading => div()
                .flex()
                .flex_col()
                .items_center()
                .gap_2()
                .child(div().text_color(colors.accent_foreground).child(RESULT_LOADING_TITLE))
                .child(
                    div()
                        .text_sm()
                        .text_color(colors.muted_foreground)
                        .child(RESULT_LOADING_HINT),
                ),
            ResultPane::Placeholder => div()
                .flex()
                .flex_col()
                .items_center()
                .gap_2()
                .max_w(px(360.0))
                .child(div().text_color(colors.surface_foreground).child(RESULT_READY_TITLE))
                .child(
                    div()
                        .text_sm()
                        .text_color(colors.muted_foreground)
                        .child(RESULT_READY_HINT),
                ),
            ResultPane::Empty => div(),
            ResultPane::Image => match self.result_texture.clone() {
                Some(texture) => div()
                    .size_full()
                    .child(img(texture).size_full().object_fit(ObjectFit::Contain)),
                None => div()
                    .text_color(colors.muted_foreground)
                    .child("无法预览该图片格式，可直接下载查看。"),
            },
        };

        let has_result = self.state.result().is_some();

        div()
            .flex()
            .flex_col()
            .flex_1()
            .gap_3()
            .p(theme.spacing.panel_padding)
            .rounded(theme.radius.panel)
            .border_1()
            .border_color(colors.panel_border)
            .bg(colors.panel_background)
            .child(
                div()
                    .flex()
                    .items_center()
                    .justify_between()
                    .child(Label::new(RESULT_TITLE))
                    .children(has_result.then(|| {
                        Button::new("download-button")
                            .label(DOWNLOAD_LABEL)
                            .on_click(cx.listener(|this, _, _window, cx| {
                                this.on_download_clicked(cx)
                            }))
                    })),
            )
            .child(
                div()
                    .id("result-pane")
                    .flex()
                    .flex_1()
                    .items_center()
                    .justify_center()
                    .min_h(px(RESULT_PANE_MIN_HEIGHT_PX))
                    .rounded(theme.radius.panel)
                    .bg(colors.upload_background)
                    .overflow_hidden()
                    .child(body),
            )
            .children(self.download_notice.iter().map(|notice| match notice {
                Ok(message) => div()
                    .text_sm()
                    .text_color(colors.success_foreground)
                    .child(message.clone()),
                Err(message) => div()
                    .text_sm()
                    .text_color(colors.error_foreground)
                    .child(message.clone()),
            }))
    }
}

fn texture_for_payload(payload: &ImagePayload) -> Option<Arc<Image>> {
    let format = image_format_for_mime(&payload.mime_type)?;
    Some(Arc::new(Image::from_bytes(format, payload.bytes.to_vec())))
}

impl Render for StudioWindow {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.global::<StudioTheme>().clone();
        let colors = theme.colors;
        let status = self.state.status();
        let loading = status == GenerationStatus::Loading;
        let can_generate = self.state.can_generate();

        let panels: Vec<UploadPanel> = SlotKind::ALL
            .iter()
            .copied()
            .map(|slot| UploadPanel {
                slot,
                file_name: self
                    .state
                    .slot(slot)
                    .file()
                    .map(|file| file.file_name.clone()),
                preview: self.preview_for(slot),
                error: self.slot_error_for(slot),
            })
            .collect();
        let upload_panels: Vec<_> = panels
            .into_iter()
            .map(|panel| render_upload_panel(panel, &theme, cx))
            .collect();
        let error_banner = (status == GenerationStatus::Error)
            .then(|| self.state.error_message().map(str::to_owned))
            .flatten();
        let result_pane = self.render_result_pane(&theme, cx);

        div()
            .size_full()
            .overflow_y_scrollbar()
            .flex()
            .flex_col()
            .bg(colors.surface_background)
            .text_color(colors.surface_foreground)
            .child(
                div()
                    .flex()
                    .items_center()
                    .justify_between()
                    .px(theme.spacing.window_padding)
                    .py_3()
                    .border_b_1()
                    .border_color(colors.panel_border)
                    .bg(colors.header_background)
                    .child(Label::new(APP_TITLE))
                    .child(
                        div()
                            .text_sm()
                            .text_color(colors.muted_foreground)
                            .child(APP_SUBTITLE),
                    ),
            )
            .children(self.startup_notice.iter().map(|notice| {
                div()
                    .px(theme.spacing.window_padding)
                    .py_2()
                    .text_sm()
                    .text_color(colors.warning_foreground)
                    .child(notice.clone())
            }))
            .child(
                div()
                    .flex()
                    .gap(theme.spacing.section_gap)
                    .p(theme.spacing.window_padding)
                    .child(
                        div()
                            .flex()
                            .flex_col()
                            .w(px(380.0))
                            .gap(theme.spacing.section_gap)
                            .p(theme.spacing.panel_padding)
                            .rounded(theme.radius.panel)
                            .border_1()
                            .border_color(colors.panel_border)
                            .bg(colors.panel_background)
                            .children(upload_panels)
                            .child(
                                Button::new("generate-button")
                                    .primary()
                                    .label(generate_button_label(status))
                                    .loading(loading)
                                    .disabled(!can_generate)
                                    .on_click(cx.listener(|this, _, window, cx| {
                                        this.on_generate_clicked(window, cx)
                                    })),
                            )
                            .children(error_banner.map(|message| {
                                div()
                                    .p_3()
                                    .rounded(theme.radius.control)
                                    .border_1()
                                    .border_color(colors.error_border)
                                    .bg(colors.error_background)
                                    .text_sm()
                                    .text_color(colors.error_foreground)
                                    .child(message)
                            })),
                    )
                    .child(result_pane),
            )
    }
}
