use gpui::{App, AppContext, Application, Bounds, WindowBounds, WindowOptions, px, size};
use gpui_component::Root;

mod backend;
mod state;
mod theme;
mod upload_control;
mod utils;
mod window;

const STUDIO_WINDOW_WIDTH: f32 = 1120.0;
const STUDIO_WINDOW_HEIGHT: f32 = 780.0;
const UPLOAD_PANEL_HEIGHT_PX: f32 = 200.0;
const RESULT_PANE_MIN_HEIGHT_PX: f32 = 520.0;
const JOB_UPDATE_POLL_INTERVAL_MS: u64 = 50;

const STUB_PROVIDER_ID: &str = "studio_stub";
const STUB_MODEL_ID: &str = "studio-unconfigured";

const APP_TITLE: &str = "AI 软装搭配助手";
const APP_SUBTITLE: &str = "Powered by Gemini 2.5 Flash";
const UPLOAD_EMPTY_LABEL: &str = "点击上传";
const UPLOAD_CLEAR_LABEL: &str = "×";
const UPLOAD_FILE_PICKER_PROMPT: &str = "选择图片";
const UPLOAD_DROP_ERROR_MESSAGE: &str = "请拖入至少一个图片文件。";
const GENERATE_LABEL: &str = "开始生成搭配";
const GENERATING_LABEL: &str = "正在设计中...";
const RESULT_TITLE: &str = "搭配效果预览";
const RESULT_LOADING_TITLE: &str = "AI 正在分析空间结构并铺设地毯...";
const RESULT_LOADING_HINT: &str = "这可能需要几秒钟时间";
const RESULT_READY_TITLE: &str = "准备就绪";
const RESULT_READY_HINT: &str = "请在左侧上传场景图和地毯图，点击生成按钮查看 AI 设计效果。";
const DOWNLOAD_LABEL: &str = "下载图片";
const STUB_PROVIDER_NOTICE: &str = "未配置 Gemini API Key。请设置 ROOMRUG_GEMINI_API_KEY（或 GEMINI_API_KEY）后重新启动，否则生成请求将直接失败。";

pub(crate) fn run_studio_window() {
    Application::new().run(|cx: &mut App| {
        gpui_component::init(cx);
        theme::apply_default_theme(cx);

        let bounds = Bounds::centered(
            None,
            size(px(STUDIO_WINDOW_WIDTH), px(STUDIO_WINDOW_HEIGHT)),
            cx,
        );
        let options = WindowOptions {
            window_bounds: Some(WindowBounds::Windowed(bounds)),
            ..Default::default()
        };

        if cx
            .open_window(options, |window, cx| {
                let view = cx.new(|cx| window::StudioWindow::new(window, cx));
                cx.new(|cx| Root::new(view, window, cx))
            })
            .is_err()
        {
            log::error!("failed to open the studio window");
            cx.quit();
            return;
        }

        cx.on_window_closed(|cx| {
            if cx.windows().is_empty() {
                cx.quit();
            }
        })
        .detach();

        cx.activate(true);
    });
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use gpui::ImageFormat;
    use roomrug::app::{SelectImageError, StudioState};
    use roomrug::domain::{
        CompositeImage, GenerationError, GenerationStatus, ImagePayload, PreviewRegistry,
        SlotKind,
    };
    use roomrug::infra::image_file::ImageLoadError;

    use super::backend::is_missing_credentials_error;
    use super::state::{ResultPane, SlotErrorState, generate_button_label, result_pane};
    use super::upload_control::slot_copy;
    use super::utils::{choose_dropped_image_path, display_file_name_from_path, image_format_for_mime};
    use super::{GENERATE_LABEL, GENERATING_LABEL};

    fn ready_state() -> (PreviewRegistry, StudioState) {
        let registry = PreviewRegistry::new();
        let payload = |name: &str| ImagePayload::new(name, "image/jpeg", vec![0xff_u8, 0xd8]);
        let state = StudioState::new()
            .select_scene(payload("roomA.jpg"), registry.acquire(SlotKind::Scene))
            .select_rug(payload("rugB.jpg"), registry.acquire(SlotKind::Rug));
        (registry, state)
    }

    #[test]
    fn choose_dropped_image_path_prefers_supported_extension() {
        let paths = vec![PathBuf::from("/tmp/notes.txt"), PathBuf::from("/tmp/rugB.webp")];
        assert_eq!(
            choose_dropped_image_path(&paths),
            Some(PathBuf::from("/tmp/rugB.webp"))
        );
    }

    #[test]
    fn choose_dropped_image_path_falls_back_to_first_entry() {
        let paths = vec![PathBuf::from("/tmp/notes.txt"), PathBuf::from("/tmp/readme.md")];
        assert_eq!(
            choose_dropped_image_path(&paths),
            Some(PathBuf::from("/tmp/notes.txt"))
        );
        assert_eq!(choose_dropped_image_path(&[]), None);
    }

    #[test]
    fn display_file_name_from_path_uses_last_component() {
        assert_eq!(display_file_name_from_path("/a/b/roomA.jpg"), "roomA.jpg");
        assert_eq!(display_file_name_from_path(""), "");
    }

    #[test]
    fn image_format_for_mime_maps_renderable_types() {
        assert!(matches!(image_format_for_mime("image/png"), Some(ImageFormat::Png)));
        assert!(matches!(image_format_for_mime("image/jpeg"), Some(ImageFormat::Jpeg)));
        assert!(matches!(image_format_for_mime("IMAGE/WEBP"), Some(ImageFormat::Webp)));
        assert!(image_format_for_mime("image/heic").is_none());
    }

    #[test]
    fn generate_button_label_follows_loading_status() {
        assert_eq!(generate_button_label(GenerationStatus::Idle), GENERATE_LABEL);
        assert_eq!(generate_button_label(GenerationStatus::Loading), GENERATING_LABEL);
        assert_eq!(generate_button_label(GenerationStatus::Error), GENERATE_LABEL);
    }

    #[test]
    fn result_pane_tracks_generation_lifecycle() {
        let (_registry, state) = ready_state();
        assert_eq!(result_pane(&state), ResultPane::Placeholder);

        let ticket = roomrug::app::TicketIssuer::new().issue();
        let (loading, _) = state.begin_generation(ticket).expect("ready");
        assert_eq!(result_pane(&loading), ResultPane::Loading);

        let image = CompositeImage::from_data_uri("data:image/png;base64,AAA").expect("valid");
        let done = loading.complete_generation(ticket, Ok(image));
        assert_eq!(result_pane(&done), ResultPane::Image);
        assert_eq!(result_pane(&done.clear_rug()), ResultPane::Image);
    }

    #[test]
    fn result_pane_is_empty_after_failure() {
        let (_registry, state) = ready_state();
        let ticket = roomrug::app::TicketIssuer::new().issue();
        let (loading, _) = state.begin_generation(ticket).expect("ready");

        let failed = loading.complete_generation(ticket, Err(GenerationError::Timeout));

        assert_eq!(result_pane(&failed), ResultPane::Empty);
        assert_eq!(result_pane(&failed.clear_scene()), ResultPane::Empty);
    }

    #[test]
    fn slot_error_state_uses_localized_message() {
        let error = SelectImageError::LoadFailed {
            source: ImageLoadError::UnsupportedExtension {
                path: "/tmp/rug.txt".to_string(),
            },
        };
        let state = SlotErrorState::from_select_error(SlotKind::Rug, &error);
        assert_eq!(state.slot, SlotKind::Rug);
        assert_eq!(state.message, "仅支持图片文件（PNG、JPG、WEBP 等）。");
    }

    #[test]
    fn slot_copy_matches_panel_headings() {
        assert_eq!(slot_copy(SlotKind::Scene).title, "1. 上传场景");
        assert_eq!(slot_copy(SlotKind::Scene).hint, "选择一张客厅或房间图片");
        assert_eq!(slot_copy(SlotKind::Rug).title, "2. 上传地毯");
        assert_eq!(slot_copy(SlotKind::Rug).hint, "选择地毯纹理或平面图");
    }

    #[test]
    fn missing_key_error_is_detected() {
        assert!(is_missing_credentials_error(&GenerationError::validation(
            "Gemini API key is missing (set ROOMRUG_GEMINI_API_KEY)"
        )));
        assert!(!is_missing_credentials_error(&GenerationError::validation(
            "ROOMRUG_GEMINI_TIMEOUT_SECS must be greater than 0 seconds"
        )));
    }
}
