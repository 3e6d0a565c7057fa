use std::sync::Arc;

use gpui::{
    Context, ExternalPaths, Image, IntoElement, ObjectFit, StyledImage, div, img, prelude::*, px,
};
use gpui_component::{
    button::{Button, ButtonVariants as _},
    label::Label,
};
use roomrug::domain::SlotKind;

use super::theme::StudioTheme;
use super::utils::choose_dropped_image_path;
use super::window::StudioWindow;
use super::{UPLOAD_CLEAR_LABEL, UPLOAD_EMPTY_LABEL, UPLOAD_PANEL_HEIGHT_PX};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct SlotCopy {
    pub(super) title: &'static str,
    pub(super) hint: &'static str,
    panel_id: &'static str,
    clear_id: &'static str,
}

pub(super) fn slot_copy(slot: SlotKind) -> SlotCopy {
    match slot {
        SlotKind::Scene => SlotCopy {
            title: "1. 上传场景",
            hint: "选择一张客厅或房间图片",
            panel_id: "upload-panel-scene",
            clear_id: "upload-clear-scene",
        },
        SlotKind::Rug => SlotCopy {
            title: "2. 上传地毯",
            hint: "选择地毯纹理或平面图",
            panel_id: "upload-panel-rug",
            clear_id: "upload-clear-rug",
        },
    }
}

/// Everything one upload panel needs from the window for a single frame.
pub(super) struct UploadPanel {
    pub(super) slot: SlotKind,
    pub(super) file_name: Option<String>,
    pub(super) preview: Option<Arc<Image>>,
    pub(super) error: Option<String>,
}

pub(super) fn render_upload_panel(
    panel: UploadPanel,
    theme: &StudioTheme,
    cx: &mut Context<StudioWindow>,
) -> impl IntoElement + use<> {
    let slot = panel.slot;
    let copy = slot_copy(slot);
    let colors = theme.colors;
    let populated = panel.file_name.is_some();

    let drop_zone = div()
        .id(copy.panel_id)
        .relative()
        .flex()
        .flex_col()
        .items_center()
        .justify_center()
        .w_full()
        .h(px(UPLOAD_PANEL_HEIGHT_PX))
        .p_2()
        .border_2()
        .rounded(theme.radius.panel)
        .border_color(colors.upload_border(populated))
        .bg(colors.upload_background)
        .overflow_hidden()
        .can_drop(|value, _, _| {
            value
                .downcast_ref::<ExternalPaths>()
                .is_some_and(|paths| !paths.paths().is_empty())
        })
        .drag_over::<ExternalPaths>(move |style, paths, _, _| {
            if choose_dropped_image_path(paths.paths()).is_some() {
                style
                    .border_color(colors.upload_drop_border)
                    .bg(colors.upload_drop_background)
            } else {
                style
                    .border_color(colors.drop_invalid_border)
                    .bg(colors.drop_invalid_background)
            }
        })
        .on_drop(cx.listener(move |this, paths: &ExternalPaths, _window, cx| {
            this.on_slot_drop(slot, paths, cx)
        }));

    // Only an empty panel opens the dialog; a populated one is cleared first.
    let drop_zone = if populated {
        drop_zone
    } else {
        drop_zone
            .cursor_pointer()
            .hover(move |style| {
                style
                    .border_color(colors.upload_drop_border)
                    .bg(colors.upload_hover_background)
            })
            .on_click(cx.listener(move |this, _, window, cx| {
                this.on_select_file_clicked(slot, window, cx)
            }))
    };

    let body = match (panel.preview, panel.file_name) {
        (Some(preview), Some(_)) => div()
            .size_full()
            .child(img(preview).size_full().object_fit(ObjectFit::Contain)),
        (None, Some(file_name)) => div()
            .flex()
            .flex_col()
            .items_center()
            .gap_1()
            .child(Label::new(file_name))
            .child(
                div()
                    .text_sm()
                    .text_color(colors.muted_foreground)
                    .child(copy.hint),
            ),
        (_, None) => div()
            .flex()
            .flex_col()
            .items_center()
            .gap_1()
            .child(
                div()
                    .text_color(colors.surface_foreground)
                    .child(UPLOAD_EMPTY_LABEL),
            )
            .child(
                div()
                    .text_sm()
                    .text_color(colors.muted_foreground)
                    .child(copy.hint),
            ),
    };

    let clear_button = populated.then(|| {
        div().absolute().top_2().right_2().child(
            Button::new(copy.clear_id)
                .label(UPLOAD_CLEAR_LABEL)
                .ghost()
                .on_click(cx.listener(move |this, _, _window, cx| {
                    cx.stop_propagation();
                    this.on_clear_slot_clicked(slot, cx)
                })),
        )
    });

    div()
        .flex()
        .flex_col()
        .gap_2()
        .w_full()
        .child(
            div()
                .text_sm()
                .text_color(colors.surface_foreground)
                .child(copy.title),
        )
        .child(drop_zone.child(body).children(clear_button))
        .children(panel.error.map(|message| {
            div()
                .text_sm()
                .text_color(colors.error_foreground)
                .child(message)
        }))
}
