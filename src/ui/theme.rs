use gpui::{App, Global, Hsla, Pixels, SharedString, px, rgb};
use gpui_component::Theme;

#[derive(Debug, Clone, Copy)]
pub(super) struct ThemeColors {
    pub(super) surface_background: Hsla,
    pub(super) surface_foreground: Hsla,
    pub(super) header_background: Hsla,
    pub(super) panel_background: Hsla,
    pub(super) panel_border: Hsla,
    pub(super) upload_background: Hsla,
    pub(super) upload_hover_background: Hsla,
    pub(super) upload_drop_border: Hsla,
    pub(super) upload_drop_background: Hsla,
    pub(super) primary: Hsla,
    pub(super) primary_dark: Hsla,
    pub(super) muted_foreground: Hsla,
    pub(super) accent_foreground: Hsla,
    pub(super) success_foreground: Hsla,
    pub(super) error_foreground: Hsla,
    pub(super) error_background: Hsla,
    pub(super) error_border: Hsla,
    pub(super) warning_foreground: Hsla,
    pub(super) drop_invalid_border: Hsla,
    pub(super) drop_invalid_background: Hsla,
}

impl ThemeColors {
    #[inline]
    pub(super) fn upload_border(self, populated: bool) -> Hsla {
        if populated {
            self.primary
        } else {
            self.panel_border
        }
    }
}

#[derive(Debug, Clone)]
pub(super) struct ThemeTypography {
    pub(super) font_family: SharedString,
    pub(super) mono_font_family: SharedString,
    pub(super) font_size: Pixels,
    pub(super) mono_font_size: Pixels,
}

#[derive(Debug, Clone, Copy)]
pub(super) struct ThemeSpacing {
    pub(super) window_padding: Pixels,
    pub(super) section_gap: Pixels,
    pub(super) panel_padding: Pixels,
}

#[derive(Debug, Clone, Copy)]
pub(super) struct ThemeRadius {
    pub(super) control: Pixels,
    pub(super) panel: Pixels,
}

#[derive(Debug, Clone)]
pub(super) struct StudioTheme {
    pub(super) colors: ThemeColors,
    pub(super) typography: ThemeTypography,
    pub(super) spacing: ThemeSpacing,
    pub(super) radius: ThemeRadius,
}

impl Default for StudioTheme {
    fn default() -> Self {
        Self {
            colors: ThemeColors {
                surface_background: rgb(0xf8fafc).into(),
                surface_foreground: rgb(0x0f172a).into(),
                header_background: rgb(0xffffff).into(),
                panel_background: rgb(0xffffff).into(),
                panel_border: rgb(0xe2e8f0).into(),
                upload_background: rgb(0xf8fafc).into(),
                upload_hover_background: rgb(0xeef2ff).into(),
                upload_drop_border: rgb(0x6366f1).into(),
                upload_drop_background: rgb(0xe0e7ff).into(),
                primary: rgb(0x4f46e5).into(),
                primary_dark: rgb(0x4338ca).into(),
                muted_foreground: rgb(0x64748b).into(),
                accent_foreground: rgb(0x4f46e5).into(),
                success_foreground: rgb(0x16a34a).into(),
                error_foreground: rgb(0xdc2626).into(),
                error_background: rgb(0xfef2f2).into(),
                error_border: rgb(0xfecaca).into(),
                warning_foreground: rgb(0xb45309).into(),
                drop_invalid_border: rgb(0xfda4af).into(),
                drop_invalid_background: rgb(0xfff1f2).into(),
            },
            typography: ThemeTypography {
                font_family: ".SystemUIFont".into(),
                mono_font_family: if cfg!(target_os = "macos") {
                    "Menlo".into()
                } else if cfg!(target_os = "windows") {
                    "Consolas".into()
                } else {
                    "DejaVu Sans Mono".into()
                },
                font_size: px(15.0),
                mono_font_size: px(13.0),
            },
            spacing: ThemeSpacing {
                window_padding: px(24.0),
                section_gap: px(16.0),
                panel_padding: px(16.0),
            },
            radius: ThemeRadius {
                control: px(8.0),
                panel: px(12.0),
            },
        }
    }
}

impl Global for StudioTheme {}

pub(super) fn apply_default_theme(cx: &mut App) {
    apply_theme(StudioTheme::default(), cx);
}

pub(super) fn apply_theme(theme: StudioTheme, cx: &mut App) {
    cx.set_global(theme.clone());
    apply_to_gpui_component_theme(&theme, cx);
}

fn apply_to_gpui_component_theme(theme: &StudioTheme, cx: &mut App) {
    let component_theme = Theme::global_mut(cx);

    component_theme.font_family = theme.typography.font_family.clone();
    component_theme.font_size = theme.typography.font_size;
    component_theme.mono_font_family = theme.typography.mono_font_family.clone();
    component_theme.mono_font_size = theme.typography.mono_font_size;

    component_theme.radius = theme.radius.control;
    component_theme.radius_lg = theme.radius.panel;

    component_theme.background = theme.colors.surface_background;
    component_theme.foreground = theme.colors.surface_foreground;
    component_theme.border = theme.colors.panel_border;
    component_theme.input = theme.colors.panel_border;

    component_theme.primary = theme.colors.primary;
    component_theme.primary_hover = theme.colors.primary_dark;
    component_theme.primary_active = theme.colors.primary_dark;
    component_theme.primary_foreground = theme.colors.panel_background;

    component_theme.secondary = theme.colors.panel_background;
    component_theme.secondary_hover = theme.colors.upload_hover_background;
    component_theme.secondary_active = theme.colors.upload_hover_background;
    component_theme.secondary_foreground = theme.colors.surface_foreground;

    component_theme.danger = theme.colors.error_foreground;
    component_theme.danger_hover = theme.colors.error_foreground;
    component_theme.danger_active = theme.colors.error_foreground;
    component_theme.danger_foreground = theme.colors.panel_background;

    component_theme.success = theme.colors.success_foreground;
    component_theme.success_hover = theme.colors.success_foreground;
    component_theme.success_active = theme.colors.success_foreground;
    component_theme.success_foreground = theme.colors.panel_background;

    component_theme.warning = theme.colors.warning_foreground;
    component_theme.warning_hover = theme.colors.warning_foreground;
    component_theme.warning_active = theme.colors.warning_foreground;
    component_theme.warning_foreground = theme.colors.panel_background;

    component_theme.info = theme.colors.accent_foreground;
    component_theme.info_hover = theme.colors.accent_foreground;
    component_theme.info_active = theme.colors.accent_foreground;
    component_theme.info_foreground = theme.colors.panel_background;

    component_theme.muted_foreground = theme.colors.muted_foreground;
    component_theme.ring = theme.colors.primary;

    component_theme.popover = theme.colors.panel_background;
    component_theme.popover_foreground = theme.colors.surface_foreground;
}
