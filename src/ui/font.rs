//! System font loading
//!
//! Workshop titles and descriptions are frequently Chinese, Japanese or
//! Korean, which egui's bundled fonts cannot render.
use eframe::egui::{FontData, FontDefinitions, FontFamily};
use font_kit::handle::Handle;
use font_kit::source::SystemSource;
use std::sync::Arc;

const CJK_FONT_NAME: &str = "SystemCJKFont";
const FALLBACK_FONT_NAME: &str = "SystemFont";

/// Default egui fonts with the first available CJK system font appended as
/// a fallback for both families
pub fn setup_fonts() -> FontDefinitions {
    let mut fonts = FontDefinitions::default();
    let source = SystemSource::new();

    let loaded = preferred_font_names()
        .iter()
        .find_map(|name| load_family(&source, name).map(|data| (*name, data)));

    match loaded {
        Some((name, data)) => {
            tracing::info!("Using system font '{}' for CJK text", name);
            register(&mut fonts, CJK_FONT_NAME, data);
        }
        None => match load_sans_serif(&source) {
            Some(data) => {
                tracing::info!("No CJK font found, using generic system sans-serif");
                register(&mut fonts, FALLBACK_FONT_NAME, data);
            }
            None => tracing::warn!("Could not load any system font, using egui defaults"),
        },
    }

    fonts
}

fn preferred_font_names() -> &'static [&'static str] {
    match std::env::consts::OS {
        "macos" => &["PingFang SC", "Hiragino Sans GB", "Hiragino Sans", "Heiti SC"],
        "windows" => &["Microsoft YaHei", "Yu Gothic", "Malgun Gothic", "SimSun"],
        "linux" => &[
            "Noto Sans CJK SC",
            "Noto Sans CJK JP",
            "Noto Sans CJK TC",
            "Source Han Sans SC",
            "WenQuanYi Micro Hei",
        ],
        _ => &[],
    }
}

fn read_handle(handle: &Handle) -> Option<Vec<u8>> {
    match handle {
        Handle::Memory { bytes, .. } => Some(bytes.to_vec()),
        Handle::Path { path, .. } => std::fs::read(path).ok(),
    }
}

fn load_family(source: &SystemSource, name: &str) -> Option<Vec<u8>> {
    let family = source.select_family_by_name(name).ok()?;
    let handle = family.fonts().first()?;
    read_handle(handle)
}

fn load_sans_serif(source: &SystemSource) -> Option<Vec<u8>> {
    let handle = source
        .select_best_match(
            &[font_kit::family_name::FamilyName::SansSerif],
            &font_kit::properties::Properties::new(),
        )
        .ok()?;
    read_handle(&handle)
}

/// Keep egui's own fonts first so Latin text and emoji icons are unchanged
fn register(fonts: &mut FontDefinitions, name: &str, data: Vec<u8>) {
    fonts
        .font_data
        .insert(name.to_owned(), Arc::new(FontData::from_owned(data)));

    for family in [FontFamily::Proportional, FontFamily::Monospace] {
        if let Some(list) = fonts.families.get_mut(&family) {
            list.push(name.to_owned());
        }
    }
}
