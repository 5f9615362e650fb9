//! Built-in overlay styles.
//!
//! Two static catalogs, compiled into the binary with their SVG artwork:
//! [`MUSTACHES`] and [`ACCESSORIES`]. Style ids are unique across both, so
//! [`find_style`] can resolve any id a user types.

use crate::imaging::Graphic;
use std::fmt;
use std::sync::Arc;

/// Where on the body an accessory is meant to sit.
///
/// Informational only: every style is drawn into the same placement
/// rectangles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessoryCategory {
    Face,
    Head,
    Neck,
}

impl fmt::Display for AccessoryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AccessoryCategory::Face => "face",
            AccessoryCategory::Head => "head",
            AccessoryCategory::Neck => "neck",
        })
    }
}

/// A selectable overlay graphic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayStyle {
    pub id: &'static str,
    pub display_name: &'static str,
    pub icon_glyph: &'static str,
    /// Asset path relative to `assets/`, for display.
    pub asset_path: &'static str,
    svg: &'static str,
    /// `None` for mustaches.
    pub category: Option<AccessoryCategory>,
}

impl OverlayStyle {
    /// The style's artwork, ready for the compositor.
    pub fn graphic(&self) -> Graphic {
        Graphic::Svg(Arc::from(self.svg))
    }

    pub fn is_accessory(&self) -> bool {
        self.category.is_some()
    }
}

pub const MUSTACHES: &[OverlayStyle] = &[
    OverlayStyle {
        id: "classic",
        display_name: "Classic",
        icon_glyph: "♛",
        asset_path: "mustaches/classic.svg",
        svg: include_str!("../assets/mustaches/classic.svg"),
        category: None,
    },
    OverlayStyle {
        id: "handlebar",
        display_name: "Handlebar",
        icon_glyph: "★",
        asset_path: "mustaches/handlebar.svg",
        svg: include_str!("../assets/mustaches/handlebar.svg"),
        category: None,
    },
    OverlayStyle {
        id: "victorian",
        display_name: "Victorian",
        icon_glyph: "◆",
        asset_path: "mustaches/victorian.svg",
        svg: include_str!("../assets/mustaches/victorian.svg"),
        category: None,
    },
    OverlayStyle {
        id: "walrus",
        display_name: "Walrus",
        icon_glyph: "☻",
        asset_path: "mustaches/walrus.svg",
        svg: include_str!("../assets/mustaches/walrus.svg"),
        category: None,
    },
];

pub const ACCESSORIES: &[OverlayStyle] = &[
    OverlayStyle {
        id: "monocle",
        display_name: "Monocle",
        icon_glyph: "◉",
        asset_path: "accessories/monocle.svg",
        svg: include_str!("../assets/accessories/monocle.svg"),
        category: Some(AccessoryCategory::Face),
    },
    OverlayStyle {
        id: "top-hat",
        display_name: "Top Hat",
        icon_glyph: "♜",
        asset_path: "accessories/top-hat.svg",
        svg: include_str!("../assets/accessories/top-hat.svg"),
        category: Some(AccessoryCategory::Head),
    },
    OverlayStyle {
        id: "bow-tie",
        display_name: "Bow Tie",
        icon_glyph: "⋈",
        asset_path: "accessories/bow-tie.svg",
        svg: include_str!("../assets/accessories/bow-tie.svg"),
        category: Some(AccessoryCategory::Neck),
    },
];

/// Every style, mustaches first.
pub fn all_styles() -> impl Iterator<Item = &'static OverlayStyle> {
    MUSTACHES.iter().chain(ACCESSORIES.iter())
}

/// Look a style up by id (case-insensitive).
pub fn find_style(id: &str) -> Option<&'static OverlayStyle> {
    all_styles().find(|s| s.id.eq_ignore_ascii_case(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::{ImageBackend, RustBackend};
    use std::collections::HashSet;

    #[test]
    fn ids_are_unique_across_catalogs() {
        let ids: HashSet<&str> = all_styles().map(|s| s.id).collect();
        assert_eq!(ids.len(), MUSTACHES.len() + ACCESSORIES.len());
    }

    #[test]
    fn catalog_sizes() {
        assert_eq!(MUSTACHES.len(), 4);
        assert_eq!(ACCESSORIES.len(), 3);
    }

    #[test]
    fn mustaches_have_no_category() {
        assert!(MUSTACHES.iter().all(|s| !s.is_accessory()));
        assert!(ACCESSORIES.iter().all(|s| s.is_accessory()));
    }

    #[test]
    fn find_style_is_case_insensitive() {
        assert_eq!(find_style("Walrus").map(|s| s.id), Some("walrus"));
        assert_eq!(find_style("TOP-HAT").map(|s| s.display_name), Some("Top Hat"));
        assert!(find_style("goatee").is_none());
    }

    #[test]
    fn every_asset_rasterizes() {
        let backend = RustBackend::new();
        for style in all_styles() {
            let img = backend
                .rasterize(&style.graphic(), 100, 40)
                .unwrap_or_else(|e| panic!("{} failed to rasterize: {e}", style.id));
            assert!(
                img.pixels().any(|p| p[3] > 0),
                "{} rendered fully transparent",
                style.id
            );
        }
    }

    #[test]
    fn category_display() {
        assert_eq!(AccessoryCategory::Neck.to_string(), "neck");
    }
}
