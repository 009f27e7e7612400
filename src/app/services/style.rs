//! Copy visual settings between screenshots without touching their copy.

use crate::app::domain::screenshot::Screenshot;
use crate::app::domain::settings::SettingsTree;

/// Overwrite `target`'s style with `source`'s. Background and device
/// transform are replaced wholesale; text takes every styling field but keeps
/// its own headlines and subheadlines.
pub fn copy_style(source: &SettingsTree, target: &mut SettingsTree) {
    // Cloning the background shares its image handle.
    target.background = source.background.clone();
    target.screenshot = source.screenshot.clone();
    target.text.copy_style_from(&source.text);
}

/// Copy the style of `screenshots[source]` onto `screenshots[target]`.
/// Returns false when either index is out of range; copying onto itself is
/// a no-op that reports success.
pub fn transfer_style(screenshots: &mut [Screenshot], source: usize, target: usize) -> bool {
    if source >= screenshots.len() || target >= screenshots.len() {
        return false;
    }
    if source == target {
        return true;
    }
    let style = screenshots[source].settings.clone();
    copy_style(&style, &mut screenshots[target].settings);
    true
}

/// Copy the style of `screenshots[source]` onto every other screenshot.
/// Returns how many screenshots were updated.
pub fn apply_style_to_all(screenshots: &mut [Screenshot], source: usize) -> usize {
    let Some(style) = screenshots.get(source).map(|s| s.settings.clone()) else {
        return 0;
    };
    let mut updated = 0;
    for (index, shot) in screenshots.iter_mut().enumerate() {
        if index == source {
            continue;
        }
        copy_style(&style, &mut shot.settings);
        updated += 1;
    }
    updated
}
