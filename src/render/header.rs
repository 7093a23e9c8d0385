//! Header controls above the settings list
//!
//! Three rows: filter toggles and debug mode, the search field, and the
//! expand/collapse-all action.

use super::context::StyleCache;
use super::widgets::{put, put_after};
use crate::config::ManagerSettings;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use unicode_width::UnicodeWidthStr;

pub const HEADER_HEIGHT: u16 = 3;

/// Focusable header controls, in tab order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderControl {
    ShowSettings,
    ShowKeybinds,
    ShowAdvanced,
    DebugMode,
    Search,
    ClearSearch,
    ExpandCollapseAll,
    /// Debug mode only
    OpenLog,
}

impl HeaderControl {
    pub fn all(debug: bool) -> Vec<Self> {
        let mut controls = vec![
            HeaderControl::ShowSettings,
            HeaderControl::ShowKeybinds,
            HeaderControl::ShowAdvanced,
            HeaderControl::DebugMode,
            HeaderControl::Search,
            HeaderControl::ClearSearch,
            HeaderControl::ExpandCollapseAll,
        ];
        if debug {
            controls.push(HeaderControl::OpenLog);
        }
        controls
    }

    pub fn next(self, debug: bool) -> Self {
        let all = Self::all(debug);
        let i = all.iter().position(|c| *c == self).unwrap_or(0);
        all[(i + 1) % all.len()]
    }

    pub fn prev(self, debug: bool) -> Self {
        let all = Self::all(debug);
        let i = all.iter().position(|c| *c == self).unwrap_or(0);
        all[(i + all.len() - 1) % all.len()]
    }

    /// Filter toggles only apply while not searching
    pub fn is_filter(self) -> bool {
        matches!(
            self,
            HeaderControl::ShowSettings | HeaderControl::ShowKeybinds | HeaderControl::ShowAdvanced
        )
    }
}

/// Inputs of one header frame
pub struct HeaderView<'a> {
    pub settings: &'a ManagerSettings,
    pub search_text: &'a str,
    pub searching: bool,
    pub focused: Option<HeaderControl>,
    pub styles: &'a StyleCache,
}

impl<'a> HeaderView<'a> {
    fn style_for(&self, control: HeaderControl, normal: Style) -> Style {
        if self.focused == Some(control) {
            self.styles.focused
        } else if control.is_filter() && self.searching {
            self.styles.disabled
        } else {
            normal
        }
    }

    /// `Label: [x]`
    fn toggle(&self, label: &str, checked: bool, control: HeaderControl, normal: Style) -> (String, Style) {
        let checkbox = if checked { "[x]" } else { "[ ]" };
        (format!("{label}: {checkbox}"), self.style_for(control, normal))
    }

    pub fn render(&self, buf: &mut Buffer, area: Rect) {
        if area.height < HEADER_HEIGHT || area.width == 0 {
            return;
        }
        let row = |y: u16| Rect::new(area.x, area.y + y, area.width, 1);
        let text = self.styles.text;

        // Filters
        let filters = [
            self.toggle(
                "Normal settings",
                self.settings.show_settings,
                HeaderControl::ShowSettings,
                text,
            ),
            self.toggle(
                "Keyboard shortcuts",
                self.settings.show_keybinds,
                HeaderControl::ShowKeybinds,
                text,
            ),
            self.toggle(
                "Advanced settings",
                self.settings.show_advanced,
                HeaderControl::ShowAdvanced,
                self.styles.advanced_name,
            ),
            self.toggle(
                "Debug mode",
                self.settings.show_debug,
                HeaderControl::DebugMode,
                text,
            ),
        ];
        let first = row(0);
        let mut x = put(buf, first, "Show: ", self.styles.hint);
        for (label, style) in &filters {
            x = put_after(buf, first, x, label, *style);
            x = put_after(buf, first, x, "  ", text);
        }

        // Search
        let second = row(1);
        let mut x = put(buf, second, "Search settings: ", self.styles.hint);
        let cursor = if self.focused == Some(HeaderControl::Search) {
            "_"
        } else {
            ""
        };
        x = put_after(
            buf,
            second,
            x,
            &format!("[{}{cursor}]", self.search_text),
            self.style_for(HeaderControl::Search, text),
        );
        x = put_after(buf, second, x, "  ", text);
        put_after(
            buf,
            second,
            x,
            "[Clear]",
            self.style_for(HeaderControl::ClearSearch, text),
        );

        // Actions
        let third = row(2);
        if self.settings.show_debug {
            put(
                buf,
                third,
                "[Open log]",
                self.style_for(HeaderControl::OpenLog, text),
            );
        }
        let label = if self.settings.plugin_collapsed_default {
            "[Expand All]"
        } else {
            "[Collapse All]"
        };
        let width = label.width() as u16;
        if third.width >= width {
            let right = Rect::new(third.x + third.width - width, third.y, width, 1);
            put(
                buf,
                right,
                label,
                self.style_for(HeaderControl::ExpandCollapseAll, text),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width)
            .map(|x| buf[(x, y)].symbol().to_string())
            .collect::<String>()
            .trim_end()
            .to_string()
    }

    fn render(settings: &ManagerSettings, search: &str, focused: Option<HeaderControl>) -> Buffer {
        let styles = StyleCache::from_settings(settings);
        let view = HeaderView {
            settings,
            search_text: search,
            searching: !search.trim().is_empty(),
            focused,
            styles: &styles,
        };
        let area = Rect::new(0, 0, 120, HEADER_HEIGHT);
        let mut buf = Buffer::empty(area);
        view.render(&mut buf, area);
        buf
    }

    #[test]
    fn test_header_rows() {
        let settings = ManagerSettings::default();
        let buf = render(&settings, "beta", None);

        let filters = line(&buf, 0);
        assert!(filters.starts_with("Show: Normal settings: [x]"));
        assert!(filters.contains("Advanced settings: [ ]"));
        assert_eq!(line(&buf, 1), "Search settings: [beta]  [Clear]");
        assert!(line(&buf, 2).ends_with("[Expand All]"));
    }

    #[test]
    fn test_filters_disabled_while_searching() {
        let settings = ManagerSettings::default();
        let styles = StyleCache::from_settings(&settings);
        let buf = render(&settings, "beta", None);
        // "Show: " is six columns wide
        assert_eq!(buf[(6, 0)].style().fg, styles.disabled.fg);

        let buf = render(&settings, "", None);
        assert_eq!(buf[(6, 0)].style().fg, styles.text.fg);
    }

    #[test]
    fn test_debug_adds_open_log() {
        let mut settings = ManagerSettings::default();
        settings.show_debug = true;
        settings.plugin_collapsed_default = false;
        let buf = render(&settings, "", None);
        assert!(line(&buf, 2).starts_with("[Open log]"));
        assert!(line(&buf, 2).ends_with("[Collapse All]"));
        assert_eq!(
            HeaderControl::ExpandCollapseAll.next(true),
            HeaderControl::OpenLog
        );
        assert_eq!(
            HeaderControl::ExpandCollapseAll.next(false),
            HeaderControl::ShowSettings
        );
    }

    #[test]
    fn test_tab_order_wraps() {
        assert_eq!(
            HeaderControl::ShowSettings.prev(false),
            HeaderControl::ExpandCollapseAll
        );
        assert_eq!(HeaderControl::Search.next(false), HeaderControl::ClearSearch);
    }
}
