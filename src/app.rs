//! The settings editor facade
//!
//! [`ConfigManager`] ties discovery, the presentation pipeline and the
//! renderers together behind two calls the host makes every frame:
//! [`render`](ConfigManager::render) and
//! [`handle_key`](ConfigManager::handle_key).

use crate::config::ManagerSettings;
use crate::config_io::{save_settings_or_warn, DirectoryContext};
use crate::model::{PluginHost, PluginInfo, TypeKey};
use crate::pipeline::SettingsDataManager;
use crate::render::{
    draw_picker_popup, owner_rows, Canvas, FocusTarget, FrameStats, HeaderControl, HeaderView,
    ListRow, ListView, RegistryError, RenderContext, RendererRegistry, ScrollState, StyleCache,
    TypeRenderer, HEADER_HEIGHT,
};
use crate::store::SharedConfigFile;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::widgets::{Clear, Scrollbar, ScrollbarOrientation, ScrollbarState, StatefulWidget, Widget};
use ratatui::Frame;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Opens a file or directory with the system handler
pub type Opener = Box<dyn Fn(&Path) -> io::Result<()>>;

/// Where keyboard input goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Focus {
    Header(HeaderControl),
    List(FocusTarget),
}

pub struct ConfigManager {
    host: Rc<dyn PluginHost>,
    settings: ManagerSettings,
    dir_context: Option<DirectoryContext>,
    data: SettingsDataManager,
    registry: RendererRegistry,
    ctx: RenderContext,
    scroll: ScrollState,
    focus: Focus,
    /// List focus to return to when tabbing back from the header
    last_list_focus: Option<FocusTarget>,
    displaying: bool,
    last_frame: FrameStats,
    opener: Opener,
}

impl ConfigManager {
    pub fn new(host: Rc<dyn PluginHost>, settings: ManagerSettings) -> Self {
        let data = if settings.background_rebuild {
            SettingsDataManager::new().with_background_rebuild()
        } else {
            SettingsDataManager::new()
        };
        Self {
            host,
            ctx: RenderContext::new(&settings),
            settings,
            dir_context: None,
            data,
            registry: RendererRegistry::with_builtins(),
            scroll: ScrollState::new(0),
            focus: Focus::Header(HeaderControl::Search),
            last_list_focus: None,
            displaying: false,
            last_frame: FrameStats::default(),
            opener: Box::new(|path: &Path| open::that(path)),
        }
    }

    /// Persist settings under this context and resolve plugin file locations
    pub fn with_directories(mut self, dir_context: DirectoryContext) -> Self {
        self.dir_context = Some(dir_context);
        self
    }

    pub fn with_opener(mut self, opener: Opener) -> Self {
        self.opener = opener;
        self
    }

    pub fn settings(&self) -> &ManagerSettings {
        &self.settings
    }

    pub fn data(&self) -> &SettingsDataManager {
        &self.data
    }

    pub fn focus(&self) -> &Focus {
        &self.focus
    }

    pub fn scroll(&self) -> &ScrollState {
        &self.scroll
    }

    /// Counters of the most recent frame
    pub fn last_frame(&self) -> FrameStats {
        self.last_frame
    }

    pub fn is_displaying(&self) -> bool {
        self.displaying
    }

    /// Add a renderer for a value type. Fails when the type already has one.
    pub fn register_type_renderer(
        &mut self,
        key: TypeKey,
        renderer: Rc<dyn TypeRenderer>,
    ) -> Result<(), RegistryError> {
        self.registry.register(key, renderer)
    }

    /// Showing rediscovers every setting; hiding saves the editor settings
    pub fn set_displaying(&mut self, displaying: bool) {
        if displaying == self.displaying {
            return;
        }
        self.displaying = displaying;
        if displaying {
            tracing::debug!("Showing settings editor");
            self.ctx.styles = StyleCache::from_settings(&self.settings);
            self.refresh();
        } else {
            tracing::debug!("Hiding settings editor");
            self.ctx.transient.close();
            self.persist_settings();
        }
    }

    /// Full rebuild from the host's plugins
    pub fn refresh(&mut self) {
        self.data
            .build_setting_list(self.host.as_ref(), &self.settings);
        self.normalize_focus();
    }

    pub fn render(&mut self, frame: &mut Frame<'_>) {
        let area = frame.area();
        self.render_to(area, frame.buffer_mut());
    }

    pub fn render_to(&mut self, area: Rect, buf: &mut Buffer) {
        if !self.displaying || area.height < HEADER_HEIGHT + 2 || area.width < 2 {
            return;
        }
        if self.data.poll_rebuild(&self.settings) {
            self.normalize_focus();
        }

        let [header, body, status] = Layout::vertical([
            Constraint::Length(HEADER_HEIGHT),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .areas(area);
        let [list, bar] =
            Layout::horizontal([Constraint::Min(1), Constraint::Length(1)]).areas(body);

        let header_focus = match self.focus {
            Focus::Header(control) => Some(control),
            Focus::List(_) => None,
        };
        HeaderView {
            settings: &self.settings,
            search_text: self.data.search_text(),
            searching: self.data.is_searching(),
            focused: header_focus,
            styles: &self.ctx.styles,
        }
        .render(buf, header);

        self.scroll.set_viewport(list.height);
        let mut stats = self.draw_list(list, buf);
        self.scroll.set_content_height(stats.content_height);
        if let Some((y, height)) = stats.focus_row {
            let before = self.scroll.offset;
            self.scroll.ensure_visible(y, height);
            if self.scroll.offset != before {
                Clear.render(list, buf);
                stats = self.draw_list(list, buf);
                self.scroll.set_content_height(stats.content_height);
            }
        }
        self.last_frame = stats;

        if self.scroll.needs_scrollbar() {
            let mut state = ScrollbarState::new(self.scroll.max_offset() as usize)
                .position(self.scroll.offset as usize)
                .viewport_content_length(list.height as usize);
            Scrollbar::new(ScrollbarOrientation::VerticalRight).render(bar, buf, &mut state);
        }

        draw_picker_popup(buf, list, &self.ctx);

        if let Some(text) = self.status_text() {
            buf.set_stringn(status.x, status.y, text, status.width as usize, self.ctx.styles.hint);
        }
    }

    fn draw_list(&mut self, area: Rect, buf: &mut Buffer) -> FrameStats {
        let footer = self.data.owners_without_settings().to_string();
        let searching = self.data.is_searching();
        let focus = match &self.focus {
            Focus::List(target) => Some(target.clone()),
            Focus::Header(_) => None,
        };
        let view = ListView {
            registry: &self.registry,
            settings: &self.settings,
            searching,
            owners_without_settings: &footer,
            focus: focus.as_ref(),
        };
        let (entries, plugins) = self.data.split_mut();
        let mut canvas = Canvas::new(buf, area, self.scroll.offset);
        view.render(entries, plugins, &mut canvas, &mut self.ctx)
    }

    /// Description of the focused entry, or the website of a focused owner
    fn status_text(&self) -> Option<String> {
        match &self.focus {
            Focus::List(FocusTarget::Entry(index)) => self
                .data
                .entries()
                .get(*index)
                .map(|entry| entry.description.clone())
                .filter(|text| !text.is_empty()),
            Focus::List(FocusTarget::Plugin(name)) => self
                .data
                .filtered_settings()
                .iter()
                .find(|p| p.info.name == *name)
                .and_then(|p| p.website.clone())
                .map(|url| format!("Website: {url}")),
            Focus::Header(_) => None,
        }
    }

    /// Returns whether the key was consumed
    pub fn handle_key(&mut self, key_event: KeyEvent) -> bool {
        match self.settings.toggle_shortcut() {
            Ok(shortcut) if shortcut.matches(&key_event) && !self.ctx.transient.is_open() => {
                self.set_displaying(!self.displaying);
                return true;
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("Ignoring toggle shortcut: {}", e),
        }
        if !self.displaying {
            return false;
        }

        if let Some(index) = self.ctx.transient.owner() {
            self.handle_transient_key(index, key_event);
            return true;
        }

        match key_event {
            KeyEvent {
                code: KeyCode::Tab | KeyCode::BackTab,
                ..
            } => self.switch_pane(),

            KeyEvent {
                code: KeyCode::Esc, ..
            } => self.set_displaying(false),

            _ => match self.focus.clone() {
                Focus::Header(control) => self.handle_header_key(control, key_event),
                Focus::List(target) => self.handle_list_key(target, key_event),
            },
        }
        true
    }

    fn handle_transient_key(&mut self, index: usize, key_event: KeyEvent) {
        let Some(entry) = self.data.entries().get(index) else {
            self.ctx.transient.close();
            return;
        };
        let strategy = self.registry.dispatch(&entry.value_type);
        match strategy
            .renderer()
            .handle_key(entry, index, key_event, &mut self.ctx)
        {
            Ok(true) => {}
            Ok(false) => {
                if key_event.code == KeyCode::Esc {
                    self.ctx.transient.close();
                }
            }
            Err(e) => {
                tracing::error!("Failed to edit setting {} - {}", entry.display_name, e);
                self.ctx.transient.close();
            }
        }
    }

    fn switch_pane(&mut self) {
        match &self.focus {
            Focus::Header(_) => {
                let target = self
                    .last_list_focus
                    .clone()
                    .or_else(|| self.focus_targets().into_iter().next());
                if let Some(target) = target {
                    self.focus = Focus::List(target);
                    self.normalize_focus();
                }
            }
            Focus::List(target) => {
                self.last_list_focus = Some(target.clone());
                self.focus = Focus::Header(HeaderControl::Search);
            }
        }
    }

    fn handle_header_key(&mut self, control: HeaderControl, key_event: KeyEvent) {
        let debug = self.settings.show_debug;
        match key_event {
            KeyEvent {
                code: KeyCode::Char(c),
                modifiers,
                ..
            } if control == HeaderControl::Search
                && (modifiers == KeyModifiers::NONE || modifiers == KeyModifiers::SHIFT) =>
            {
                self.search_push_char(c)
            }

            KeyEvent {
                code: KeyCode::Backspace,
                ..
            } if control == HeaderControl::Search => self.search_pop_char(),

            KeyEvent {
                code: KeyCode::Left,
                ..
            } => self.focus = Focus::Header(control.prev(debug)),

            KeyEvent {
                code: KeyCode::Right,
                ..
            } => self.focus = Focus::Header(control.next(debug)),

            KeyEvent {
                code: KeyCode::Down,
                ..
            } => self.switch_pane(),

            KeyEvent {
                code: KeyCode::Enter | KeyCode::Char(' '),
                ..
            } => self.activate(control),

            _ => {}
        }
    }

    fn activate(&mut self, control: HeaderControl) {
        if control.is_filter() && self.data.is_searching() {
            tracing::debug!("Filters do not apply while searching");
            return;
        }
        match control {
            HeaderControl::ShowSettings => {
                self.settings.show_settings = !self.settings.show_settings;
                self.filters_changed();
            }
            HeaderControl::ShowKeybinds => {
                self.settings.show_keybinds = !self.settings.show_keybinds;
                self.filters_changed();
            }
            HeaderControl::ShowAdvanced => {
                self.settings.show_advanced = !self.settings.show_advanced;
                self.filters_changed();
            }
            HeaderControl::DebugMode => {
                self.settings.show_debug = !self.settings.show_debug;
                self.refresh();
            }
            HeaderControl::Search => {}
            HeaderControl::ClearSearch => self.set_search_text(String::new()),
            HeaderControl::ExpandCollapseAll => {
                self.data.expand_collapse_all(&mut self.settings);
                self.persist_settings();
                self.normalize_focus();
            }
            HeaderControl::OpenLog => match &self.dir_context {
                Some(dir_context) => self.open_path(&dir_context.log_path()),
                None => tracing::warn!("No log file to open"),
            },
        }
    }

    fn filters_changed(&mut self) {
        self.persist_settings();
        self.data.build_filtered_setting_list(&self.settings);
        self.normalize_focus();
    }

    pub fn search_push_char(&mut self, c: char) {
        let mut text = self.data.search_text().to_string();
        text.push(c);
        self.set_search_text(text);
    }

    pub fn search_pop_char(&mut self) {
        let mut text = self.data.search_text().to_string();
        if text.pop().is_some() {
            self.set_search_text(text);
        }
    }

    pub fn set_search_text(&mut self, text: String) {
        self.data.set_search_text(text, &self.settings);
        self.scroll.offset = 0;
        self.normalize_focus();
    }

    fn handle_list_key(&mut self, target: FocusTarget, key_event: KeyEvent) {
        let consumed = match &target {
            FocusTarget::Plugin(name) => self.handle_owner_key(name, key_event),
            FocusTarget::Entry(index) => self.handle_entry_key(*index, key_event),
        };
        if consumed {
            return;
        }

        match key_event.code {
            KeyCode::Up => self.move_focus(-1),
            KeyCode::Down => self.move_focus(1),
            KeyCode::PageUp => self.move_focus(-(self.scroll.viewport.max(1) as isize)),
            KeyCode::PageDown => self.move_focus(self.scroll.viewport.max(1) as isize),
            KeyCode::Home => self.move_focus(isize::MIN),
            KeyCode::End => self.move_focus(isize::MAX),
            _ => {}
        }
    }

    fn handle_owner_key(&mut self, name: &str, key_event: KeyEvent) -> bool {
        match key_event.code {
            KeyCode::Enter | KeyCode::Char(' ') => {
                self.data.toggle_collapsed(name);
                true
            }
            KeyCode::Char('r') => {
                self.reload_owner(name);
                true
            }
            KeyCode::Char('o') => {
                self.open_owner_file(name);
                true
            }
            _ => false,
        }
    }

    fn handle_entry_key(&mut self, index: usize, key_event: KeyEvent) -> bool {
        let Some(entry) = self.data.entries().get(index) else {
            return false;
        };

        let reset = matches!(
            key_event,
            KeyEvent {
                code: KeyCode::Delete,
                ..
            } | KeyEvent {
                code: KeyCode::Char('r'),
                modifiers: KeyModifiers::CONTROL,
                ..
            }
        );
        if reset {
            match entry.reset() {
                Ok(true) => tracing::debug!("Reset {} to its default", entry.display_name),
                Ok(false) => {}
                Err(e) => tracing::error!("Failed to reset setting {} - {}", entry.display_name, e),
            }
            return true;
        }

        let strategy = self.registry.dispatch(&entry.value_type);
        match strategy
            .renderer()
            .handle_key(entry, index, key_event, &mut self.ctx)
        {
            Ok(consumed) => consumed,
            Err(e) => {
                tracing::error!("Failed to edit setting {} - {}", entry.display_name, e);
                true
            }
        }
    }

    /// Focusable list rows in presentation order
    fn focus_targets(&self) -> Vec<FocusTarget> {
        let searching = self.data.is_searching();
        let mut targets = Vec::new();
        for plugin in self.data.filtered_settings() {
            for row in owner_rows(plugin, searching, self.settings.hide_single_section) {
                match row {
                    ListRow::Header => targets.push(FocusTarget::Plugin(plugin.info.name.clone())),
                    ListRow::Entry(index) => targets.push(FocusTarget::Entry(index)),
                    ListRow::Category(_) => {}
                }
            }
        }
        targets
    }

    fn move_focus(&mut self, delta: isize) {
        let Focus::List(current) = &self.focus else {
            return;
        };
        let targets = self.focus_targets();
        if targets.is_empty() {
            return;
        }
        let position = targets.iter().position(|t| t == current).unwrap_or(0);
        if position == 0 && delta == -1 {
            self.last_list_focus = Some(targets[0].clone());
            self.focus = Focus::Header(HeaderControl::Search);
            return;
        }
        let next = if delta < 0 {
            position.saturating_sub(delta.unsigned_abs())
        } else {
            position.saturating_add(delta as usize).min(targets.len() - 1)
        };
        self.focus = Focus::List(targets[next].clone());
    }

    /// Keep list focus on a row that still exists after a rebuild or a
    /// collapse change
    fn normalize_focus(&mut self) {
        let Focus::List(current) = &self.focus else {
            return;
        };
        let targets = self.focus_targets();
        if targets.contains(current) {
            return;
        }
        let owner = match current {
            FocusTarget::Entry(index) => self
                .data
                .entries()
                .get(*index)
                .map(|entry| FocusTarget::Plugin(entry.owner.name.clone())),
            FocusTarget::Plugin(_) => None,
        };
        self.focus = match owner.filter(|o| targets.contains(o)) {
            Some(owner) => Focus::List(owner),
            None => match targets.into_iter().next() {
                Some(first) => Focus::List(first),
                None => Focus::Header(HeaderControl::Search),
            },
        };
    }

    fn plugin_info(&self, name: &str) -> Option<PluginInfo> {
        self.data
            .filtered_settings()
            .iter()
            .find(|p| p.info.name == name)
            .map(|p| p.info.clone())
    }

    /// Backing storage of an owner: a plugin's own file or the host's
    fn config_file_for(&self, name: &str) -> Option<SharedConfigFile> {
        if let Some(plugin) = self
            .host
            .plugins()
            .into_iter()
            .find(|p| p.info().name == name)
        {
            return plugin.config_file();
        }
        self.host
            .core_settings()
            .filter(|(info, _)| info.name == name)
            .map(|(_, file)| file)
    }

    fn reload_owner(&mut self, name: &str) {
        let Some(file) = self.config_file_for(name) else {
            tracing::warn!("{} has no config file to reload", name);
            return;
        };
        let result = file.borrow_mut().reload();
        if let Err(e) = result {
            tracing::warn!("Failed to reload settings of {}: {}", name, e);
            return;
        }
        self.data.build_filtered_setting_list(&self.settings);
        self.normalize_focus();
    }

    fn open_owner_file(&self, name: &str) {
        let path: Option<PathBuf> = match self.config_file_for(name) {
            Some(file) => {
                let path = file.borrow().path().to_path_buf();
                Some(path)
            }
            None => match (self.plugin_info(name), &self.dir_context) {
                (Some(info), Some(dir_context)) => Some(dir_context.plugin_config_path(&info.guid)),
                _ => None,
            },
        };
        match path {
            Some(path) => self.open_path(&path),
            None => tracing::warn!("{} has no config file to open", name),
        }
    }

    fn open_path(&self, path: &Path) {
        tracing::info!("Opening {}", path.display());
        if let Err(e) = (self.opener)(path) {
            tracing::warn!("Failed to open {}: {}", path.display(), e);
        }
    }

    fn persist_settings(&self) {
        if let Some(dir_context) = &self.dir_context {
            save_settings_or_warn(dir_context, &self.settings);
        }
    }
}
