//! Filter, search and group pipeline
//!
//! Turns the flat list of discovered entries into the presentation list the
//! renderer walks every frame: owners sorted by name, each with categories
//! and sorted entries.
//!
//! Grouping only looks at [`EntryFacts`], owned snapshots taken on the render
//! thread, so a filtered rebuild can run on a worker without calling any
//! value accessor. Its result replaces the presentation list as a whole.

use crate::config::ManagerSettings;
use crate::discovery::collect_settings;
use crate::model::{PluginHost, PluginInfo, SettingEntry};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::mpsc;
use std::thread;
use std::time::Instant;

/// Whitespace-separated search tokens, lowercased
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    tokens: Vec<String>,
}

impl SearchQuery {
    pub fn parse(text: &str) -> Self {
        Self {
            tokens: text
                .split_whitespace()
                .map(str::to_lowercase)
                .collect(),
        }
    }

    /// No tokens: the boolean filters apply instead
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Every token must occur in the (lowercased) haystack
    pub fn matches(&self, haystack: &str) -> bool {
        self.tokens.iter().all(|t| haystack.contains(t.as_str()))
    }
}

/// The three visibility filters used while not searching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterOptions {
    pub show_advanced: bool,
    pub show_keybinds: bool,
    pub show_settings: bool,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            show_advanced: false,
            show_keybinds: true,
            show_settings: true,
        }
    }
}

impl FilterOptions {
    pub fn from_settings(settings: &ManagerSettings) -> Self {
        Self {
            show_advanced: settings.show_advanced,
            show_keybinds: settings.show_keybinds,
            show_settings: settings.show_settings,
        }
    }

    pub fn admits(&self, facts: &EntryFacts) -> bool {
        if !self.show_advanced && facts.advanced == Some(true) {
            return false;
        }
        if !self.show_keybinds && facts.is_shortcut {
            return false;
        }
        if !self.show_settings && facts.advanced != Some(true) && !facts.is_shortcut {
            return false;
        }
        true
    }
}

/// Owned snapshot of everything grouping needs from one entry
#[derive(Debug, Clone)]
pub struct EntryFacts {
    /// Position in the flat entry list
    pub index: usize,
    pub owner: PluginInfo,
    pub display_name: String,
    pub category: String,
    pub order: i32,
    pub advanced: Option<bool>,
    pub is_shortcut: bool,
    pub browsable: bool,
    pub website: Option<String>,
    /// Lowercased searchable fields joined by newlines
    pub haystack: String,
}

impl EntryFacts {
    /// Snapshot an entry, reading its current value. Render thread only.
    pub fn capture(index: usize, entry: &SettingEntry, website: Option<String>) -> Self {
        let default = entry
            .default_value
            .as_ref()
            .map(|v| v.display_with(&entry.value_type))
            .unwrap_or_default();
        let current = match entry.get() {
            Ok(value) => value.display_with(&entry.value_type),
            Err(e) => {
                tracing::debug!("Search text of {} has no current value: {}", entry.display_name, e);
                String::new()
            }
        };
        let haystack = [
            entry.owner.name.as_str(),
            entry.owner.guid.as_str(),
            entry.display_name.as_str(),
            entry.category.as_str(),
            entry.description.as_str(),
            default.as_str(),
            current.as_str(),
        ]
        .join("\n")
        .to_lowercase();

        Self {
            index,
            owner: entry.owner.clone(),
            display_name: entry.display_name.clone(),
            category: entry.category.clone(),
            order: entry.order,
            advanced: entry.is_advanced,
            is_shortcut: entry.is_keyboard_shortcut(),
            browsable: entry.browsable,
            website,
            haystack,
        }
    }
}

/// One category of an owner, entries as indices into the flat list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginSettingsGroup {
    pub name: String,
    pub entries: Vec<usize>,
}

/// Presentation data of one owner
#[derive(Debug, Clone, PartialEq)]
pub struct PluginSettingsData {
    pub info: PluginInfo,
    pub groups: Vec<PluginSettingsGroup>,
    pub website: Option<String>,
    collapsed: bool,
    cached_height: u16,
}

impl PluginSettingsData {
    pub fn new(info: PluginInfo, groups: Vec<PluginSettingsGroup>, collapsed: bool) -> Self {
        Self {
            info,
            groups,
            website: None,
            collapsed,
            cached_height: 0,
        }
    }

    pub fn collapsed(&self) -> bool {
        self.collapsed
    }

    /// Changing the collapse state forces the next frame to measure again
    pub fn set_collapsed(&mut self, collapsed: bool) {
        self.collapsed = collapsed;
        self.cached_height = 0;
    }

    /// Rows this owner took when last fully drawn; 0 means never measured
    pub fn cached_height(&self) -> u16 {
        self.cached_height
    }

    pub fn set_cached_height(&mut self, height: u16) {
        self.cached_height = height;
    }

    pub fn entry_count(&self) -> usize {
        self.groups.iter().map(|g| g.entries.len()).sum()
    }

    pub fn entries(&self) -> impl Iterator<Item = usize> + '_ {
        self.groups.iter().flat_map(|g| g.entries.iter().copied())
    }
}

/// Filter and group entry facts, every owner collapsed as `collapsed_default`
pub fn group_entries(
    facts: &[EntryFacts],
    query: &SearchQuery,
    filters: FilterOptions,
    collapsed_default: bool,
) -> Vec<PluginSettingsData> {
    let surviving = facts.iter().filter(|f| f.browsable).filter(|f| {
        if query.is_empty() {
            filters.admits(f)
        } else {
            query.matches(&f.haystack)
        }
    });

    // BTreeMap by raw owner name gives the final ordinal owner order
    let mut by_owner: BTreeMap<&str, Vec<&EntryFacts>> = BTreeMap::new();
    for f in surviving {
        by_owner.entry(f.owner.name.as_str()).or_default().push(f);
    }

    by_owner
        .into_values()
        .map(|owner_facts| {
            let mut category_order: Vec<&str> = Vec::new();
            for f in &owner_facts {
                if !category_order.contains(&f.category.as_str()) {
                    category_order.push(f.category.as_str());
                }
            }

            let groups = category_order
                .iter()
                .map(|&category| {
                    let mut members: Vec<&EntryFacts> = owner_facts
                        .iter()
                        .copied()
                        .filter(|f| f.category == category)
                        .collect();
                    members.sort_by(|a, b| {
                        b.order
                            .cmp(&a.order)
                            .then_with(|| a.display_name.cmp(&b.display_name))
                    });
                    PluginSettingsGroup {
                        name: category.to_string(),
                        entries: members.iter().map(|f| f.index).collect(),
                    }
                })
                .collect();

            let first = owner_facts[0];
            let mut data = PluginSettingsData::new(first.owner.clone(), groups, collapsed_default);
            data.website = owner_facts.iter().find_map(|f| f.website.clone());
            data
        })
        .collect()
}

/// Keep manual collapse overrides from `previous` in `next`.
///
/// Owners whose previous state differed from `collapsed_default` get the
/// opposite of the default; every other owner gets the default.
pub fn carry_over_collapse(
    next: &mut [PluginSettingsData],
    previous: &[PluginSettingsData],
    collapsed_default: bool,
) {
    let overridden: HashSet<&str> = previous
        .iter()
        .filter(|p| p.collapsed() != collapsed_default)
        .map(|p| p.info.name.as_str())
        .collect();

    for data in next.iter_mut() {
        let collapsed = if overridden.contains(data.info.name.as_str()) {
            !collapsed_default
        } else {
            collapsed_default
        };
        data.set_collapsed(collapsed);
    }
}

/// Filtered rebuild against the current presentation list
pub fn rebuild(
    facts: &[EntryFacts],
    query: &SearchQuery,
    filters: FilterOptions,
    collapsed_default: bool,
    previous: &[PluginSettingsData],
) -> Vec<PluginSettingsData> {
    let mut next = group_entries(facts, query, filters, collapsed_default);
    carry_over_collapse(&mut next, previous, collapsed_default);
    next
}

struct RebuildJob {
    generation: u64,
    facts: Vec<EntryFacts>,
    query: SearchQuery,
    filters: FilterOptions,
    collapsed_default: bool,
}

struct RebuildResult {
    generation: u64,
    groups: Vec<PluginSettingsData>,
}

/// Worker thread running filtered rebuilds off the render thread
struct RebuildWorker {
    jobs: mpsc::Sender<RebuildJob>,
    results: mpsc::Receiver<RebuildResult>,
}

impl RebuildWorker {
    fn spawn() -> std::io::Result<Self> {
        let (job_tx, job_rx) = mpsc::channel::<RebuildJob>();
        let (result_tx, result_rx) = mpsc::channel();

        thread::Builder::new()
            .name("confman-rebuild".to_string())
            .spawn(move || {
                while let Ok(mut job) = job_rx.recv() {
                    // Only the newest queued job matters
                    while let Ok(newer) = job_rx.try_recv() {
                        job = newer;
                    }
                    let groups =
                        group_entries(&job.facts, &job.query, job.filters, job.collapsed_default);
                    let sent = result_tx.send(RebuildResult {
                        generation: job.generation,
                        groups,
                    });
                    if sent.is_err() {
                        break;
                    }
                }
            })?;

        Ok(Self {
            jobs: job_tx,
            results: result_rx,
        })
    }
}

/// Owns the flat entries and the presentation list derived from them
pub struct SettingsDataManager {
    entries: Vec<SettingEntry>,
    facts: Vec<EntryFacts>,
    websites: HashMap<String, String>,
    filtered: Vec<PluginSettingsData>,
    search_text: String,
    owners_without_settings: String,
    generation: u64,
    /// Generation of the background rebuild not yet swapped in
    pending: Option<u64>,
    worker: Option<RebuildWorker>,
}

impl Default for SettingsDataManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsDataManager {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            facts: Vec::new(),
            websites: HashMap::new(),
            filtered: Vec::new(),
            search_text: String::new(),
            owners_without_settings: String::new(),
            generation: 0,
            pending: None,
            worker: None,
        }
    }

    /// Run filtered rebuilds on a worker thread; results arrive via
    /// [`poll_rebuild`](Self::poll_rebuild)
    pub fn with_background_rebuild(mut self) -> Self {
        match RebuildWorker::spawn() {
            Ok(worker) => self.worker = Some(worker),
            Err(e) => tracing::warn!("Failed to start rebuild worker, rebuilding inline: {}", e),
        }
        self
    }

    pub fn entries(&self) -> &[SettingEntry] {
        &self.entries
    }

    pub fn filtered_settings(&self) -> &[PluginSettingsData] {
        &self.filtered
    }

    /// Entries for reading alongside the presentation list for writing
    pub fn split_mut(&mut self) -> (&[SettingEntry], &mut [PluginSettingsData]) {
        (&self.entries, &mut self.filtered)
    }

    /// Display names of owners without settings, sorted, comma separated
    pub fn owners_without_settings(&self) -> &str {
        &self.owners_without_settings
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn is_searching(&self) -> bool {
        !SearchQuery::parse(&self.search_text).is_empty()
    }

    /// A background rebuild has been requested and not yet applied
    pub fn is_rebuilding(&self) -> bool {
        self.pending.is_some()
    }

    /// Update the search text; an unchanged text does nothing
    pub fn set_search_text(&mut self, text: impl Into<String>, settings: &ManagerSettings) {
        let text = text.into();
        if text == self.search_text {
            return;
        }
        self.search_text = text;
        self.build_filtered_setting_list(settings);
    }

    /// Full rebuild: rediscover every entry, then rebuild the presentation
    /// list inline
    pub fn build_setting_list(&mut self, host: &dyn PluginHost, settings: &ManagerSettings) {
        let start = Instant::now();
        let discovered = collect_settings(host, settings.show_debug);

        self.owners_without_settings = discovered.owners_without_settings_text();
        self.websites = host
            .plugins()
            .iter()
            .filter_map(|p| p.website().map(|url| (p.info().name.clone(), url)))
            .collect();
        self.entries = discovered.entries;
        self.capture_facts();

        // Results of rebuilds started before this point refer to old indices
        self.generation += 1;
        self.pending = None;
        let groups = self.rebuild_inline(settings);
        self.apply(groups, settings.plugin_collapsed_default);

        tracing::debug!(
            "Full rebuild: {} entries, {} owners shown in {:?}",
            self.entries.len(),
            self.filtered.len(),
            start.elapsed()
        );
    }

    /// Filtered rebuild: apply search and filters to the current entries
    pub fn build_filtered_setting_list(&mut self, settings: &ManagerSettings) {
        let start = Instant::now();
        let query = SearchQuery::parse(&self.search_text);
        if !query.is_empty() {
            // Searching matches current values, which may have changed
            self.capture_facts();
        }

        self.generation += 1;
        let filters = FilterOptions::from_settings(settings);
        let collapsed_default = settings.plugin_collapsed_default;

        if let Some(worker) = &self.worker {
            let job = RebuildJob {
                generation: self.generation,
                facts: self.facts.clone(),
                query: query.clone(),
                filters,
                collapsed_default,
            };
            if worker.jobs.send(job).is_ok() {
                self.pending = Some(self.generation);
                return;
            }
            tracing::warn!("Rebuild worker stopped, rebuilding inline");
            self.worker = None;
        }

        let groups = group_entries(&self.facts, &query, filters, collapsed_default);
        self.apply(groups, collapsed_default);
        tracing::debug!(
            "Filtered rebuild: {} owners in {:?}",
            self.filtered.len(),
            start.elapsed()
        );
    }

    /// Swap in the newest finished background rebuild, discarding
    /// superseded ones. Returns whether the presentation list changed.
    ///
    /// Collapse state is carried over against the current default, which
    /// may have been flipped after the rebuild was requested.
    pub fn poll_rebuild(&mut self, settings: &ManagerSettings) -> bool {
        let Some(worker) = &self.worker else {
            return false;
        };

        let mut newest = None;
        while let Ok(result) = worker.results.try_recv() {
            if result.generation == self.generation {
                newest = Some(result);
            }
        }

        match newest {
            Some(result) => {
                self.pending = None;
                self.apply(result.groups, settings.plugin_collapsed_default);
                true
            }
            None => false,
        }
    }

    /// Flip the persisted default and apply it to every owner
    pub fn expand_collapse_all(&mut self, settings: &mut ManagerSettings) {
        let collapsed = !settings.plugin_collapsed_default;
        settings.plugin_collapsed_default = collapsed;
        for data in &mut self.filtered {
            data.set_collapsed(collapsed);
        }
    }

    /// Toggle one owner. Ignored while searching, where every owner is
    /// shown expanded.
    pub fn toggle_collapsed(&mut self, owner_name: &str) -> bool {
        if self.is_searching() {
            return false;
        }
        match self.filtered.iter_mut().find(|d| d.info.name == owner_name) {
            Some(data) => {
                let collapsed = !data.collapsed();
                data.set_collapsed(collapsed);
                true
            }
            None => false,
        }
    }

    fn capture_facts(&mut self) {
        self.facts = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                EntryFacts::capture(i, entry, self.websites.get(&entry.owner.name).cloned())
            })
            .collect();
    }

    fn rebuild_inline(&self, settings: &ManagerSettings) -> Vec<PluginSettingsData> {
        group_entries(
            &self.facts,
            &SearchQuery::parse(&self.search_text),
            FilterOptions::from_settings(settings),
            settings.plugin_collapsed_default,
        )
    }

    fn apply(&mut self, mut groups: Vec<PluginSettingsData>, collapsed_default: bool) {
        carry_over_collapse(&mut groups, &self.filtered, collapsed_default);
        self.filtered = groups;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::DiscoveryError;
    use crate::model::{Plugin, PluginRegistry, SettingValue, ValueType};
    use proptest::prelude::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn fact(index: usize, owner: &str, name: &str, category: &str) -> EntryFacts {
        let owner = PluginInfo::new(owner, format!("guid.{}", owner.to_lowercase()), "1.0");
        let haystack = [owner.name.as_str(), owner.guid.as_str(), name, category]
            .join("\n")
            .to_lowercase();
        EntryFacts {
            index,
            owner,
            display_name: name.to_string(),
            category: category.to_string(),
            order: 0,
            advanced: None,
            is_shortcut: false,
            browsable: true,
            website: None,
            haystack,
        }
    }

    fn shown(groups: &[PluginSettingsData]) -> Vec<usize> {
        groups.iter().flat_map(|g| g.entries().collect::<Vec<_>>()).collect()
    }

    #[test]
    fn test_search_query_parse() {
        let query = SearchQuery::parse("  Beta   X ");
        assert_eq!(query.tokens(), &["beta".to_string(), "x".to_string()]);
        assert!(SearchQuery::parse("   ").is_empty());
        assert!(query.matches("beta\ncategory x"));
        assert!(!query.matches("beta only"));
    }

    #[test]
    fn test_search_query_splits_on_any_whitespace() {
        let tokens = vec!["beta".to_string(), "x".to_string()];
        assert_eq!(SearchQuery::parse("beta\tx").tokens(), tokens.as_slice());
        assert_eq!(SearchQuery::parse("Beta\n X\r\n").tokens(), tokens.as_slice());
        assert!(SearchQuery::parse("\t\n").is_empty());
    }

    #[test]
    fn test_filters() {
        let mut advanced = fact(0, "A", "adv", "");
        advanced.advanced = Some(true);
        let mut shortcut = fact(1, "A", "key", "");
        shortcut.is_shortcut = true;
        let plain = fact(2, "A", "plain", "");
        let mut explicit_plain = fact(3, "A", "explicit", "");
        explicit_plain.advanced = Some(false);

        let only_settings = FilterOptions {
            show_advanced: false,
            show_keybinds: false,
            show_settings: true,
        };
        assert!(!only_settings.admits(&advanced));
        assert!(!only_settings.admits(&shortcut));
        assert!(only_settings.admits(&plain));
        assert!(only_settings.admits(&explicit_plain));

        let no_plain = FilterOptions {
            show_advanced: true,
            show_keybinds: true,
            show_settings: false,
        };
        assert!(no_plain.admits(&advanced));
        assert!(no_plain.admits(&shortcut));
        assert!(!no_plain.admits(&plain));
    }

    #[test]
    fn test_grouping_and_ordering() {
        let mut facts = vec![
            fact(0, "Zeta", "z", ""),
            fact(1, "Alpha", "b", "Second"),
            fact(2, "Alpha", "a", "First"),
            fact(3, "Alpha", "c", "Second"),
            fact(4, "Alpha", "d", "Second"),
        ];
        facts[3].order = 5;

        let groups = group_entries(&facts, &SearchQuery::default(), FilterOptions::default(), true);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].info.name, "Alpha");
        assert_eq!(groups[1].info.name, "Zeta");

        let alpha = &groups[0];
        let names: Vec<&str> = alpha.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Second", "First"]);
        // Higher order first, then by name
        assert_eq!(alpha.groups[0].entries, vec![3, 1, 4]);
        assert!(alpha.collapsed());
        assert_eq!(alpha.cached_height(), 0);
    }

    #[test]
    fn test_bang_prefix_sorts_first() {
        let facts = vec![fact(0, "Alpha", "a", ""), fact(1, "!Core", "c", "")];
        let groups = group_entries(&facts, &SearchQuery::default(), FilterOptions::default(), true);
        assert_eq!(groups[0].info.name, "!Core");
    }

    #[test]
    fn test_search_ignores_filters() {
        let mut advanced = fact(0, "Beta", "Hidden gem", "X");
        advanced.advanced = Some(true);
        let facts = vec![advanced];

        let filters = FilterOptions::default();
        assert!(group_entries(&facts, &SearchQuery::default(), filters, true).is_empty());
        let found = group_entries(&facts, &SearchQuery::parse("gem"), filters, true);
        assert_eq!(shown(&found), vec![0]);
    }

    #[test]
    fn test_collapse_carry_over() {
        let facts = vec![fact(0, "A", "a", ""), fact(1, "B", "b", "")];
        let query = SearchQuery::default();
        let filters = FilterOptions::default();

        let mut previous = rebuild(&facts, &query, filters, true, &[]);
        // A manually expanded against a collapsed default
        previous[0].set_collapsed(false);

        let same_default = rebuild(&facts, &query, filters, true, &previous);
        assert!(!same_default[0].collapsed());
        assert!(same_default[1].collapsed());

        // Flipping the default keeps both owners where they were
        let flipped = rebuild(&facts, &query, filters, false, &previous);
        assert!(!flipped[0].collapsed());
        assert!(flipped[1].collapsed());
    }

    #[test]
    fn test_set_collapsed_invalidates_height() {
        let mut data = PluginSettingsData::new(PluginInfo::new("A", "a", "1"), Vec::new(), true);
        data.set_cached_height(12);
        data.set_collapsed(false);
        assert_eq!(data.cached_height(), 0);
    }

    fn arb_fact() -> impl Strategy<Value = (String, String, Option<bool>, bool, bool)> {
        (
            prop::sample::select(vec!["Alpha", "Beta", "Gamma"]),
            "[a-c]{1,4}",
            prop::option::of(any::<bool>()),
            any::<bool>(),
            any::<bool>(),
        )
            .prop_map(|(owner, name, adv, shortcut, browsable)| {
                (owner.to_string(), name, adv, shortcut, browsable)
            })
    }

    fn build_facts(raw: &[(String, String, Option<bool>, bool, bool)]) -> Vec<EntryFacts> {
        raw.iter()
            .enumerate()
            .map(|(i, (owner, name, adv, shortcut, browsable))| {
                let mut f = fact(i, owner, name, "");
                f.advanced = *adv;
                f.is_shortcut = *shortcut;
                f.browsable = *browsable;
                f
            })
            .collect()
    }

    proptest! {
        #[test]
        fn prop_non_browsable_never_shown(
            raw in prop::collection::vec(arb_fact(), 0..24),
            search in "[a-c ]{0,5}",
            show_advanced: bool,
            show_keybinds: bool,
            show_settings: bool,
        ) {
            let facts = build_facts(&raw);
            let filters = FilterOptions { show_advanced, show_keybinds, show_settings };
            let groups = group_entries(&facts, &SearchQuery::parse(&search), filters, true);
            for index in shown(&groups) {
                prop_assert!(facts[index].browsable);
            }
        }

        #[test]
        fn prop_search_matches_contain_every_token(
            raw in prop::collection::vec(arb_fact(), 0..24),
            search in "[a-cA-C ]{1,6}",
        ) {
            let facts = build_facts(&raw);
            let query = SearchQuery::parse(&search);
            prop_assume!(!query.is_empty());
            let groups = group_entries(&facts, &query, FilterOptions::default(), true);
            let matched: HashSet<usize> = shown(&groups).into_iter().collect();
            for f in facts.iter().filter(|f| f.browsable) {
                let all_tokens = query
                    .tokens()
                    .iter()
                    .all(|t| f.haystack.contains(t.as_str()));
                prop_assert_eq!(matched.contains(&f.index), all_tokens);
            }
        }

        #[test]
        fn prop_hiding_advanced_removes_only_advanced(
            raw in prop::collection::vec(arb_fact(), 0..24),
            show_keybinds: bool,
            show_settings: bool,
        ) {
            let facts = build_facts(&raw);
            let query = SearchQuery::default();
            let with = FilterOptions { show_advanced: true, show_keybinds, show_settings };
            let without = FilterOptions { show_advanced: false, ..with };

            let before: HashSet<usize> = shown(&group_entries(&facts, &query, with, true)).into_iter().collect();
            let after: HashSet<usize> = shown(&group_entries(&facts, &query, without, true)).into_iter().collect();
            let removed: HashSet<usize> = before.difference(&after).copied().collect();
            let advanced: HashSet<usize> = before
                .iter()
                .copied()
                .filter(|&i| facts[i].advanced == Some(true))
                .collect();
            prop_assert!(after.is_subset(&before));
            prop_assert_eq!(removed, advanced);
        }
    }

    struct CounterPlugin {
        info: PluginInfo,
        value: Rc<Cell<i64>>,
    }

    impl Plugin for CounterPlugin {
        fn info(&self) -> &PluginInfo {
            &self.info
        }

        fn describe_settings(&self) -> Result<Vec<SettingEntry>, DiscoveryError> {
            let read = self.value.clone();
            let write = self.value.clone();
            Ok(vec![SettingEntry::property(
                self.info.clone(),
                "Counter",
                ValueType::int(),
                move || Ok(SettingValue::Int(read.get())),
                move |v| match v {
                    SettingValue::Int(i) => {
                        write.set(i);
                        Ok(())
                    }
                    _ => Err("expected int".to_string()),
                },
            )])
        }

        fn website(&self) -> Option<String> {
            Some("https://example.com/counter".to_string())
        }
    }

    struct EmptyPlugin(PluginInfo);

    impl Plugin for EmptyPlugin {
        fn info(&self) -> &PluginInfo {
            &self.0
        }

        fn describe_settings(&self) -> Result<Vec<SettingEntry>, DiscoveryError> {
            Ok(Vec::new())
        }
    }

    fn registry(value: Rc<Cell<i64>>) -> PluginRegistry {
        let mut registry = PluginRegistry::new();
        registry.register(Rc::new(CounterPlugin {
            info: PluginInfo::new("Counter", "com.test.counter", "2.0"),
            value,
        }));
        registry.register(Rc::new(EmptyPlugin(PluginInfo::new(
            "!Quiet", "com.test.quiet", "1.0",
        ))));
        registry
    }

    #[test]
    fn test_manager_full_rebuild() {
        let settings = ManagerSettings::default();
        let mut manager = SettingsDataManager::new();
        manager.build_setting_list(&registry(Rc::new(Cell::new(1))), &settings);

        assert_eq!(manager.entries().len(), 1);
        assert_eq!(manager.filtered_settings().len(), 1);
        assert_eq!(
            manager.filtered_settings()[0].website.as_deref(),
            Some("https://example.com/counter")
        );
        assert_eq!(manager.owners_without_settings(), "Quiet");
    }

    #[test]
    fn test_search_sees_current_values() {
        let settings = ManagerSettings::default();
        let value = Rc::new(Cell::new(1));
        let mut manager = SettingsDataManager::new();
        manager.build_setting_list(&registry(value.clone()), &settings);

        value.set(4242);
        manager.set_search_text("4242", &settings);
        assert_eq!(manager.filtered_settings().len(), 1);

        manager.set_search_text("9999", &settings);
        assert!(manager.filtered_settings().is_empty());
    }

    #[test]
    fn test_toggle_collapsed_ignored_while_searching() {
        let settings = ManagerSettings::default();
        let mut manager = SettingsDataManager::new();
        manager.build_setting_list(&registry(Rc::new(Cell::new(1))), &settings);

        assert!(manager.toggle_collapsed("Counter"));
        assert!(!manager.filtered_settings()[0].collapsed());

        manager.set_search_text("counter", &settings);
        assert!(!manager.toggle_collapsed("Counter"));
        assert!(manager.is_searching());
    }

    #[test]
    fn test_expand_collapse_all_flips_default() {
        let mut settings = ManagerSettings::default();
        let mut manager = SettingsDataManager::new();
        manager.build_setting_list(&registry(Rc::new(Cell::new(1))), &settings);
        assert!(manager.filtered_settings()[0].collapsed());

        manager.expand_collapse_all(&mut settings);
        assert!(!settings.plugin_collapsed_default);
        assert!(!manager.filtered_settings()[0].collapsed());

        // A rebuild keeps the new default
        manager.build_filtered_setting_list(&settings);
        assert!(!manager.filtered_settings()[0].collapsed());
    }

    #[test]
    fn test_background_rebuild_last_writer_wins() {
        let settings = ManagerSettings::default();
        let mut manager = SettingsDataManager::new().with_background_rebuild();
        manager.build_setting_list(&registry(Rc::new(Cell::new(1))), &settings);
        assert_eq!(manager.filtered_settings().len(), 1);

        manager.set_search_text("nothing-matches", &settings);
        manager.set_search_text("counter", &settings);
        assert!(manager.is_rebuilding());

        let deadline = Instant::now() + std::time::Duration::from_secs(5);
        while manager.is_rebuilding() && Instant::now() < deadline {
            manager.poll_rebuild(&settings);
            thread::sleep(std::time::Duration::from_millis(5));
        }
        assert!(!manager.is_rebuilding());
        assert_eq!(manager.filtered_settings().len(), 1);
    }

    fn wait_for_rebuild(manager: &mut SettingsDataManager, settings: &ManagerSettings) {
        let deadline = Instant::now() + std::time::Duration::from_secs(5);
        while manager.is_rebuilding() && Instant::now() < deadline {
            manager.poll_rebuild(settings);
            thread::sleep(std::time::Duration::from_millis(5));
        }
        assert!(!manager.is_rebuilding());
    }

    fn two_counters() -> PluginRegistry {
        let mut registry = PluginRegistry::new();
        for name in ["A", "B"] {
            registry.register(Rc::new(CounterPlugin {
                info: PluginInfo::new(name, format!("com.test.{}", name.to_lowercase()), "1.0"),
                value: Rc::new(Cell::new(0)),
            }));
        }
        registry
    }

    fn collapse_state(manager: &SettingsDataManager) -> Vec<(String, bool)> {
        manager
            .filtered_settings()
            .iter()
            .map(|p| (p.info.name.clone(), p.collapsed()))
            .collect()
    }

    #[test]
    fn test_default_flip_while_rebuild_pending() {
        let mut settings = ManagerSettings::default();
        let mut manager = SettingsDataManager::new().with_background_rebuild();
        manager.build_setting_list(&two_counters(), &settings);

        manager.set_search_text("zzz", &settings);
        wait_for_rebuild(&mut manager, &settings);
        assert!(manager.filtered_settings().is_empty());

        // Requested with the collapsed default, applied after it flipped
        manager.set_search_text("", &settings);
        manager.expand_collapse_all(&mut settings);
        assert!(!settings.plugin_collapsed_default);
        wait_for_rebuild(&mut manager, &settings);

        let expanded = vec![("A".to_string(), false), ("B".to_string(), false)];
        assert_eq!(collapse_state(&manager), expanded);

        manager.build_filtered_setting_list(&settings);
        wait_for_rebuild(&mut manager, &settings);
        assert_eq!(collapse_state(&manager), expanded);
    }

    #[test]
    fn test_stopped_worker_falls_back_to_inline_rebuild() {
        let settings = ManagerSettings::default();
        let mut manager = SettingsDataManager::new();
        manager.build_setting_list(&two_counters(), &settings);

        let (jobs, job_rx) = mpsc::channel();
        drop(job_rx);
        let (_result_tx, results) = mpsc::channel();
        manager.worker = Some(RebuildWorker { jobs, results });

        manager.set_search_text("b", &settings);
        assert!(manager.worker.is_none());
        assert!(!manager.is_rebuilding());
        let owners: Vec<&str> = manager
            .filtered_settings()
            .iter()
            .map(|p| p.info.name.as_str())
            .collect();
        assert_eq!(owners, vec!["B"]);
    }
}
