//! One lookup overlay bound to one mounted region.
//!
//! The session is driven by host events: toggle clicks, segmentation slices,
//! pointer enter/leave on units and key releases. Everything runs on the
//! caller's thread; only the dictionary fetch is spawned onto the runtime.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::dom::{Document, NodeId};
use crate::error::{DictionaryLoadError, DocumentError};
use crate::navigate::{self, CURRENT_CLASS, FALLBACK_CLASS, UnitFilter};
use crate::notify::{MessageOptions, Notifier};
use crate::popup::{Layout, Popup, PopupPresenter};
use crate::profile::{Messages, ScriptProfile};
use crate::resolve::{MatchResult, Resolver};
use crate::segment::{SegmentProgress, SegmentStats, Segmenter};
use crate::storage::FlagStorage;
use crate::store::{DictionaryStore, LoadState};

/// Collaborators supplied by the host page.
pub struct HostServices {
    pub notifier: Arc<dyn Notifier>,
    pub storage: Arc<dyn FlagStorage>,
    pub layout: Box<dyn Layout>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Left,
    Right,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub shift: bool,
}

impl KeyEvent {
    pub fn new(key: Key) -> Self {
        Self { key, shift: false }
    }

    pub fn shifted(key: Key) -> Self {
        Self { key, shift: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Not ours; the host keeps its default behaviour.
    Ignored,
    /// Consumed (default prevented) without moving.
    Handled,
    Moved(NodeId),
}

pub struct LookupSession {
    profile: ScriptProfile,
    store: DictionaryStore,
    resolver: Resolver,
    document: Document,
    snapshot: Option<Document>,
    active: bool,
    current: Option<NodeId>,
    match_anchor: Option<NodeId>,
    highlighted: Vec<NodeId>,
    hover_depth: usize,
    segmenter: Segmenter,
    presenter: PopupPresenter,
    notifier: Arc<dyn Notifier>,
    storage: Arc<dyn FlagStorage>,
    layout: Box<dyn Layout>,
}

impl LookupSession {
    /// Mounts the region's current markup; the session starts inactive.
    pub fn mount(
        profile: ScriptProfile,
        store: DictionaryStore,
        markup: &str,
        host: HostServices,
    ) -> Result<Self, DocumentError> {
        let document = Document::parse(markup)?;
        let resolver = Resolver::new(store.clone(), profile.window(), profile.lexicon_url());
        let segmenter = Segmenter::new(profile.batch_size());
        Ok(Self {
            profile,
            store,
            resolver,
            document,
            snapshot: None,
            active: false,
            current: None,
            match_anchor: None,
            highlighted: Vec::new(),
            hover_depth: 0,
            segmenter,
            presenter: PopupPresenter::new(),
            notifier: host.notifier,
            storage: host.storage,
            layout: host.layout,
        })
    }

    pub fn profile(&self) -> &ScriptProfile {
        &self.profile
    }

    pub fn store(&self) -> &DictionaryStore {
        &self.store
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// While true the host should disable its toggle button.
    pub fn is_segmenting(&self) -> bool {
        self.segmenter.is_running()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Current inner markup of the mounted region.
    pub fn markup(&self) -> String {
        self.document.serialize()
    }

    pub fn current(&self) -> Option<NodeId> {
        self.current
    }

    pub fn match_anchor(&self) -> Option<NodeId> {
        self.match_anchor
    }

    pub fn hover_depth(&self) -> usize {
        self.hover_depth
    }

    pub fn popup(&self) -> Option<&Popup> {
        self.presenter.current()
    }

    /// Reactivates when the persisted flag says the lookup was on.
    pub fn restore_persisted_state(&mut self) -> Option<JoinHandle<LoadState>> {
        let key = self.profile.storage_key()?.to_string();
        match self.storage.get_flag(&key) {
            Ok(Some(true)) => self.activate(),
            Ok(_) => None,
            Err(err) => {
                warn!(error = %err, key = %key, "lookup state storage unavailable");
                None
            }
        }
    }

    /// Flips the active flag; ignored while a segmentation pass runs.
    pub fn toggle(&mut self) -> Option<JoinHandle<LoadState>> {
        if self.segmenter.is_running() {
            debug!("toggle ignored while segmenting");
            return None;
        }
        if self.active {
            self.deactivate();
            None
        } else {
            self.activate()
        }
    }

    /// Snapshots the region, requests the dictionary and starts segmenting.
    ///
    /// Returns the dictionary load task when this call started one.
    pub fn activate(&mut self) -> Option<JoinHandle<LoadState>> {
        if self.active {
            return None;
        }
        if self.snapshot.is_none() {
            self.snapshot = Some(self.document.clone());
        }
        self.active = true;
        info!(profile = self.profile.name(), "lookup activated");
        let load = self.request_dictionary();
        self.segmenter.start(&self.document);
        self.persist(true);
        load
    }

    /// Restores the snapshot and drops all lookup state.
    pub fn deactivate(&mut self) {
        if !self.active {
            return;
        }
        self.presenter.dismiss();
        if let Some(snapshot) = self.snapshot.take() {
            self.document = snapshot;
        }
        self.active = false;
        self.current = None;
        self.match_anchor = None;
        self.highlighted.clear();
        self.hover_depth = 0;
        self.segmenter.reset();

        let messages = self.profile.messages();
        self.notifier.clear();
        self.notifier.show(
            &messages.disabled,
            MessageOptions::with_timeout(messages.disabled_timeout),
        );
        info!(profile = self.profile.name(), "lookup deactivated");
        self.persist(false);
    }

    fn request_dictionary(&mut self) -> Option<JoinHandle<LoadState>> {
        if self.store.state() != LoadState::Unloaded {
            return None;
        }
        let messages = self.profile.messages().clone();
        self.notifier.clear();
        self.notifier
            .show(&messages.loading, MessageOptions::with_id(&messages.loading_id));

        match Handle::try_current() {
            Ok(handle) => {
                let store = self.store.clone();
                let notifier = Arc::clone(&self.notifier);
                Some(handle.spawn(async move {
                    let state = store.ensure_loaded().await;
                    report_load(&*notifier, &messages, &store, state);
                    state
                }))
            }
            Err(_) => {
                let state = self.store.fail(DictionaryLoadError::NoRuntime);
                report_load(&*self.notifier, &messages, &self.store, state);
                None
            }
        }
    }

    /// Runs one segmentation slice.
    pub fn segment_step(&mut self) -> SegmentProgress {
        let progress = self.segmenter.step(&mut self.document, &self.profile);
        if let SegmentProgress::Complete(_) = progress {
            if self.active && self.current.is_none() {
                self.current = navigate::first(&self.document, UnitFilter::SkipPunctuation);
                self.match_anchor = self.current;
            }
        }
        progress
    }

    /// Drives slices to completion, pausing between them so other tasks run.
    pub async fn run_segmentation(&mut self) -> SegmentStats {
        while self.segmenter.is_running() {
            if let SegmentProgress::Complete(stats) = self.segment_step() {
                return stats;
            }
            let delay = self.profile.slice_delay();
            if delay.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(delay).await;
            }
        }
        self.segmenter.stats()
    }

    pub fn pointer_enter(&mut self, node: NodeId) -> Option<MatchResult> {
        if !self.active || !navigate::is_unit(&self.document, node) {
            return None;
        }
        self.hover_depth += 1;
        if navigate::is_punctuation(&self.document, node) {
            // Punctuation never becomes current, but it still clears the old lookup.
            self.clear_lookup();
            return None;
        }
        Some(self.set_current(node))
    }

    pub fn pointer_leave(&mut self, node: NodeId) {
        if navigate::is_unit(&self.document, node) {
            self.hover_depth = self.hover_depth.saturating_sub(1);
        }
    }

    /// Pointer left the popup.
    pub fn popup_pointer_leave(&mut self) {
        self.presenter.pointer_leave();
    }

    /// Arrow navigation; only active while the pointer is over a unit.
    pub fn key_up(&mut self, event: KeyEvent) -> KeyOutcome {
        if !self.active || self.hover_depth == 0 {
            return KeyOutcome::Ignored;
        }
        let target = match event.key {
            Key::Right => {
                let from = if event.shift {
                    self.match_anchor.or(self.current)
                } else {
                    self.current
                };
                from.filter(|id| self.document.is_attached(*id))
                    .and_then(|id| navigate::next(&self.document, id, UnitFilter::SkipPunctuation))
            }
            Key::Left => self
                .current
                .filter(|id| self.document.is_attached(*id))
                .and_then(|id| {
                    navigate::previous(&self.document, id, UnitFilter::SkipPunctuation)
                }),
            Key::Other => return KeyOutcome::Ignored,
        };
        match target {
            Some(node) => {
                self.set_current(node);
                KeyOutcome::Moved(node)
            }
            None => KeyOutcome::Handled,
        }
    }

    /// Moves the current position and refreshes highlight and popup.
    pub fn set_current(&mut self, node: NodeId) -> MatchResult {
        self.clear_lookup();
        if !self.document.is_attached(node)
            || !navigate::is_unit(&self.document, node)
            || navigate::is_punctuation(&self.document, node)
        {
            return MatchResult::default();
        }
        self.current = Some(node);

        let result = self.resolver.resolve(&self.document, node);
        let Some(winner) = result.winner() else {
            self.match_anchor = Some(node);
            return result;
        };
        for &id in &result.matched {
            self.document.add_class(id, CURRENT_CLASS);
            if winner.is_fallback {
                self.document.add_class(id, FALLBACK_CLASS);
            }
        }
        self.highlighted = result.matched.clone();
        self.match_anchor = result.anchor();
        if let Some(&first) = result.matched.first() {
            self.presenter
                .present(self.layout.as_ref(), &self.document, first, &result.rows);
        }
        debug!(
            rows = result.rows.len(),
            matched = result.matched.len(),
            "lookup resolved"
        );
        result
    }

    /// Removes the popup and the match highlight; `current` is kept.
    fn clear_lookup(&mut self) {
        self.presenter.dismiss();
        for id in std::mem::take(&mut self.highlighted) {
            self.document.remove_class(id, CURRENT_CLASS);
            self.document.remove_class(id, FALLBACK_CLASS);
        }
    }

    fn persist(&self, active: bool) {
        let Some(key) = self.profile.storage_key() else {
            return;
        };
        if let Err(err) = self.storage.set_flag(key, active) {
            warn!(error = %err, key, "failed to persist lookup state");
        }
    }
}

fn report_load(
    notifier: &dyn Notifier,
    messages: &Messages,
    store: &DictionaryStore,
    state: LoadState,
) {
    notifier.remove(&messages.loading_id);
    match state {
        LoadState::Ready => notifier.show(&messages.ready, MessageOptions::default()),
        LoadState::Failed => {
            let reason = store
                .last_error()
                .map(|err| err.to_string())
                .unwrap_or_else(|| "unknown error".to_string());
            notifier.show(
                &messages.failure(&reason),
                MessageOptions::with_timeout(messages.failed_timeout),
            );
        }
        LoadState::Unloaded | LoadState::Loading => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DictionaryEntry, TablesBuilder};
    use crate::notify::MemoryNotifier;
    use crate::popup::GridLayout;
    use crate::storage::{MemoryStorage, UnavailableStorage};
    use crate::store::DictionarySource;
    use async_trait::async_trait;
    use std::time::Duration;

    const MARKUP: &str = "<p>如是我聞。一時 Buddha</p><p>Latin only</p>";

    fn tables() -> crate::data::DictionaryTables {
        TablesBuilder::new()
            .primary("如是", DictionaryEntry::new("thus", "thus; in this way"))
            .primary("如", DictionaryEntry::new("like", "as, like"))
            .primary("我", DictionaryEntry::new("I", "I, me"))
            .primary("一時", DictionaryEntry::new("once", "at one time"))
            .fallback('聞', DictionaryEntry::new("hear", "to hear"))
            .finish()
            .unwrap()
    }

    struct Fixture {
        session: LookupSession,
        notifier: Arc<MemoryNotifier>,
        storage: Arc<MemoryStorage>,
    }

    fn fixture_with(store: DictionaryStore, markup: &str) -> Fixture {
        let notifier = Arc::new(MemoryNotifier::new());
        let storage = Arc::new(MemoryStorage::new());
        let session = LookupSession::mount(
            ScriptProfile::literary_chinese(),
            store,
            markup,
            HostServices {
                notifier: notifier.clone(),
                storage: storage.clone(),
                layout: Box::new(GridLayout::default()),
            },
        )
        .unwrap();
        Fixture {
            session,
            notifier,
            storage,
        }
    }

    fn active_fixture() -> Fixture {
        let mut fixture = fixture_with(DictionaryStore::preloaded(tables()), MARKUP);
        assert!(fixture.session.activate().is_none());
        while fixture.session.segment_step() == SegmentProgress::Pending {}
        fixture
    }

    fn unit(session: &LookupSession, ch: &str) -> NodeId {
        let doc = session.document();
        let mut cursor = navigate::first(doc, UnitFilter::Any);
        while let Some(node) = cursor {
            if navigate::unit_text(doc, node) == ch {
                return node;
            }
            cursor = navigate::next(doc, node, UnitFilter::Any);
        }
        panic!("no unit for {ch}");
    }

    fn text_of(session: &LookupSession, node: Option<NodeId>) -> String {
        navigate::unit_text(session.document(), node.unwrap())
    }

    struct FailingSource;

    #[async_trait]
    impl DictionarySource for FailingSource {
        async fn fetch(&self, resource: &str) -> Result<Vec<u8>, DictionaryLoadError> {
            Err(DictionaryLoadError::Network {
                resource: resource.to_string(),
                message: "connection refused".to_string(),
            })
        }
    }

    #[test]
    fn deactivate_restores_markup_exactly() {
        for markup in [
            MARKUP,
            "",
            "<p>No ideographs here</p>",
            "<div><p>、。　</p><b>佛</b>x<!-- c --><br>法、僧</div>",
        ] {
            let mut fixture = fixture_with(DictionaryStore::preloaded(tables()), markup);
            let original = fixture.session.markup();
            fixture.session.activate();
            while fixture.session.segment_step() == SegmentProgress::Pending {}
            if let Some(node) = navigate::first(fixture.session.document(), UnitFilter::SkipPunctuation) {
                fixture.session.pointer_enter(node);
            }
            fixture.session.deactivate();
            assert_eq!(fixture.session.markup(), original);
        }
    }

    #[test]
    fn completion_sets_first_position() {
        let fixture = active_fixture();
        let session = &fixture.session;
        assert_eq!(text_of(session, session.current()), "如");
        assert!(session.popup().is_none());
        assert!(!session.is_segmenting());
    }

    #[test]
    fn hover_resolves_and_highlights_longest_match() {
        let mut fixture = active_fixture();
        let session = &mut fixture.session;
        let ru = unit(session, "如");
        let result = session.pointer_enter(ru).unwrap();
        let sequences: Vec<_> = result.rows.iter().map(|r| r.sequence.as_str()).collect();
        assert_eq!(sequences, vec!["如是", "如"]);
        assert_eq!(text_of(session, session.match_anchor()), "是");

        let shi = unit(session, "是");
        assert!(session.document().has_class(ru, CURRENT_CLASS));
        assert!(session.document().has_class(shi, CURRENT_CLASS));
        let popup = session.popup().unwrap();
        assert_eq!(popup.anchor, ru);
        assert!(popup.content.html.contains("thus; in this way"));
    }

    #[test]
    fn keys_are_ignored_without_hover() {
        let mut fixture = active_fixture();
        let outcome = fixture.session.key_up(KeyEvent::new(Key::Right));
        assert_eq!(outcome, KeyOutcome::Ignored);
    }

    #[test]
    fn arrow_navigation_skips_punctuation_and_uses_anchor_on_shift() {
        let mut fixture = active_fixture();
        let session = &mut fixture.session;
        let ru = unit(session, "如");
        session.pointer_enter(ru);

        // Shift jumps past the whole matched word.
        let KeyOutcome::Moved(node) = session.key_up(KeyEvent::shifted(Key::Right)) else {
            panic!("expected a move");
        };
        assert_eq!(navigate::unit_text(session.document(), node), "我");
        assert!(!session.document().has_class(ru, CURRENT_CLASS));

        session.key_up(KeyEvent::new(Key::Right));
        assert_eq!(text_of(session, session.current()), "聞");
        let wen = unit(session, "聞");
        assert!(session.document().has_class(wen, FALLBACK_CLASS));
        assert!(session.popup().unwrap().content.html.contains("popup fallback"));

        session.key_up(KeyEvent::new(Key::Right));
        assert_eq!(text_of(session, session.current()), "一");
        assert!(!session.document().has_class(wen, FALLBACK_CLASS));

        session.key_up(KeyEvent::new(Key::Left));
        assert_eq!(text_of(session, session.current()), "聞");

        session.key_up(KeyEvent::new(Key::Right));
        session.key_up(KeyEvent::new(Key::Right));
        assert_eq!(text_of(session, session.current()), "時");
        assert_eq!(session.key_up(KeyEvent::new(Key::Right)), KeyOutcome::Handled);
        assert_eq!(text_of(session, session.current()), "時");
        assert_eq!(session.key_up(KeyEvent::new(Key::Other)), KeyOutcome::Ignored);
    }

    #[test]
    fn empty_match_removes_stale_popup() {
        let mut fixture = active_fixture();
        let session = &mut fixture.session;
        session.pointer_enter(unit(session, "我"));
        assert!(session.popup().is_some());
        let shi = unit(session, "時");
        let result = session.pointer_enter(shi).unwrap();
        assert!(result.is_empty());
        assert!(session.popup().is_none());
        assert_eq!(session.current(), Some(shi));
    }

    #[test]
    fn punctuation_hover_counts_but_does_not_move() {
        let mut fixture = active_fixture();
        let session = &mut fixture.session;
        let before = session.current();
        let stop = unit(session, "。");
        assert!(session.pointer_enter(stop).is_none());
        assert_eq!(session.hover_depth(), 1);
        assert_eq!(session.current(), before);
        session.pointer_leave(stop);
        session.pointer_leave(stop);
        assert_eq!(session.hover_depth(), 0);
    }

    #[test]
    fn punctuation_hover_removes_previous_popup() {
        let mut fixture = active_fixture();
        let session = &mut fixture.session;
        let wo = unit(session, "我");
        assert!(!session.pointer_enter(wo).unwrap().is_empty());
        assert!(session.popup().is_some());
        assert!(session.document().has_class(wo, CURRENT_CLASS));

        let stop = unit(session, "。");
        assert!(session.pointer_enter(stop).is_none());
        assert!(session.popup().is_none());
        assert!(!session.document().has_class(wo, CURRENT_CLASS));
        assert_eq!(session.current(), Some(wo));
        assert_eq!(session.hover_depth(), 2);
    }

    #[test]
    fn popup_pointer_leave_dismisses() {
        let mut fixture = active_fixture();
        let session = &mut fixture.session;
        session.pointer_enter(unit(session, "如"));
        session.popup_pointer_leave();
        assert!(session.popup().is_none());
    }

    #[test]
    fn navigation_works_between_slices() {
        let markup: String = (0..30).map(|_| "<p>如是</p>").collect();
        let mut fixture = fixture_with(DictionaryStore::preloaded(tables()), &markup);
        let session = &mut fixture.session;
        session.activate();
        assert_eq!(session.segment_step(), SegmentProgress::Pending);
        assert!(session.is_segmenting());
        assert!(session.toggle().is_none());
        assert!(session.is_active());

        let ru = unit(session, "如");
        let result = session.pointer_enter(ru).unwrap();
        assert_eq!(result.winner().unwrap().sequence, "如是");
        while session.segment_step() == SegmentProgress::Pending {}
        assert_eq!(session.current(), Some(ru));
    }

    #[test]
    fn toggle_persists_flag_and_reports_disable() {
        let mut fixture = fixture_with(DictionaryStore::preloaded(tables()), MARKUP);
        fixture.session.toggle();
        assert_eq!(fixture.storage.get_flag("lzh2en.active").unwrap(), Some(true));
        while fixture.session.segment_step() == SegmentProgress::Pending {}
        fixture.session.toggle();
        assert!(!fixture.session.is_active());
        assert_eq!(fixture.storage.get_flag("lzh2en.active").unwrap(), Some(false));
        let visible = fixture.notifier.visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].html, "<p>Lookup disabled.</p>");
        assert_eq!(visible[0].options.timeout, Some(Duration::from_millis(5_000)));
    }

    #[test]
    fn persisted_flag_reactivates() {
        let mut fixture = fixture_with(DictionaryStore::preloaded(tables()), MARKUP);
        fixture.storage.set_flag("lzh2en.active", true).unwrap();
        fixture.session.restore_persisted_state();
        assert!(fixture.session.is_active());
        assert!(fixture.session.is_segmenting());
    }

    #[test]
    fn unavailable_storage_degrades_gracefully() {
        let mut session = LookupSession::mount(
            ScriptProfile::literary_chinese(),
            DictionaryStore::preloaded(tables()),
            MARKUP,
            HostServices {
                notifier: Arc::new(MemoryNotifier::new()),
                storage: Arc::new(UnavailableStorage),
                layout: Box::new(GridLayout::default()),
            },
        )
        .unwrap();
        assert!(session.restore_persisted_state().is_none());
        assert!(!session.is_active());
        session.toggle();
        assert!(session.is_active());
    }

    #[test]
    fn activation_without_runtime_reports_failure() {
        let store = DictionaryStore::new(
            Arc::new(FailingSource),
            vec!["lzh2en-data.json".to_string()],
            Duration::from_secs(1),
        );
        let mut fixture = fixture_with(store, MARKUP);
        assert!(fixture.session.activate().is_none());
        assert_eq!(fixture.session.store().state(), LoadState::Failed);
        let visible = fixture.notifier.visible();
        assert_eq!(visible.len(), 1);
        assert!(visible[0].html.contains("no async runtime"));
    }

    #[tokio::test]
    async fn load_failure_keeps_segmentation_and_navigation() {
        let store = DictionaryStore::new(
            Arc::new(FailingSource),
            vec!["lzh2en-data.json".to_string()],
            Duration::from_secs(1),
        );
        let mut fixture = fixture_with(store, MARKUP);
        let handle = fixture.session.activate().expect("load task spawned");
        fixture.session.run_segmentation().await;
        assert_eq!(handle.await.unwrap(), LoadState::Failed);

        let history = fixture.notifier.history();
        assert_eq!(history[0].options.id.as_deref(), Some("lzh_msg_loading"));
        let failure = fixture.notifier.visible();
        assert_eq!(failure.len(), 1);
        assert!(failure[0].html.contains("connection refused"));
        assert_eq!(failure[0].options.timeout, Some(Duration::from_millis(10_000)));

        let session = &mut fixture.session;
        let ru = unit(session, "如");
        assert!(session.pointer_enter(ru).unwrap().is_empty());
        assert!(matches!(session.key_up(KeyEvent::new(Key::Right)), KeyOutcome::Moved(_)));
        assert_eq!(text_of(session, session.current()), "是");

        // A second activation cycle never refetches.
        session.deactivate();
        assert!(session.activate().is_none());
    }

    #[tokio::test]
    async fn successful_load_replaces_loading_message() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("lzh2en-data.json"),
            r#"{"primary": {"如是": ["thus", "thus; in this way"]}, "fallback": {"聞": ["hear", "to hear"]}}"#,
        )
        .unwrap();
        let store = DictionaryStore::new(
            Arc::new(crate::store::FileSource::new(dir.path())),
            ScriptProfile::literary_chinese().resources().to_vec(),
            Duration::from_secs(5),
        );
        let mut fixture = fixture_with(store, MARKUP);
        let handle = fixture.session.activate().expect("load task spawned");

        // Lookups before the data arrives just miss.
        fixture.session.segment_step();
        let ru = unit(&fixture.session, "如");
        assert!(fixture.session.pointer_enter(ru).unwrap().is_empty());

        assert_eq!(handle.await.unwrap(), LoadState::Ready);
        // A late load never pops up a lookup by itself.
        assert!(fixture.session.popup().is_none());
        assert!(!fixture.session.document().has_class(ru, CURRENT_CLASS));
        fixture.session.run_segmentation().await;
        assert!(fixture.session.popup().is_none());
        let visible = fixture.notifier.visible();
        assert_eq!(visible.len(), 1);
        assert!(visible[0].html.contains("lookup activated"));

        let result = fixture.session.set_current(ru);
        assert_eq!(result.winner().unwrap().sequence, "如是");
    }
}
