//! Conversation transcripts keyed by the selected entity.
//!
//! The active scope is `node:<id>` while a node is selected and
//! `container:<id>` while only a container is. Every mutation flushes the
//! message lists to a [`TranscriptStore`]; rendered markup stays in memory
//! and is rebuilt from messages whenever it is missing.

pub mod markup;
pub mod store;

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use store::{FileStore, MemoryStore, StoreError, TranscriptStore};

static SCOPE_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(node|container):(\S.*)$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScopeKey {
    Node(String),
    Container(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("malformed scope key `{0}`")]
pub struct ScopeKeyError(pub String);

impl ScopeKey {
    /// A selected node wins over its container.
    pub fn resolve(node: Option<&str>, container: Option<&str>) -> Option<Self> {
        match (node, container) {
            (Some(node), _) => Some(ScopeKey::Node(node.to_string())),
            (None, Some(container)) => Some(ScopeKey::Container(container.to_string())),
            (None, None) => None,
        }
    }

    pub fn entity_id(&self) -> &str {
        match self {
            ScopeKey::Node(id) | ScopeKey::Container(id) => id,
        }
    }

    pub fn is_node(&self) -> bool {
        matches!(self, ScopeKey::Node(_))
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeKey::Node(id) => write!(f, "node:{id}"),
            ScopeKey::Container(id) => write!(f, "container:{id}"),
        }
    }
}

impl FromStr for ScopeKey {
    type Err = ScopeKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = SCOPE_KEY_RE
            .captures(s)
            .ok_or_else(|| ScopeKeyError(s.to_string()))?;
        let id = caps[2].to_string();
        match &caps[1] {
            "node" => Ok(ScopeKey::Node(id)),
            _ => Ok(ScopeKey::Container(id)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: &str) -> Self {
        Self {
            role: Role::User,
            content: content.to_string(),
        }
    }

    pub fn assistant(content: &str) -> Self {
        Self {
            role: Role::Assistant,
            content: content.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub role: Role,
    pub markup: String,
}

/// The visible conversation: messages plus one rendered entry per message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<Message>,
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_messages(messages: Vec<Message>) -> Self {
        let entries = messages
            .iter()
            .map(|message| TranscriptEntry {
                role: message.role,
                markup: markup::render_message(message),
            })
            .collect();
        Self { messages, entries }
    }

    pub fn push(&mut self, message: Message) {
        self.entries.push(TranscriptEntry {
            role: message.role,
            markup: markup::render_message(&message),
        });
        self.messages.push(message);
    }

    /// Appends a message whose on-screen form differs from its text.
    pub fn push_rendered(&mut self, message: Message, rendered: String) {
        self.entries.push(TranscriptEntry {
            role: message.role,
            markup: rendered,
        });
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Last `n` messages, oldest first.
    pub fn trailing(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.entries.clear();
    }
}

#[derive(Debug, Clone)]
struct CachedScope {
    messages: Vec<Message>,
    rendered: Option<Vec<TranscriptEntry>>,
}

impl CachedScope {
    fn into_transcript(self) -> Transcript {
        match self.rendered {
            Some(entries) if entries.len() == self.messages.len() => Transcript {
                messages: self.messages,
                entries,
            },
            _ => Transcript::from_messages(self.messages),
        }
    }
}

/// Scope key → transcript cache with a durable, messages-only mirror.
pub struct ScopeCache {
    entries: HashMap<ScopeKey, CachedScope>,
    active: Option<ScopeKey>,
    transcript: Transcript,
    store: Box<dyn TranscriptStore>,
    storage_key: String,
}

impl fmt::Debug for ScopeCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeCache")
            .field("active", &self.active)
            .field("cached", &self.entries.len())
            .field("visible", &self.transcript.len())
            .finish()
    }
}

impl ScopeCache {
    /// Restores the durable record. A corrupt record is dropped as a whole.
    pub fn restore(store: Box<dyn TranscriptStore>, storage_key: &str) -> Self {
        let mut cache = Self {
            entries: HashMap::new(),
            active: None,
            transcript: Transcript::new(),
            store,
            storage_key: storage_key.to_string(),
        };
        match cache.store.load(storage_key) {
            Ok(Some(blob)) => match decode_record(&blob) {
                Some(entries) => {
                    tracing::debug!(scopes = entries.len(), "restored chat cache");
                    cache.entries = entries;
                }
                None => {
                    tracing::warn!("discarding corrupt chat cache record");
                    if let Err(err) = cache.store.remove(storage_key) {
                        tracing::warn!(%err, "failed to remove corrupt chat cache record");
                    }
                }
            },
            Ok(None) => {}
            Err(err) => tracing::warn!(%err, "chat cache unavailable, starting empty"),
        }
        cache
    }

    pub fn active(&self) -> Option<&ScopeKey> {
        self.active.as_ref()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn is_cached(&self, key: &ScopeKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn cached_messages(&self, key: &ScopeKey) -> Option<&[Message]> {
        self.entries.get(key).map(|entry| entry.messages.as_slice())
    }

    pub fn cached_scopes(&self) -> usize {
        self.entries.len()
    }

    /// Entity selection: flush outgoing, load incoming (or start empty).
    pub fn switch_to(&mut self, next: Option<ScopeKey>) {
        if self.active == next {
            return;
        }
        self.flush_active();
        self.transcript = next
            .as_ref()
            .and_then(|key| self.entries.get(key).cloned())
            .map(CachedScope::into_transcript)
            .unwrap_or_default();
        tracing::debug!(
            from = ?self.active.as_ref().map(ToString::to_string),
            to = ?next.as_ref().map(ToString::to_string),
            messages = self.transcript.len(),
            "scope switched"
        );
        self.active = next;
    }

    /// Container switch: the outgoing scope is flushed so it can be recovered
    /// later, but its transcript never carries into the new topic.
    pub fn switch_container(&mut self, next: Option<ScopeKey>) {
        self.flush_active();
        self.transcript.clear();
        self.active = None;
        self.switch_to(next);
    }

    pub fn append(&mut self, message: Message) {
        self.transcript.push(message);
        self.flush_active();
    }

    pub fn append_rendered(&mut self, message: Message, rendered: String) {
        self.transcript.push_rendered(message, rendered);
        self.flush_active();
    }

    /// Appends to `key` whether or not it is active. Used for replies that
    /// land after the user moved to another scope.
    pub fn append_to(&mut self, key: &ScopeKey, message: Message, rendered: Option<String>) {
        if self.active.as_ref() == Some(key) {
            match rendered {
                Some(rendered) => self.append_rendered(message, rendered),
                None => self.append(message),
            }
            return;
        }
        let mut transcript = self
            .entries
            .get(key)
            .cloned()
            .map(CachedScope::into_transcript)
            .unwrap_or_default();
        match rendered {
            Some(rendered) => transcript.push_rendered(message, rendered),
            None => transcript.push(message),
        }
        self.entries.insert(
            key.clone(),
            CachedScope {
                messages: transcript.messages,
                rendered: Some(transcript.entries),
            },
        );
        self.persist();
    }

    /// Drops the active scope's entry entirely, not just what is on screen.
    pub fn clear_active(&mut self) {
        self.transcript.clear();
        if let Some(key) = self.active.clone() {
            self.entries.remove(&key);
            self.persist();
        }
    }

    /// Forgets `key`. Clears the visible transcript too when it is active.
    pub fn forget(&mut self, key: &ScopeKey) -> bool {
        let removed = self.entries.remove(key).is_some();
        let active = self.active.as_ref() == Some(key);
        if active {
            self.transcript.clear();
        }
        if removed || active {
            self.persist();
        }
        removed || active
    }

    fn flush_active(&mut self) {
        let Some(key) = self.active.clone() else {
            return;
        };
        if self.transcript.is_empty() {
            return;
        }
        self.entries.insert(
            key,
            CachedScope {
                messages: self.transcript.messages.clone(),
                rendered: Some(self.transcript.entries.clone()),
            },
        );
        self.persist();
    }

    fn persist(&mut self) {
        let record: BTreeMap<String, &[Message]> = self
            .entries
            .iter()
            .map(|(key, entry)| (key.to_string(), entry.messages.as_slice()))
            .collect();
        let blob = match serde_json::to_string(&record) {
            Ok(blob) => blob,
            Err(err) => {
                tracing::warn!(%err, "failed to encode chat cache");
                return;
            }
        };
        if let Err(err) = self.store.save(&self.storage_key, &blob) {
            tracing::warn!(%err, "chat cache write failed; keeping in-memory state");
        }
    }
}

fn decode_record(blob: &str) -> Option<HashMap<ScopeKey, CachedScope>> {
    let raw: BTreeMap<String, Vec<Message>> = serde_json::from_str(blob).ok()?;
    let mut entries = HashMap::with_capacity(raw.len());
    for (key, messages) in raw {
        let key = key.parse::<ScopeKey>().ok()?;
        if messages.is_empty() {
            continue;
        }
        entries.insert(
            key,
            CachedScope {
                messages,
                rendered: None,
            },
        );
    }
    Some(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str) -> Option<ScopeKey> {
        Some(ScopeKey::Node(id.to_string()))
    }

    fn fresh() -> ScopeCache {
        ScopeCache::restore(Box::new(MemoryStore::new()), "chat")
    }

    #[test]
    fn scope_key_round_trips_through_text() {
        let key: ScopeKey = "node:N_1".parse().expect("valid key");
        assert_eq!(key, ScopeKey::Node("N_1".to_string()));
        assert_eq!(key.to_string(), "node:N_1");
        let key: ScopeKey = "container:KC_9".parse().expect("valid key");
        assert!(!key.is_node());
        assert_eq!(key.entity_id(), "KC_9");
        assert!("edge:E_1".parse::<ScopeKey>().is_err());
        assert!("node:".parse::<ScopeKey>().is_err());
    }

    #[test]
    fn resolve_prefers_node() {
        assert_eq!(ScopeKey::resolve(Some("N"), Some("C")), node("N"));
        assert_eq!(
            ScopeKey::resolve(None, Some("C")),
            Some(ScopeKey::Container("C".to_string()))
        );
        assert_eq!(ScopeKey::resolve(None, None), None);
    }

    #[test]
    fn away_and_back_restores_exact_transcript() {
        let mut cache = fresh();
        cache.switch_to(node("N1"));
        cache.append(Message::user("hello"));
        cache.append(Message::assistant("hi"));
        cache.switch_to(node("N2"));
        assert!(cache.transcript().is_empty());
        cache.switch_to(node("N1"));
        assert_eq!(
            cache.transcript().messages(),
            &[Message::user("hello"), Message::assistant("hi")]
        );
        assert_eq!(cache.transcript().entries().len(), 2);
    }

    #[test]
    fn empty_scope_is_not_cached() {
        let mut cache = fresh();
        cache.switch_to(node("N1"));
        cache.switch_to(node("N2"));
        assert!(!cache.is_cached(&ScopeKey::Node("N1".to_string())));
    }

    #[test]
    fn reload_rebuilds_one_entry_per_message() {
        let mut store = MemoryStore::new();
        store.put_raw(
            "chat",
            r#"{"node:N1":[{"role":"user","content":"q"},{"role":"assistant","content":"a"},{"role":"user","content":"q2"}]}"#,
        );
        let mut cache = ScopeCache::restore(Box::new(store), "chat");
        cache.switch_to(node("N1"));
        let entries = cache.transcript().entries();
        assert_eq!(entries.len(), 3);
        let roles: Vec<Role> = entries.iter().map(|entry| entry.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User]);
        for entry in entries {
            assert_eq!(markup::role_of_markup(&entry.markup), Some(entry.role));
        }
    }

    #[test]
    fn corrupt_record_is_discarded_wholesale() {
        let mut store = MemoryStore::new();
        store.put_raw(
            "chat",
            r#"{"node:N1":[{"role":"user","content":"ok"}],"bogus":[{"role":"user","content":"x"}]}"#,
        );
        let cache = ScopeCache::restore(Box::new(store), "chat");
        assert_eq!(cache.cached_scopes(), 0);

        let mut store = MemoryStore::new();
        store.put_raw("chat", "not json at all");
        let cache = ScopeCache::restore(Box::new(store), "chat");
        assert_eq!(cache.cached_scopes(), 0);
    }

    #[test]
    fn failed_writes_keep_memory_authoritative() {
        let mut cache = ScopeCache::restore(Box::new(MemoryStore::with_quota(8)), "chat");
        cache.switch_to(node("N1"));
        cache.append(Message::user("a message that will not fit"));
        cache.switch_to(node("N2"));
        cache.switch_to(node("N1"));
        assert_eq!(cache.transcript().len(), 1);
    }

    #[test]
    fn clear_removes_the_entry() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut cache = ScopeCache::restore(Box::new(FileStore::new(dir.path())), "chat");
        cache.switch_to(node("N1"));
        cache.append(Message::user("hello"));
        cache.switch_to(node("N2"));
        cache.append(Message::user("other"));
        cache.switch_to(node("N1"));
        cache.clear_active();
        assert!(cache.transcript().is_empty());
        assert!(!cache.is_cached(&ScopeKey::Node("N1".to_string())));
        cache.switch_to(node("N2"));
        cache.switch_to(node("N1"));
        assert!(cache.transcript().is_empty());

        let reloaded = ScopeCache::restore(Box::new(FileStore::new(dir.path())), "chat");
        assert!(!reloaded.is_cached(&ScopeKey::Node("N1".to_string())));
        assert!(reloaded.is_cached(&ScopeKey::Node("N2".to_string())));
    }

    #[test]
    fn container_switch_wipes_but_flushes() {
        let mut cache = fresh();
        let kc1 = Some(ScopeKey::Container("KC1".to_string()));
        let kc2 = Some(ScopeKey::Container("KC2".to_string()));
        cache.switch_to(kc1.clone());
        cache.append(Message::user("about topic one"));
        cache.switch_container(kc2);
        assert!(cache.transcript().is_empty());
        cache.switch_container(kc1);
        assert_eq!(cache.transcript().messages(), &[Message::user("about topic one")]);
    }

    #[test]
    fn append_to_inactive_scope_lands_in_cache() {
        let mut cache = fresh();
        let n1 = ScopeKey::Node("N1".to_string());
        cache.switch_to(Some(n1.clone()));
        cache.append(Message::user("q"));
        cache.switch_to(node("N2"));
        cache.append_to(&n1, Message::assistant("late answer"), None);
        assert!(cache.transcript().is_empty());
        assert_eq!(cache.cached_messages(&n1).map(<[Message]>::len), Some(2));
    }

    #[test]
    fn trailing_history_window() {
        let mut transcript = Transcript::new();
        for i in 0..8 {
            transcript.push(Message::user(&format!("m{i}")));
        }
        let tail = transcript.trailing(6);
        assert_eq!(tail.len(), 6);
        assert_eq!(tail[0].content, "m2");
        assert_eq!(transcript.trailing(100).len(), 8);
    }
}
