//! Incremental dictionary lookup over ideographic text.
//!
//! A [`LookupSession`] mounts a region of markup, wraps its ideographs into
//! clickable units a slice at a time, and resolves the longest dictionary
//! match at the current unit into a positioned gloss popup.

pub mod data;
pub mod dom;
pub mod error;
pub mod navigate;
pub mod notify;
pub mod popup;
pub mod profile;
pub mod resolve;
pub mod segment;
pub mod session;
pub mod storage;
pub mod store;

pub use data::{DictionaryEntry, DictionaryTables, Hit, TableKind, TablesBuilder};
pub use dom::{Document, NodeId};
pub use error::{ConfigError, DictionaryLoadError, DocumentError, StorageError};
pub use navigate::UnitFilter;
pub use notify::{MemoryNotifier, MessageOptions, Notifier, TracingNotifier};
pub use popup::{GridLayout, Layout, Popup, PopupPresenter, Rect, Size};
pub use profile::{Messages, ProfileSettings, ScriptProfile};
pub use resolve::{MatchResult, MatchRow, Resolver};
pub use segment::{SegmentProgress, SegmentStats, Segmenter};
pub use session::{HostServices, Key, KeyEvent, KeyOutcome, LookupSession};
pub use storage::{FlagStorage, JsonFileStorage, MemoryStorage, UnavailableStorage};
#[cfg(feature = "http")]
pub use store::HttpSource;
pub use store::{DictionarySource, DictionaryStore, FileSource, LoadState};
