//! Data models for the course catalog document.
//!
//! Subjects group courses; a course is split into ordered modules, and each
//! module holds ordered contents pointing at a content item. Using
//! autosurgeon derives for automatic CRDT serialization.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use automerge::{ScalarValue, Value};
use autosurgeon::reconcile::{MapReconciler, NoKey};
use autosurgeon::{Hydrate, HydrateError, ReadDoc, Reconcile, Reconciler};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CatalogError, CatalogResult};
use crate::ordering::{OrderedRecord, ScopeValue, ScopedSequencer};

/// Max length of subject/course/module titles and slugs.
pub const TITLE_MAX: usize = 200;
/// Max length of content item titles.
pub const ITEM_TITLE_MAX: usize = 250;

pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub(crate) fn check_len(field: &'static str, value: &str, max: usize) -> CatalogResult<()> {
    let length = value.chars().count();
    if length > max {
        return Err(CatalogError::FieldTooLong { field, length, max });
    }
    Ok(())
}

// =============================================================================
// DOCUMENT ROOT
// =============================================================================

/// Root document structure for a course catalog.
#[derive(Debug, Clone, Default, Reconcile, Hydrate, Serialize, Deserialize, PartialEq)]
pub struct CatalogRoot {
    /// Subjects keyed by ID.
    pub subjects: HashMap<String, Subject>,
    /// Courses keyed by ID.
    pub courses: HashMap<String, Course>,
    /// Modules keyed by ID, ordered per course by `order`.
    pub modules: HashMap<String, Module>,
    /// Contents keyed by ID, ordered per module by `order`.
    pub contents: HashMap<String, Content>,
    /// Content items keyed by ID.
    pub items: HashMap<String, ContentItem>,
}

impl CatalogRoot {
    /// Creates a new empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the catalog holds no records at all.
    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
            && self.courses.is_empty()
            && self.modules.is_empty()
            && self.contents.is_empty()
            && self.items.is_empty()
    }
}

// =============================================================================
// SUBJECT
// =============================================================================

/// Parent grouping for courses.
#[derive(Debug, Clone, Default, Reconcile, Hydrate, Serialize, Deserialize, PartialEq)]
pub struct Subject {
    pub id: String,
    pub title: String,
    /// Unique across subjects.
    pub slug: String,
}

impl Subject {
    /// Creates a new Subject with a fresh ID.
    pub fn new(title: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            title: title.into(),
            slug: slug.into(),
        }
    }

    /// Builder: Set ID.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

// =============================================================================
// COURSE
// =============================================================================

/// A course owned by one author.
#[derive(Debug, Clone, Default, Reconcile, Hydrate, Serialize, Deserialize, PartialEq)]
pub struct Course {
    pub id: String,
    /// Author user name.
    pub owner: String,
    pub subject_id: String,
    pub title: String,
    /// Unique across courses.
    pub slug: String,
    pub overview: String,
    /// Milliseconds since epoch.
    pub created_at: i64,
}

impl Course {
    /// Creates a new Course with a fresh ID.
    pub fn new(
        owner: impl Into<String>,
        subject_id: impl Into<String>,
        title: impl Into<String>,
        slug: impl Into<String>,
    ) -> Self {
        Self {
            id: new_id(),
            owner: owner.into(),
            subject_id: subject_id.into(),
            title: title.into(),
            slug: slug.into(),
            ..Default::default()
        }
    }

    /// Builder: Set ID.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Builder: Set overview.
    pub fn with_overview(mut self, overview: impl Into<String>) -> Self {
        self.overview = overview.into();
        self
    }

    /// Builder: Set creation timestamp.
    pub fn with_created_at(mut self, created_at: i64) -> Self {
        self.created_at = created_at;
        self
    }
}

impl fmt::Display for Course {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

// =============================================================================
// MODULE
// =============================================================================

/// A section of a course, ordered within the course.
#[derive(Debug, Clone, Default, Reconcile, Hydrate, Serialize, Deserialize, PartialEq)]
pub struct Module {
    pub id: String,
    pub course_id: String,
    pub title: String,
    pub description: String,
    /// Position within the course. `None` only before the module is stored.
    pub order: Option<u32>,
}

impl Module {
    /// Modules are numbered per course.
    pub const SEQUENCER: ScopedSequencer = ScopedSequencer::new(&["course"]);

    /// Creates a new Module with a fresh ID and no position.
    pub fn new(course_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            course_id: course_id.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    /// Builder: Set ID.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Builder: Set description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder: Set an explicit position.
    pub fn with_order(mut self, order: u32) -> Self {
        self.order = Some(order);
        self
    }
}

impl OrderedRecord for Module {
    fn position(&self) -> Option<u32> {
        self.order
    }

    fn set_position(&mut self, position: u32) {
        self.order = Some(position);
    }

    fn attribute(&self, name: &str) -> Option<ScopeValue> {
        match name {
            "course" => Some(ScopeValue::from(self.course_id.as_str())),
            "id" => Some(ScopeValue::from(self.id.as_str())),
            _ => None,
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.order {
            Some(order) => write!(f, "{}. {}", order, self.title),
            None => f.write_str(&self.title),
        }
    }
}

// =============================================================================
// CONTENT
// =============================================================================

/// Link from a module to one content item, ordered within the module.
#[derive(Debug, Clone, Default, Reconcile, Hydrate, Serialize, Deserialize, PartialEq)]
pub struct Content {
    pub id: String,
    pub module_id: String,
    pub item_id: String,
    pub kind: ContentKind,
    /// Position within the module. `None` only before the content is stored.
    pub order: Option<u32>,
}

impl Content {
    /// Contents are numbered per module.
    pub const SEQUENCER: ScopedSequencer = ScopedSequencer::new(&["module"]);

    /// Creates a Content pointing at `item`, with a fresh ID and no position.
    pub fn new(module_id: impl Into<String>, item: &ContentItem) -> Self {
        Self {
            id: new_id(),
            module_id: module_id.into(),
            item_id: item.id.clone(),
            kind: item.kind(),
            order: None,
        }
    }

    /// Builder: Set an explicit position.
    pub fn with_order(mut self, order: u32) -> Self {
        self.order = Some(order);
        self
    }
}

impl OrderedRecord for Content {
    fn position(&self) -> Option<u32> {
        self.order
    }

    fn set_position(&mut self, position: u32) {
        self.order = Some(position);
    }

    fn attribute(&self, name: &str) -> Option<ScopeValue> {
        match name {
            "module" => Some(ScopeValue::from(self.module_id.as_str())),
            "id" => Some(ScopeValue::from(self.id.as_str())),
            _ => None,
        }
    }
}

// =============================================================================
// CONTENT KIND
// =============================================================================

/// The closed set of content item kinds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    #[default]
    Text,
    File,
    Image,
    Video,
}

impl ContentKind {
    pub const ALL: [ContentKind; 4] = [
        ContentKind::Text,
        ContentKind::File,
        ContentKind::Image,
        ContentKind::Video,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Text => "text",
            ContentKind::File => "file",
            ContentKind::Image => "image",
            ContentKind::Video => "video",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CatalogError::UnknownContentKind(s.to_string()))
    }
}

/// Stored as its lowercase name.
impl Reconcile for ContentKind {
    type Key<'a> = NoKey;

    fn reconcile<R: Reconciler>(&self, reconciler: R) -> Result<(), R::Error> {
        self.as_str().to_string().reconcile(reconciler)
    }
}

impl Hydrate for ContentKind {
    fn hydrate_string(s: &'_ str) -> Result<Self, HydrateError> {
        s.parse()
            .map_err(|_| HydrateError::unexpected("a content kind", s.to_string()))
    }
}

// =============================================================================
// CONTENT ITEM
// =============================================================================

/// A piece of course material owned by its author.
#[derive(Debug, Clone, Default, Reconcile, Hydrate, Serialize, Deserialize, PartialEq)]
pub struct ContentItem {
    pub id: String,
    pub owner: String,
    pub title: String,
    /// Milliseconds since epoch.
    pub created_at: i64,
    pub updated_at: i64,
    pub body: ItemBody,
}

impl ContentItem {
    /// Creates a new ContentItem with a fresh ID.
    pub fn new(owner: impl Into<String>, title: impl Into<String>, body: ItemBody) -> Self {
        Self {
            id: new_id(),
            owner: owner.into(),
            title: title.into(),
            created_at: 0,
            updated_at: 0,
            body,
        }
    }

    /// Builder: Set created and updated timestamps.
    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.created_at = timestamp;
        self.updated_at = timestamp;
        self
    }

    pub fn kind(&self) -> ContentKind {
        self.body.kind()
    }
}

impl fmt::Display for ContentItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

/// Kind-specific payload of a content item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ItemBody {
    Text { content: String },
    File { file: String },
    Image { file: String },
    Video { url: String },
}

impl Default for ItemBody {
    fn default() -> Self {
        ItemBody::Text {
            content: String::new(),
        }
    }
}

impl ItemBody {
    pub fn text(content: impl Into<String>) -> Self {
        ItemBody::Text {
            content: content.into(),
        }
    }

    pub fn file(file: impl Into<String>) -> Self {
        ItemBody::File { file: file.into() }
    }

    pub fn image(file: impl Into<String>) -> Self {
        ItemBody::Image { file: file.into() }
    }

    pub fn video(url: impl Into<String>) -> Self {
        ItemBody::Video { url: url.into() }
    }

    /// Builds a body of `kind` around its single payload value
    /// (text content, file path or URL).
    pub fn from_kind(kind: ContentKind, payload: impl Into<String>) -> Self {
        match kind {
            ContentKind::Text => Self::text(payload),
            ContentKind::File => Self::file(payload),
            ContentKind::Image => Self::image(payload),
            ContentKind::Video => Self::video(payload),
        }
    }

    pub fn kind(&self) -> ContentKind {
        match self {
            ItemBody::Text { .. } => ContentKind::Text,
            ItemBody::File { .. } => ContentKind::File,
            ItemBody::Image { .. } => ContentKind::Image,
            ItemBody::Video { .. } => ContentKind::Video,
        }
    }

    fn payload_key(kind: ContentKind) -> &'static str {
        match kind {
            ContentKind::Text => "content",
            ContentKind::File | ContentKind::Image => "file",
            ContentKind::Video => "url",
        }
    }

    /// The single payload value.
    pub fn payload(&self) -> &str {
        match self {
            ItemBody::Text { content } => content,
            ItemBody::File { file } | ItemBody::Image { file } => file,
            ItemBody::Video { url } => url,
        }
    }
}

/// Stored as `{ kind, <payload key> }`; keys of other kinds are deleted so a
/// body that changes kind leaves no stale payload behind.
impl Reconcile for ItemBody {
    type Key<'a> = NoKey;

    fn reconcile<R: Reconciler>(&self, mut reconciler: R) -> Result<(), R::Error> {
        let mut m = reconciler.map()?;
        let kind = self.kind();
        let key = Self::payload_key(kind);

        m.put("kind", kind.as_str().to_string())?;
        m.put(key, self.payload().to_string())?;
        for stale in ["content", "file", "url"] {
            if stale != key {
                let _ = m.delete(stale);
            }
        }
        Ok(())
    }
}

impl Hydrate for ItemBody {
    fn hydrate_map<D: ReadDoc>(doc: &D, obj: &automerge::ObjId) -> Result<Self, HydrateError> {
        fn hydrate_str<D: ReadDoc>(
            doc: &D,
            obj: &automerge::ObjId,
            key: &str,
        ) -> Result<Option<String>, HydrateError> {
            match doc.get(obj, key)? {
                Some((Value::Scalar(s), _)) => match s.as_ref() {
                    ScalarValue::Str(st) => Ok(Some(st.to_string())),
                    _ => Ok(None),
                },
                _ => Ok(None),
            }
        }

        let kind_name = hydrate_str(doc, obj, "kind")?
            .ok_or_else(|| HydrateError::unexpected("a content kind", "nothing".to_string()))?;
        let kind: ContentKind = kind_name
            .parse()
            .map_err(|_| HydrateError::unexpected("a content kind", kind_name.clone()))?;
        let payload = hydrate_str(doc, obj, Self::payload_key(kind))?.unwrap_or_default();

        Ok(Self::from_kind(kind, payload))
    }
}

// =============================================================================
// TESTS
// =============================================================================
