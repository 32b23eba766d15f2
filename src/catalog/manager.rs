//! CatalogManager implementation with hybrid operations pattern.
//!
//! This module provides the main `CatalogManager` struct that wraps an Automerge
//! document and provides:
//! - Validated inserts via autosurgeon (hydrate/reconcile), with modules and
//!   contents sequenced inside their parent before they are written
//! - Targeted O(1) updates via direct put operations for plain text fields
//! - Macro-generated lookup, listing and re-numbering for Module/Content

use std::collections::HashMap;

use automerge::{
    transaction::Transactable, AutoCommit, ChangeHash, ObjId, ReadDoc, ScalarValue, Value, ROOT,
};
use autosurgeon::{hydrate, reconcile};
use paste::paste;
use tracing::{debug, info, warn};

use crate::catalog::model::*;
use crate::error::{CatalogError, CatalogResult};
use crate::ordering::{ensure_unique, find_duplicates, DuplicatePosition};

// =============================================================================
// ORDERED ENTITY MACRO
// =============================================================================

/// Generates lookup, listing and re-numbering for an ordered entity.
/// `$parent` is the field holding the scope's parent ID.
macro_rules! ordered_entity {
    ($entity:ident, $collection:ident, $parent:ident, $label:literal) => {
        paste! {
            /// Gets a record by ID.
            pub fn [<get_ $entity:snake>](&mut self, id: &str) -> CatalogResult<Option<$entity>> {
                let state = self.get_state()?;
                Ok(state.$collection.get(id).cloned())
            }

            /// Records of one parent, in position order.
            pub fn [<$collection _of>](&mut self, parent_id: &str) -> CatalogResult<Vec<$entity>> {
                let state = self.get_state()?;
                let mut records: Vec<$entity> = state
                    .$collection
                    .values()
                    .filter(|record| record.$parent == parent_id)
                    .cloned()
                    .collect();
                records.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
                Ok(records)
            }

            /// Applies explicit positions (ID -> position) in one batch.
            ///
            /// IDs that do not exist or are not owned by `owner` are skipped.
            /// The whole batch is rejected if it leaves two records of one
            /// scope on the same position. Returns the number of records moved.
            pub fn [<reorder_ $collection>](
                &mut self,
                owner: &str,
                positions: &HashMap<String, u32>,
            ) -> CatalogResult<usize> {
                self.try_update_state(|state| {
                    let moved: Vec<(String, u32)> = positions
                        .iter()
                        .filter(|(id, _)| {
                            state.$collection.get(id.as_str()).map_or(false, |record| {
                                Self::[<owner_of_ $entity:snake>](state, record) == Some(owner)
                            })
                        })
                        .map(|(id, position)| (id.clone(), *position))
                        .collect();

                    for (id, position) in &moved {
                        if let Some(record) = state.$collection.get_mut(id) {
                            record.order = Some(*position);
                        }
                    }

                    for (id, position) in &moved {
                        let scope = $entity::SEQUENCER.scope_of(&state.$collection[id]);
                        ensure_unique(
                            $label,
                            state.$collection.values().filter(|other| other.id != *id),
                            &scope,
                            *position,
                        )?;
                    }

                    info!(entity = $label, owner, moved = moved.len(), "re-numbered");
                    Ok(moved.len())
                })
            }
        }
    };
}

// =============================================================================
// CATALOG MANAGER
// =============================================================================

/// The main document manager for a course catalog.
///
/// Uses a hybrid approach:
/// - `try_update_state()` for validated struct operations (hydrate/reconcile);
///   a failed operation leaves the document untouched
/// - `set_module_title()` and friends for targeted O(1) updates
/// - `ordered_entity!` macro generates consistent ordering helpers for
///   Module/Content
pub struct CatalogManager {
    doc: AutoCommit,
    /// Cached hydrated state - invalidated after direct document mutations.
    cached_state: Option<CatalogRoot>,
}

impl CatalogManager {
    // =========================================================================
    // INITIALIZATION
    // =========================================================================

    /// Creates a new empty CatalogManager with an initialized document schema.
    pub fn new() -> Self {
        let mut doc = AutoCommit::new();
        let root = CatalogRoot::default();
        reconcile(&mut doc, &root).expect("Failed to initialize document");
        Self {
            doc,
            cached_state: Some(root),
        }
    }

    /// Creates a CatalogManager from saved binary data.
    pub fn from_bytes(bytes: &[u8]) -> CatalogResult<Self> {
        let doc = AutoCommit::load(bytes)?;
        Ok(Self {
            doc,
            cached_state: None,
        })
    }

    /// Saves the document to binary format.
    pub fn save(&mut self) -> Vec<u8> {
        self.doc.save()
    }

    /// Returns the current heads (for sync protocol).
    pub fn get_heads(&mut self) -> Vec<ChangeHash> {
        self.doc.get_heads()
    }

    /// Gets the actor ID for this document instance.
    pub fn actor_id(&self) -> String {
        self.doc.get_actor().to_hex_string()
    }

    // =========================================================================
    // HIGH-LEVEL OPERATIONS (via Hydrate/Reconcile)
    // =========================================================================

    /// Hydrates the entire document state to Rust structs.
    pub fn get_state(&mut self) -> CatalogResult<CatalogRoot> {
        if let Some(ref cached) = self.cached_state {
            return Ok(cached.clone());
        }
        let state: CatalogRoot = hydrate(&self.doc)?;
        self.cached_state = Some(state.clone());
        Ok(state)
    }

    /// Applies a function to mutate the state, then reconciles back to the document.
    /// Bypasses all validation; prefer the typed operations below.
    pub fn update_state<F>(&mut self, f: F) -> CatalogResult<()>
    where
        F: FnOnce(&mut CatalogRoot),
    {
        let mut state = self.get_state()?;
        f(&mut state);
        reconcile(&mut self.doc, &state)?;
        self.cached_state = Some(state);
        Ok(())
    }

    /// Like `update_state`, but `f` may fail. Nothing is written on failure.
    pub fn try_update_state<T, F>(&mut self, f: F) -> CatalogResult<T>
    where
        F: FnOnce(&mut CatalogRoot) -> CatalogResult<T>,
    {
        let mut state = self.get_state()?;
        let out = f(&mut state)?;
        reconcile(&mut self.doc, &state)?;
        self.cached_state = Some(state);
        Ok(out)
    }

    // =========================================================================
    // SUBJECT OPERATIONS
    // =========================================================================

    /// Stores a new subject. Slugs are unique across subjects.
    pub fn create_subject(&mut self, subject: Subject) -> CatalogResult<Subject> {
        check_len("title", &subject.title, TITLE_MAX)?;
        check_len("slug", &subject.slug, TITLE_MAX)?;
        self.try_update_state(|state| {
            ensure_new_id("subject", &state.subjects, &subject.id)?;
            if state.subjects.values().any(|s| s.slug == subject.slug) {
                return Err(CatalogError::duplicate_slug("subject", &subject.slug));
            }
            state.subjects.insert(subject.id.clone(), subject.clone());
            Ok(subject)
        })
    }

    /// Gets a subject by ID.
    pub fn get_subject(&mut self, id: &str) -> CatalogResult<Option<Subject>> {
        let state = self.get_state()?;
        Ok(state.subjects.get(id).cloned())
    }

    /// All subjects sorted by title.
    pub fn list_subjects(&mut self) -> CatalogResult<Vec<Subject>> {
        let state = self.get_state()?;
        let mut subjects: Vec<Subject> = state.subjects.into_values().collect();
        subjects.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)));
        Ok(subjects)
    }

    /// Deletes a subject together with its courses.
    pub fn delete_subject(&mut self, id: &str) -> CatalogResult<()> {
        self.try_update_state(|state| {
            state
                .subjects
                .remove(id)
                .ok_or_else(|| CatalogError::not_found("subject", id))?;
            let course_ids: Vec<String> = state
                .courses
                .values()
                .filter(|c| c.subject_id == id)
                .map(|c| c.id.clone())
                .collect();
            for course_id in &course_ids {
                Self::remove_course_tree(state, course_id);
            }
            Ok(())
        })
    }

    // =========================================================================
    // COURSE OPERATIONS
    // =========================================================================

    /// Stores a new course under an existing subject. Slugs are unique across
    /// courses.
    pub fn create_course(&mut self, course: Course) -> CatalogResult<Course> {
        Self::validate_course(&course)?;
        self.try_update_state(|state| {
            ensure_new_id("course", &state.courses, &course.id)?;
            Self::check_course_links(state, &course)?;
            state.courses.insert(course.id.clone(), course.clone());
            Ok(course)
        })
    }

    /// Gets a course by ID.
    pub fn get_course(&mut self, id: &str) -> CatalogResult<Option<Course>> {
        let state = self.get_state()?;
        Ok(state.courses.get(id).cloned())
    }

    /// Courses created by `owner`, newest first.
    pub fn courses_by_owner(&mut self, owner: &str) -> CatalogResult<Vec<Course>> {
        let state = self.get_state()?;
        let mut courses: Vec<Course> = state
            .courses
            .into_values()
            .filter(|c| c.owner == owner)
            .collect();
        courses.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.title.cmp(&b.title))
        });
        Ok(courses)
    }

    /// Edits a course owned by `owner`. ID and owner cannot change.
    pub fn update_course<F>(&mut self, owner: &str, id: &str, f: F) -> CatalogResult<Course>
    where
        F: FnOnce(&mut Course),
    {
        self.try_update_state(|state| {
            Self::course_owned(state, id, owner)?;
            let mut course = state
                .courses
                .remove(id)
                .ok_or_else(|| CatalogError::not_found("course", id))?;
            f(&mut course);
            course.id = id.to_string();
            course.owner = owner.to_string();

            Self::validate_course(&course)?;
            Self::check_course_links(state, &course)?;
            state.courses.insert(course.id.clone(), course.clone());
            Ok(course)
        })
    }

    /// Deletes a course owned by `owner`, with its modules, contents and items.
    pub fn delete_course(&mut self, owner: &str, id: &str) -> CatalogResult<()> {
        self.try_update_state(|state| {
            Self::course_owned(state, id, owner)?;
            Self::remove_course_tree(state, id);
            Ok(())
        })
    }

    /// Sets the overview of a course owned by `owner` (O(1)).
    pub fn set_course_overview(
        &mut self,
        owner: &str,
        course_id: &str,
        overview: &str,
    ) -> CatalogResult<()> {
        let obj = self.owned_course_obj(owner, course_id)?;
        self.cached_state = None;
        self.doc
            .put(&obj, "overview", ScalarValue::Str(overview.into()))?;
        Ok(())
    }

    // =========================================================================
    // MODULE OPERATIONS
    // =========================================================================

    ordered_entity!(Module, modules, course_id, "module");

    /// Stores a new module in a course owned by `owner`.
    ///
    /// Without an explicit `order` the module goes one past the highest
    /// position in the course (0 for the first). A position already taken in
    /// the course fails with [`CatalogError::Integrity`].
    pub fn create_module(&mut self, owner: &str, mut module: Module) -> CatalogResult<Module> {
        check_len("title", &module.title, TITLE_MAX)?;
        self.try_update_state(|state| {
            ensure_new_id("module", &state.modules, &module.id)?;
            Self::course_owned(state, &module.course_id, owner)?;

            let position = Module::SEQUENCER.assign_local(&mut module, &state.modules);
            let scope = Module::SEQUENCER.scope_of(&module);
            ensure_unique("module", state.modules.values(), &scope, position)?;

            debug!(module = %module.id, %scope, position, "inserting module");
            state.modules.insert(module.id.clone(), module.clone());
            Ok(module)
        })
    }

    /// Edits a module of a course owned by `owner`.
    ///
    /// The module may move to another course of the same owner. Clearing
    /// `order` sequences it again at the end of its (new) course.
    pub fn update_module<F>(&mut self, owner: &str, id: &str, f: F) -> CatalogResult<Module>
    where
        F: FnOnce(&mut Module),
    {
        self.try_update_state(|state| {
            let mut module = state
                .modules
                .remove(id)
                .ok_or_else(|| CatalogError::not_found("module", id))?;
            if Self::owner_of_module(state, &module) != Some(owner) {
                return Err(CatalogError::permission_denied("module", id, owner));
            }
            f(&mut module);
            module.id = id.to_string();

            check_len("title", &module.title, TITLE_MAX)?;
            Self::course_owned(state, &module.course_id, owner)?;
            let position = Module::SEQUENCER.assign_local(&mut module, &state.modules);
            let scope = Module::SEQUENCER.scope_of(&module);
            ensure_unique("module", state.modules.values(), &scope, position)?;

            state.modules.insert(module.id.clone(), module.clone());
            Ok(module)
        })
    }

    /// Deletes a module owned by `owner`, with its contents and items.
    pub fn delete_module(&mut self, owner: &str, id: &str) -> CatalogResult<()> {
        self.try_update_state(|state| {
            let module = state
                .modules
                .get(id)
                .ok_or_else(|| CatalogError::not_found("module", id))?;
            if Self::owner_of_module(state, module) != Some(owner) {
                return Err(CatalogError::permission_denied("module", id, owner));
            }
            Self::remove_module_tree(state, id);
            Ok(())
        })
    }

    /// Sets the title of a module owned by `owner` (O(1)).
    pub fn set_module_title(
        &mut self,
        owner: &str,
        module_id: &str,
        title: &str,
    ) -> CatalogResult<()> {
        check_len("title", title, TITLE_MAX)?;
        let obj = self.owned_module_obj(owner, module_id)?;
        self.cached_state = None;
        self.doc.put(&obj, "title", ScalarValue::Str(title.into()))?;
        Ok(())
    }

    /// Sets the description of a module owned by `owner` (O(1)).
    pub fn set_module_description(
        &mut self,
        owner: &str,
        module_id: &str,
        description: &str,
    ) -> CatalogResult<()> {
        let obj = self.owned_module_obj(owner, module_id)?;
        self.cached_state = None;
        self.doc
            .put(&obj, "description", ScalarValue::Str(description.into()))?;
        Ok(())
    }

    // =========================================================================
    // CONTENT OPERATIONS
    // =========================================================================

    ordered_entity!(Content, contents, module_id, "content");

    /// Stores `item` and attaches it to a module of a course owned by `owner`.
    ///
    /// The item is re-owned by `owner`. The new content is sequenced within
    /// the module exactly like modules are within a course.
    pub fn create_content(
        &mut self,
        owner: &str,
        module_id: &str,
        mut item: ContentItem,
        order: Option<u32>,
    ) -> CatalogResult<Content> {
        check_len("title", &item.title, ITEM_TITLE_MAX)?;
        self.try_update_state(|state| {
            let module = state
                .modules
                .get(module_id)
                .ok_or_else(|| CatalogError::not_found("module", module_id))?;
            if Self::owner_of_module(state, module) != Some(owner) {
                return Err(CatalogError::permission_denied("module", module_id, owner));
            }
            ensure_new_id("item", &state.items, &item.id)?;
            item.owner = owner.to_string();

            let mut content = Content::new(module_id, &item);
            content.order = order;
            ensure_new_id("content", &state.contents, &content.id)?;

            let position = Content::SEQUENCER.assign_local(&mut content, &state.contents);
            let scope = Content::SEQUENCER.scope_of(&content);
            ensure_unique("content", state.contents.values(), &scope, position)?;

            debug!(content = %content.id, kind = %content.kind, %scope, position, "inserting content");
            state.items.insert(item.id.clone(), item);
            state.contents.insert(content.id.clone(), content.clone());
            Ok(content)
        })
    }

    /// Gets a content item by ID.
    pub fn get_item(&mut self, id: &str) -> CatalogResult<Option<ContentItem>> {
        let state = self.get_state()?;
        Ok(state.items.get(id).cloned())
    }

    /// Contents of a module in position order, paired with their items.
    pub fn items_of(&mut self, module_id: &str) -> CatalogResult<Vec<(Content, ContentItem)>> {
        let contents = self.contents_of(module_id)?;
        let state = self.get_state()?;
        contents
            .into_iter()
            .map(|content| {
                let item = state
                    .items
                    .get(&content.item_id)
                    .cloned()
                    .ok_or_else(|| CatalogError::not_found("item", &content.item_id))?;
                Ok((content, item))
            })
            .collect()
    }

    /// Edits an item owned by `owner` and stamps `updated_at`.
    /// Contents pointing at the item follow a change of kind.
    pub fn update_item<F>(
        &mut self,
        owner: &str,
        id: &str,
        timestamp: i64,
        f: F,
    ) -> CatalogResult<ContentItem>
    where
        F: FnOnce(&mut ContentItem),
    {
        self.try_update_state(|state| {
            let mut item = state
                .items
                .remove(id)
                .ok_or_else(|| CatalogError::not_found("item", id))?;
            if item.owner != owner {
                return Err(CatalogError::permission_denied("item", id, owner));
            }
            f(&mut item);
            item.id = id.to_string();
            item.owner = owner.to_string();
            item.updated_at = timestamp;
            check_len("title", &item.title, ITEM_TITLE_MAX)?;

            let kind = item.kind();
            for content in state.contents.values_mut().filter(|c| c.item_id == id) {
                content.kind = kind;
            }
            state.items.insert(item.id.clone(), item.clone());
            Ok(item)
        })
    }

    /// Deletes a content owned by `owner` and its item.
    pub fn delete_content(&mut self, owner: &str, id: &str) -> CatalogResult<()> {
        self.try_update_state(|state| {
            let content = state
                .contents
                .remove(id)
                .ok_or_else(|| CatalogError::not_found("content", id))?;
            if Self::owner_of_content(state, &content) != Some(owner) {
                return Err(CatalogError::permission_denied("content", id, owner));
            }
            state.items.remove(&content.item_id);
            Ok(())
        })
    }

    // =========================================================================
    // INTEGRITY
    // =========================================================================

    /// Scans the whole document for positions shared by two or more modules
    /// of a course or contents of a module, and for records whose parent is
    /// gone.
    pub fn integrity_report(&mut self) -> CatalogResult<IntegrityReport> {
        let state = self.get_state()?;

        let mut duplicates: Vec<(&'static str, DuplicatePosition)> =
            find_duplicates(state.modules.values(), Module::SEQUENCER.for_fields())
                .into_iter()
                .map(|dup| ("module", dup))
                .collect();
        duplicates.extend(
            find_duplicates(state.contents.values(), Content::SEQUENCER.for_fields())
                .into_iter()
                .map(|dup| ("content", dup)),
        );

        let mut orphans = Vec::new();
        for course in state.courses.values() {
            if !state.subjects.contains_key(&course.subject_id) {
                orphans.push(Orphan::new("course", &course.id, "subject", &course.subject_id));
            }
        }
        for module in state.modules.values() {
            if !state.courses.contains_key(&module.course_id) {
                orphans.push(Orphan::new("module", &module.id, "course", &module.course_id));
            }
        }
        for content in state.contents.values() {
            if !state.modules.contains_key(&content.module_id) {
                orphans.push(Orphan::new("content", &content.id, "module", &content.module_id));
            } else if !state.items.contains_key(&content.item_id) {
                orphans.push(Orphan::new("content", &content.id, "item", &content.item_id));
            }
        }
        orphans.sort_by(|a, b| a.entity.cmp(b.entity).then_with(|| a.id.cmp(&b.id)));

        Ok(IntegrityReport { duplicates, orphans })
    }

    /// Fails with the first duplicate position found, then with the first
    /// orphaned record.
    ///
    /// Replicas sequence independently, so two of them appending to the same
    /// course compute the same position; one replica may also delete a parent
    /// another is adding to. Run this after `merge` or `apply_sync_message`
    /// to surface the conflict.
    pub fn verify_integrity(&mut self) -> CatalogResult<()> {
        let report = self.integrity_report()?;
        if let Some((entity, dup)) = report.duplicates.into_iter().next() {
            warn!(entity, scope = %dup.scope, position = dup.position, count = dup.count, "duplicate position");
            return Err(CatalogError::integrity(
                entity,
                dup.scope.to_string(),
                dup.position,
            ));
        }
        if let Some(orphan) = report.orphans.into_iter().next() {
            warn!(entity = orphan.entity, id = %orphan.id, parent = %orphan.parent, "orphaned record");
            return Err(CatalogError::Orphaned {
                entity: orphan.entity,
                id: orphan.id,
                parent: orphan.parent,
            });
        }
        Ok(())
    }

    // =========================================================================
    // JSON SNAPSHOTS
    // =========================================================================

    /// Serializes the hydrated state as pretty JSON.
    pub fn to_json(&mut self) -> CatalogResult<String> {
        let state = self.get_state()?;
        Ok(serde_json::to_string_pretty(&state)?)
    }

    /// Builds a new document from a JSON snapshot written by `to_json`.
    ///
    /// The snapshot is taken as is (positions included) and must pass
    /// `verify_integrity`.
    pub fn from_json(json: &str) -> CatalogResult<Self> {
        let root: CatalogRoot = serde_json::from_str(json)?;
        let mut manager = Self::new();
        manager.update_state(|state| *state = root)?;
        manager.verify_integrity()?;
        Ok(manager)
    }

    // =========================================================================
    // SYNC OPERATIONS
    // =========================================================================

    /// Merges another document into this one.
    pub fn merge(&mut self, other: &mut Self) -> CatalogResult<()> {
        self.cached_state = None;
        self.doc.merge(&mut other.doc)?;
        Ok(())
    }

    /// Generates sync message for incremental sync.
    /// Returns None if there are no changes since their_heads.
    pub fn generate_sync_message(&mut self, their_heads: &[ChangeHash]) -> Option<Vec<u8>> {
        let changes = self.doc.get_changes(their_heads);
        if changes.is_empty() {
            return None;
        }
        let mut bytes = Vec::new();
        for change in changes {
            bytes.extend_from_slice(change.raw_bytes());
        }
        Some(bytes)
    }

    /// Applies sync message from peer.
    pub fn apply_sync_message(&mut self, msg: &[u8]) -> CatalogResult<()> {
        self.cached_state = None;
        self.doc.load_incremental(msg)?;
        Ok(())
    }

    // =========================================================================
    // INTERNAL HELPERS
    // =========================================================================

    fn validate_course(course: &Course) -> CatalogResult<()> {
        check_len("title", &course.title, TITLE_MAX)?;
        check_len("slug", &course.slug, TITLE_MAX)
    }

    /// Subject must exist and the slug must be free. `course` must not be in
    /// `state.courses`.
    fn check_course_links(state: &CatalogRoot, course: &Course) -> CatalogResult<()> {
        if !state.subjects.contains_key(&course.subject_id) {
            return Err(CatalogError::not_found("subject", &course.subject_id));
        }
        if state.courses.values().any(|c| c.slug == course.slug) {
            return Err(CatalogError::duplicate_slug("course", &course.slug));
        }
        Ok(())
    }

    fn course_owned<'a>(
        state: &'a CatalogRoot,
        course_id: &str,
        owner: &str,
    ) -> CatalogResult<&'a Course> {
        let course = state
            .courses
            .get(course_id)
            .ok_or_else(|| CatalogError::not_found("course", course_id))?;
        if course.owner != owner {
            return Err(CatalogError::permission_denied("course", course_id, owner));
        }
        Ok(course)
    }

    fn owner_of_module<'a>(state: &'a CatalogRoot, module: &Module) -> Option<&'a str> {
        state
            .courses
            .get(&module.course_id)
            .map(|course| course.owner.as_str())
    }

    fn owner_of_content<'a>(state: &'a CatalogRoot, content: &Content) -> Option<&'a str> {
        state
            .modules
            .get(&content.module_id)
            .and_then(|module| Self::owner_of_module(state, module))
    }

    fn remove_course_tree(state: &mut CatalogRoot, course_id: &str) {
        state.courses.remove(course_id);
        let module_ids: Vec<String> = state
            .modules
            .values()
            .filter(|m| m.course_id == course_id)
            .map(|m| m.id.clone())
            .collect();
        for module_id in &module_ids {
            Self::remove_module_tree(state, module_id);
        }
    }

    fn remove_module_tree(state: &mut CatalogRoot, module_id: &str) {
        state.modules.remove(module_id);
        let contents: Vec<(String, String)> = state
            .contents
            .values()
            .filter(|c| c.module_id == module_id)
            .map(|c| (c.id.clone(), c.item_id.clone()))
            .collect();
        for (content_id, item_id) in &contents {
            state.contents.remove(content_id);
            state.items.remove(item_id);
        }
    }

    /// ObjId of a course owned by `owner`, read straight from the document.
    fn owned_course_obj(&self, owner: &str, course_id: &str) -> CatalogResult<ObjId> {
        let obj = self.get_record_obj("courses", "course", course_id)?;
        if self.get_str(&obj, "owner")?.as_deref() != Some(owner) {
            return Err(CatalogError::permission_denied("course", course_id, owner));
        }
        Ok(obj)
    }

    /// ObjId of a module whose course is owned by `owner`.
    fn owned_module_obj(&self, owner: &str, module_id: &str) -> CatalogResult<ObjId> {
        let obj = self.get_record_obj("modules", "module", module_id)?;
        let course_id = self.get_str(&obj, "course_id")?.ok_or_else(|| {
            CatalogError::schema_violation(format!("module {} has no course_id", module_id))
        })?;
        match self.owned_course_obj(owner, &course_id) {
            Ok(_) => Ok(obj),
            Err(CatalogError::NotFound { .. }) | Err(CatalogError::PermissionDenied { .. }) => {
                Err(CatalogError::permission_denied("module", module_id, owner))
            }
            Err(err) => Err(err),
        }
    }

    /// Reads a string scalar at a map key.
    fn get_str(&self, obj: &ObjId, key: &str) -> CatalogResult<Option<String>> {
        match self.doc.get(obj, key)? {
            Some((Value::Scalar(s), _)) => match s.as_ref() {
                ScalarValue::Str(st) => Ok(Some(st.to_string())),
                _ => Ok(None),
            },
            _ => Ok(None),
        }
    }

    /// Gets the ObjId of record `id` in a root collection.
    fn get_record_obj(
        &self,
        collection: &str,
        entity: &'static str,
        id: &str,
    ) -> CatalogResult<ObjId> {
        let collection_obj = self.get_obj_at_key(&ROOT, collection)?.ok_or_else(|| {
            CatalogError::schema_violation(format!("missing '{}' collection", collection))
        })?;
        self.get_obj_at_key(&collection_obj, id)?
            .ok_or_else(|| CatalogError::not_found(entity, id))
    }

    /// Gets an object ID at a map key. `None` if the key is absent.
    fn get_obj_at_key(&self, parent: &ObjId, key: &str) -> CatalogResult<Option<ObjId>> {
        match self.doc.get(parent, key)? {
            Some((Value::Object(_), obj_id)) => Ok(Some(obj_id)),
            Some(_) => Err(CatalogError::schema_violation(format!(
                "'{}' is not an object",
                key
            ))),
            None => Ok(None),
        }
    }
}

impl Default for CatalogManager {
    fn default() -> Self {
        Self::new()
    }
}

fn ensure_new_id<T>(entity: &str, records: &HashMap<String, T>, id: &str) -> CatalogResult<()> {
    if records.contains_key(id) {
        return Err(CatalogError::schema_violation(format!(
            "{entity} {id} already exists"
        )));
    }
    Ok(())
}

// =============================================================================
// INTEGRITY REPORT
// =============================================================================

/// A record whose parent is missing from the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Orphan {
    pub entity: &'static str,
    pub id: String,
    /// Missing parent, e.g. `module 9f2c...`.
    pub parent: String,
}

impl Orphan {
    fn new(entity: &'static str, id: &str, parent_entity: &str, parent_id: &str) -> Self {
        Self {
            entity,
            id: id.to_string(),
            parent: format!("{} {}", parent_entity, parent_id),
        }
    }
}

/// Damage found by [`CatalogManager::integrity_report`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegrityReport {
    /// Positions held by more than one record of a scope.
    pub duplicates: Vec<(&'static str, DuplicatePosition)>,
    pub orphans: Vec<Orphan>,
}

impl IntegrityReport {
    pub fn len(&self) -> usize {
        self.duplicates.len() + self.orphans.len()
    }

    /// True when the document has no duplicates and no orphans.
    pub fn is_empty(&self) -> bool {
        self.duplicates.is_empty() && self.orphans.is_empty()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: &str = "testuser";

    fn course_fixture(manager: &mut CatalogManager, slug: &str) -> Course {
        let subject = match manager
            .list_subjects()
            .unwrap()
            .into_iter()
            .find(|s| s.slug == "test-subject")
        {
            Some(subject) => subject,
            None => manager
                .create_subject(Subject::new("Test Subject", "test-subject"))
                .unwrap(),
        };
        manager
            .create_course(Course::new(OWNER, &subject.id, slug, slug))
            .unwrap()
    }

    fn add_module(manager: &mut CatalogManager, course: &Course, title: &str) -> Module {
        manager
            .create_module(OWNER, Module::new(&course.id, title))
            .unwrap()
    }

    #[test]
    fn test_new_manager() {
        let mut manager = CatalogManager::new();
        let state = manager.get_state().unwrap();
        assert!(state.is_empty());
    }

    #[test]
    fn test_module_order() {
        let mut manager = CatalogManager::new();
        let c1 = course_fixture(&mut manager, "course1");

        let m1 = add_module(&mut manager, &c1, "Module 1");
        assert_eq!(m1.order, Some(0));
        let m2 = add_module(&mut manager, &c1, "Module 2");
        assert_eq!(m2.order, Some(1));
        let m3 = manager
            .create_module(OWNER, Module::new(&c1.id, "Module 3").with_order(5))
            .unwrap();
        assert_eq!(m3.order, Some(5));
        let m4 = add_module(&mut manager, &c1, "Module 4");
        assert_eq!(m4.order, Some(6));

        let c2 = course_fixture(&mut manager, "course2");
        let m5 = add_module(&mut manager, &c2, "Module 1");
        assert_eq!(m5.order, Some(0));

        // Re-read from a reloaded document.
        let bytes = manager.save();
        let mut loaded = CatalogManager::from_bytes(&bytes).unwrap();
        let orders: Vec<Option<u32>> = loaded
            .modules_of(&c1.id)
            .unwrap()
            .iter()
            .map(|m| m.order)
            .collect();
        assert_eq!(orders, vec![Some(0), Some(1), Some(5), Some(6)]);
        assert_eq!(loaded.get_module(&m5.id).unwrap().unwrap().order, Some(0));
    }

    #[test]
    fn test_duplicate_explicit_position_fails() {
        let mut manager = CatalogManager::new();
        let course = course_fixture(&mut manager, "course1");

        manager
            .create_module(OWNER, Module::new(&course.id, "A").with_order(1))
            .unwrap();
        let err = manager
            .create_module(OWNER, Module::new(&course.id, "B").with_order(1))
            .unwrap_err();
        assert!(err.is_integrity());

        // The failed insert wrote nothing.
        assert_eq!(manager.modules_of(&course.id).unwrap().len(), 1);
    }

    #[test]
    fn test_same_position_in_other_course_is_fine() {
        let mut manager = CatalogManager::new();
        let c1 = course_fixture(&mut manager, "course1");
        let c2 = course_fixture(&mut manager, "course2");

        manager
            .create_module(OWNER, Module::new(&c1.id, "A").with_order(3))
            .unwrap();
        manager
            .create_module(OWNER, Module::new(&c2.id, "B").with_order(3))
            .unwrap();
        manager.verify_integrity().unwrap();
    }

    #[test]
    fn test_module_requires_course() {
        let mut manager = CatalogManager::new();
        let err = manager
            .create_module(OWNER, Module::new("missing", "A"))
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFound { entity: "course", .. }));
    }

    #[test]
    fn test_module_id_is_not_overwritten() {
        let mut manager = CatalogManager::new();
        let course = course_fixture(&mut manager, "course1");
        manager
            .create_module(OWNER, Module::new(&course.id, "A").with_id("mod-1"))
            .unwrap();
        let err = manager
            .create_module(OWNER, Module::new(&course.id, "B").with_id("mod-1"))
            .unwrap_err();
        assert!(matches!(err, CatalogError::SchemaViolation(_)));
    }

    #[test]
    fn test_content_order() {
        let mut manager = CatalogManager::new();
        let course = course_fixture(&mut manager, "course1");
        let module = add_module(&mut manager, &course, "Module 1");

        let bodies = [
            ItemBody::text("This is text content 1"),
            ItemBody::file("path/to/file1.pdf"),
            ItemBody::image("path/to/image1.jpg"),
            ItemBody::video("https://www.example.com/video1.mp4"),
        ];
        for (expected, body) in bodies.into_iter().enumerate() {
            let item = ContentItem::new(OWNER, format!("Item {expected}"), body);
            let content = manager
                .create_content(OWNER, &module.id, item, None)
                .unwrap();
            assert_eq!(content.order, Some(expected as u32));
        }

        let bytes = manager.save();
        let mut loaded = CatalogManager::from_bytes(&bytes).unwrap();
        let listed = loaded.items_of(&module.id).unwrap();
        let kinds: Vec<ContentKind> = listed.iter().map(|(_, item)| item.kind()).collect();
        assert_eq!(kinds, ContentKind::ALL.to_vec());
        assert_eq!(listed[3].1.body, ItemBody::video("https://www.example.com/video1.mp4"));
    }

    #[test]
    fn test_content_scopes_per_module() {
        let mut manager = CatalogManager::new();
        let course = course_fixture(&mut manager, "course1");
        let m1 = add_module(&mut manager, &course, "Module 1");
        let m2 = add_module(&mut manager, &course, "Module 2");

        let first = manager
            .create_content(OWNER, &m1.id, ContentItem::new(OWNER, "a", ItemBody::text("a")), None)
            .unwrap();
        let second = manager
            .create_content(OWNER, &m2.id, ContentItem::new(OWNER, "b", ItemBody::text("b")), None)
            .unwrap();
        assert_eq!(first.order, Some(0));
        assert_eq!(second.order, Some(0));
    }

    #[test]
    fn test_content_requires_module_owner() {
        let mut manager = CatalogManager::new();
        let course = course_fixture(&mut manager, "course1");
        let module = add_module(&mut manager, &course, "Module 1");

        let item = ContentItem::new("mallory", "x", ItemBody::text("x"));
        let err = manager
            .create_content("mallory", &module.id, item, None)
            .unwrap_err();
        assert!(matches!(err, CatalogError::PermissionDenied { .. }));
        assert!(manager.contents_of(&module.id).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_slug_rejected() {
        let mut manager = CatalogManager::new();
        course_fixture(&mut manager, "course1");
        let subject = manager.list_subjects().unwrap().remove(0);

        let err = manager
            .create_course(Course::new(OWNER, &subject.id, "Other", "course1"))
            .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateSlug { entity: "course", .. }));

        let err = manager
            .create_subject(Subject::new("Again", "test-subject"))
            .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateSlug { entity: "subject", .. }));
    }

    #[test]
    fn test_title_too_long_rejected() {
        let mut manager = CatalogManager::new();
        let course = course_fixture(&mut manager, "course1");
        let err = manager
            .create_module(OWNER, Module::new(&course.id, "x".repeat(TITLE_MAX + 1)))
            .unwrap_err();
        assert!(matches!(err, CatalogError::FieldTooLong { field: "title", .. }));
    }

    #[test]
    fn test_courses_by_owner_newest_first() {
        let mut manager = CatalogManager::new();
        let subject = manager
            .create_subject(Subject::new("Rust", "rust"))
            .unwrap();
        for (slug, created_at) in [("old", 10), ("new", 30), ("mid", 20)] {
            manager
                .create_course(Course::new(OWNER, &subject.id, slug, slug).with_created_at(created_at))
                .unwrap();
        }
        manager
            .create_course(Course::new("someone", &subject.id, "theirs", "theirs"))
            .unwrap();

        let slugs: Vec<String> = manager
            .courses_by_owner(OWNER)
            .unwrap()
            .into_iter()
            .map(|c| c.slug)
            .collect();
        assert_eq!(slugs, vec!["new", "mid", "old"]);
    }

    #[test]
    fn test_reorder_modules() {
        let mut manager = CatalogManager::new();
        let course = course_fixture(&mut manager, "course1");
        let a = add_module(&mut manager, &course, "A");
        let b = add_module(&mut manager, &course, "B");

        let positions = HashMap::from([(a.id.clone(), 1), (b.id.clone(), 0)]);
        assert_eq!(manager.reorder_modules(OWNER, &positions).unwrap(), 2);

        let titles: Vec<String> = manager
            .modules_of(&course.id)
            .unwrap()
            .into_iter()
            .map(|m| m.title)
            .collect();
        assert_eq!(titles, vec!["B", "A"]);
    }

    #[test]
    fn test_reorder_rejects_collision() {
        let mut manager = CatalogManager::new();
        let course = course_fixture(&mut manager, "course1");
        let a = add_module(&mut manager, &course, "A");
        add_module(&mut manager, &course, "B");

        let positions = HashMap::from([(a.id.clone(), 1)]);
        let err = manager.reorder_modules(OWNER, &positions).unwrap_err();
        assert!(err.is_integrity());
        assert_eq!(manager.get_module(&a.id).unwrap().unwrap().order, Some(0));
    }

    #[test]
    fn test_reorder_skips_foreign_records() {
        let mut manager = CatalogManager::new();
        let course = course_fixture(&mut manager, "course1");
        let a = add_module(&mut manager, &course, "A");

        let positions = HashMap::from([(a.id.clone(), 7), ("missing".to_string(), 2)]);
        assert_eq!(manager.reorder_modules("mallory", &positions).unwrap(), 0);
        assert_eq!(manager.get_module(&a.id).unwrap().unwrap().order, Some(0));
    }

    #[test]
    fn test_reorder_contents() {
        let mut manager = CatalogManager::new();
        let course = course_fixture(&mut manager, "course1");
        let module = add_module(&mut manager, &course, "M");
        let first = manager
            .create_content(OWNER, &module.id, ContentItem::new(OWNER, "a", ItemBody::text("a")), None)
            .unwrap();
        manager
            .create_content(OWNER, &module.id, ContentItem::new(OWNER, "b", ItemBody::text("b")), None)
            .unwrap();

        let positions = HashMap::from([(first.id.clone(), 9)]);
        assert_eq!(manager.reorder_contents(OWNER, &positions).unwrap(), 1);
        let last = manager.contents_of(&module.id).unwrap().pop().unwrap();
        assert_eq!(last.id, first.id);

        // Sequencing continues after the new maximum.
        let next = manager
            .create_content(OWNER, &module.id, ContentItem::new(OWNER, "c", ItemBody::text("c")), None)
            .unwrap();
        assert_eq!(next.order, Some(10));
    }

    #[test]
    fn test_update_module_moves_to_other_course() {
        let mut manager = CatalogManager::new();
        let c1 = course_fixture(&mut manager, "course1");
        let c2 = course_fixture(&mut manager, "course2");
        let module = add_module(&mut manager, &c1, "Moving");
        add_module(&mut manager, &c2, "Resident");

        let target = c2.id.clone();
        let moved = manager
            .update_module(OWNER, &module.id, |m| {
                m.course_id = target;
                m.order = None;
            })
            .unwrap();
        assert_eq!(moved.course_id, c2.id);
        assert_eq!(moved.order, Some(1));
        assert!(manager.modules_of(&c1.id).unwrap().is_empty());
    }

    #[test]
    fn test_update_module_keeps_own_position() {
        let mut manager = CatalogManager::new();
        let course = course_fixture(&mut manager, "course1");
        let module = add_module(&mut manager, &course, "Old");

        let updated = manager
            .update_module(OWNER, &module.id, |m| m.title = "New".to_string())
            .unwrap();
        assert_eq!(updated.order, Some(0));
        assert_eq!(updated.title, "New");
    }

    #[test]
    fn test_delete_course_cascades() {
        let mut manager = CatalogManager::new();
        let course = course_fixture(&mut manager, "course1");
        let module = add_module(&mut manager, &course, "M");
        manager
            .create_content(OWNER, &module.id, ContentItem::new(OWNER, "a", ItemBody::text("a")), None)
            .unwrap();

        let err = manager.delete_course("mallory", &course.id).unwrap_err();
        assert!(matches!(err, CatalogError::PermissionDenied { .. }));

        manager.delete_course(OWNER, &course.id).unwrap();
        let state = manager.get_state().unwrap();
        assert!(state.courses.is_empty());
        assert!(state.modules.is_empty());
        assert!(state.contents.is_empty());
        assert!(state.items.is_empty());
        assert_eq!(state.subjects.len(), 1);
    }

    #[test]
    fn test_delete_content_removes_item() {
        let mut manager = CatalogManager::new();
        let course = course_fixture(&mut manager, "course1");
        let module = add_module(&mut manager, &course, "M");
        let content = manager
            .create_content(OWNER, &module.id, ContentItem::new(OWNER, "a", ItemBody::text("a")), None)
            .unwrap();

        manager.delete_content(OWNER, &content.id).unwrap();
        assert!(manager.get_item(&content.item_id).unwrap().is_none());
        assert!(manager.get_content(&content.id).unwrap().is_none());
    }

    #[test]
    fn test_update_item_changes_kind() {
        let mut manager = CatalogManager::new();
        let course = course_fixture(&mut manager, "course1");
        let module = add_module(&mut manager, &course, "M");
        let content = manager
            .create_content(OWNER, &module.id, ContentItem::new(OWNER, "a", ItemBody::text("a")), None)
            .unwrap();

        let item = manager
            .update_item(OWNER, &content.item_id, 42, |item| {
                item.body = ItemBody::video("https://example.com/a.mp4");
            })
            .unwrap();
        assert_eq!(item.updated_at, 42);

        let bytes = manager.save();
        let mut loaded = CatalogManager::from_bytes(&bytes).unwrap();
        let stored = loaded.get_content(&content.id).unwrap().unwrap();
        assert_eq!(stored.kind, ContentKind::Video);
        let item = loaded.get_item(&content.item_id).unwrap().unwrap();
        assert_eq!(item.body, ItemBody::video("https://example.com/a.mp4"));
    }

    #[test]
    fn test_targeted_module_title() {
        let mut manager = CatalogManager::new();
        let course = course_fixture(&mut manager, "course1");
        let module = add_module(&mut manager, &course, "Old");

        manager.set_module_title(OWNER, &module.id, "New").unwrap();
        manager
            .set_module_description(OWNER, &module.id, "Desc")
            .unwrap();
        manager
            .set_course_overview(OWNER, &course.id, "All about it")
            .unwrap();
        let stored = manager.get_module(&module.id).unwrap().unwrap();
        assert_eq!(stored.title, "New");
        assert_eq!(stored.description, "Desc");
        assert_eq!(stored.order, Some(0));
        let course = manager.get_course(&course.id).unwrap().unwrap();
        assert_eq!(course.overview, "All about it");

        let err = manager.set_module_title(OWNER, "missing", "x").unwrap_err();
        assert!(matches!(err, CatalogError::NotFound { entity: "module", .. }));
    }

    #[test]
    fn test_targeted_updates_check_owner() {
        let mut manager = CatalogManager::new();
        let course = course_fixture(&mut manager, "course1");
        let module = add_module(&mut manager, &course, "Old");

        let err = manager
            .set_module_title("mallory", &module.id, "Mine")
            .unwrap_err();
        assert!(matches!(err, CatalogError::PermissionDenied { entity: "module", .. }));
        let err = manager
            .set_module_description("mallory", &module.id, "Mine")
            .unwrap_err();
        assert!(matches!(err, CatalogError::PermissionDenied { .. }));
        let err = manager
            .set_course_overview("mallory", &course.id, "Mine")
            .unwrap_err();
        assert!(matches!(err, CatalogError::PermissionDenied { entity: "course", .. }));

        let stored = manager.get_module(&module.id).unwrap().unwrap();
        assert_eq!(stored.title, "Old");
        assert_eq!(stored.description, "");
    }

    #[test]
    fn test_create_module_checks_owner() {
        let mut manager = CatalogManager::new();
        let course = course_fixture(&mut manager, "course1");

        let err = manager
            .create_module("mallory", Module::new(&course.id, "Intruder"))
            .unwrap_err();
        assert!(matches!(err, CatalogError::PermissionDenied { entity: "course", .. }));
        assert!(manager.modules_of(&course.id).unwrap().is_empty());
    }

    #[test]
    fn test_delete_subject_cascades() {
        let mut manager = CatalogManager::new();
        let course = course_fixture(&mut manager, "course1");
        let module = add_module(&mut manager, &course, "M");
        manager
            .create_content(OWNER, &module.id, ContentItem::new(OWNER, "a", ItemBody::text("a")), None)
            .unwrap();

        manager.delete_subject(&course.subject_id).unwrap();
        assert!(manager.get_state().unwrap().is_empty());

        let err = manager.delete_subject(&course.subject_id).unwrap_err();
        assert!(matches!(err, CatalogError::NotFound { entity: "subject", .. }));
    }

    #[test]
    fn test_update_course() {
        let mut manager = CatalogManager::new();
        let course = course_fixture(&mut manager, "course1");
        course_fixture(&mut manager, "course2");

        // Own slug is still accepted.
        let renamed = manager
            .update_course(OWNER, &course.id, |c| {
                c.title = "Renamed".to_string();
                c.id = "hijacked".to_string();
                c.owner = "mallory".to_string();
            })
            .unwrap();
        assert_eq!(renamed.id, course.id);
        assert_eq!(renamed.owner, OWNER);
        assert_eq!(renamed.slug, "course1");

        let stored = manager.get_course(&course.id).unwrap().unwrap();
        assert_eq!(stored.title, "Renamed");
        assert!(manager.get_course("hijacked").unwrap().is_none());

        let err = manager
            .update_course("mallory", &course.id, |c| c.title = "Mine".to_string())
            .unwrap_err();
        assert!(matches!(err, CatalogError::PermissionDenied { .. }));

        let err = manager
            .update_course(OWNER, &course.id, |c| c.slug = "course2".to_string())
            .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateSlug { entity: "course", .. }));
        assert_eq!(manager.get_course(&course.id).unwrap().unwrap().slug, "course1");
    }

    #[test]
    fn test_deleted_parent_surfaces_on_merge() {
        let mut base = CatalogManager::new();
        let course = course_fixture(&mut base, "course1");
        let module = add_module(&mut base, &course, "Doomed");

        let bytes = base.save();
        let mut client_a = CatalogManager::from_bytes(&bytes).unwrap();
        let mut client_b = CatalogManager::from_bytes(&bytes).unwrap();

        client_a.delete_module(OWNER, &module.id).unwrap();
        let content = client_b
            .create_content(OWNER, &module.id, ContentItem::new(OWNER, "late", ItemBody::text("x")), None)
            .unwrap();

        client_a.merge(&mut client_b).unwrap();
        let report = client_a.integrity_report().unwrap();
        assert!(report.duplicates.is_empty());
        assert_eq!(
            report.orphans,
            vec![Orphan {
                entity: "content",
                id: content.id.clone(),
                parent: format!("module {}", module.id),
            }]
        );

        let err = client_a.verify_integrity().unwrap_err();
        assert!(matches!(err, CatalogError::Orphaned { entity: "content", .. }));
    }

    #[test]
    fn test_json_snapshot() {
        let mut manager = CatalogManager::new();
        let course = course_fixture(&mut manager, "course1");
        add_module(&mut manager, &course, "A");
        manager
            .create_module(OWNER, Module::new(&course.id, "B").with_order(4))
            .unwrap();

        let json = manager.to_json().unwrap();
        let mut restored = CatalogManager::from_json(&json).unwrap();
        assert_eq!(restored.get_state().unwrap(), manager.get_state().unwrap());

        let err = CatalogManager::from_json("{ not json").err().unwrap();
        assert!(matches!(err, CatalogError::Serialization(_)));
    }

    #[test]
    fn test_concurrent_appends_surface_on_merge() {
        let mut base = CatalogManager::new();
        let course = course_fixture(&mut base, "course1");
        add_module(&mut base, &course, "Shared");

        let bytes = base.save();
        let mut client_a = CatalogManager::from_bytes(&bytes).unwrap();
        let mut client_b = CatalogManager::from_bytes(&bytes).unwrap();

        let a = add_module(&mut client_a, &course, "From A");
        let b = add_module(&mut client_b, &course, "From B");
        assert_eq!(a.order, Some(1));
        assert_eq!(b.order, Some(1));

        client_a.merge(&mut client_b).unwrap();
        assert_eq!(client_a.modules_of(&course.id).unwrap().len(), 3);

        let report = client_a.integrity_report().unwrap();
        assert_eq!(report.len(), 1);
        assert!(report.orphans.is_empty());
        assert_eq!(report.duplicates[0].0, "module");
        assert_eq!(report.duplicates[0].1.position, 1);

        let err = client_a.verify_integrity().unwrap_err();
        assert!(err.is_integrity());

        // Re-numbering one side resolves the conflict.
        let positions = HashMap::from([(b.id.clone(), 2)]);
        client_a.reorder_modules(OWNER, &positions).unwrap();
        client_a.verify_integrity().unwrap();
    }

    #[test]
    fn test_sync_message_roundtrip() {
        let mut server = CatalogManager::new();
        let course = course_fixture(&mut server, "course1");
        let mut client = CatalogManager::from_bytes(&server.save()).unwrap();
        let heads = client.get_heads();

        add_module(&mut server, &course, "New");
        let msg = server.generate_sync_message(&heads).unwrap();
        client.apply_sync_message(&msg).unwrap();

        assert_eq!(client.modules_of(&course.id).unwrap().len(), 1);
        let latest = server.get_heads();
        assert!(server.generate_sync_message(&latest).is_none());
    }
}
