//! WASM bindings for the catalog module.
//!
//! This module provides JavaScript-friendly wrappers around the
//! CatalogManager for use in browser environments.

use std::collections::HashMap;

use automerge::ChangeHash;
use js_sys::{Array, Uint8Array};
use serde::Serialize;
use serde_wasm_bindgen::{from_value, Serializer};
use wasm_bindgen::prelude::*;

use crate::catalog::manager::CatalogManager;
use crate::catalog::model::*;
use crate::CatalogError;

/// Serialize a value to JsValue with HashMaps as plain JS objects (not Map).
fn to_js_value<T: Serialize>(value: &T) -> Result<JsValue, serde_wasm_bindgen::Error> {
    value.serialize(&Serializer::new().serialize_maps_as_objects(true))
}

// =============================================================================
// ERROR CONVERSION
// =============================================================================

/// Helper macro for Result conversion
macro_rules! js_result {
    ($expr:expr) => {
        $expr.map_err(|e: CatalogError| JsValue::from_str(&e.to_string()))
    };
}

// =============================================================================
// MAIN WRAPPER TYPE
// =============================================================================

/// JavaScript-friendly wrapper around CatalogManager.
#[wasm_bindgen]
pub struct JsCatalogManager {
    inner: CatalogManager,
}

#[wasm_bindgen]
impl JsCatalogManager {
    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Creates a new empty catalog manager.
    ///
    /// # Example (JavaScript)
    /// ```js
    /// const manager = new JsCatalogManager();
    /// ```
    #[wasm_bindgen(constructor)]
    pub fn new() -> JsCatalogManager {
        JsCatalogManager {
            inner: CatalogManager::new(),
        }
    }

    /// Loads from binary bytes (Uint8Array).
    #[wasm_bindgen(js_name = fromBytes)]
    pub fn from_bytes(bytes: &[u8]) -> Result<JsCatalogManager, JsValue> {
        let inner = js_result!(CatalogManager::from_bytes(bytes))?;
        Ok(JsCatalogManager { inner })
    }

    /// Saves to binary bytes (returns Uint8Array).
    #[wasm_bindgen(js_name = toBytes)]
    pub fn to_bytes(&mut self) -> Uint8Array {
        let bytes = self.inner.save();
        Uint8Array::from(&bytes[..])
    }

    /// Gets the actor ID for this document instance.
    #[wasm_bindgen(js_name = actorId)]
    pub fn actor_id(&self) -> String {
        self.inner.actor_id()
    }

    /// Gets the current heads (for sync protocol).
    #[wasm_bindgen(js_name = getHeads)]
    pub fn get_heads(&mut self) -> Array {
        let heads = self.inner.get_heads();
        heads
            .into_iter()
            .map(|h| JsValue::from_str(&h.to_string()))
            .collect()
    }

    /// Gets the full document state as a JavaScript object.
    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&mut self) -> Result<JsValue, JsValue> {
        let state = js_result!(self.inner.get_state())?;
        Ok(to_js_value(&state)?)
    }

    /// Pretty-printed JSON snapshot of the catalog.
    #[wasm_bindgen(js_name = toJson)]
    pub fn to_json(&mut self) -> Result<String, JsValue> {
        js_result!(self.inner.to_json())
    }

    // =========================================================================
    // SUBJECTS & COURSES
    // =========================================================================

    /// Creates a subject and returns it.
    #[wasm_bindgen(js_name = createSubject)]
    pub fn create_subject(&mut self, title: &str, slug: &str) -> Result<JsValue, JsValue> {
        let subject = js_result!(self.inner.create_subject(Subject::new(title, slug)))?;
        Ok(to_js_value(&subject)?)
    }

    /// Lists subjects sorted by title.
    #[wasm_bindgen(js_name = listSubjects)]
    pub fn list_subjects(&mut self) -> Result<JsValue, JsValue> {
        let subjects = js_result!(self.inner.list_subjects())?;
        Ok(to_js_value(&subjects)?)
    }

    /// Creates a course and returns it.
    ///
    /// # Example (JavaScript)
    /// ```js
    /// const course = manager.createCourse("ana", subject.id, "Rust 101", "rust-101", Date.now());
    /// ```
    #[wasm_bindgen(js_name = createCourse)]
    pub fn create_course(
        &mut self,
        owner: &str,
        subject_id: &str,
        title: &str,
        slug: &str,
        created_at: i64,
    ) -> Result<JsValue, JsValue> {
        let course = Course::new(owner, subject_id, title, slug).with_created_at(created_at);
        let course = js_result!(self.inner.create_course(course))?;
        Ok(to_js_value(&course)?)
    }

    /// Courses of `owner`, newest first.
    #[wasm_bindgen(js_name = coursesByOwner)]
    pub fn courses_by_owner(&mut self, owner: &str) -> Result<JsValue, JsValue> {
        let courses = js_result!(self.inner.courses_by_owner(owner))?;
        Ok(to_js_value(&courses)?)
    }

    /// Sets the course overview (O(1)).
    #[wasm_bindgen(js_name = setCourseOverview)]
    pub fn set_course_overview(
        &mut self,
        owner: &str,
        course_id: &str,
        overview: &str,
    ) -> Result<(), JsValue> {
        js_result!(self.inner.set_course_overview(owner, course_id, overview))
    }

    /// Deletes a course with its modules and contents.
    #[wasm_bindgen(js_name = deleteCourse)]
    pub fn delete_course(&mut self, owner: &str, course_id: &str) -> Result<(), JsValue> {
        js_result!(self.inner.delete_course(owner, course_id))
    }

    // =========================================================================
    // MODULES
    // =========================================================================

    /// Creates a module. Pass `undefined` as `order` to append it.
    #[wasm_bindgen(js_name = createModule)]
    pub fn create_module(
        &mut self,
        owner: &str,
        course_id: &str,
        title: &str,
        description: &str,
        order: Option<u32>,
    ) -> Result<JsValue, JsValue> {
        let mut module = Module::new(course_id, title).with_description(description);
        module.order = order;
        let module = js_result!(self.inner.create_module(owner, module))?;
        Ok(to_js_value(&module)?)
    }

    /// Modules of a course in position order.
    #[wasm_bindgen(js_name = modulesOf)]
    pub fn modules_of(&mut self, course_id: &str) -> Result<JsValue, JsValue> {
        let modules = js_result!(self.inner.modules_of(course_id))?;
        Ok(to_js_value(&modules)?)
    }

    /// Sets the module title (O(1)).
    #[wasm_bindgen(js_name = setModuleTitle)]
    pub fn set_module_title(
        &mut self,
        owner: &str,
        module_id: &str,
        title: &str,
    ) -> Result<(), JsValue> {
        js_result!(self.inner.set_module_title(owner, module_id, title))
    }

    /// Sets the module description (O(1)).
    #[wasm_bindgen(js_name = setModuleDescription)]
    pub fn set_module_description(
        &mut self,
        owner: &str,
        module_id: &str,
        description: &str,
    ) -> Result<(), JsValue> {
        js_result!(self.inner.set_module_description(owner, module_id, description))
    }

    /// Deletes a module with its contents.
    #[wasm_bindgen(js_name = deleteModule)]
    pub fn delete_module(&mut self, owner: &str, module_id: &str) -> Result<(), JsValue> {
        js_result!(self.inner.delete_module(owner, module_id))
    }

    /// Applies `{ moduleId: position }` and returns the number moved.
    ///
    /// # Example (JavaScript)
    /// ```js
    /// manager.reorderModules("ana", { [a.id]: 1, [b.id]: 0 });
    /// ```
    #[wasm_bindgen(js_name = reorderModules)]
    pub fn reorder_modules(&mut self, owner: &str, positions: JsValue) -> Result<usize, JsValue> {
        let positions: HashMap<String, u32> = from_value(positions)?;
        js_result!(self.inner.reorder_modules(owner, &positions))
    }

    // =========================================================================
    // CONTENTS
    // =========================================================================

    /// Creates an item of `kind` (text, file, image, video) and attaches it
    /// to a module. `payload` is the text, file path or video URL.
    #[wasm_bindgen(js_name = createContent)]
    pub fn create_content(
        &mut self,
        owner: &str,
        module_id: &str,
        kind: &str,
        title: &str,
        payload: &str,
        timestamp: i64,
        order: Option<u32>,
    ) -> Result<JsValue, JsValue> {
        let kind: ContentKind = js_result!(kind.parse())?;
        let item = ContentItem::new(owner, title, ItemBody::from_kind(kind, payload))
            .with_timestamp(timestamp);
        let content = js_result!(self.inner.create_content(owner, module_id, item, order))?;
        Ok(to_js_value(&content)?)
    }

    /// Contents of a module in position order, as `[content, item]` pairs.
    #[wasm_bindgen(js_name = itemsOf)]
    pub fn items_of(&mut self, module_id: &str) -> Result<JsValue, JsValue> {
        let items = js_result!(self.inner.items_of(module_id))?;
        Ok(to_js_value(&items)?)
    }

    /// Deletes a content and its item.
    #[wasm_bindgen(js_name = deleteContent)]
    pub fn delete_content(&mut self, owner: &str, content_id: &str) -> Result<(), JsValue> {
        js_result!(self.inner.delete_content(owner, content_id))
    }

    /// Applies `{ contentId: position }` and returns the number moved.
    #[wasm_bindgen(js_name = reorderContents)]
    pub fn reorder_contents(&mut self, owner: &str, positions: JsValue) -> Result<usize, JsValue> {
        let positions: HashMap<String, u32> = from_value(positions)?;
        js_result!(self.inner.reorder_contents(owner, &positions))
    }

    // =========================================================================
    // SYNC OPERATIONS
    // =========================================================================

    /// Merges another manager's changes into this one.
    #[wasm_bindgen]
    pub fn merge(&mut self, other: &mut JsCatalogManager) -> Result<(), JsValue> {
        js_result!(self.inner.merge(&mut other.inner))
    }

    /// Throws on the first position shared by two modules of a course or two
    /// contents of a module, then on the first record whose parent is gone.
    /// Call after `merge` or `applyChanges`.
    #[wasm_bindgen(js_name = verifyIntegrity)]
    pub fn verify_integrity(&mut self) -> Result<(), JsValue> {
        js_result!(self.inner.verify_integrity())
    }

    /// Gets changes since the given heads (for incremental sync).
    ///
    /// Takes an array of hex-encoded change hashes and returns the diff bytes
    /// as a Uint8Array. Returns null if there are no changes.
    #[wasm_bindgen(js_name = getChangesSince)]
    pub fn get_changes_since(&mut self, their_heads: Array) -> Result<JsValue, JsValue> {
        let heads: Vec<ChangeHash> = their_heads
            .iter()
            .filter_map(|v| {
                v.as_string().and_then(|s| {
                    let bytes = hex::decode(&s).ok()?;
                    if bytes.len() == 32 {
                        let mut arr = [0u8; 32];
                        arr.copy_from_slice(&bytes);
                        Some(ChangeHash(arr))
                    } else {
                        None
                    }
                })
            })
            .collect();

        match self.inner.generate_sync_message(&heads) {
            Some(bytes) => Ok(Uint8Array::from(&bytes[..]).into()),
            None => Ok(JsValue::NULL),
        }
    }

    /// Applies incremental changes from a diff (for incremental sync).
    #[wasm_bindgen(js_name = applyChanges)]
    pub fn apply_changes(&mut self, changes: &[u8]) -> Result<(), JsValue> {
        js_result!(self.inner.apply_sync_message(changes))
    }
}

impl Default for JsCatalogManager {
    fn default() -> Self {
        Self::new()
    }
}
