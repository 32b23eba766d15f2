//! Input structs for importing a catalog from JSON.
//!
//! The import format is nested (subject → course → module → content) and
//! uses arrays; positions are optional and are sequenced on insert when
//! missing.

use anyhow::{Context, Result};
use serde::Deserialize;

use coursebook::{CatalogManager, ContentItem, ContentKind, Course, ItemBody, Module, Subject};

// =============================================================================
// INPUT STRUCTS
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct InputCatalog {
    #[serde(default)]
    pub subjects: Vec<InputSubject>,
}

#[derive(Debug, Deserialize)]
pub struct InputSubject {
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub courses: Vec<InputCourse>,
}

#[derive(Debug, Deserialize)]
pub struct InputCourse {
    /// Falls back to the `--owner` flag.
    pub owner: Option<String>,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub modules: Vec<InputModule>,
}

#[derive(Debug, Deserialize)]
pub struct InputModule {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub order: Option<u32>,
    #[serde(default)]
    pub contents: Vec<InputContent>,
}

#[derive(Debug, Deserialize)]
pub struct InputContent {
    pub kind: String,
    pub title: String,
    /// Text body, file path or video URL depending on `kind`.
    pub payload: String,
    pub order: Option<u32>,
}

// =============================================================================
// IMPORT
// =============================================================================

/// Counts of records written by an import.
#[derive(Debug, Default)]
pub struct ImportStats {
    pub subjects: usize,
    pub courses: usize,
    pub modules: usize,
    pub contents: usize,
}

impl InputCatalog {
    /// Inserts everything through the manager's validated operations, in
    /// file order, so modules and contents without `order` are appended.
    pub fn import_into(self, manager: &mut CatalogManager, owner: &str) -> Result<ImportStats> {
        let mut stats = ImportStats::default();

        for input_subject in self.subjects {
            let subject = manager
                .create_subject(Subject::new(&input_subject.title, &input_subject.slug))
                .with_context(|| format!("Failed to import subject '{}'", input_subject.slug))?;
            stats.subjects += 1;

            for input_course in input_subject.courses {
                let course_owner = input_course.owner.as_deref().unwrap_or(owner);
                let course = Course::new(
                    course_owner,
                    &subject.id,
                    &input_course.title,
                    &input_course.slug,
                )
                .with_overview(&input_course.overview)
                .with_created_at(input_course.created_at);
                let course = manager
                    .create_course(course)
                    .with_context(|| format!("Failed to import course '{}'", input_course.slug))?;
                stats.courses += 1;

                for input_module in input_course.modules {
                    let mut module = Module::new(&course.id, &input_module.title)
                        .with_description(&input_module.description);
                    module.order = input_module.order;
                    let module = manager.create_module(&course.owner, module).with_context(|| {
                        format!(
                            "Failed to import module '{}' of course '{}'",
                            input_module.title, course.slug
                        )
                    })?;
                    stats.modules += 1;

                    for input_content in input_module.contents {
                        let kind: ContentKind = input_content.kind.parse()?;
                        let item = ContentItem::new(
                            &course.owner,
                            &input_content.title,
                            ItemBody::from_kind(kind, input_content.payload),
                        )
                        .with_timestamp(course.created_at);
                        manager
                            .create_content(&course.owner, &module.id, item, input_content.order)
                            .with_context(|| {
                                format!(
                                    "Failed to import content '{}' of module '{}'",
                                    input_content.title, module.title
                                )
                            })?;
                        stats.contents += 1;
                    }
                }
            }
        }

        Ok(stats)
    }
}
