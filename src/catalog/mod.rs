//! Template and preset catalog.
//!
//! Definitions are registered once into a `CatalogBuilder`, then frozen into
//! an immutable `Arc<TemplateCatalog>` shared by every compilation. Lookups
//! hand out deep copies, so callers can never mutate catalog state.

pub mod builtin;
pub mod merge;

use std::sync::{Arc, LazyLock};

use indexmap::IndexMap;
use log::debug;
use serde::Serialize;

use crate::error::{ChoreoError, Result};
use crate::model::{Preset, Template};

pub use merge::apply_preset;

/// Mutable registration phase. Rejects duplicate ids.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    templates: IndexMap<String, Template>,
    aliases: IndexMap<String, String>,
    presets: IndexMap<String, Preset>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_template(&mut self, template: Template) -> Result<&mut Self> {
        let id = template.template_id().to_string();
        if self.templates.contains_key(&id) || self.aliases.contains_key(&id) {
            return Err(ChoreoError::Collision { kind: "template", id });
        }
        self.templates.insert(id, template);
        Ok(self)
    }

    /// Register `alias` as another name for the already-registered `template_id`.
    pub fn register_alias(&mut self, alias: &str, template_id: &str) -> Result<&mut Self> {
        if self.templates.contains_key(alias) || self.aliases.contains_key(alias) {
            return Err(ChoreoError::Collision {
                kind: "template alias",
                id: alias.to_string(),
            });
        }
        if !self.templates.contains_key(template_id) {
            return Err(ChoreoError::not_found(
                "template",
                template_id,
                self.templates.keys().cloned().collect(),
            ));
        }
        self.aliases.insert(alias.to_string(), template_id.to_string());
        Ok(self)
    }

    pub fn register_preset(&mut self, preset: Preset) -> Result<&mut Self> {
        preset.validate()?;
        let id = preset.preset_id.clone();
        if self.presets.contains_key(&id) {
            return Err(ChoreoError::Collision { kind: "preset", id });
        }
        self.presets.insert(id, preset);
        Ok(self)
    }

    /// Freeze into a read-only catalog.
    pub fn build(self) -> Arc<TemplateCatalog> {
        debug!(
            "catalog frozen: {} templates, {} aliases, {} presets",
            self.templates.len(),
            self.aliases.len(),
            self.presets.len()
        );
        Arc::new(TemplateCatalog {
            templates: self.templates,
            aliases: self.aliases,
            presets: self.presets,
        })
    }
}

/// Short listing entry for front ends.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateSummary {
    pub template_id: String,
    pub name: String,
    pub category: String,
    pub version: u32,
    pub steps: Vec<String>,
    pub aliases: Vec<String>,
}

/// Frozen catalog. Safe to share across threads.
#[derive(Debug)]
pub struct TemplateCatalog {
    templates: IndexMap<String, Template>,
    aliases: IndexMap<String, String>,
    presets: IndexMap<String, Preset>,
}

impl TemplateCatalog {
    /// Independent copy of a template, looked up by id or alias.
    pub fn get(&self, id_or_alias: &str) -> Result<Template> {
        let id = self.aliases.get(id_or_alias).map_or(id_or_alias, String::as_str);
        self.templates.get(id).cloned().ok_or_else(|| {
            let mut valid: Vec<String> = self.templates.keys().cloned().collect();
            valid.extend(self.aliases.keys().cloned());
            ChoreoError::not_found("template", id_or_alias, valid)
        })
    }

    pub fn get_preset(&self, preset_id: &str) -> Result<Preset> {
        self.presets
            .get(preset_id)
            .cloned()
            .ok_or_else(|| ChoreoError::not_found("preset", preset_id, self.presets.keys().cloned().collect()))
    }

    /// Template with the preset (if any) applied.
    pub fn resolve(&self, template_id: &str, preset_id: Option<&str>) -> Result<Template> {
        let template = self.get(template_id)?;
        match preset_id {
            Some(pid) => apply_preset(&template, &self.get_preset(pid)?),
            None => Ok(template),
        }
    }

    pub fn template_ids(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn preset_ids(&self) -> impl Iterator<Item = &str> {
        self.presets.keys().map(String::as_str)
    }

    pub fn presets(&self) -> impl Iterator<Item = &Preset> {
        self.presets.values()
    }

    pub fn summaries(&self) -> Vec<TemplateSummary> {
        self.templates
            .values()
            .map(|t| TemplateSummary {
                template_id: t.template_id().to_string(),
                name: t.name().to_string(),
                category: t.category().to_string(),
                version: t.version(),
                steps: t.steps().iter().map(|s| s.step_id().to_string()).collect(),
                aliases: self
                    .aliases
                    .iter()
                    .filter(|(_, target)| target.as_str() == t.template_id())
                    .map(|(alias, _)| alias.clone())
                    .collect(),
            })
            .collect()
    }
}

static BUILTIN: LazyLock<std::result::Result<Arc<TemplateCatalog>, String>> =
    LazyLock::new(|| builtin::builder().map(CatalogBuilder::build).map_err(|e| e.to_string()));

/// Process-wide catalog of the shipped templates and presets, built on first use.
pub fn builtin_catalog() -> Result<Arc<TemplateCatalog>> {
    match &*BUILTIN {
        Ok(catalog) => Ok(Arc::clone(catalog)),
        Err(msg) => Err(ChoreoError::validation("builtin catalog", msg.clone())),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::model::template::test_support::simple_draft;

    fn template(id: &str) -> Template {
        Template::new(simple_draft(id)).unwrap()
    }

    #[test]
    fn duplicate_registration_collides() {
        let mut b = CatalogBuilder::new();
        b.register_template(template("a")).unwrap();
        assert!(matches!(
            b.register_template(template("a")),
            Err(ChoreoError::Collision { .. })
        ));
        b.register_alias("x", "a").unwrap();
        assert!(b.register_alias("x", "a").is_err());
        assert!(b.register_alias("a", "a").is_err());
        b.register_preset(Preset::new("p", "P")).unwrap();
        assert!(b.register_preset(Preset::new("p", "P")).is_err());
    }

    #[test]
    fn alias_needs_existing_target() {
        let mut b = CatalogBuilder::new();
        assert!(matches!(b.register_alias("x", "missing"), Err(ChoreoError::NotFound { .. })));
    }

    #[test]
    fn get_resolves_aliases_and_lists_valid_ids() {
        let mut b = CatalogBuilder::new();
        b.register_template(template("a")).unwrap();
        b.register_alias("alpha", "a").unwrap();
        let catalog = b.build();
        assert_eq!(catalog.get("alpha").unwrap().template_id(), "a");
        let err = catalog.get("zzz").unwrap_err().to_string();
        assert!(err.contains("zzz") && err.contains("alpha"), "{err}");
    }

    #[test]
    fn builtin_catalog_loads() {
        let catalog = builtin_catalog().unwrap();
        assert!(catalog.template_ids().count() >= 4);
        for summary in catalog.summaries() {
            assert!(!summary.steps.is_empty());
        }
    }

    #[test]
    fn builtin_presets_apply_to_some_template() {
        let catalog = builtin_catalog().unwrap();
        for preset in catalog.presets() {
            let applies = catalog
                .template_ids()
                .any(|tid| catalog.resolve(tid, Some(&preset.preset_id)).is_ok());
            assert!(applies, "preset {} matches no template", preset.preset_id);
        }
    }
}
