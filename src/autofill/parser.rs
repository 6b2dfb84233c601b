use std::collections::BTreeMap;

use anyhow::{bail, Result};

use crate::autofill::{
    catalog::{FieldCatalog, FieldDescriptor, FieldKind},
    collection::SavedValueCollection,
    hints::{filter_supported_hints, infer_hint, is_supported_hint},
    structure::{ScreenStructure, ViewNode, AUTOFILL_TYPE_NONE},
    value::SavedValue,
};
use crate::{log_debug, log_warn};

const ENABLE_LOGS: bool = true;

/// Walks a screen snapshot and collects autofill metadata from its views.
pub struct StructureParser<'a> {
    structure: &'a ScreenStructure,
    learned_hints: Option<&'a BTreeMap<String, String>>,
}

impl<'a> StructureParser<'a> {
    pub fn new(structure: &'a ScreenStructure) -> Self {
        Self {
            structure,
            learned_hints: None,
        }
    }

    /// Hints remembered per resource id for this package, consulted for views
    /// that declare no supported hint of their own.
    pub fn with_learned_hints(mut self, learned_hints: &'a BTreeMap<String, String>) -> Self {
        self.learned_hints = Some(learned_hints);
        self
    }

    /// Catalog of every view that carries, or can be given, a supported hint. Fails if
    /// views on the screen claim different web domains.
    pub fn parse_for_fill(&self) -> Result<FieldCatalog> {
        log_debug!("Parsing structure of {} for fill", self.structure.package_name);
        self.web_domain()?;

        let mut catalog = FieldCatalog::new();
        self.structure.walk(|node| {
            let Some(hints) = self.hints_for(node) else {
                return;
            };
            let Some(id) = node.autofill_id.clone() else {
                log_warn!("Autofill id missing for view {:?}", node.id_entry);
                return;
            };
            let kind = FieldKind::from_raw(node.autofill_type, node.autofill_options.as_deref());
            catalog.add(FieldDescriptor::new(id, kind, hints).focused(node.focused));
        });

        Ok(catalog)
    }

    /// Captures the values currently shown in every hinted view.
    pub fn parse_for_save(&self) -> SavedValueCollection {
        log_debug!("Parsing structure of {} for save", self.structure.package_name);

        let mut collection = SavedValueCollection::new();
        self.structure.walk(|node| {
            let Some(hints) = self.hints_for(node) else {
                return;
            };
            let value = SavedValue::from_observed(
                node.autofill_value.as_ref(),
                node.autofill_options.as_deref(),
            );
            collection.set_value_for_hints(&hints, value);
        });

        collection
    }

    /// The single web domain declared by the screen's views, if any.
    pub fn web_domain(&self) -> Result<Option<String>> {
        let mut domain: Option<&str> = None;
        self.structure.try_walk(|node| {
            let Some(child) = node.web_domain.as_deref() else {
                return Ok(());
            };
            match domain {
                Some(valid) if valid != child => {
                    bail!("Found multiple web domains: valid={valid}, child={child}")
                }
                Some(_) => Ok(()),
                None => {
                    log_debug!("Web domain: {}", child);
                    domain = Some(child);
                    Ok(())
                }
            }
        })?;
        Ok(domain.map(str::to_string))
    }

    /// Resource id to explicit hint, for every view that has both. Saved so
    /// later screens of the same package can be filled without hints.
    pub fn resource_id_hints(&self) -> BTreeMap<String, String> {
        let mut learned = BTreeMap::new();
        self.structure.walk(|node| {
            let Some(resource_id) = node.id_entry.as_deref() else {
                return;
            };
            if let Some(hint) = filter_supported_hints(&node.autofill_hints).into_iter().next() {
                learned.insert(resource_id.to_string(), hint);
            }
        });
        learned
    }

    /// Explicit supported hints first, then a hint learned for the view's
    /// resource id, then one inferred from its text.
    fn hints_for(&self, node: &ViewNode) -> Option<Vec<String>> {
        let hints = filter_supported_hints(&node.autofill_hints);
        if !hints.is_empty() {
            return Some(hints);
        }
        if node.autofill_type == AUTOFILL_TYPE_NONE {
            return None;
        }

        let learned = node
            .id_entry
            .as_deref()
            .zip(self.learned_hints)
            .and_then(|(resource_id, learned)| learned.get(resource_id))
            .filter(|hint| is_supported_hint(hint));
        if let Some(hint) = learned {
            log_debug!("Using learned hint {} for view {:?}", hint, node.id_entry);
            return Some(vec![hint.clone()]);
        }

        match inferred_hint(node) {
            Some(hint) => Some(vec![hint.to_string()]),
            None => {
                log_debug!("No supported hints on view {:?}", node.id_entry);
                None
            }
        }
    }
}

/// View hint text, then resource id, then the typed text of an edit box.
/// The text itself never reaches the log.
fn inferred_hint(node: &ViewNode) -> Option<&'static str> {
    if let Some(hint) = node.hint.as_deref().and_then(infer_hint) {
        log_debug!("Inferred {} from view hint of {:?}", hint, node.id_entry);
        return Some(hint);
    }
    if let Some(hint) = node.id_entry.as_deref().and_then(infer_hint) {
        log_debug!("Inferred {} from resource id {:?}", hint, node.id_entry);
        return Some(hint);
    }
    let is_edit_text = node
        .class_name
        .as_deref()
        .is_some_and(|class_name| class_name.contains("EditText"));
    if is_edit_text {
        if let Some(hint) = node.text.as_deref().and_then(infer_hint) {
            log_debug!("Inferred {} from text of {:?}", hint, node.id_entry);
            return Some(hint);
        }
    }
    None
}
