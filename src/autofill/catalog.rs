use std::collections::BTreeMap;

use crate::autofill::{
    hints::SaveType,
    structure::{
        AutofillId, AUTOFILL_TYPE_DATE, AUTOFILL_TYPE_LIST, AUTOFILL_TYPE_TEXT,
        AUTOFILL_TYPE_TOGGLE,
    },
};
use crate::log_warn;

const ENABLE_LOGS: bool = true;

/// Value kind a field accepts. Host codes outside the four fillable kinds are
/// carried as `Unsupported` so the applier can report them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Toggle,
    Date,
    List(Vec<String>),
    Unsupported(i32),
}

impl FieldKind {
    pub fn from_raw(autofill_type: i32, options: Option<&[String]>) -> Self {
        match autofill_type {
            AUTOFILL_TYPE_TEXT => FieldKind::Text,
            AUTOFILL_TYPE_TOGGLE => FieldKind::Toggle,
            AUTOFILL_TYPE_DATE => FieldKind::Date,
            AUTOFILL_TYPE_LIST => FieldKind::List(options.map(<[String]>::to_vec).unwrap_or_default()),
            other => FieldKind::Unsupported(other),
        }
    }
}

/// One fillable control on the current screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub id: AutofillId,
    pub kind: FieldKind,
    pub hints: Vec<String>,
    pub focused: bool,
}

impl FieldDescriptor {
    pub fn new(id: AutofillId, kind: FieldKind, hints: Vec<String>) -> Self {
        Self {
            id,
            kind,
            hints,
            focused: false,
        }
    }

    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    pub fn save_type(&self) -> SaveType {
        SaveType::for_hints(&self.hints)
    }

    /// Position of `value` among the field's option labels. Exact, case-sensitive.
    pub fn option_index(&self, value: &str) -> Option<usize> {
        match &self.kind {
            FieldKind::List(options) => options.iter().position(|option| option == value),
            _ => None,
        }
    }
}

/// All fillable fields on one screen, indexed by hint. Built fresh per request.
#[derive(Debug, Clone, Default)]
pub struct FieldCatalog {
    fields: Vec<FieldDescriptor>,
    fields_by_hint: BTreeMap<String, Vec<usize>>,
    all_hints: Vec<String>,
    focused_hints: Vec<String>,
    save_type: SaveType,
}

impl FieldCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `field` under each of its hints. A second field with an id
    /// already in the catalog is ignored.
    pub fn add(&mut self, field: FieldDescriptor) -> bool {
        if self.fields.iter().any(|existing| existing.id == field.id) {
            log_warn!("Duplicate autofill id {} in snapshot; ignoring", field.id);
            return false;
        }

        let index = self.fields.len();
        self.save_type |= field.save_type();
        for hint in &field.hints {
            if !self.all_hints.contains(hint) {
                self.all_hints.push(hint.clone());
            }
            if field.focused && !self.focused_hints.contains(hint) {
                self.focused_hints.push(hint.clone());
            }
            let indices = self.fields_by_hint.entry(hint.clone()).or_default();
            if !indices.contains(&index) {
                indices.push(index);
            }
        }
        self.fields.push(field);
        true
    }

    pub fn hints(&self) -> impl Iterator<Item = &str> {
        self.fields_by_hint.keys().map(String::as_str)
    }

    pub fn fields_for_hint<'a>(&'a self, hint: &str) -> impl Iterator<Item = &'a FieldDescriptor> + 'a {
        self.fields_by_hint
            .get(hint)
            .into_iter()
            .flatten()
            .map(move |&index| &self.fields[index])
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn autofill_ids(&self) -> Vec<AutofillId> {
        self.fields.iter().map(|field| field.id.clone()).collect()
    }

    pub fn all_hints(&self) -> &[String] {
        &self.all_hints
    }

    pub fn focused_hints(&self) -> &[String] {
        &self.focused_hints
    }

    pub fn save_type(&self) -> SaveType {
        self.save_type
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(id: &str, kind: FieldKind, hints: &[&str]) -> FieldDescriptor {
        FieldDescriptor::new(
            AutofillId::new(id),
            kind,
            hints.iter().map(|h| h.to_string()).collect(),
        )
    }

    #[test]
    fn indexes_field_under_every_hint() {
        let mut catalog = FieldCatalog::new();
        catalog.add(field("1", FieldKind::Text, &["username", "emailAddress"]));
        catalog.add(field("2", FieldKind::Text, &["password"]).focused(true));

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.fields_for_hint("username").count(), 1);
        assert_eq!(catalog.fields_for_hint("emailAddress").next().unwrap().id.0, "1");
        assert_eq!(catalog.all_hints(), ["username", "emailAddress", "password"]);
        assert_eq!(catalog.focused_hints(), ["password"]);
        assert!(catalog.save_type().contains(SaveType::PASSWORD));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut catalog = FieldCatalog::new();
        assert!(catalog.add(field("1", FieldKind::Text, &["username"])));
        assert!(!catalog.add(field("1", FieldKind::Text, &["password"])));
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.fields_for_hint("password").count(), 0);
    }

    #[test]
    fn unknown_hint_yields_no_fields() {
        let catalog = FieldCatalog::new();
        assert_eq!(catalog.fields_for_hint("username").count(), 0);
        assert!(catalog.is_empty());
    }

    #[test]
    fn option_index_is_case_sensitive() {
        let gender = field(
            "g",
            FieldKind::List(vec!["Male".into(), "Female".into()]),
            &["gender"],
        );
        assert_eq!(gender.option_index("Male"), Some(0));
        assert_eq!(gender.option_index("Female"), Some(1));
        assert_eq!(gender.option_index("male"), None);
    }

    #[test]
    fn kind_from_host_codes() {
        let options = vec!["a".to_string()];
        assert_eq!(FieldKind::from_raw(1, None), FieldKind::Text);
        assert_eq!(FieldKind::from_raw(3, Some(&options)), FieldKind::List(options.clone()));
        assert_eq!(FieldKind::from_raw(3, None), FieldKind::List(Vec::new()));
        assert_eq!(FieldKind::from_raw(0, None), FieldKind::Unsupported(0));
        assert_eq!(FieldKind::from_raw(9, None), FieldKind::Unsupported(9));
    }
}
