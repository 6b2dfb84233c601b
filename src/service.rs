//! Request handling: ties parsing, stores and preferences together.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{bail, Result};

use crate::autofill::{
    response::{locked_response, new_response},
    FieldCatalog, FillResponse, SavedValueCollection, ScreenStructure, StructureParser,
};
use crate::settings::{PreferencesStore, UserPreferences};
use crate::store::{AutofillRepository, PackageVerificationStore};
use crate::{log_debug, log_info};

const ENABLE_LOGS: bool = true;

/// Response for a parsed screen given what the store returned and the current
/// preferences. Response authentication takes precedence over everything else.
pub fn build_fill_response(
    catalog: &FieldCatalog,
    collections: Option<&BTreeMap<String, SavedValueCollection>>,
    preferences: &UserPreferences,
) -> Option<FillResponse> {
    if catalog.is_empty() {
        log_debug!("No autofill ids found");
        return None;
    }
    if preferences.response_auth {
        return locked_response(catalog);
    }
    new_response(catalog, collections, preferences.dataset_auth)
}

pub struct AutofillService {
    repository: Arc<dyn AutofillRepository>,
    preferences: Arc<PreferencesStore>,
    verification: Arc<PackageVerificationStore>,
}

impl AutofillService {
    pub fn new(
        repository: Arc<dyn AutofillRepository>,
        preferences: Arc<PreferencesStore>,
        verification: Arc<PackageVerificationStore>,
    ) -> Self {
        Self {
            repository,
            preferences,
            verification,
        }
    }

    pub fn preferences(&self) -> &PreferencesStore {
        &self.preferences
    }

    fn verify_package(&self, package_name: &str, signatures: &[Vec<u8>]) -> Result<()> {
        if !self.verification.put_package_signatures(package_name, signatures) {
            bail!("invalid package signature for {package_name}");
        }
        Ok(())
    }

    /// Answers a fill request for `structure`, whose package is signed by
    /// `signatures`. `Ok(None)` means there is nothing to offer.
    pub async fn on_fill_request(
        &self,
        structure: &ScreenStructure,
        signatures: &[Vec<u8>],
    ) -> Result<Option<FillResponse>> {
        self.verify_package(&structure.package_name, signatures)?;

        let learned = self.repository.learned_hints(&structure.package_name).await?;
        let catalog = StructureParser::new(structure)
            .with_learned_hints(&learned)
            .parse_for_fill()?;
        let preferences = self.preferences.snapshot();
        if catalog.is_empty() || preferences.response_auth {
            return Ok(build_fill_response(&catalog, None, &preferences));
        }

        let collections = self
            .repository
            .load_collections(catalog.focused_hints(), catalog.all_hints())
            .await?;
        log_info!(
            "Fill request for {}: {} fields, {} stored collections",
            structure.package_name,
            catalog.len(),
            collections.as_ref().map_or(0, BTreeMap::len)
        );

        Ok(build_fill_response(&catalog, collections.as_ref(), &preferences))
    }

    /// Stores the values shown on `structure`. Returns the new dataset name, or
    /// `None` when the screen shows nothing worth saving.
    pub async fn on_save_request(
        &self,
        structure: &ScreenStructure,
        signatures: &[Vec<u8>],
    ) -> Result<Option<String>> {
        self.verify_package(&structure.package_name, signatures)?;

        let learned = self.repository.learned_hints(&structure.package_name).await?;
        let parser = StructureParser::new(structure).with_learned_hints(&learned);
        let resource_hints = parser.resource_id_hints();
        if !resource_hints.is_empty() {
            self.repository
                .learn_hints(&structure.package_name, &resource_hints)
                .await?;
        }

        let collection = parser.parse_for_save();
        if collection.values().all(|(_, value)| value.is_empty()) {
            log_debug!("Nothing to save for {}", structure.package_name);
            return Ok(None);
        }

        let name = self
            .repository
            .save_collection(&structure.package_name, collection)
            .await?;
        Ok(Some(name))
    }

    /// Forgets saved datasets and trusted package signatures.
    pub async fn clear(&self) -> Result<()> {
        self.repository.clear().await?;
        self.verification.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autofill::{AutofillId, FillValue, RawValue, ViewNode};
    use crate::db::Database;
    use crate::store::JsonDatasetStore;

    struct Fixture {
        _dir: tempfile::TempDir,
        store: Arc<JsonDatasetStore>,
        service: AutofillService,
    }

    fn services_for(
        dir: &tempfile::TempDir,
        repository: Arc<dyn AutofillRepository>,
    ) -> AutofillService {
        let preferences = Arc::new(PreferencesStore::new(dir.path().join("prefs.json")).unwrap());
        let verification =
            Arc::new(PackageVerificationStore::open(dir.path().join("signatures.json")).unwrap());
        AutofillService::new(repository, preferences, verification)
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonDatasetStore::open(dir.path().join("datasets.json")).unwrap());
        Fixture {
            service: services_for(&dir, store.clone()),
            store,
            _dir: dir,
        }
    }

    fn text_node(id: &str, hint: &str, value: Option<&str>, focused: bool) -> ViewNode {
        ViewNode {
            autofill_id: Some(AutofillId::new(id)),
            autofill_hints: vec![hint.to_string()],
            autofill_type: 1,
            autofill_value: value.map(|v| RawValue::Text(v.to_string())),
            focused,
            ..ViewNode::default()
        }
    }

    fn login_screen(username: Option<&str>, password: Option<&str>) -> ScreenStructure {
        let root = ViewNode {
            children: vec![
                text_node("1", "username", username, true),
                text_node("2", "password", password, false),
            ],
            ..ViewNode::default()
        };
        ScreenStructure {
            package_name: "com.example.app".into(),
            windows: vec![root],
        }
    }

    fn cert() -> Vec<Vec<u8>> {
        vec![b"release-cert".to_vec()]
    }

    #[tokio::test]
    async fn save_then_fill() {
        let fx = fixture();

        let name = fx
            .service
            .on_save_request(&login_screen(Some("alice"), Some("hunter2")), &cert())
            .await
            .unwrap();
        assert_eq!(name.as_deref(), Some("dataset-0"));

        let response = fx
            .service
            .on_fill_request(&login_screen(None, None), &cert())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(response.datasets.len(), 1);
        let dataset = &response.datasets[0];
        assert_eq!(
            dataset.value_for(&AutofillId::new("1")),
            Some(&FillValue::Text("alice".into()))
        );
        assert!(!dataset.requires_auth);
        let save_info = response.save_info.unwrap();
        assert_eq!(save_info.ids.len(), 2);
    }

    #[tokio::test]
    async fn empty_screen_is_not_saved() {
        let fx = fixture();
        let saved = fx
            .service
            .on_save_request(&login_screen(None, None), &cert())
            .await
            .unwrap();
        assert!(saved.is_none());
        assert_eq!(fx.store.dataset_number(), 0);

        let saved = fx
            .service
            .on_save_request(&login_screen(Some("alice"), None), &cert())
            .await
            .unwrap();
        assert_eq!(saved.as_deref(), Some("dataset-0"));
        assert_eq!(fx.store.dataset_number(), 1);
    }

    #[tokio::test]
    async fn resource_ids_learned_on_save_drive_later_fills() {
        let dir = tempfile::tempdir().unwrap();
        let database = Database::open(dir.path().join("autofill.db")).unwrap();
        let service = services_for(&dir, Arc::new(database.clone()));

        let mut filled = login_screen(Some("alice"), Some("hunter2"));
        filled.windows[0].children[0].id_entry = Some("field_a".into());
        filled.windows[0].children[1].id_entry = Some("field_b".into());
        service.on_save_request(&filled, &cert()).await.unwrap();

        let learned = database
            .get_learned_hints("com.example.app".into())
            .await
            .unwrap();
        assert_eq!(learned["field_a"], "username");
        assert_eq!(learned["field_b"], "password");

        // Same screen in a build that dropped the autofill hints.
        let mut bare = login_screen(None, None);
        for (node, id_entry) in bare.windows[0].children.iter_mut().zip(["field_a", "field_b"]) {
            node.autofill_hints.clear();
            node.id_entry = Some(id_entry.into());
        }
        let response = service
            .on_fill_request(&bare, &cert())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(response.datasets.len(), 1);
        assert_eq!(
            response.datasets[0].value_for(&AutofillId::new("2")),
            Some(&FillValue::Text("hunter2".into()))
        );
    }

    #[tokio::test]
    async fn response_auth_locks_everything() {
        let fx = fixture();
        fx.service.preferences().set_response_auth(true).unwrap();

        let response = fx
            .service
            .on_fill_request(&login_screen(None, None), &cert())
            .await
            .unwrap()
            .unwrap();
        assert!(response.datasets.is_empty());
        assert!(response.save_info.is_none());
        assert_eq!(response.authentication.unwrap().ids.len(), 2);
    }

    #[tokio::test]
    async fn dataset_auth_marks_datasets() {
        let fx = fixture();
        fx.service
            .on_save_request(&login_screen(Some("alice"), None), &cert())
            .await
            .unwrap();
        fx.service.preferences().set_dataset_auth(true).unwrap();

        let response = fx
            .service
            .on_fill_request(&login_screen(None, None), &cert())
            .await
            .unwrap()
            .unwrap();
        assert!(response.datasets.iter().all(|dataset| dataset.requires_auth));
    }

    #[tokio::test]
    async fn changed_signature_is_rejected() {
        let fx = fixture();
        fx.service
            .on_fill_request(&login_screen(None, None), &cert())
            .await
            .unwrap();

        let err = fx
            .service
            .on_fill_request(&login_screen(None, None), &[b"other-cert".to_vec()])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid package signature"));

        fx.service.clear().await.unwrap();
        assert!(fx
            .service
            .on_fill_request(&login_screen(None, None), &[b"other-cert".to_vec()])
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn conflicting_web_domains_fail_the_request() {
        let fx = fixture();
        let mut screen = login_screen(None, None);
        screen.windows[0].children[0].web_domain = Some("example.com".into());
        screen.windows[0].children[1].web_domain = Some("evil.test".into());

        assert!(fx.service.on_fill_request(&screen, &cert()).await.is_err());
    }

    #[tokio::test]
    async fn screen_without_hints_gets_no_response() {
        let fx = fixture();
        let screen = ScreenStructure {
            package_name: "com.example.app".into(),
            windows: vec![ViewNode::default()],
        };
        assert!(fx.service.on_fill_request(&screen, &cert()).await.unwrap().is_none());
    }
}
