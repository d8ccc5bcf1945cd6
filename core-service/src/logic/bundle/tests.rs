//! Bundle tests - persistence integrity and the serving registry

#[cfg(test)]
mod store_tests {
    use std::fs;

    use sha2::{Digest, Sha256};
    use tempfile::tempdir;

    use crate::logic::bundle::{BundleError, BundleHandle, BundleStore, ModelBundle};
    use crate::logic::features::RawTransaction;
    use crate::logic::pipeline::FraudDetector;
    use crate::logic::testutil;

    pub(super) fn trained_bundle(seed: u64) -> ModelBundle {
        let data = testutil::transactions(150, 0.3, seed);
        FraudDetector::train(&testutil::small_schema(), &data, &testutil::fast_scoring_config(3)).unwrap()
    }

    fn rows(seed: u64) -> Vec<RawTransaction> {
        testutil::transactions(25, 0.3, seed).into_iter().map(|t| t.features).collect()
    }

    /// Rewrite the stored envelope, recomputing the checksum so only the edit differs
    fn rewrite_payload(path: &std::path::Path, edit: impl FnOnce(&mut serde_json::Value)) {
        let mut envelope: serde_json::Value = serde_json::from_slice(&fs::read(path).unwrap()).unwrap();
        let mut payload: serde_json::Value =
            serde_json::from_str(envelope["payload"].as_str().unwrap()).unwrap();
        edit(&mut payload);
        let payload = serde_json::to_string(&payload).unwrap();
        envelope["checksum"] = hex::encode(Sha256::digest(payload.as_bytes())).into();
        envelope["payload"] = payload.into();
        fs::write(path, serde_json::to_vec(&envelope).unwrap()).unwrap();
    }

    #[test]
    fn test_round_trip_scores_identically() {
        let dir = tempdir().unwrap();
        let store = BundleStore::new(dir.path());
        let bundle = trained_bundle(1);

        let handle = store.save(&bundle).unwrap();
        let loaded = store.load(&handle).unwrap();

        assert_eq!(loaded, bundle);
        let batch = rows(2);
        assert_eq!(loaded.score(&batch, 0.5).unwrap(), bundle.score(&batch, 0.5).unwrap());
    }

    #[test]
    fn test_save_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let store = BundleStore::new(dir.path().join("nested"));
        store.save(&trained_bundle(3)).unwrap();

        let names: Vec<String> = fs::read_dir(store.dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].starts_with("bundle_") && names[0].ends_with(".json"));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let store = BundleStore::new(dir.path());
        let handle = BundleHandle::new(dir.path().join("nope.json"));
        assert!(matches!(store.load(&handle), Err(BundleError::NotFound(_))));
    }

    #[test]
    fn test_garbage_file_is_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bundle_garbage.json");
        fs::write(&path, b"\x00\x01 definitely not json").unwrap();

        let store = BundleStore::new(dir.path());
        assert!(matches!(store.load(&BundleHandle::new(&path)), Err(BundleError::Corrupt(_))));
    }

    #[test]
    fn test_tampered_payload_fails_checksum() {
        let dir = tempdir().unwrap();
        let store = BundleStore::new(dir.path());
        let handle = store.save(&trained_bundle(4)).unwrap();

        let text = fs::read_to_string(handle.path()).unwrap();
        let mut envelope: serde_json::Value = serde_json::from_str(&text).unwrap();
        let payload = envelope["payload"].as_str().unwrap().replacen("\"rf\"", "\"rX\"", 1);
        envelope["payload"] = payload.into();
        fs::write(handle.path(), serde_json::to_vec(&envelope).unwrap()).unwrap();

        match store.load(&handle) {
            Err(BundleError::Corrupt(msg)) => assert!(msg.contains("checksum")),
            other => panic!("expected checksum failure, got {:?}", other.map(|b| b.id().to_string())),
        }
    }

    #[test]
    fn test_schema_edit_is_schema_mismatch() {
        let dir = tempdir().unwrap();
        let store = BundleStore::new(dir.path());
        let handle = store.save(&trained_bundle(5)).unwrap();

        rewrite_payload(handle.path(), |payload| {
            payload["schema"]["features"][0]["name"] = "amount_usd".into();
        });
        assert!(matches!(store.load(&handle), Err(BundleError::SchemaMismatch { .. })));
    }

    #[test]
    fn test_projector_schema_edit_is_schema_mismatch() {
        let dir = tempdir().unwrap();
        let store = BundleStore::new(dir.path());
        let handle = store.save(&trained_bundle(5)).unwrap();

        rewrite_payload(handle.path(), |payload| {
            payload["projector"]["fitted"]["schema"]["features"][0]["name"] = "amount_usd".into();
        });
        assert!(matches!(store.load(&handle), Err(BundleError::SchemaMismatch { .. })));
    }

    #[test]
    fn test_directory_path_is_io_error() {
        let dir = tempdir().unwrap();
        let store = BundleStore::new(dir.path());
        let handle = BundleHandle::new(dir.path());
        assert!(matches!(store.load(&handle), Err(BundleError::Io(_))));
    }

    #[test]
    fn test_non_ascii_id_saves() {
        let dir = tempdir().unwrap();
        let store = BundleStore::new(dir.path());

        let mut value = serde_json::to_value(trained_bundle(9)).unwrap();
        value["id"] = "ünïcødé-bündle".into();
        let bundle: ModelBundle = serde_json::from_value(value).unwrap();

        let handle = store.save(&bundle).unwrap();
        let name = handle.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.contains("ünïcødé"));
        assert_eq!(store.load(&handle).unwrap().id(), "ünïcødé-bündle");
    }

    #[test]
    fn test_projection_id_edit_is_corrupt() {
        let dir = tempdir().unwrap();
        let store = BundleStore::new(dir.path());
        let handle = store.save(&trained_bundle(6)).unwrap();

        rewrite_payload(handle.path(), |payload| {
            payload["ensemble"]["projection_id"] = "some-other-fit".into();
        });
        assert!(matches!(store.load(&handle), Err(BundleError::Corrupt(_))));
    }

    #[test]
    fn test_list_is_oldest_first() {
        let dir = tempdir().unwrap();
        let store = BundleStore::new(dir.path());
        assert!(store.list().unwrap().is_empty());
        assert!(store.latest().unwrap().is_none());

        let first = store.save(&trained_bundle(7)).unwrap();
        let second = store.save(&trained_bundle(8)).unwrap();
        fs::write(dir.path().join(".stray.json.tmp"), b"partial").unwrap();

        assert_eq!(store.list().unwrap(), vec![first, second.clone()]);
        assert_eq!(store.latest().unwrap(), Some(second));
    }
}

#[cfg(test)]
mod registry_tests {
    use std::sync::Arc;

    use tempfile::tempdir;

    use super::store_tests::trained_bundle;
    use crate::logic::bundle::{BundleHandle, BundleStore, ModelRegistry};
    use crate::logic::error::FraudError;
    use crate::logic::model::ThresholdConfig;
    use crate::logic::testutil;

    #[test]
    fn test_not_ready_until_published() {
        let registry = ModelRegistry::new();
        assert!(!registry.is_ready());
        assert!(registry.current().is_none());

        let tx = testutil::transactions(1, 0.5, 1).remove(0).features;
        let err = registry.score(&tx, None).unwrap_err();
        assert!(matches!(err, FraudError::NotReady));
        assert!(err.is_serving_fault());
        assert_eq!(registry.status().error_count, 1);
    }

    #[test]
    fn test_publish_and_score() {
        let registry = ModelRegistry::new();
        let bundle = trained_bundle(11);
        let expected_id = bundle.id().to_string();
        let tx = testutil::transactions(1, 0.5, 2).remove(0).features;
        let expected = bundle.score_one(&tx, 0.4).unwrap();

        assert!(registry.publish(bundle).unwrap().is_none());
        assert!(registry.is_ready());
        assert_eq!(registry.score(&tx, Some(0.4)).unwrap(), expected);

        let status = registry.status();
        assert!(status.ready);
        assert_eq!(status.bundle_id.as_deref(), Some(expected_id.as_str()));
        assert_eq!(status.latent_width, Some(3));
        assert_eq!(status.score_count, 1);
    }

    #[test]
    fn test_swap_keeps_in_flight_snapshot() {
        let registry = ModelRegistry::new();
        let first = trained_bundle(12);
        let first_id = first.id().to_string();
        registry.publish(first).unwrap();

        let in_flight = registry.current().unwrap();
        let replaced = registry.publish(trained_bundle(13)).unwrap().unwrap();

        assert_eq!(replaced.id(), first_id);
        assert_eq!(in_flight.id(), first_id);
        assert_ne!(registry.current().unwrap().id(), first_id);
        assert!(Arc::ptr_eq(&in_flight, &replaced));
    }

    #[test]
    fn test_failed_load_keeps_active_bundle() {
        let dir = tempdir().unwrap();
        let store = BundleStore::new(dir.path());
        let registry = ModelRegistry::new();

        let handle = store.save(&trained_bundle(14)).unwrap();
        let active = registry.load_and_publish(&store, &handle).unwrap();
        assert!(Arc::ptr_eq(&active, &registry.current().unwrap()));

        let missing = BundleHandle::new(dir.path().join("missing.json"));
        assert!(registry.load_and_publish(&store, &missing).is_err());
        assert_eq!(registry.current().unwrap().id(), active.id());
    }

    #[test]
    fn test_configured_default_threshold() {
        let bundle = trained_bundle(16);
        let tx = testutil::transactions(1, 0.5, 3).remove(0).features;
        let p = bundle.score_one(&tx, 0.5).unwrap().probability();
        assert!(p > 0.0);

        let lenient = ModelRegistry::with_threshold(ThresholdConfig::new(p));
        lenient.publish(bundle.clone()).unwrap();
        assert!(!lenient.score(&tx, None).unwrap().is_fraud());
        assert!(lenient.score(&tx, Some(p / 2.0)).unwrap().is_fraud());

        let strict = ModelRegistry::new();
        strict.publish(bundle).unwrap();
        strict.set_threshold(ThresholdConfig::new(p / 2.0)).unwrap();
        assert!(strict.score(&tx, None).unwrap().is_fraud());
        assert_eq!(strict.status().default_threshold, p / 2.0);

        assert!(matches!(strict.set_threshold(ThresholdConfig::new(1.5)), Err(FraudError::Config(_))));
        assert_eq!(strict.threshold(), ThresholdConfig::new(p / 2.0));
    }

    #[test]
    fn test_clear() {
        let registry = ModelRegistry::new();
        registry.publish(trained_bundle(15)).unwrap();
        registry.clear();
        assert!(!registry.is_ready());
        assert_eq!(registry.status().score_count, 0);
    }
}
