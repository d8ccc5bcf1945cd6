//! Projector tests - fit, transform, schema robustness

#[cfg(test)]
mod projector_tests {
    use crate::logic::features::{
        FeatureProjector, FeatureSchema, ProjectorConfig, ProjectorError, RawTransaction, RawValue,
    };
    use crate::logic::testutil;

    fn fitted(n_components: usize) -> (FeatureProjector, Vec<RawTransaction>) {
        let rows: Vec<RawTransaction> = testutil::transactions(300, 0.1, 7)
            .into_iter()
            .map(|t| t.features)
            .collect();
        let mut projector = FeatureProjector::new(ProjectorConfig { n_components });
        projector.fit(&testutil::small_schema(), &rows).unwrap();
        (projector, rows)
    }

    #[test]
    fn test_transform_before_fit() {
        let projector = FeatureProjector::new(ProjectorConfig::default());
        let row = RawTransaction::new().with("amount", 1.0);
        assert_eq!(projector.transform_one(&row).unwrap_err(), ProjectorError::NotFitted);
        assert!(projector.component_loadings().is_err());
        assert!(projector.projection_id().is_none());
    }

    #[test]
    fn test_fixed_width_and_projection_id() {
        let (projector, rows) = fitted(5);
        let latents = projector.transform(&rows[..20]).unwrap();

        assert_eq!(latents.len(), 20);
        let id = projector.projection_id().unwrap();
        for v in &latents {
            assert_eq!(v.width(), 5);
            assert!(v.is_from(id));
            assert!(v.values.iter().all(|x| x.is_finite()));
        }
    }

    #[test]
    fn test_transform_is_deterministic() {
        let (projector, rows) = fitted(4);
        let a = projector.transform_one(&rows[3]).unwrap();
        let b = projector.transform_one(&rows[3]).unwrap();
        assert_eq!(a, b);
        assert_eq!(projector.transform(&rows[3..4]).unwrap()[0], a);
    }

    #[test]
    fn test_missing_and_unseen_values_do_not_fail() {
        let (projector, _) = fitted(4);

        let empty = RawTransaction::new();
        let sparse = RawTransaction::new()
            .with("amount", RawValue::Missing)
            .with("card_brand", "diners")
            .with("device_type", "smart-fridge")
            .with("transaction_hour", "not-a-number")
            .with("unrelated_extra_field", 42i64);

        for row in [empty, sparse] {
            let v = projector.transform_one(&row).unwrap();
            assert_eq!(v.width(), 4);
            assert!(v.values.iter().all(|x| x.is_finite()));
        }
    }

    #[test]
    fn test_fit_rejects_bad_input() {
        let schema = testutil::small_schema();
        let mut projector = FeatureProjector::new(ProjectorConfig { n_components: 2 });

        assert!(matches!(projector.fit(&schema, &[]), Err(ProjectorError::Schema(_))));

        let rows = vec![RawTransaction::new().with("amount", 1.0)];
        let empty_schema = FeatureSchema::new(Vec::new());
        assert!(matches!(projector.fit(&empty_schema, &rows), Err(ProjectorError::Schema(_))));

        let dup = FeatureSchema::from_names(&["amount", "amount"], &[]);
        assert!(matches!(projector.fit(&dup, &rows), Err(ProjectorError::Schema(_))));

        let bad = vec![RawTransaction::new().with("amount", "twelve")];
        let numeric_only = FeatureSchema::from_names(&["amount", "hour"], &[]);
        assert!(matches!(projector.fit(&numeric_only, &bad), Err(ProjectorError::Schema(_))));

        assert!(!projector.is_fitted());
    }

    #[test]
    fn test_fit_rejects_too_few_encoded_columns() {
        let schema = FeatureSchema::from_names(&["amount"], &["card_brand"]);
        let rows = vec![
            RawTransaction::new().with("amount", 1.0).with("card_brand", "visa"),
            RawTransaction::new().with("amount", 2.0).with("card_brand", "amex"),
        ];
        // 1 numeric + 2 indicators = 3 encoded columns
        let mut projector = FeatureProjector::new(ProjectorConfig { n_components: 4 });
        let err = projector.fit(&schema, &rows).unwrap_err();
        assert!(err.to_string().contains("smaller than n_components"));

        let mut projector = FeatureProjector::new(ProjectorConfig { n_components: 3 });
        assert!(projector.fit(&schema, &rows).is_ok());
        assert_eq!(projector.encoded_width(), Some(3));
    }

    #[test]
    fn test_string_numbers_accepted_at_fit() {
        let schema = FeatureSchema::from_names(&["amount", "hour"], &[]);
        let rows = vec![
            RawTransaction::new().with("amount", "10.5").with("hour", 3i64),
            RawTransaction::new().with("amount", 20.0).with("hour", " 4 "),
            RawTransaction::new().with("hour", 5i64),
        ];
        let mut projector = FeatureProjector::new(ProjectorConfig { n_components: 2 });
        assert!(projector.fit(&schema, &rows).is_ok());
    }

    #[test]
    fn test_introspection() {
        let (projector, _) = fitted(3);

        let ratios = projector.explained_variance().unwrap();
        assert_eq!(ratios.len(), 3);
        assert!(ratios.windows(2).all(|w| w[0].1 >= w[1].1));
        assert!(ratios.iter().map(|r| r.1).sum::<f64>() <= 1.0 + 1e-9);

        let loadings = projector.component_loadings().unwrap();
        assert_eq!(loadings.components, vec!["V1", "V2", "V3"]);
        assert_eq!(loadings.matrix.ncols(), projector.encoded_width().unwrap());
        assert!(loadings.loading("V1", "amount").is_some());
        assert!(loadings.loading("V1", "card_brand_visa").is_some());
        assert!(loadings
            .columns
            .iter()
            .any(|c| c.name == "device_type_missing" && c.source == "device_type"));

        let top = loadings.top_columns("V1", 2);
        assert_eq!(top.len(), 2);
        assert!(top[0].1.abs() >= top[1].1.abs());
    }

    #[test]
    fn test_refit_changes_projection_id() {
        let (mut projector, rows) = fitted(3);
        let first = projector.projection_id().unwrap().to_string();
        projector.fit(&testutil::small_schema(), &rows).unwrap();
        assert_ne!(projector.projection_id().unwrap(), first);
    }

    #[test]
    fn test_serde_preserves_transform() {
        let (projector, rows) = fitted(4);
        let json = serde_json::to_string(&projector).unwrap();
        let restored: FeatureProjector = serde_json::from_str(&json).unwrap();

        assert!(restored.check_consistency().is_ok());
        assert_eq!(
            projector.transform(&rows[..10]).unwrap(),
            restored.transform(&rows[..10]).unwrap()
        );
    }
}
