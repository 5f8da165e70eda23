mod common;

use common::{EMBEDDING_JSON, MODEL_JSON, SCALER_JSON, TempModelDir};
use newsreact::application::ml::load_all_models;
use newsreact::domain::errors::PipelineError;
use newsreact::domain::ml::{NUM_FEAT_DIM, NumericContext};

fn context() -> NumericContext {
    NumericContext {
        price_before: 4850.0,
        last_close_gap: -0.01,
        pre_event_return: 0.03,
        pre_event_volatility: 0.015,
    }
}

#[test]
fn test_load_all_models_agrees_on_width() {
    let dir = TempModelDir::with_default_artifacts();
    let registry = load_all_models(&dir.paths()).unwrap();

    assert_eq!(registry.embedding_dim(), 2);
    assert_eq!(registry.num_feat_dim(), NUM_FEAT_DIM);
    assert_eq!(registry.feature_dim(), 6);
}

#[test]
fn test_feature_width_is_constant_across_headlines() {
    let dir = TempModelDir::with_default_artifacts();
    let registry = load_all_models(&dir.paths()).unwrap();

    for headline in [
        "",
        "laba",
        "BBRI catat laba bersih naik 12% di kuartal pertama",
        "!!! ???",
        "rugi rugi rugi",
    ] {
        let features = registry.build_features(headline, &context()).unwrap();
        assert_eq!(features.len(), registry.embedding_dim() + registry.num_feat_dim());
    }
}

#[test]
fn test_missing_artifact_is_load_error() {
    let dir = TempModelDir::new();
    dir.write("scaler.json", SCALER_JSON);
    dir.write("embedding.json", EMBEDDING_JSON);

    let err = load_all_models(&dir.paths()).unwrap_err();
    assert!(matches!(err, PipelineError::ArtifactLoad { .. }));
    assert!(err.is_fatal());
}

#[test]
fn test_incompatible_model_width_is_rejected() {
    let dir = TempModelDir::with_default_artifacts();
    dir.write(
        "xgb_model.json",
        &MODEL_JSON.replace("\"num_features\": 6", "\"num_features\": 7"),
    );

    let err = load_all_models(&dir.paths()).unwrap_err();
    match err {
        PipelineError::ArtifactLoad { artifact, reason } => {
            assert_eq!(artifact, "regression model");
            assert!(reason.contains('7'));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_scaler_column_order_is_checked() {
    let dir = TempModelDir::with_default_artifacts();
    dir.write(
        "scaler.json",
        &SCALER_JSON.replace(
            r#"["price_before", "last_close_gap""#,
            r#"["last_close_gap", "price_before""#,
        ),
    );

    let err = load_all_models(&dir.paths()).unwrap_err();
    assert!(matches!(err, PipelineError::ArtifactLoad { ref artifact, .. } if artifact == "scaler"));
}

#[test]
fn test_malformed_embedding_is_load_error() {
    let dir = TempModelDir::with_default_artifacts();
    dir.write("embedding.json", "{\"dim\": 2, \"vocab\": [\"a\"]");

    assert!(matches!(
        load_all_models(&dir.paths()),
        Err(PipelineError::ArtifactLoad { .. })
    ));
}

#[test]
fn test_prediction_is_deterministic_and_sentiment_ordered() {
    let dir = TempModelDir::with_default_artifacts();
    let registry = load_all_models(&dir.paths()).unwrap();

    let predict = |headline: &str| {
        let features = registry.build_features(headline, &context()).unwrap();
        registry.predict(&features).unwrap()
    };

    let good = predict("Company X reports record profit surge");
    assert_eq!(good.to_bits(), predict("Company X reports record profit surge").to_bits());

    let neutral = predict("Company X holds annual meeting");
    let bad = predict("Company X posts heavy loss");
    assert!(good > neutral);
    assert!(neutral > bad);
}

#[test]
fn test_text_scorer_matches_single_prediction() {
    let dir = TempModelDir::with_default_artifacts();
    let registry = load_all_models(&dir.paths()).unwrap();
    let scorer = registry.text_scorer(&context()).unwrap();

    let texts = vec![
        "laba naik".to_string(),
        "rugi".to_string(),
        "rapat umum".to_string(),
    ];
    let batch = scorer.predict_texts(&texts).unwrap();

    for (text, score) in texts.iter().zip(&batch) {
        let single = registry
            .predict(&registry.build_features(text, &context()).unwrap())
            .unwrap();
        assert!((single - score).abs() < 1e-12);
    }
}
