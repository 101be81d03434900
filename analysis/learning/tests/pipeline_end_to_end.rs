use std::fs;

use analysis_learning::{
    datasets::{load_iris, make_linear, ClassificationSet},
    model_selection::take_rows,
    AnalysisPipeline, PipelineConfig, RocOutcome,
};
use tempfile::tempdir;

fn config_in(dir: &std::path::Path) -> PipelineConfig {
    PipelineConfig {
        output_dir: dir.to_path_buf(),
        ..PipelineConfig::default()
    }
}

#[test]
fn default_run_writes_expected_artifacts() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    let iris = load_iris().unwrap();
    let regression = make_linear(&config.regression).unwrap();
    let report = AnalysisPipeline::new(config)
        .run(&iris, &regression)
        .unwrap();

    assert_eq!(report.classification_split.train, 120);
    assert_eq!(report.classification_split.test, 30);
    assert_eq!(report.regression_split.train, 80);
    assert_eq!(report.regression_split.test, 20);
    assert_eq!(report.summary.count, 100);

    for name in ["regression.jpg", "clusters.png", "clusters_copy.png"] {
        assert!(dir.path().join(name).is_file(), "{name} missing");
    }
    assert!(!dir.path().join("roc.png").exists());
    assert_eq!(report.roc, RocOutcome::Skipped { n_classes: 3 });

    assert!([3, 5, 7, 9].contains(&report.grid.best));
    assert_eq!(report.grid.results.len(), 4);
    assert_eq!(report.knn.cv_scores.len(), 5);
    assert_eq!(report.knn.confusion.counts.sum(), 30);
    assert!(report.knn.report.accuracy > 0.8);
    assert_eq!(report.clustering.sizes.iter().sum::<usize>(), 150);
    assert!(report.regression.test_r2 > 0.7);

    assert_eq!(
        fs::read(dir.path().join("clusters.png")).unwrap(),
        fs::read(dir.path().join("clusters_copy.png")).unwrap()
    );

    let text = report.render_text();
    assert!(text.contains("Confusion Matrix:"));
    assert!(text.contains("Decision Tree Classification Report:"));
    assert!(text.contains("ROC: skipped (3 classes)"));
}

#[test]
fn repeated_runs_are_identical() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    let iris = load_iris().unwrap();
    let regression = make_linear(&config.regression).unwrap();
    let pipeline = AnalysisPipeline::new(config);

    let first = pipeline.run(&iris, &regression).unwrap();
    let first_bytes: Vec<Vec<u8>> = first.files.iter().map(|p| fs::read(p).unwrap()).collect();
    let second = pipeline.run(&iris, &regression).unwrap();
    let second_bytes: Vec<Vec<u8>> = second.files.iter().map(|p| fs::read(p).unwrap()).collect();

    assert_eq!(first.render_text(), second.render_text());
    assert_eq!(first.files, second.files);
    assert_eq!(first_bytes, second_bytes);
    assert_ne!(first.run_id, second.run_id);
}

#[test]
fn binary_labels_produce_roc_plot() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    let iris = load_iris().unwrap();
    let rows: Vec<usize> = (0..iris.n_samples()).filter(|&r| iris.targets[r] < 2).collect();
    let binary = ClassificationSet::new(
        take_rows(&iris.features, &rows),
        rows.iter().map(|&r| iris.targets[r]).collect(),
    )
    .unwrap();
    let regression = make_linear(&config.regression).unwrap();
    let report = AnalysisPipeline::new(config).run(&binary, &regression).unwrap();

    assert!(dir.path().join("roc.png").is_file());
    match report.roc {
        RocOutcome::Computed {
            positive_label,
            auc,
            ..
        } => {
            assert_eq!(positive_label, 1);
            assert!(auc > 0.95);
        }
        RocOutcome::Skipped { .. } => panic!("ROC step skipped on two-class data"),
    }
    assert_eq!(report.classification_split.test, 20);
}

#[test]
fn labels_without_zero_keep_one_report_row_per_class() {
    let dir = tempdir().unwrap();
    let config = config_in(dir.path());
    let iris = load_iris().unwrap();
    let rows: Vec<usize> = (0..iris.n_samples()).filter(|&r| iris.targets[r] >= 1).collect();
    let upper = ClassificationSet::new(
        take_rows(&iris.features, &rows),
        rows.iter().map(|&r| iris.targets[r]).collect(),
    )
    .unwrap();
    let regression = make_linear(&config.regression).unwrap();
    let report = AnalysisPipeline::new(config).run(&upper, &regression).unwrap();

    let expected: Vec<String> = report
        .knn
        .confusion
        .labels
        .iter()
        .map(ToString::to_string)
        .collect();
    let names: Vec<&String> = report.knn.report.classes.keys().collect();
    assert_eq!(names.len(), report.knn.confusion.labels.len());
    assert_eq!(names, expected.iter().collect::<Vec<_>>());
    assert!(matches!(report.roc, RocOutcome::Computed { positive_label: 2, .. }));
}
