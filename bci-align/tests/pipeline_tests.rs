//! End-to-end pipeline tests on generated modality trees
//!
//! Each test builds a dataset under a temp directory, runs a pipeline stage
//! and checks the CSV tables it committed.

mod helpers;

use std::fs;

use bci_align::types::DropReason;
use bci_align::workflow::pipeline::{
    ALIGNMENT_REPORT_FILE, CLEAN_INDEX_FILE, DROPPED_FILE, MANIFEST_FILE, MISSING_KEYS_FILE,
};
use bci_align::{AlignError, Pipeline, PipelineConfig};
use bci_common::config::RootEntry;
use bci_common::Modality;
use helpers::{modality_roots, neutral_tempdir, read_csv, reference_tree};

fn config_for(root: &std::path::Path) -> PipelineConfig {
    let data = reference_tree(root);
    PipelineConfig {
        roots: modality_roots(&data),
        output_dir: root.join("manifests"),
        splits_dir: root.join("splits"),
        ..Default::default()
    }
}

#[test]
fn test_run_all_reference_dataset() {
    let tmp = neutral_tempdir();
    let config = config_for(tmp.path());
    let out = config.output_dir.clone();

    let summary = Pipeline::new(config).run_all().unwrap();
    assert_eq!(summary.outputs.len(), 5);

    let scan = summary.scan.as_ref().unwrap();
    assert_eq!(scan.files_per_modality[&Modality::General], 16);
    assert_eq!(scan.files_per_modality[&Modality::Semantic], 15);
    assert_eq!(scan.files_per_modality[&Modality::Acoustic], 17);
    assert_eq!(scan.files_per_modality[&Modality::Articulatory], 10);
    assert_eq!(scan.total_files(), 58);
    assert_eq!(scan.missing_subject, 1);
    assert_eq!(scan.missing_trial, 1);

    let index = summary.index.as_ref().unwrap();
    assert_eq!(index.required_modalities, Modality::ALL.to_vec());
    assert_eq!(index.subjects_grouped, 2);
    assert_eq!(index.unkeyed_files, 1);
    assert_eq!(index.clean_rows, 10);
    assert_eq!(index.dropped_rows, 7);
    assert_eq!(index.clean_per_subject.get("sub-01"), Some(&10));
    assert_eq!(index.clean_per_subject.get("sub-03"), None);
    assert_eq!(
        index.dropped_by_reason[&DropReason::MissingOneOrMoreModalities],
        2
    );
    assert_eq!(index.dropped_by_reason[&DropReason::SubjectMissingModality], 5);
    assert_eq!(index.label_mismatches, 0);

    let (headers, clean) = read_csv(&out.join(CLEAN_INDEX_FILE));
    assert_eq!(
        headers,
        vec![
            "subject",
            "trial_idx",
            "acoustic_path",
            "articulatory_path",
            "general_path",
            "semantic_path"
        ]
    );
    assert_eq!(clean.len(), 10);
    assert_eq!(clean[0][0], "sub-01");
    assert_eq!(clean[0][1], "1");
    assert!(clean[0][2].ends_with("acoustic/sub-01/word-01.wav"));
    assert!(clean[0][5].ends_with("semantic/sub-01/item_01.txt"));
    assert_eq!(clean[9][1], "10");
    assert!(clean[9][4].ends_with("general/sub-01/word_010.wav"));

    let (headers, dropped) = read_csv(&out.join(DROPPED_FILE));
    assert_eq!(headers, vec!["subject", "trial_idx", "reason"]);
    let dropped: Vec<(String, String, String)> = dropped
        .into_iter()
        .map(|r| (r[0].clone(), r[1].clone(), r[2].clone()))
        .collect();
    assert_eq!(
        dropped[..2],
        [
            (
                "sub-01".to_string(),
                "11".to_string(),
                "missing_one_or_more_modalities".to_string()
            ),
            (
                "sub-01".to_string(),
                "12".to_string(),
                "missing_one_or_more_modalities".to_string()
            ),
        ]
    );
    for (i, row) in dropped[2..].iter().enumerate() {
        assert_eq!(row.0, "sub-03");
        assert_eq!(row.1, (i + 1).to_string());
        assert_eq!(row.2, "subject_missing_modality");
    }
}

#[test]
fn test_scan_reports() {
    let tmp = neutral_tempdir();
    let config = config_for(tmp.path());
    let out = config.output_dir.clone();

    let summary = Pipeline::new(config).run_scan().unwrap();
    assert!(summary.index.is_none());
    assert_eq!(summary.outputs.len(), 3);
    assert!(!out.join(CLEAN_INDEX_FILE).exists());

    let (headers, manifest) = read_csv(&out.join(MANIFEST_FILE));
    assert_eq!(
        headers,
        vec![
            "modality",
            "rel_path",
            "filename",
            "ext",
            "size_bytes",
            "subject_guess",
            "trial_guess"
        ]
    );
    assert_eq!(manifest.len(), 58);
    assert!(manifest.iter().all(|r| r[2] != ".DS_Store"));

    let notes = manifest.iter().find(|r| r[2] == "notes.txt").unwrap();
    assert_eq!(notes[0], "general");
    assert_eq!(notes[3], ".txt");
    assert_eq!(notes[4], "3");
    assert_eq!(notes[5], "");
    assert_eq!(notes[6], "");

    let (_, missing) = read_csv(&out.join(MISSING_KEYS_FILE));
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0][2], "notes.txt");

    // Labels differ between trees, so no label key is complete
    let (headers, report) = read_csv(&out.join(ALIGNMENT_REPORT_FILE));
    assert_eq!(headers.last().unwrap(), "total_files_for_key");
    assert_eq!(report.len(), 33);
    let scan = summary.scan.unwrap();
    assert_eq!(scan.complete_keys, 0);
    assert_eq!(scan.incomplete_keys, 33);

    let word_one = report
        .iter()
        .find(|r| r[0] == "sub-01" && r[1] == "word-1")
        .unwrap();
    // has_acoustic, has_articulatory, has_general, has_semantic, total
    assert_eq!(word_one[2..], ["1", "1", "1", "0", "3"]);
}

#[test]
fn test_index_from_written_manifest_matches_run_all() {
    let tmp = neutral_tempdir();
    let config = config_for(tmp.path());

    let combined_dir = tmp.path().join("combined");
    Pipeline::new(PipelineConfig {
        output_dir: combined_dir.clone(),
        ..config.clone()
    })
    .run_all()
    .unwrap();

    let pipeline = Pipeline::new(config.clone());
    pipeline.run_scan().unwrap();
    let summary = pipeline
        .run_index(&config.output_dir.join(MANIFEST_FILE))
        .unwrap();
    assert!(summary.scan.is_none());
    assert_eq!(summary.index.unwrap().clean_rows, 10);

    for file in [CLEAN_INDEX_FILE, DROPPED_FILE] {
        assert_eq!(
            fs::read_to_string(config.output_dir.join(file)).unwrap(),
            fs::read_to_string(combined_dir.join(file)).unwrap(),
            "{} differs",
            file
        );
    }
}

#[test]
fn test_empty_results_still_write_both_tables() {
    let tmp = neutral_tempdir();
    let data = tmp.path().join("raw");
    helpers::write_trials(&data, Modality::General, "sub-02", "trial", 2, ".wav", 3);

    let out = tmp.path().join("out");
    let config = PipelineConfig {
        roots: modality_roots(&data),
        output_dir: out.clone(),
        required_modalities: Some(vec![Modality::General, Modality::Semantic]),
        ..Default::default()
    };
    let summary = Pipeline::new(config).run_all().unwrap();
    assert_eq!(summary.index.unwrap().clean_rows, 0);

    let (headers, clean) = read_csv(&out.join(CLEAN_INDEX_FILE));
    assert_eq!(headers, vec!["subject", "trial_idx", "general_path", "semantic_path"]);
    assert!(clean.is_empty());

    let (_, dropped) = read_csv(&out.join(DROPPED_FILE));
    assert_eq!(dropped.len(), 3);
    assert!(dropped.iter().all(|r| r[2] == "subject_missing_modality"));
}

#[test]
fn test_failed_run_keeps_previous_outputs() {
    let tmp = neutral_tempdir();
    let config = config_for(tmp.path());
    let out = config.output_dir.clone();

    Pipeline::new(config.clone()).run_all().unwrap();
    let before = fs::read_to_string(out.join(CLEAN_INDEX_FILE)).unwrap();
    let manifest_before = fs::read_to_string(out.join(MANIFEST_FILE)).unwrap();

    // New data plus an unusable required set: the run must not commit anything
    helpers::write_trials(
        &tmp.path().join("raw"),
        Modality::General,
        "sub-05",
        "word_",
        3,
        ".wav",
        2,
    );
    let err = Pipeline::new(PipelineConfig {
        required_modalities: Some(Vec::new()),
        ..config
    })
    .run_all()
    .unwrap_err();
    assert!(err.is_config_error());

    assert_eq!(fs::read_to_string(out.join(CLEAN_INDEX_FILE)).unwrap(), before);
    assert_eq!(fs::read_to_string(out.join(MANIFEST_FILE)).unwrap(), manifest_before);
    assert_eq!(fs::read_dir(&out).unwrap().count(), 5);
}

#[test]
fn test_no_existing_root_is_config_error() {
    let tmp = neutral_tempdir();
    let out = tmp.path().join("out");
    let config = PipelineConfig {
        roots: vec![RootEntry {
            modality: Modality::General,
            path: tmp.path().join("missing"),
        }],
        output_dir: out.clone(),
        ..Default::default()
    };

    let err = Pipeline::new(config).run_scan().unwrap_err();
    assert!(matches!(err, AlignError::Scan(_)));
    assert!(err.is_config_error());
    assert!(!out.exists());
}

#[test]
fn test_split_writes_non_empty_sets() {
    let tmp = neutral_tempdir();
    let config = config_for(tmp.path());
    let pipeline = Pipeline::new(config.clone());
    pipeline.run_all().unwrap();

    let summary = pipeline
        .run_split(&config.output_dir.join(CLEAN_INDEX_FILE))
        .unwrap();
    assert_eq!(summary.rows_per_split, vec![("train".to_string(), 10)]);

    let (headers, rows) = read_csv(&config.splits_dir.join("train.csv"));
    assert_eq!(headers[0], "subject");
    assert_eq!(rows.len(), 10);
    assert!(!config.splits_dir.join("val.csv").exists());
    assert!(!config.splits_dir.join("test.csv").exists());
}
