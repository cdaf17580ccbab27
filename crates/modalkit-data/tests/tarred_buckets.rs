use modalkit_data::{CutSetSource, DataConfig, DataError, read_cutset_from_config};
use std::fs;
use std::path::Path;

fn write_manifest(path: &Path, entries: usize) {
    let lines: Vec<String> = (0..entries)
        .map(|i| format!(r#"{{"audio_filepath": "utt{i}.wav", "duration": 1.0, "text": "utterance {i}"}}"#))
        .collect();
    fs::write(path, lines.join("\n")).unwrap();
}

#[test]
fn buckets_are_weighted_by_manifest_size() {
    let dir = tempfile::tempdir().unwrap();
    let short = dir.path().join("bucket1.json");
    let long = dir.path().join("bucket2.json");
    write_manifest(&short, 2);
    write_manifest(&long, 5);

    let config_path = dir.path().join("train_ds.json");
    let config = serde_json::json!({
        "manifest_filepath": [[short], [long]],
        "tarred_audio_filepaths": [["b1/audio_{0..1}.tar"], ["b2/audio_{0..3}.tar"]],
        "shuffle": true,
        "lhotse": {"text_field": "text"}
    });
    fs::write(&config_path, config.to_string()).unwrap();

    let config = DataConfig::from_file(&config_path).unwrap();
    let (source, is_tarred) = read_cutset_from_config(&config).unwrap();
    assert!(is_tarred);

    let CutSetSource::NemoTarredMux { sources, weights } = source else {
        panic!("expected a tarred NeMo multiplexer");
    };
    assert_eq!(weights, vec![2, 5]);
    assert_eq!(sources[1].tar_paths, vec!["b2/audio_{0..3}.tar".to_string()]);
    assert!(sources.iter().all(|s| s.shuffle_shards));

    let texts: Vec<String> = sources[0]
        .manifest
        .iter()
        .unwrap()
        .map(|entry| entry.unwrap().text.unwrap())
        .collect();
    assert_eq!(texts, vec!["utterance 0", "utterance 1"]);
}

#[test]
fn bucket_count_mismatch_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = dir.path().join("bucket1.json");
    write_manifest(&manifest, 1);

    let config: DataConfig = serde_json::from_value(serde_json::json!({
        "manifest_filepath": [[manifest]],
        "tarred_audio_filepaths": [["a.tar"], ["b.tar"]],
    }))
    .unwrap();
    assert!(matches!(
        read_cutset_from_config(&config),
        Err(DataError::InvalidConfig(_))
    ));
}

#[test]
fn missing_bucket_manifest_is_io_error() {
    let config: DataConfig = serde_json::from_value(serde_json::json!({
        "manifest_filepath": [["/nonexistent/bucket.json"]],
        "tarred_audio_filepaths": [["a.tar"]],
    }))
    .unwrap();
    assert!(matches!(
        read_cutset_from_config(&config),
        Err(DataError::Io { .. })
    ));
}
