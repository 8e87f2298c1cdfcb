use std::path::PathBuf;

use bevy_splat_stream::{
    StreamError,
    io::manifest::{
        DequantManifest,
        GroupManifest,
    },
};


fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("splat_stream_{name}_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn viewers_json(frames: usize, values: usize) -> String {
    let entries: Vec<String> = (0..frames)
        .map(|frame| {
            let info: Vec<String> = (0..values).map(|i| format!("{}.5", frame * 100 + i)).collect();
            format!(r#""{frame}": {{ "num": {values}, "info": [{}] }}"#, info.join(", "))
        })
        .collect();

    format!(r#"{{ "viewers": {{ {} }} }}"#, entries.join(", "))
}


#[test]
fn manifests_load_from_disk() {
    let dir = scratch_dir("manifests");
    let groups_path = dir.join("group_info.json");
    let ranges_path = dir.join("viewer_min_max.json");

    std::fs::write(
        &groups_path,
        r#"{ "1": { "frame_index": [3, 5] }, "0": { "frame_index": [0, 2] } }"#,
    )
    .unwrap();
    std::fs::write(&ranges_path, viewers_json(6, 30)).unwrap();

    let groups = GroupManifest::from_path(&groups_path).unwrap();
    assert_eq!(groups.total_frames(), 6);
    assert_eq!(groups.groups[1].first, 3);

    let ranges = DequantManifest::from_path(&ranges_path).unwrap();
    assert_eq!(ranges.len(), 6);
    assert!(ranges.missing_frames(6).is_empty());
    assert_eq!(ranges.missing_frames(8), vec![6, 7]);

    let frame_four = ranges.ranges(4).unwrap();
    assert_eq!(frame_four.get(0).min, 400.5);
    assert_eq!(frame_four.get(3).min, 412.5);
    assert_eq!(frame_four.get(13).max, 429.5);

    std::fs::remove_dir_all(dir).ok();
}

#[test]
fn absent_files_are_missing_manifests() {
    let dir = scratch_dir("absent");

    assert!(matches!(
        GroupManifest::from_path(dir.join("group_info.json")),
        Err(StreamError::ManifestMissing(_))
    ));
    assert!(matches!(
        DequantManifest::from_path(dir.join("viewer_min_max.json")),
        Err(StreamError::ManifestMissing(_))
    ));

    std::fs::remove_dir_all(dir).ok();
}

#[test]
fn broken_json_is_reported() {
    assert!(matches!(GroupManifest::from_json("{ \"0\": "), Err(StreamError::Json(_))));
    assert!(matches!(
        GroupManifest::from_json(r#"{ "zero": { "frame_index": [0, 1] } }"#),
        Err(StreamError::ManifestMalformed(_))
    ));
    assert!(matches!(
        DequantManifest::from_json(r#"{ "viewers": { "0": { "info": ["a"] } } }"#),
        Err(StreamError::ManifestMalformed(_))
    ));
    assert!(matches!(
        DequantManifest::from_json(r#"{ "viewers": {} }"#),
        Err(StreamError::ManifestMissing(_))
    ));
}

#[test]
fn short_info_arrays_are_malformed() {
    assert!(matches!(
        DequantManifest::from_json(&viewers_json(1, 17)),
        Err(StreamError::ManifestMalformed(_))
    ));
    assert!(DequantManifest::from_json(&viewers_json(1, 18)).is_ok());
}
