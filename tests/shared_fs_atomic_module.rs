use runscope::cache::{CacheLookup, RunCache};
use runscope::shared::{atomic_write_file, write_json_atomic};
use std::fs;

#[test]
fn shared_fs_atomic_replaces_files_in_place() {
    let temp = tempfile::tempdir().expect("tempdir");
    let target = temp.path().join("run-7/run_summary.json");

    atomic_write_file(&target, b"first").expect("write first");
    assert_eq!(fs::read_to_string(&target).expect("read first"), "first");

    write_json_atomic(&target, &serde_json::json!({"pipelineVersion": "0.0.1"}))
        .expect("write second");
    let entries = fs::read_dir(target.parent().expect("parent"))
        .expect("read dir")
        .count();
    assert_eq!(entries, 1);
}

#[test]
fn partially_written_summaries_are_not_reused() {
    let temp = tempfile::tempdir().expect("tempdir");
    let run_dir = temp.path().join("run-8");
    atomic_write_file(&RunCache::summary_path(&run_dir), b"{\"pipelineVersion\":")
        .expect("write truncated summary");

    let lookup = RunCache::new("0.1.0").lookup(&run_dir);
    assert!(matches!(lookup, CacheLookup::Unreadable(_)));
}
