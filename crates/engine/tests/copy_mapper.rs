use std::error::Error;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::thread;
use std::time::Duration;

use checksums::DigestAlgorithm;
use engine::{
    CHECKSUM_MISMATCH_ERROR_MSG, CopyConfig, CopyError, CopyMapper, CopyTask,
    LENGTH_MISMATCH_ERROR_MSG, RecordTag, RetryPolicy, VecSink,
};
use metadata::{AttributeSet, CreateOptions};
use store::{FileStore, Identity, StoreDefaults};
use test_support::{CopyFixture, pattern_bytes};

const TREE_DIRS: &[&str] = &["/1", "/2", "/2/3", "/2/3/4", "/5"];
const TREE_FILES: &[&str] = &["/5/6", "/7/8/9"];
const TREE_FILE_SIZE: usize = 1024;

fn default_config(fixture: &CopyFixture) -> CopyConfig {
    CopyConfig::new(fixture.target_root(), fixture.target_root()).sync_folders(true)
}

fn populate_standard_tree(fixture: &CopyFixture) {
    for dir in TREE_DIRS {
        fixture.create_source_dir(dir);
    }
    for file in TREE_FILES {
        fixture.write_source(file, &pattern_bytes(TREE_FILE_SIZE));
    }
}

fn standard_tasks(fixture: &CopyFixture) -> Vec<CopyTask> {
    TREE_DIRS
        .iter()
        .chain(TREE_FILES.iter())
        .map(|relative| CopyTask::new(*relative, fixture.source_status(relative)))
        .collect()
}

fn run_tasks(
    config: CopyConfig,
    fixture: &CopyFixture,
    tasks: &[CopyTask],
    sink: &mut VecSink,
) -> (engine::Counters, engine::CopyResult<()>) {
    let mut mapper = CopyMapper::new(
        config,
        &fixture.source_store,
        &fixture.target_store,
        Identity::superuser(),
    )
    .expect("create mapper");
    for task in tasks {
        let result = mapper.map(task, sink);
        if result.is_err() {
            return (mapper.counters(), result);
        }
    }
    (mapper.counters(), Ok(()))
}

/// Unwraps the retry-layer cause and then the original cause beneath it.
fn cause_two_levels_deep(top: &CopyError) -> &CopyError {
    let retry_layer = top
        .source()
        .and_then(|cause| cause.downcast_ref::<CopyError>())
        .expect("retry-layer cause");
    retry_layer
        .source()
        .and_then(|cause| cause.downcast_ref::<CopyError>())
        .expect("original cause")
}

#[test]
fn end_to_end_counters_over_a_standard_tree() {
    let fixture = CopyFixture::new();
    populate_standard_tree(&fixture);
    let tasks = standard_tasks(&fixture);

    let mut sink = VecSink::new();
    let (counters, result) = run_tasks(default_config(&fixture), &fixture, &tasks, &mut sink);
    result.expect("first pass succeeds");

    assert_eq!(counters.dir_copy, 5);
    assert_eq!(counters.copy, 2);
    assert_eq!(counters.bytes_copied, 2048);
    assert_eq!(counters.skip, 0);
    assert_eq!(counters.fail, 0);

    for file in TREE_FILES {
        assert_eq!(fixture.target_status(file).length, TREE_FILE_SIZE as u64);
    }
}

#[test]
fn second_pass_skips_every_file_and_leaves_targets_untouched() {
    let fixture = CopyFixture::new();
    populate_standard_tree(&fixture);
    let tasks = standard_tasks(&fixture);

    let mut sink = VecSink::new();
    run_tasks(default_config(&fixture), &fixture, &tasks, &mut sink)
        .1
        .expect("first pass succeeds");
    let mtimes_before: Vec<_> = TREE_FILES
        .iter()
        .map(|file| fixture.target_status(file).modification_time)
        .collect();

    let mut sink = VecSink::new();
    let (counters, result) = run_tasks(default_config(&fixture), &fixture, &tasks, &mut sink);
    result.expect("second pass succeeds");

    assert_eq!(counters.skip, 2);
    assert_eq!(counters.dir_copy, 5);
    assert_eq!(counters.copy, 0);
    assert_eq!(counters.bytes_copied, 0);
    assert_eq!(counters.fail, 0);

    // the always-on skip records name the source path and the reason
    let skipped = sink.messages(RecordTag::Skip);
    assert_eq!(skipped.len(), 2);
    for file in TREE_FILES {
        let source = fixture.source_path(file).display().to_string();
        assert!(
            skipped
                .iter()
                .any(|m| m.starts_with(&source) && m.contains("length and checksum match")),
            "missing SKIP for {source}"
        );
    }

    let mtimes_after: Vec<_> = TREE_FILES
        .iter()
        .map(|file| fixture.target_status(file).modification_time)
        .collect();
    assert_eq!(mtimes_before, mtimes_after);
}

#[test]
fn verbose_mode_emits_detail_records() {
    let fixture = CopyFixture::new();
    populate_standard_tree(&fixture);
    let tasks = standard_tasks(&fixture);

    let mut sink = VecSink::new();
    run_tasks(
        default_config(&fixture).verbose(true),
        &fixture,
        &tasks,
        &mut sink,
    )
    .1
    .expect("first pass succeeds");
    assert_eq!(sink.count(RecordTag::FileCopied), 2);
    assert_eq!(sink.count(RecordTag::DirCopied), 5);
    assert_eq!(sink.count(RecordTag::FileSkipped), 0);

    let mut sink = VecSink::new();
    run_tasks(
        default_config(&fixture).verbose(true),
        &fixture,
        &tasks,
        &mut sink,
    )
    .1
    .expect("second pass succeeds");
    assert_eq!(sink.count(RecordTag::Skip), 2);
    assert_eq!(sink.count(RecordTag::FileSkipped), 2);
    assert_eq!(sink.count(RecordTag::FileCopied), 0);
}

#[test]
fn explicit_file_destination_always_overwrites() {
    let fixture = CopyFixture::new();
    let data = pattern_bytes(512);
    fixture.write_source("/out.bin", &data);
    fixture.write_target("/out.bin", &data);
    let destination = fixture.target_path("/out.bin");

    let task = CopyTask::new("/out.bin", fixture.source_status("/out.bin"));
    let before = fixture.target_status("/out.bin").modification_time;
    thread::sleep(Duration::from_millis(20));

    let config = CopyConfig::new(&destination, &destination).sync_folders(true);
    let mut sink = VecSink::new();
    let mut mapper = CopyMapper::new(
        config,
        &fixture.source_store,
        &fixture.target_store,
        Identity::superuser(),
    )
    .expect("create mapper");
    mapper.map(&task, &mut sink).expect("overwrite succeeds");

    assert_eq!(mapper.counters().copy, 1);
    let after = fixture.target_status("/out.bin").modification_time;
    assert!(after > before, "target was not rewritten");
}

#[test]
fn directory_destination_skips_an_identical_file() {
    let fixture = CopyFixture::new();
    let data = pattern_bytes(512);
    fixture.write_source("/out.bin", &data);
    fixture.write_target("/out.bin", &data);

    let task = CopyTask::new("/out.bin", fixture.source_status("/out.bin"));
    let mut sink = VecSink::new();
    let (counters, result) =
        run_tasks(default_config(&fixture), &fixture, &[task], &mut sink);
    result.expect("skip succeeds");
    assert_eq!(counters.skip, 1);
    assert_eq!(counters.copy, 0);
    assert_eq!(sink.count(RecordTag::Skip), 1);
}

#[test]
fn preserving_the_checksum_type_pins_target_block_sizes() {
    let target_defaults = StoreDefaults {
        block_size: 64 * 1024,
        ..StoreDefaults::default()
    };
    let fixture = CopyFixture::with_defaults(StoreDefaults::default(), target_defaults);
    let data = pattern_bytes(8192);
    fixture.write_source_with(
        "/a",
        &data,
        &CreateOptions {
            block_size: Some(2048),
            ..CreateOptions::default()
        },
    );
    fixture.write_source_with(
        "/b",
        &data,
        &CreateOptions {
            block_size: Some(4096),
            ..CreateOptions::default()
        },
    );

    let preserve: AttributeSet = "c".parse().expect("preserve letters");
    let tasks = vec![
        CopyTask::new("/a", fixture.source_status("/a")),
        CopyTask::new("/b", fixture.source_status("/b")),
    ];
    let mut sink = VecSink::new();
    let (counters, result) = run_tasks(
        default_config(&fixture).preserve(preserve),
        &fixture,
        &tasks,
        &mut sink,
    );
    result.expect("heterogeneous block sizes copy cleanly when preserved");
    assert_eq!(counters.copy, 2);
    assert_eq!(fixture.target_status("/a").block_size, 2048);
    assert_eq!(fixture.target_status("/b").block_size, 4096);
}

#[test]
fn unpreserved_attributes_actually_diverge_from_the_source() {
    let fixture = CopyFixture::new();
    fixture.write_source_with(
        "/data",
        &pattern_bytes(4096),
        &CreateOptions {
            block_size: Some(2048),
            replication: Some(6),
            ..CreateOptions::default()
        },
    );

    let task = CopyTask::new("/data", fixture.source_status("/data"));
    let mut sink = VecSink::new();
    // block sizes differ, so checksum verification must be off for this copy
    let (_, result) = run_tasks(
        default_config(&fixture).skip_checksum(true),
        &fixture,
        &[task],
        &mut sink,
    );
    result.expect("copy succeeds without verification");

    let source = fixture.source_status("/data");
    let target = fixture.target_status("/data");
    assert_ne!(target.block_size, source.block_size);
    assert_ne!(target.replication, source.replication);
    assert_eq!(target.block_size, StoreDefaults::default().block_size);
    assert_eq!(target.replication, StoreDefaults::default().replication);
}

#[test]
fn block_size_mismatch_fails_with_remediation_hints() {
    let fixture = CopyFixture::new();
    // multi-block under its own 2048-byte blocks, single task, no preservation
    fixture.write_source_with(
        "/data",
        &pattern_bytes(8192),
        &CreateOptions {
            block_size: Some(2048),
            ..CreateOptions::default()
        },
    );

    let task = CopyTask::new("/data", fixture.source_status("/data"));
    let mut sink = VecSink::new();
    let (_, result) = run_tasks(default_config(&fixture), &fixture, &[task], &mut sink);
    let error = result.expect_err("incompatible block sizes");

    let message = error.to_string();
    assert!(message.contains("preserve block sizes"));
    assert!(message.contains("skip checksum"));
    let original = cause_two_levels_deep(&error);
    assert!(original.to_string().contains("block size mismatch"));
}

#[test]
fn checksum_scheme_mismatch_fails_unless_verification_is_skipped() {
    let target_defaults = StoreDefaults {
        algorithm: DigestAlgorithm::Sha256,
        ..StoreDefaults::default()
    };
    let fixture = CopyFixture::with_defaults(StoreDefaults::default(), target_defaults);
    fixture.write_source("/data", &pattern_bytes(1024));
    let task = CopyTask::new("/data", fixture.source_status("/data"));

    let mut sink = VecSink::new();
    let (_, result) =
        run_tasks(default_config(&fixture), &fixture, &[task.clone()], &mut sink);
    let error = result.expect_err("incomparable schemes");
    assert!(error.to_string().contains("preserve the checksum type ('c')"));

    let mut sink = VecSink::new();
    let (counters, result) = run_tasks(
        default_config(&fixture).skip_checksum(true),
        &fixture,
        &[task],
        &mut sink,
    );
    result.expect("skipping verification unblocks the copy");
    assert_eq!(counters.copy, 1);
}

#[test]
fn append_transfers_only_the_tail() {
    let fixture = CopyFixture::new();
    let data = pattern_bytes(1024);
    fixture.write_source("/grow.log", &data);
    fixture.write_target("/grow.log", &data[..512]);

    let task = CopyTask::new("/grow.log", fixture.source_status("/grow.log"));
    let mut sink = VecSink::new();
    let (counters, result) = run_tasks(
        default_config(&fixture).append(true),
        &fixture,
        &[task],
        &mut sink,
    );
    result.expect("append succeeds");

    assert_eq!(counters.copy, 1);
    assert_eq!(counters.bytes_copied, 512);
    let target = fixture.target_status("/grow.log");
    assert_eq!(target.length, 1024);
    let source_sum = fixture
        .source_store
        .checksum(&fixture.source_path("/grow.log"), 1024)
        .expect("source checksum");
    let target_sum = fixture
        .target_store
        .checksum(&fixture.target_path("/grow.log"), 1024)
        .expect("target checksum");
    assert_eq!(source_sum, target_sum);
}

#[test]
fn mismatched_prefix_falls_back_to_a_full_rewrite() {
    let fixture = CopyFixture::new();
    let data = pattern_bytes(1024);
    fixture.write_source("/grow.log", &data);
    fixture.write_target("/grow.log", &vec![0xAA; 512]);

    let task = CopyTask::new("/grow.log", fixture.source_status("/grow.log"));
    let mut sink = VecSink::new();
    let (counters, result) = run_tasks(
        default_config(&fixture).append(true),
        &fixture,
        &[task],
        &mut sink,
    );
    result.expect("rewrite succeeds");

    // the whole file moved, not just the missing tail
    assert_eq!(counters.bytes_copied, 1024);
    let source_sum = fixture
        .source_store
        .checksum(&fixture.source_path("/grow.log"), 1024)
        .expect("source checksum");
    let target_sum = fixture
        .target_store
        .checksum(&fixture.target_path("/grow.log"), 1024)
        .expect("target checksum");
    assert_eq!(source_sum, target_sum);
}

#[test]
fn a_concurrently_growing_source_copies_its_snapshot_cleanly() {
    let fixture = CopyFixture::new();
    fixture.write_source("/busy.log", &pattern_bytes(256 * 1024));
    let snapshot = fixture.source_status("/busy.log");
    let task = CopyTask::new("/busy.log", snapshot.clone());

    let source_path = fixture.source_path("/busy.log");
    let appender = thread::spawn(move || {
        let mut file = OpenOptions::new()
            .append(true)
            .open(&source_path)
            .expect("open source for appending");
        for _ in 0..50 {
            file.write_all(&[0xFF; 64]).expect("append");
            thread::sleep(Duration::from_millis(1));
        }
    });

    let mut sink = VecSink::new();
    let (counters, result) = run_tasks(
        default_config(&fixture).copy_buffer_size(4096),
        &fixture,
        &[task],
        &mut sink,
    );
    appender.join().expect("appender thread");

    match result {
        Ok(()) => {
            assert_eq!(counters.bytes_copied, snapshot.length);
            assert_eq!(fixture.target_status("/busy.log").length, snapshot.length);
        }
        Err(error) => {
            let message = error.to_string();
            assert!(
                message.contains(LENGTH_MISMATCH_ERROR_MSG)
                    || message.contains(CHECKSUM_MISMATCH_ERROR_MSG),
                "unexpected failure during append race: {message}"
            );
        }
    }
}

#[test]
fn a_source_shrunk_after_listing_fails_with_the_length_sentinel() {
    let fixture = CopyFixture::new();
    fixture.write_source("/shrink.bin", &pattern_bytes(4096));
    let task = CopyTask::new("/shrink.bin", fixture.source_status("/shrink.bin"));

    // snapshot says 4096 bytes; the live file no longer has them
    std::fs::write(fixture.source_path("/shrink.bin"), pattern_bytes(100))
        .expect("truncate source");

    let mut sink = VecSink::new();
    let (_, result) = run_tasks(default_config(&fixture), &fixture, &[task], &mut sink);
    let error = result.expect_err("length verification fails");
    assert!(error.to_string().contains(LENGTH_MISMATCH_ERROR_MSG));
    assert!(
        fixture
            .target_store
            .try_status(&fixture.target_path("/shrink.bin"))
            .expect("probe target")
            .is_none(),
        "failed copy must not leave a target behind"
    );
}

#[test]
fn ignored_failures_are_counted_and_recorded() {
    let fixture = CopyFixture::new();
    fixture.write_source("/keep.bin", &pattern_bytes(1024));
    fixture.write_source("/gone.bin", &pattern_bytes(1024));
    let tasks = vec![
        CopyTask::new("/gone.bin", fixture.source_status("/gone.bin")),
        CopyTask::new("/keep.bin", fixture.source_status("/keep.bin")),
    ];
    std::fs::remove_file(fixture.source_path("/gone.bin")).expect("remove source");

    let mut sink = VecSink::new();
    let (counters, result) = run_tasks(
        default_config(&fixture)
            .ignore_failures(true)
            .retry(RetryPolicy::none()),
        &fixture,
        &tasks,
        &mut sink,
    );
    result.expect("worker keeps going");

    assert_eq!(counters.fail, 1);
    assert_eq!(counters.copy, 1);
    let failures = sink.messages(RecordTag::Fail);
    assert_eq!(failures.len(), 1);
    assert!(failures[0].contains("gone.bin"));
}

#[test]
fn unignored_failures_abort_the_batch() {
    let fixture = CopyFixture::new();
    fixture.write_source("/keep.bin", &pattern_bytes(1024));
    fixture.write_source("/gone.bin", &pattern_bytes(1024));
    let tasks = vec![
        CopyTask::new("/gone.bin", fixture.source_status("/gone.bin")),
        CopyTask::new("/keep.bin", fixture.source_status("/keep.bin")),
    ];
    std::fs::remove_file(fixture.source_path("/gone.bin")).expect("remove source");

    let mut sink = VecSink::new();
    let (counters, result) = run_tasks(
        default_config(&fixture).retry(RetryPolicy::none()),
        &fixture,
        &tasks,
        &mut sink,
    );
    assert!(result.is_err());
    assert_eq!(counters.fail, 0);
    assert_eq!(counters.copy, 0, "tasks after the failure must not run");
}

#[test]
fn access_denied_is_reachable_two_cause_levels_deep() {
    let fixture = CopyFixture::new();
    fixture.write_source("/secret", &pattern_bytes(1024));
    fixture
        .source_store
        .set_permissions(&fixture.source_path("/secret"), 0o000, &Identity::superuser())
        .expect("revoke permissions");
    let task = CopyTask::new("/secret", fixture.source_status("/secret"));

    let config = default_config(&fixture).retry(RetryPolicy::none());
    let mut sink = VecSink::new();
    let mut mapper = CopyMapper::new(
        config,
        &fixture.source_store,
        &fixture.target_store,
        Identity::new("guest", "guests"),
    )
    .expect("create mapper");
    let error = mapper.map(&task, &mut sink).expect_err("read denied");

    let original = cause_two_levels_deep(&error);
    assert!(original.is_access_denied());
}

#[test]
fn type_conflicts_abort_even_under_ignore_failures() {
    let fixture = CopyFixture::new();
    fixture.write_source("/clash", &pattern_bytes(64));
    fixture
        .target_store
        .mkdirs(&fixture.target_path("/clash"))
        .expect("create conflicting directory");
    let file_over_dir = CopyTask::new("/clash", fixture.source_status("/clash"));

    fixture.create_source_dir("/swap");
    fixture.write_target("/swap", &pattern_bytes(64));
    let dir_over_file = CopyTask::new("/swap", fixture.source_status("/swap"));

    for task in [file_over_dir, dir_over_file] {
        let mut sink = VecSink::new();
        let (counters, result) = run_tasks(
            default_config(&fixture).ignore_failures(true),
            &fixture,
            &[task],
            &mut sink,
        );
        let error = result.expect_err("structural conflict propagates");
        assert!(error.to_string().contains("Can't replace"));
        assert_eq!(counters.fail, 0);
        assert_eq!(sink.count(RecordTag::Fail), 0);
    }
}

#[test]
fn preserved_attributes_are_applied_to_the_target() {
    let fixture = CopyFixture::new();
    fixture.write_source("/owned.bin", &pattern_bytes(1024));
    let source_path = fixture.source_path("/owned.bin");
    let root = Identity::superuser();
    fixture
        .source_store
        .set_permissions(&source_path, 0o640, &root)
        .expect("chmod source");
    fixture
        .source_store
        .set_owner(&source_path, "michael", "corleone", &root)
        .expect("chown source");

    let preserve: AttributeSet = "ugpt".parse().expect("preserve letters");
    let task = CopyTask::new("/owned.bin", fixture.source_status("/owned.bin"));
    let mut sink = VecSink::new();
    let (_, result) = run_tasks(
        default_config(&fixture).preserve(preserve),
        &fixture,
        &[task],
        &mut sink,
    );
    result.expect("copy with preservation succeeds");

    let source = fixture.source_status("/owned.bin");
    let target = fixture.target_status("/owned.bin");
    assert_eq!(target.permissions, 0o640);
    assert_eq!(target.owner, "michael");
    assert_eq!(target.group, "corleone");
    assert_eq!(target.modification_time, source.modification_time);
}

#[test]
fn unpreserved_ownership_stays_at_target_defaults() {
    let fixture = CopyFixture::new();
    fixture.write_source("/plain.bin", &pattern_bytes(64));
    let root = Identity::superuser();
    fixture
        .source_store
        .set_owner(&fixture.source_path("/plain.bin"), "michael", "corleone", &root)
        .expect("chown source");

    let task = CopyTask::new("/plain.bin", fixture.source_status("/plain.bin"));
    let mut sink = VecSink::new();
    let (_, result) = run_tasks(default_config(&fixture), &fixture, &[task], &mut sink);
    result.expect("copy succeeds");

    let target = fixture.target_status("/plain.bin");
    assert_ne!(target.owner, "michael");
    assert_ne!(target.group, "corleone");
}

#[test]
fn staging_files_do_not_linger_in_the_target_tree() {
    let fixture = CopyFixture::new();
    populate_standard_tree(&fixture);
    let tasks = standard_tasks(&fixture);
    let mut sink = VecSink::new();
    run_tasks(default_config(&fixture), &fixture, &tasks, &mut sink)
        .1
        .expect("copy succeeds");

    fn assert_no_staging(dir: &Path) {
        for entry in std::fs::read_dir(dir).expect("list target dir") {
            let entry = entry.expect("dir entry");
            let name = entry.file_name();
            let name = name.to_string_lossy();
            assert!(!name.contains(".copying."), "staging file left behind: {name}");
            if entry.path().is_dir() {
                assert_no_staging(&entry.path());
            }
        }
    }
    assert_no_staging(fixture.target_root());
}
