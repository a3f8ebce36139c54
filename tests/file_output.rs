//! Writing fetched segments into output files.

pub mod common;

use common::harness::{Action, SimObject, SimTransport, small_config, spawn_fetcher};
use ndn_fetch::{
    Error, ErrorKind, SegmentRange, TaskDef,
    packet::{InterestTemplate, Name},
};
use sha2::{Digest, Sha256};
use std::{path::Path, time::Duration};

fn file_def(path: &Path, range: SegmentRange, segment_len: usize) -> TaskDef {
    TaskDef {
        template: InterestTemplate::new("/file".parse::<Name>().unwrap()),
        range,
        filename: Some(path.to_path_buf()),
        segment_len: Some(segment_len),
    }
}

#[tokio::test(start_paused = true)]
async fn test_segments_written_at_their_offsets() {
    let object = SimObject::new(1000, 3);
    let transport = SimTransport::with_policy(object.clone(), |interest, _| {
        // Segment 1 overtakes segment 0.
        if interest.seg_num() == 1 {
            Action::Deliver(Duration::from_millis(2))
        } else {
            Action::Deliver(Duration::from_millis(20))
        }
    });
    let fetcher = spawn_fetcher(small_config(16, 3.0), &[transport]);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("object.bin");
    let mut task = fetcher
        .fetch(file_def(&path, SegmentRange::new(0, 3), 1000))
        .await
        .unwrap();
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 3000);

    task.wait_finished().await.unwrap();
    task.stop().await.unwrap();

    let written = std::fs::read(&path).unwrap();
    assert_eq!(written.len(), 3000);
    assert_eq!(&written[1000..2000], &object.segment(1)[..]);
    assert_eq!(Sha256::digest(&written), Sha256::digest(object.bytes()));
    assert_eq!(task.counters().await.unwrap_err().kind(), ErrorKind::Internal);
}

#[tokio::test(start_paused = true)]
async fn test_existing_bytes_outside_range_are_kept() {
    let object = SimObject::new(1000, 3);
    let transport = SimTransport::new(object.clone());
    let fetcher = spawn_fetcher(small_config(16, 2.0), &[transport.clone()]);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("partial.bin");
    std::fs::write(&path, vec![0xaa; 4000]).unwrap();

    let mut task = fetcher
        .fetch(file_def(&path, SegmentRange::new(1, 3), 1000))
        .await
        .unwrap();
    task.wait_finished().await.unwrap();
    task.stop().await.unwrap();
    assert_eq!(transport.sent(), vec![1, 2]);

    let written = std::fs::read(&path).unwrap();
    assert_eq!(written.len(), 4000);
    assert!(written[..1000].iter().all(|&b| b == 0xaa));
    assert_eq!(&written[1000..2000], &object.segment(1)[..]);
    assert_eq!(&written[2000..3000], &object.segment(2)[..]);
    assert!(written[3000..].iter().all(|&b| b == 0xaa));
}

#[tokio::test(start_paused = true)]
async fn test_missing_directory_fails_without_leftovers() {
    let transport = SimTransport::new(SimObject::new(1000, 3));
    let fetcher = spawn_fetcher(small_config(16, 2.0), &[transport.clone()]);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("object.bin");
    let err = fetcher
        .fetch(file_def(&path, SegmentRange::new(0, 3), 1000))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::FileOutput { .. }));
    assert_eq!(err.kind(), ErrorKind::Resource);
    assert!(!path.exists());
    assert!(fetcher.tasks().is_empty());
    assert!(transport.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_file_removed_when_no_slot_is_free() {
    let mut config = small_config(16, 2.0);
    config.task_slot.slots_per_worker = 1;
    let transport = SimTransport::new(SimObject::new(1000, 3));
    let fetcher = spawn_fetcher(config, &[transport]);

    let busy = fetcher
        .fetch(TaskDef {
            template: InterestTemplate::new("/busy".parse::<Name>().unwrap()),
            range: SegmentRange::open(100),
            ..Default::default()
        })
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("object.bin");
    let err = fetcher
        .fetch(file_def(&path, SegmentRange::new(0, 3), 1000))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NoFreeSlot));
    assert!(!path.exists());

    busy.stop().await.unwrap();
    let mut task = fetcher
        .fetch(file_def(&path, SegmentRange::new(0, 3), 1000))
        .await
        .unwrap();
    task.wait_finished().await.unwrap();
    task.stop().await.unwrap();
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 3000);
}
