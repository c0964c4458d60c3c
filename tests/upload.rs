//! Upload pipeline: folder resolution, chunked transfer, retries.

#![cfg(not(target_arch = "wasm32"))]

use std::{cell::RefCell, rc::Rc, time::Duration};

use stagehand::{
    conf,
    platform::{
        rig::Rig,
        storage::{ByteRange, RecordingMetadata},
        Blob,
    },
    upload::{
        folders, DestinationContext, UploadError, UploadPhase,
        UploadRequest, Uploader,
    },
};
use stagehand_storage_mock::MemoryBackend;
use tokio::{task, time};

const MIB: u64 = 1024 * 1024;

fn uploader(backend: &MemoryBackend) -> Uploader {
    Uploader::new(
        conf::Upload::default(),
        backend.storage(),
        backend.auth(),
        backend.registry(),
    )
}

fn request(blob: Blob) -> UploadRequest {
    UploadRequest {
        blob,
        file_name: String::from("take-1.webm"),
        destination: DestinationContext {
            performance: String::from("Hamlet"),
            rehearsal: String::from("Act I"),
        },
        metadata: RecordingMetadata {
            title: String::from("Take 1"),
            tags: vec![String::from("blocking")],
            duration_secs: 12,
            file: None,
        },
    }
}

fn blob_of(size: u64) -> Blob {
    let data = (0..size).map(|i| (i % 251) as u8).collect::<Vec<_>>();
    Blob::from_bytes(data, "video/webm")
}

fn range(start: u64, end: u64, total: u64) -> ByteRange {
    ByteRange { start, end, total }
}

#[tokio::test]
async fn twelve_mib_upload_goes_in_three_chunks_with_rounded_progress() {
    time::pause();
    let _rig = Rig::install();
    task::LocalSet::new()
        .run_until(async {
            let backend = MemoryBackend::new();
            let uploader = uploader(&backend);

            let job = uploader.submit(request(blob_of(12 * MIB))).unwrap();
            let progress = Rc::new(RefCell::new(Vec::new()));
            let log = Rc::clone(&progress);
            job.set_on_progress(move |p| log.borrow_mut().push(p));

            let file = job.run().await.unwrap();

            assert_eq!(
                backend.put_ranges(),
                vec![
                    range(0, 5 * MIB, 12 * MIB),
                    range(5 * MIB, 10 * MIB, 12 * MIB),
                    range(10 * MIB, 12 * MIB, 12 * MIB),
                ],
            );
            assert_eq!(*progress.borrow(), vec![33, 67, 100]);
            assert_eq!(job.phase(), UploadPhase::Complete);
            assert_eq!(job.progress(), 100);
            assert_eq!(job.retry_count(), 0);

            // The whole blob must have arrived byte-for-byte.
            let stored = backend.file_bytes(&file.id).unwrap();
            assert_eq!(stored.len() as u64, 12 * MIB);
            assert_eq!(&stored[..4], &[0, 1, 2, 3]);

            // The metadata record is persisted exactly once, with the
            // refreshed file reference.
            let saved = backend.saved_recordings();
            assert_eq!(saved.len(), 1);
            let saved_file = saved[0].file.as_ref().unwrap();
            assert_eq!(saved_file.id, file.id);
            assert!(saved_file.thumbnail_url.is_some());
        })
        .await;
}

#[tokio::test]
async fn folder_resolution_is_idempotent() {
    time::pause();
    let _rig = Rig::install();
    task::LocalSet::new()
        .run_until(async {
            let backend = MemoryBackend::new();
            let storage = backend.storage();
            let auth = backend.auth();

            let first = folders::ensure_folder_structure(
                &storage,
                &auth,
                "Callboard",
                "Hamlet",
                "Act I",
            )
            .await
            .unwrap();
            let second = folders::ensure_folder_structure(
                &storage,
                &auth,
                "Callboard",
                "Hamlet",
                "Act I",
            )
            .await
            .unwrap();

            assert_eq!(first.id, second.id);
            assert_eq!(backend.folder_create_count(), 3);

            // A sibling rehearsal reuses the two upper levels.
            let sibling = folders::ensure_folder_structure(
                &storage,
                &auth,
                "Callboard",
                "Hamlet",
                "Act II",
            )
            .await
            .unwrap();
            assert_ne!(sibling.id, first.id);
            assert_eq!(backend.folder_create_count(), 4);
        })
        .await;
}

#[tokio::test]
async fn failed_chunk_fails_the_job_and_retry_reissues_from_chunk_one() {
    time::pause();
    let _rig = Rig::install();
    task::LocalSet::new()
        .run_until(async {
            let backend = MemoryBackend::new();
            let uploader = uploader(&backend);
            backend.fail_chunk(1, 1);

            let job = uploader.submit(request(blob_of(12 * MIB))).unwrap();

            let err = job.run().await.unwrap_err();
            assert!(matches!(err.as_ref(), UploadError::Storage(_)));
            assert_eq!(job.phase(), UploadPhase::Error);
            assert!(job.error_message().is_some());
            assert_eq!(backend.put_ranges().len(), 2);

            let file = job.retry().await.unwrap();
            assert_eq!(job.retry_count(), 1);
            assert_eq!(job.phase(), UploadPhase::Complete);

            // The retried transfer reissued the full sequence from
            // chunk 1 (no partial resume).
            let ranges = backend.put_ranges();
            assert_eq!(
                ranges[2..],
                [
                    range(0, 5 * MIB, 12 * MIB),
                    range(5 * MIB, 10 * MIB, 12 * MIB),
                    range(10 * MIB, 12 * MIB, 12 * MIB),
                ],
            );
            assert_eq!(
                backend.file_bytes(&file.id).unwrap().len() as u64,
                12 * MIB,
            );
        })
        .await;
}

#[tokio::test]
async fn fourth_retry_is_refused_without_touching_the_storage() {
    time::pause();
    let _rig = Rig::install();
    task::LocalSet::new()
        .run_until(async {
            let backend = MemoryBackend::new();
            let uploader = uploader(&backend);
            backend.fail_chunk(0, u32::MAX);

            let job = uploader.submit(request(blob_of(MIB))).unwrap();

            assert!(job.run().await.is_err());
            for expected_count in 1..=3 {
                assert!(job.retry().await.is_err());
                assert_eq!(job.retry_count(), expected_count);
            }
            let puts_after_budget = backend.put_ranges().len();

            let err = job.retry().await.unwrap_err();
            assert!(matches!(
                err.as_ref(),
                UploadError::RetriesExceeded
            ));
            assert_eq!(job.retry_count(), 3);
            assert_eq!(backend.put_ranges().len(), puts_after_budget);
            assert_eq!(job.phase(), UploadPhase::Error);
        })
        .await;
}

#[tokio::test]
async fn stale_token_is_refreshed_and_the_call_reissued() {
    time::pause();
    let _rig = Rig::install();
    task::LocalSet::new()
        .run_until(async {
            let backend = MemoryBackend::new();
            let uploader = uploader(&backend);
            backend.expire_token();

            let job = uploader.submit(request(blob_of(MIB))).unwrap();
            drop(job.run().await.unwrap());

            assert_eq!(backend.refresh_count(), 1);
            assert_eq!(job.phase(), UploadPhase::Complete);
        })
        .await;
}

#[tokio::test]
async fn missing_title_is_rejected_synchronously() {
    time::pause();
    let _rig = Rig::install();
    task::LocalSet::new()
        .run_until(async {
            let backend = MemoryBackend::new();
            let uploader = uploader(&backend);

            let mut bad = request(blob_of(MIB));
            bad.metadata.title = String::from("   ");

            let err = uploader
                .submit(bad)
                .err()
                .expect("validation must reject the empty title");
            assert!(matches!(err.as_ref(), UploadError::Validation(_)));
            assert_eq!(backend.folder_create_count(), 0);
            assert!(backend.put_ranges().is_empty());
        })
        .await;
}

#[tokio::test]
async fn cancellation_stops_issuing_chunks() {
    time::pause();
    let _rig = Rig::install();
    task::LocalSet::new()
        .run_until(async {
            let backend = MemoryBackend::new();
            let uploader = uploader(&backend);

            let job = uploader.submit(request(blob_of(12 * MIB))).unwrap();
            // Cancel from within the first progress callback: the chunk
            // in flight completes, later ones are never issued.
            let cancel_handle = Rc::clone(&job);
            job.set_on_progress(move |_| cancel_handle.cancel());

            let err = job.run().await.unwrap_err();

            assert!(matches!(err.as_ref(), UploadError::Cancelled));
            assert_eq!(backend.put_ranges().len(), 1);
            assert_eq!(job.phase(), UploadPhase::Error);
        })
        .await;
}

#[tokio::test]
async fn progress_is_monotone_within_one_run() {
    time::pause();
    let _rig = Rig::install();
    task::LocalSet::new()
        .run_until(async {
            let backend = MemoryBackend::new();
            let uploader = uploader(&backend);

            let job = uploader
                .submit(request(blob_of(12 * MIB + 123)))
                .unwrap();
            let progress = Rc::new(RefCell::new(Vec::new()));
            let log = Rc::clone(&progress);
            job.set_on_progress(move |p| log.borrow_mut().push(p));

            drop(job.run().await.unwrap());

            let seen = progress.borrow();
            assert!(!seen.is_empty());
            assert!(seen.windows(2).all(|w| w[0] <= w[1]));
            assert_eq!(*seen.last().unwrap(), 100);
            // 100 is reached exactly once, on the last chunk.
            assert_eq!(seen.iter().filter(|p| **p == 100).count(), 1);
        })
        .await;
}

#[tokio::test]
async fn processing_settles_before_saving() {
    time::pause();
    let _rig = Rig::install();
    task::LocalSet::new()
        .run_until(async {
            let backend = MemoryBackend::new();
            let uploader = uploader(&backend);

            let job = uploader.submit(request(blob_of(MIB))).unwrap();
            let started = time::Instant::now();
            drop(job.run().await.unwrap());

            // The configured settle delay of the processing phase.
            assert!(started.elapsed() >= Duration::from_secs(2));
            assert_eq!(backend.saved_recordings().len(), 1);
        })
        .await;
}
