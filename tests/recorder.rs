//! Recording session state machine.

#![cfg(not(target_arch = "wasm32"))]

use std::{rc::Rc, time::Duration};

use stagehand::{
    conf,
    media::{AcquireSource, MediaManager},
    platform::rig::Rig,
    recorder::{RecordingSession, SessionState},
};
use tokio::{task, time};

async fn settle() {
    time::sleep(Duration::from_millis(50)).await;
}

fn session() -> RecordingSession {
    let manager = Rc::new(MediaManager::new(conf::Acquire::default()));
    RecordingSession::new(conf::Recorder::default(), manager)
}

/// Sleeps to the given half-second offset, so the assertions never race
/// the whole-second ticks of the recorder and the elapsed counter.
async fn sleep_secs(half_offset: f64) {
    time::sleep(Duration::from_secs_f64(half_offset)).await;
}

#[tokio::test]
async fn five_segments_concatenate_in_capture_order() {
    time::pause();
    let _rig = Rig::install();
    task::LocalSet::new()
        .run_until(async {
            let session = session();
            settle().await;

            session.start(AcquireSource::Camera, None).await.unwrap();
            assert_eq!(session.state(), SessionState::Recording);

            sleep_secs(5.5).await;
            assert_eq!(session.segment_count(), 5);

            let blob = session.stop().await.unwrap();
            assert_eq!(session.state(), SessionState::Stopped);
            assert_eq!(
                blob.as_bytes(),
                [
                    0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0, 4, 0, 0,
                    0, 5,
                ],
            );
        })
        .await;
}

#[tokio::test]
async fn stop_releases_the_capture_stream() {
    time::pause();
    let rig = Rig::install();
    task::LocalSet::new()
        .run_until(async {
            let session = session();
            settle().await;

            session.start(AcquireSource::Camera, None).await.unwrap();
            assert_eq!(rig.live_tracks(), 2);

            sleep_secs(1.5).await;
            drop(session.stop().await.unwrap());

            assert_eq!(rig.live_tracks(), 0);
        })
        .await;
}

#[tokio::test]
async fn elapsed_and_segments_freeze_while_paused() {
    time::pause();
    let _rig = Rig::install();
    task::LocalSet::new()
        .run_until(async {
            let session = session();
            settle().await;

            session.start(AcquireSource::Camera, None).await.unwrap();
            sleep_secs(2.5).await;
            assert_eq!(session.elapsed_secs(), 2);
            assert_eq!(session.segment_count(), 2);

            session.pause().unwrap();
            assert_eq!(session.state(), SessionState::Paused);
            sleep_secs(3.0).await;
            assert_eq!(session.elapsed_secs(), 2);
            assert_eq!(session.segment_count(), 2);

            session.resume().unwrap();
            sleep_secs(2.0).await;
            assert_eq!(session.elapsed_secs(), 4);
            assert_eq!(session.segment_count(), 4);

            drop(session.stop().await.unwrap());
            let frozen = session.segment_count();
            sleep_secs(2.0).await;
            assert_eq!(session.segment_count(), frozen);
        })
        .await;
}

#[tokio::test]
async fn transitions_are_guarded() {
    time::pause();
    let _rig = Rig::install();
    task::LocalSet::new()
        .run_until(async {
            let session = session();
            settle().await;

            assert!(session.stop().await.is_err());
            assert!(session.pause().is_err());
            assert!(session.resume().is_err());

            session.start(AcquireSource::Camera, None).await.unwrap();
            assert!(session
                .start(AcquireSource::Camera, None)
                .await
                .is_err());
            assert!(session.reset().is_err());

            sleep_secs(1.5).await;
            drop(session.stop().await.unwrap());

            // A finished take requires an explicit reset before the
            // next start.
            assert!(session
                .start(AcquireSource::Camera, None)
                .await
                .is_err());
            session.reset().unwrap();
            assert_eq!(session.state(), SessionState::Idle);
            session.start(AcquireSource::Camera, None).await.unwrap();
            drop(session.stop().await);
        })
        .await;
}

#[tokio::test]
async fn reset_discards_the_take_and_rearms_the_session() {
    time::pause();
    let rig = Rig::install();
    task::LocalSet::new()
        .run_until(async {
            let session = session();
            settle().await;

            session.start(AcquireSource::Camera, None).await.unwrap();
            sleep_secs(3.5).await;
            drop(session.stop().await.unwrap());
            assert!(session.result_blob().is_some());

            session.reset().unwrap();
            assert_eq!(session.state(), SessionState::Idle);
            assert_eq!(session.segment_count(), 0);
            assert_eq!(session.elapsed_secs(), 0);
            assert!(session.result_blob().is_none());
            assert_eq!(rig.live_tracks(), 0);

            session.start(AcquireSource::Camera, None).await.unwrap();
            sleep_secs(2.5).await;
            let blob = session.stop().await.unwrap();
            // The fresh run starts counting segments anew.
            assert_eq!(blob.as_bytes(), [0, 0, 0, 1, 0, 0, 0, 2]);
        })
        .await;
}

#[tokio::test]
async fn recorder_failure_keeps_the_partial_recording() {
    time::pause();
    let rig = Rig::install();
    task::LocalSet::new()
        .run_until(async {
            let session = session();
            settle().await;
            rig.fail_recorder_after(3);

            session.start(AcquireSource::Camera, None).await.unwrap();
            sleep_secs(5.5).await;

            assert_eq!(session.state(), SessionState::Stopped);
            assert_eq!(session.segment_count(), 3);
            let blob = session.result_blob().expect("partial recording");
            assert_eq!(
                blob.as_bytes(),
                [0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 3],
            );
            assert_eq!(rig.live_tracks(), 0);
        })
        .await;
}

#[tokio::test]
async fn acquisition_failure_returns_the_session_to_idle() {
    time::pause();
    let rig = Rig::install();
    task::LocalSet::new()
        .run_until(async {
            let session = session();
            settle().await;
            rig.set_responder(|_| {
                Some(stagehand::platform::rig::SimFailure::NotAllowed)
            });

            assert!(session
                .start(AcquireSource::Camera, None)
                .await
                .is_err());
            assert_eq!(session.state(), SessionState::Idle);
            assert_eq!(session.elapsed_secs(), 0);
        })
        .await;
}
