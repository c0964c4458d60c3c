//! Acquisition ladder, permission tracking and stream ownership.

#![cfg(not(target_arch = "wasm32"))]

use std::{cell::Cell, rc::Rc, time::Duration};

use stagehand::{
    conf,
    media::{AcquireError, AcquireSource, FallbackMode, MediaManager},
    platform::rig::{RequestSource, Rig, SimFailure},
    platform::EnvCapabilities,
};
use tokio::{task, time};

/// Lets the spawned tasks (permission query, watchers) settle.
async fn settle() {
    time::sleep(Duration::from_millis(50)).await;
}

fn manager() -> Rc<MediaManager> {
    Rc::new(MediaManager::new(conf::Acquire::default()))
}

#[tokio::test]
async fn every_tier_is_attempted_before_an_error_is_surfaced() {
    time::pause();
    let rig = Rig::install();
    task::LocalSet::new()
        .run_until(async {
            let manager = manager();
            settle().await;
            rig.set_responder(|_| Some(SimFailure::Overconstrained));

            let err = manager
                .acquire(AcquireSource::Camera, Some(String::from("cam-1")))
                .await
                .unwrap_err();

            assert!(matches!(
                err.as_ref(),
                AcquireError::ConstraintUnsatisfiable(_)
            ));
            // 6 camera tiers plus the audio-only request of the
            // synthesized tier.
            assert_eq!(rig.requests().len(), 7);
        })
        .await;
}

#[tokio::test]
async fn permission_denial_is_surfaced_and_not_permanent_until_reported() {
    time::pause();
    let rig = Rig::install();
    task::LocalSet::new()
        .run_until(async {
            let manager = manager();
            settle().await;
            rig.set_responder(|_| Some(SimFailure::NotAllowed));

            let err = manager
                .acquire(AcquireSource::Camera, None)
                .await
                .unwrap_err();

            assert!(matches!(
                err.as_ref(),
                AcquireError::PermissionDenied(_)
            ));
            assert!(!manager.permission().is_permanently_denied());

            rig.set_permission(stagehand::PermissionState::Denied);
            settle().await;
            assert!(manager.permission().is_permanently_denied());
        })
        .await;
}

#[tokio::test]
async fn at_most_one_live_stream_per_manager() {
    time::pause();
    let rig = Rig::install();
    task::LocalSet::new()
        .run_until(async {
            let manager = manager();
            settle().await;

            let first = manager
                .acquire(AcquireSource::Camera, None)
                .await
                .unwrap();
            let live_after_first = rig.live_tracks();

            let second = manager
                .acquire(AcquireSource::Camera, None)
                .await
                .unwrap();

            assert_eq!(live_after_first, 2);
            assert!(first.is_stopped());
            assert!(!second.is_stopped());
            // The second request must observe zero live tracks: the
            // first stream is released before the platform is asked
            // again.
            let second_request = rig
                .requests()
                .into_iter()
                .nth(1)
                .expect("two acquisition requests");
            assert_eq!(second_request.live_tracks_before, 0);
            assert_eq!(rig.live_tracks(), 2);
        })
        .await;
}

#[tokio::test]
async fn falls_back_to_synthesized_video_when_no_camera_works() {
    time::pause();
    let rig = Rig::install();
    task::LocalSet::new()
        .run_until(async {
            let manager = manager();
            settle().await;
            rig.set_responder(|req| {
                if req.video {
                    Some(SimFailure::NotFound)
                } else {
                    None
                }
            });

            let stream = manager
                .acquire(AcquireSource::Camera, None)
                .await
                .unwrap();

            assert!(stream
                .fallback()
                .contains(FallbackMode::SYNTHESIZED_VIDEO));
            assert_eq!(stream.tracks().len(), 2);
            assert_eq!(
                stream.video_device_id().as_deref(),
                Some("synthetic"),
            );
        })
        .await;
}

#[tokio::test]
async fn hanging_platform_times_out_every_tier() {
    time::pause();
    let rig = Rig::install();
    task::LocalSet::new()
        .run_until(async {
            let manager = manager();
            settle().await;
            rig.hang_acquisition(true);

            let started = time::Instant::now();
            let err = manager
                .acquire(AcquireSource::Camera, None)
                .await
                .unwrap_err();

            assert!(matches!(err.as_ref(), AcquireError::Timeout));
            // 6 tiers, 10 seconds each.
            assert!(started.elapsed() >= Duration::from_secs(60));
            assert_eq!(rig.requests().len(), 6);
        })
        .await;
}

#[tokio::test]
async fn regrant_triggers_automatic_reacquisition() {
    time::pause();
    let rig = Rig::install();
    task::LocalSet::new()
        .run_until(async {
            let manager = manager();
            settle().await;
            rig.set_responder(|_| Some(SimFailure::NotAllowed));

            let recovered = Rc::new(Cell::new(false));
            let flag = Rc::clone(&recovered);
            manager.on_stream(move |_| flag.set(true));

            assert!(manager
                .acquire(AcquireSource::Camera, None)
                .await
                .is_err());
            assert!(manager.current_stream().is_none());

            rig.clear_responder();
            rig.set_permission(stagehand::PermissionState::Granted);
            settle().await;

            assert!(recovered.get());
            assert!(manager.current_stream().is_some());
        })
        .await;
}

#[tokio::test]
async fn screen_capture_is_a_separate_explicit_source() {
    time::pause();
    let rig = Rig::install();
    task::LocalSet::new()
        .run_until(async {
            let manager = manager();
            settle().await;

            let stream = manager
                .acquire(AcquireSource::Screen, None)
                .await
                .unwrap();

            assert!(stream.fallback().contains(FallbackMode::SCREEN));
            assert!(rig
                .requests()
                .iter()
                .all(|r| r.source == RequestSource::Screen));
        })
        .await;
}

#[tokio::test]
async fn device_enumeration_fails_soft() {
    time::pause();
    let rig = Rig::install();
    task::LocalSet::new()
        .run_until(async {
            let manager = manager();
            settle().await;
            rig.fail_enumeration(true);

            assert!(manager.enumerate_devices().await.is_empty());

            rig.fail_enumeration(false);
            let devices = manager.enumerate_devices().await;
            assert_eq!(devices.len(), 1);
            assert_eq!(devices[0].device_id(), "cam-1");
        })
        .await;
}

#[tokio::test]
async fn insecure_context_blocks_before_any_platform_request() {
    time::pause();
    let rig = Rig::install();
    task::LocalSet::new()
        .run_until(async {
            let manager = manager();
            settle().await;
            rig.set_capabilities(EnvCapabilities {
                media_devices: true,
                recorder: true,
                device_enumeration: true,
                display_media: true,
                secure_context: false,
                user_agent: String::from("test"),
            });

            let err = manager
                .acquire(AcquireSource::Camera, None)
                .await
                .unwrap_err();

            assert!(matches!(
                err.as_ref(),
                AcquireError::InsecureContext
            ));
            assert!(rig.requests().is_empty());
        })
        .await;
}

#[tokio::test]
async fn switch_camera_pins_the_requested_device() {
    time::pause();
    let rig = Rig::install();
    task::LocalSet::new()
        .run_until(async {
            let manager = manager();
            settle().await;
            rig.add_camera("cam-2", "External USB Webcam");

            let first = manager
                .acquire(AcquireSource::Camera, None)
                .await
                .unwrap();
            assert_eq!(first.video_device_id().as_deref(), Some("cam-1"));

            let switched = manager
                .switch_camera(String::from("cam-2"))
                .await
                .unwrap();
            assert_eq!(
                switched.video_device_id().as_deref(),
                Some("cam-2"),
            );
            assert!(first.is_stopped());
        })
        .await;
}
