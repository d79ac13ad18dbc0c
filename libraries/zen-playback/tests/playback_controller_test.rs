//! Integration tests for the playback controller
//!
//! Each test drives a controller over headless backends with tokio's clock
//! paused, so retry delays and fades run instantly and deterministically.

use std::rc::Rc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::sleep;
use zen_playback::headless::{HeadlessGraph, HeadlessMedia};
use zen_playback::{
    AudioGraph, Backends, Clock, ErrorKind, JsonFileStore, KeyCommand, MediaElement, MediaEvent,
    MemoryStore, PlaybackController, PlaybackError, PlaybackEvent, PlaybackState, PlayerConfig,
    Severity, TokioClock, AUDIO_UNAVAILABLE_TOAST, PLAYBACK_FAILED_TOAST, STORAGE_KEY,
};

mod test_helpers;
use test_helpers::{approx, Harness};

// ===== Navigation =====

#[tokio::test(start_paused = true)]
async fn next_track_cycles_through_the_playlist() {
    let h = Harness::new();
    assert_eq!(h.controller.current_index(), 0);

    let mut visited = Vec::new();
    for _ in 0..3 {
        h.controller.next_track().await.unwrap();
        visited.push(h.controller.current_index());
    }

    assert_eq!(visited, vec![1, 2, 0]);
    assert_eq!(
        h.media.source().as_deref(),
        Some("assets/audio/zen-garden.mp3")
    );
}

#[tokio::test(start_paused = true)]
async fn previous_track_wraps_to_the_last() {
    let h = Harness::new();

    h.controller.previous_track().await.unwrap();

    assert_eq!(h.controller.current_index(), 2);
    assert_eq!(
        h.controller.current_track().map(|t| t.title.as_str()),
        Some("Temple Chants")
    );
}

#[tokio::test(start_paused = true)]
async fn track_change_reports_title_and_resets_position() {
    let h = Harness::new();
    h.media.advance_to(42.0);
    h.events.drain();

    h.controller.next_track().await.unwrap();

    let events = h.events.drain();
    assert!(events.contains(&PlaybackEvent::TrackChanged {
        index: 1,
        title: "Bamboo Flute".to_string(),
    }));
    assert!(events.contains(&PlaybackEvent::PositionChanged {
        current_secs: 0.0,
        duration_secs: None,
    }));
    // Never played: stays idle
    assert_eq!(h.controller.state(), PlaybackState::Idle);
}

#[tokio::test(start_paused = true)]
async fn track_end_while_paused_advances_without_playing() {
    let h = Harness::new();
    h.controller.play(false).await.unwrap();
    h.controller.pause();
    let plays = h.media.play_calls();
    let loads = h.media.load_calls();

    h.controller
        .handle_media_event(MediaEvent::Ended)
        .await
        .unwrap();

    assert_eq!(h.controller.current_index(), 1);
    assert_eq!(h.media.load_calls(), loads + 1);
    assert_eq!(h.media.play_calls(), plays);
    assert_eq!(h.controller.state(), PlaybackState::Paused);
    assert!(h.media.is_paused());
}

#[tokio::test(start_paused = true)]
async fn last_track_ending_wraps_to_the_first_and_keeps_playing() {
    let h = Harness::new();
    h.controller.previous_track().await.unwrap();
    h.controller.play(true).await.unwrap();

    h.controller
        .handle_media_event(MediaEvent::Ended)
        .await
        .unwrap();

    assert_eq!(h.controller.current_index(), 0);
    assert_eq!(h.controller.state(), PlaybackState::Playing);
    assert!(!h.media.is_paused());
    assert!(approx(h.graph.gain(), 0.5));
}

#[tokio::test(start_paused = true)]
async fn empty_playlist_makes_everything_a_no_op() {
    let config = PlayerConfig {
        playlist: Vec::new(),
        ..PlayerConfig::default()
    };
    let h = Harness::with_config(config);

    h.controller.play(true).await.unwrap();
    h.controller.next_track().await.unwrap();
    h.controller.previous_track().await.unwrap();
    h.controller.pause();

    assert_eq!(h.controller.state(), PlaybackState::Idle);
    assert_eq!(h.controller.current_index(), 0);
    assert!(h.controller.current_track().is_none());
    assert!(!h.controller.seek(10.0));
    assert_eq!(h.media.load_calls(), 0);
    assert_eq!(h.media.play_calls(), 0);
}

// ===== Volume =====

#[tokio::test(start_paused = true)]
async fn volume_changes_apply_immediately_when_not_fading() {
    let h = Harness::new();

    assert!(h.controller.set_volume(0.0));
    assert!(h.controller.set_volume(0.2));

    assert_eq!(h.controller.volume(), 0.2);
    assert!(approx(h.graph.gain(), 0.2));
}

#[tokio::test(start_paused = true)]
async fn out_of_range_volume_is_ignored() {
    let h = Harness::new();
    h.controller.set_volume(0.4);
    h.events.drain();

    assert!(!h.controller.set_volume(1.5));
    assert!(!h.controller.set_volume(-0.1));
    assert!(!h.controller.set_volume(f32::NAN));

    assert_eq!(h.controller.volume(), 0.4);
    assert!(approx(h.graph.gain(), 0.4));
    assert!(h.events.is_empty());
}

#[tokio::test(start_paused = true)]
async fn mute_remembers_and_restores_the_audible_gain() {
    let h = Harness::new();
    h.controller.set_volume(0.8);
    h.events.drain();

    h.controller.toggle_mute();
    assert!(h.controller.is_muted());
    assert!(approx(h.graph.gain(), 0.0));
    assert_eq!(h.controller.volume(), 0.8);

    h.controller.toggle_mute();
    assert!(!h.controller.is_muted());
    assert!(approx(h.graph.gain(), 0.8));

    assert_eq!(
        h.events.drain(),
        vec![
            PlaybackEvent::VolumeChanged {
                level: 0.8,
                is_muted: true
            },
            PlaybackEvent::VolumeChanged {
                level: 0.8,
                is_muted: false
            },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn volume_set_while_muted_stays_silent_until_unmute() {
    let h = Harness::new();
    h.controller.toggle_mute();

    h.controller.set_volume(0.3);
    assert!(approx(h.graph.gain(), 0.0));

    h.controller.toggle_mute();
    assert!(approx(h.graph.gain(), 0.3));
}

// ===== Preferences =====

#[tokio::test(start_paused = true)]
async fn out_of_range_stored_volume_keeps_default_but_restores_index() {
    let store = MemoryStore::with_entry(STORAGE_KEY, r#"{"volume": 2, "trackIndex": 1}"#);
    let h = Harness::with_store(store);

    assert_eq!(h.controller.volume(), 0.5);
    assert_eq!(h.controller.current_index(), 1);
    assert_eq!(
        h.media.source().as_deref(),
        Some("assets/audio/bamboo-flute.mp3")
    );
    assert!(approx(h.graph.gain(), 0.5));
}

#[tokio::test(start_paused = true)]
async fn corrupt_preferences_fall_back_to_defaults() {
    let h = Harness::with_store(MemoryStore::with_entry(STORAGE_KEY, "{{{"));

    assert_eq!(h.controller.volume(), 0.5);
    assert_eq!(h.controller.current_index(), 0);
}

#[tokio::test(start_paused = true)]
async fn volume_and_track_changes_are_persisted() {
    let h = Harness::new();

    h.controller.set_volume(0.35);
    let stored = h.stored_preferences().unwrap();
    assert!((stored["volume"].as_f64().unwrap() - 0.35).abs() < 1e-6);
    assert_eq!(stored["trackIndex"], 0);

    h.controller.next_track().await.unwrap();
    let stored = h.stored_preferences().unwrap();
    assert_eq!(stored["trackIndex"], 1);
}

#[tokio::test(start_paused = true)]
async fn store_write_failures_do_not_disturb_playback() {
    let h = Harness::new();
    h.store.fail_writes(true);

    assert!(h.controller.set_volume(0.6));
    h.controller.next_track().await.unwrap();

    assert_eq!(h.controller.volume(), 0.6);
    assert_eq!(h.controller.current_index(), 1);
    assert!(h.stored_preferences().is_none());
    assert!(h.notifier.toasts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn preferences_survive_a_restart_through_a_json_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("zen-player.json");

    let start = |path: &std::path::Path| {
        let clock: Rc<dyn Clock> = Rc::new(TokioClock::new());
        let backends = Backends::new(
            Rc::new(HeadlessMedia::new(clock.clone())),
            Rc::new(HeadlessGraph::new(clock.clone())),
            Rc::new(JsonFileStore::new(path)),
            clock,
        );
        let controller = PlaybackController::new(PlayerConfig::default(), backends).unwrap();
        controller.initialize();
        controller
    };

    let first = start(&path);
    first.set_volume(0.3);
    first.next_track().await.unwrap();
    first.next_track().await.unwrap();
    drop(first);

    let second = start(&path);
    assert!(approx(second.volume(), 0.3));
    assert_eq!(second.current_index(), 2);
}

// ===== Play, retry and errors =====

#[tokio::test(start_paused = true)]
async fn play_succeeds_on_third_attempt_after_backoff() {
    let h = Harness::new();
    h.media.fail_next_plays(2, "NotAllowedError");

    h.controller.play(false).await.unwrap();

    assert_eq!(h.clock.now(), Duration::from_millis(1500));
    assert_eq!(h.media.play_calls(), 3);
    assert_eq!(h.controller.state(), PlaybackState::Playing);
    assert!(h.controller.error().is_none());
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_surface_playback_failed_once() {
    let h = Harness::new();
    h.media.fail_next_plays(3, "NetworkError");
    h.events.drain();

    let err = h.controller.play(true).await.unwrap_err();

    assert!(matches!(err, PlaybackError::PlaybackFailed { attempts: 3, .. }));
    assert_eq!(h.controller.state(), PlaybackState::Errored);
    assert_eq!(h.controller.error(), Some(ErrorKind::PlaybackFailed));
    assert!(h.media.is_paused());
    assert_eq!(
        h.notifier.toasts(),
        vec![(PLAYBACK_FAILED_TOAST.to_string(), Severity::Error)]
    );

    let errors: Vec<_> = h
        .events
        .drain()
        .into_iter()
        .filter(|e| matches!(e, PlaybackEvent::Error { .. }))
        .collect();
    assert_eq!(errors.len(), 1);

    let snapshot = h.controller.snapshot();
    assert_eq!(snapshot.error_message.as_deref(), Some("Playback Failed"));
    assert!(!snapshot.is_playing);
}

#[tokio::test(start_paused = true)]
async fn transport_recovers_after_an_error() {
    let h = Harness::new();
    h.media.fail_next_plays(3, "NetworkError");
    let _ = h.controller.play(false).await;
    h.events.drain();

    h.controller.play(false).await.unwrap();

    assert_eq!(h.controller.state(), PlaybackState::Playing);
    assert!(h.controller.error().is_none());
    assert!(h.events.drain().contains(&PlaybackEvent::ErrorCleared));
}

#[tokio::test(start_paused = true)]
async fn unsolicited_media_error_while_playing_is_audio_unavailable() {
    let h = Harness::new();
    h.controller.play(false).await.unwrap();
    h.events.drain();

    h.controller
        .handle_media_event(MediaEvent::Error {
            message: "404 Not Found".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(h.controller.state(), PlaybackState::Errored);
    assert_eq!(h.controller.error(), Some(ErrorKind::AudioUnavailable));
    assert_eq!(
        h.notifier.toasts(),
        vec![(AUDIO_UNAVAILABLE_TOAST.to_string(), Severity::Error)]
    );

    let reported = h.events.drain().into_iter().find_map(|e| match e {
        PlaybackEvent::Error { kind, message } => Some((kind, message)),
        _ => None,
    });
    let (kind, message) = reported.unwrap();
    assert_eq!(kind, ErrorKind::AudioUnavailable);
    assert_eq!(message, "Audio unavailable: 404 Not Found");
}

#[tokio::test(start_paused = true)]
async fn media_error_while_paused_is_not_surfaced() {
    let h = Harness::new();
    h.controller.play(false).await.unwrap();
    h.controller.pause();

    h.controller
        .handle_media_event(MediaEvent::Error {
            message: "decode".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(h.controller.state(), PlaybackState::Paused);
    assert!(h.controller.error().is_none());
    assert!(h.notifier.toasts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn switching_tracks_clears_a_visible_error() {
    let h = Harness::new();
    h.media.fail_next_plays(3, "NetworkError");
    let _ = h.controller.play(false).await;

    h.controller.next_track().await.unwrap();

    assert!(h.controller.error().is_none());
    assert_eq!(h.controller.state(), PlaybackState::Paused);
}

#[tokio::test(start_paused = true)]
async fn suspended_graph_is_resumed_before_play() {
    let h = Harness::suspended();

    h.controller.play(false).await.unwrap();

    assert_eq!(h.graph.resume_calls(), 1);
    assert!(!h.graph.is_suspended());
    assert_eq!(h.controller.state(), PlaybackState::Playing);
}

#[tokio::test(start_paused = true)]
async fn failed_resume_does_not_block_play() {
    let h = Harness::suspended();
    h.graph.fail_resume("user gesture required");

    h.controller.play(false).await.unwrap();

    assert_eq!(h.graph.resume_calls(), 1);
    assert_eq!(h.controller.state(), PlaybackState::Playing);
}

#[tokio::test(start_paused = true)]
async fn toggle_during_pending_retry_pauses_instead_of_replaying() {
    let h = Harness::new();
    h.media.fail_next_plays(1, "NotAllowedError");

    let (first, second) = tokio::join!(h.controller.play(false), async {
        sleep(Duration::from_millis(100)).await;
        assert_eq!(h.controller.state(), PlaybackState::Loading);
        h.controller.toggle_play_pause().await
    });

    first.unwrap();
    second.unwrap();
    assert_eq!(h.controller.state(), PlaybackState::Paused);
    assert_eq!(h.media.play_calls(), 1);
    assert!(h.media.is_paused());
    assert!(h.controller.error().is_none());
}

// ===== Seeking and commands =====

#[tokio::test(start_paused = true)]
async fn non_finite_seeks_are_dropped() {
    let h = Harness::new();

    assert!(!h.controller.seek(f64::NAN));
    assert!(!h.controller.seek(f64::NEG_INFINITY));
    assert!(h.controller.seek(30.0));

    assert_eq!(h.media.seeks(), vec![30.0]);
    assert_eq!(h.controller.position().current_secs, 30.0);
}

#[tokio::test(start_paused = true)]
async fn metadata_and_time_updates_reach_listeners() {
    let h = Harness::new();
    h.events.drain();
    h.media.set_duration(Some(180.0));
    h.media.advance_to(12.0);

    h.controller
        .handle_media_event(MediaEvent::LoadedMetadata {
            duration_secs: 180.0,
        })
        .await
        .unwrap();

    assert_eq!(
        h.events.drain(),
        vec![PlaybackEvent::PositionChanged {
            current_secs: 12.0,
            duration_secs: Some(180.0),
        }]
    );
    let snapshot = h.controller.snapshot();
    assert_eq!(snapshot.total_duration_secs, Some(180.0));
    assert!((snapshot.progress_percent - 12.0 / 180.0 * 100.0).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn keyboard_commands_drive_transport() {
    let h = Harness::new();

    let space = KeyCommand::from_key("Space", " ", false).unwrap();
    assert_eq!(h.controller.handle_command(space).await.unwrap(), None);
    assert!(h.controller.state().is_playing());

    h.controller.handle_command(space).await.unwrap();
    assert_eq!(h.controller.state(), PlaybackState::Paused);

    let right = KeyCommand::from_key("ArrowRight", "ArrowRight", false).unwrap();
    h.controller.handle_command(right).await.unwrap();
    assert_eq!(h.controller.current_index(), 1);

    // Typing in a text field never reaches the controller
    assert_eq!(KeyCommand::from_key("Space", " ", true), None);
}
