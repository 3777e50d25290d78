//! Player actor tests.
//!
//! Run on a paused tokio clock: timers fire as soon as the runtime is idle,
//! so polling cadence is exercised without real waiting.

mod common;

use common::*;
use core_playback::{
    BackendKind, PlaybackError, PlaybackState, Player, PlayerConfig,
};
use core_runtime::events::{EventStream, PlayerErrorKind, PlayerEvent};
use core_async::sync::CancellationToken;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

async fn next_event(stream: &mut EventStream) -> PlayerEvent {
    timeout(Duration::from_secs(30), stream.recv())
        .await
        .expect("timed out waiting for player event")
        .expect("event stream closed")
}

fn lifecycle(player: &Player) -> EventStream {
    player
        .subscribe()
        .filter(|event| !matches!(event, PlayerEvent::Progress(_)))
}

fn spawn(hub: &Arc<MockHub>) -> Player {
    Player::spawn(registry(hub), PlayerConfig::default()).unwrap()
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_player_reports_normalized_lifecycle() {
    let hub = MockHub::new();
    hub.set_duration(Some(180.0));
    let player = spawn(&hub);
    let mut events = lifecycle(&player);

    player
        .set_state(
            PlaybackState::default()
                .with_resource(FILE_URL)
                .with_playing(true),
        )
        .await
        .unwrap();

    assert_eq!(next_event(&mut events).await, PlayerEvent::Ready);
    assert_eq!(
        next_event(&mut events).await,
        PlayerEvent::Duration { seconds: 180.0 }
    );
    assert_eq!(next_event(&mut events).await, PlayerEvent::Start);
    assert_eq!(next_event(&mut events).await, PlayerEvent::Play);

    player
        .set_state(PlaybackState::default().with_resource(FILE_URL))
        .await
        .unwrap();
    assert_eq!(next_event(&mut events).await, PlayerEvent::Pause);

    player.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_player_emits_progress_on_interval() {
    let hub = MockHub::new();
    hub.set_duration(Some(100.0));
    hub.set_fractions(Some(0.5), Some(0.25));
    let player = spawn(&hub);
    let mut progress = player
        .subscribe()
        .filter(|event| matches!(event, PlayerEvent::Progress(_)));

    player
        .set_state(
            PlaybackState::default()
                .with_resource(FILE_URL)
                .with_playing(true)
                .with_progress_interval(Duration::from_millis(500)),
        )
        .await
        .unwrap();

    match next_event(&mut progress).await {
        PlayerEvent::Progress(update) => {
            assert_eq!(update.loaded_seconds, Some(50.0));
            assert_eq!(update.played_seconds, Some(25.0));
        }
        other => panic!("expected progress, got {:?}", other),
    }

    hub.set_fractions(Some(0.5), Some(0.3));
    match next_event(&mut progress).await {
        PlayerEvent::Progress(update) => {
            assert_eq!(update.loaded, None);
            assert_eq!(update.played, Some(0.3));
        }
        other => panic!("expected progress, got {:?}", other),
    }

    player.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_player_unsupported_resource_error() {
    let hub = MockHub::new();
    let player = Player::spawn(strict_registry(&hub), PlayerConfig::default()).unwrap();
    let mut events = lifecycle(&player);

    assert!(!player.can_play("gopher://example.com/"));
    player
        .set_state(PlaybackState::default().with_resource("gopher://example.com/"))
        .await
        .unwrap();

    match next_event(&mut events).await {
        PlayerEvent::Error { kind, .. } => assert_eq!(kind, PlayerErrorKind::UnsupportedResource),
        other => panic!("expected error, got {:?}", other),
    }
    assert_eq!(hub.created(), 0);

    player.shutdown().await;
}

// ============================================================================
// Commands & queries
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_player_seek_before_ready() {
    let hub = MockHub::new();
    hub.set_auto_ready(false);
    hub.set_duration(Some(300.0));
    let player = spawn(&hub);
    let mut events = lifecycle(&player);

    player
        .set_state(PlaybackState::default().with_resource(FILE_URL))
        .await
        .unwrap();
    assert_eq!(player.seek_to(0.5).await, Some(150.0));
    assert!(player.status().await.unwrap().has_pending_seek);

    hub.events_of(&BackendKind::File).unwrap().ready();
    assert_eq!(next_event(&mut events).await, PlayerEvent::Ready);

    player
        .set_state(
            PlaybackState::default()
                .with_resource(FILE_URL)
                .with_playing(true),
        )
        .await
        .unwrap();

    loop {
        if next_event(&mut events).await == PlayerEvent::Play {
            break;
        }
    }
    assert_eq!(hub.count(|c| *c == Call::SeekTo(150.0)), 1);
    assert!(!player.status().await.unwrap().has_pending_seek);

    player.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_player_queries() {
    let hub = MockHub::new();
    let player = spawn(&hub);

    assert_eq!(player.duration().await, None);
    assert_eq!(player.current_time().await, None);
    assert_eq!(player.seek_to(10.0).await, None);

    player
        .set_state(PlaybackState::default().with_resource(FILE_URL))
        .await
        .unwrap();
    hub.set_duration(Some(40.0));
    hub.set_fractions(Some(1.0), Some(0.75));

    assert_eq!(player.duration().await, Some(40.0));
    assert_eq!(player.current_time().await, Some(30.0));

    let instance = player
        .with_internal_handle(|handle| {
            handle
                .and_then(|any| any.downcast_ref::<InternalPlayer>())
                .map(|internal| internal.instance)
        })
        .await
        .flatten();
    assert!(instance.is_some());

    player.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_player_rejects_invalid_state() {
    let hub = MockHub::new();
    let player = spawn(&hub);

    let result = player
        .set_state(PlaybackState::default().with_playback_rate(-1.0))
        .await;
    assert_eq!(result, Err(PlaybackError::InvalidPlaybackRate(-1.0)));

    let status = player.status().await.unwrap();
    assert_eq!(status.state, PlaybackState::default());

    player.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_player_can_play_without_instantiating() {
    let hub = MockHub::new();
    let player = Player::spawn(strict_registry(&hub), PlayerConfig::default()).unwrap();

    assert!(player.can_play(YOUTUBE_URL));
    assert!(player.can_play(FILE_URL));
    assert!(!player.can_play("https://example.com/index.html"));
    assert_eq!(hub.created(), 0);

    player.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_player_update_config_and_status() {
    let hub = MockHub::new();
    let player = spawn(&hub);

    player
        .update_config(PlayerConfig::default().with_preload(BackendKind::YouTube))
        .await
        .unwrap();
    player
        .set_state(PlaybackState::default().with_resource(VIMEO_URL))
        .await
        .unwrap();

    let status = player.status().await.unwrap();
    assert_eq!(status.active_kind, Some(BackendKind::Vimeo));
    assert_eq!(status.warm_kinds, vec![BackendKind::YouTube]);
    assert!(status.ready);

    let invalid = PlayerConfig::default().with_duration_probe_interval(Duration::ZERO);
    assert!(matches!(
        player.update_config(invalid).await,
        Err(PlaybackError::InvalidConfig(_))
    ));

    player.shutdown().await;
}

// ============================================================================
// Shutdown
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_player_shutdown_tears_down_instances() {
    let hub = MockHub::new();
    let player = Player::spawn(
        registry(&hub),
        PlayerConfig::default().with_preload(BackendKind::Vimeo),
    )
    .unwrap();

    player
        .set_state(
            PlaybackState::default()
                .with_resource(YOUTUBE_URL)
                .with_playing(true),
        )
        .await
        .unwrap();

    player.shutdown().await;

    assert!(!player.is_running());
    assert_eq!(hub.count(|c| *c == Call::Stop), 2);
    assert_eq!(
        player.set_state(PlaybackState::default()).await,
        Err(PlaybackError::PlayerShutDown)
    );
    assert_eq!(player.duration().await, None);

    // Idempotent.
    player.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_player_stops_when_last_handle_dropped() {
    let hub = MockHub::new();
    let player = spawn(&hub);
    let clone = player.clone();
    let mut events = player.subscribe();

    player
        .set_state(PlaybackState::default().with_resource(FILE_URL))
        .await
        .unwrap();
    drop(player);
    assert!(clone.is_running());
    drop(clone);

    // The bus closes once the task has finished tearing down.
    loop {
        match timeout(Duration::from_secs(30), events.recv()).await {
            Ok(Ok(_)) => continue,
            Ok(Err(_)) => break,
            Err(_) => panic!("player task did not stop"),
        }
    }
    assert_eq!(hub.count(|c| *c == Call::Stop), 1);
}

#[tokio::test(start_paused = true)]
async fn test_player_stops_on_cancellation() {
    let hub = MockHub::new();
    let token = CancellationToken::new();
    let player = Player::spawn_with_cancellation(
        registry(&hub),
        PlayerConfig::default(),
        token.child_token(),
    )
    .unwrap();

    player
        .set_state(PlaybackState::default().with_resource(VIMEO_URL))
        .await
        .unwrap();

    token.cancel();
    timeout(Duration::from_secs(30), player.shutdown())
        .await
        .unwrap();

    assert!(!player.is_running());
    assert_eq!(hub.count(|c| *c == Call::Stop), 1);
}
