//! # Player Usage Example
//!
//! Drives a player against a simulated file backend that takes a moment to
//! become ready and advances its position in real time.
//!
//! Run with: `cargo run --example player_demo --package core-playback`

use anyhow::Result;
use core_playback::{
    BackendEvents, BackendFactory, BackendKind, BackendRegistry, MediaBackend, PlaybackState,
    Player, PlayerConfig,
};
use core_runtime::events::PlayerEvent;
use core_runtime::logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

const TRACK_SECONDS: f64 = 8.0;

// ============================================================================
// Simulated backend
// ============================================================================

#[derive(Default)]
struct Clock {
    /// Position accumulated before the current playing stretch
    offset: f64,
    started: Option<Instant>,
    rate: f64,
}

impl Clock {
    fn position(&self) -> f64 {
        let running = self
            .started
            .map_or(0.0, |started| started.elapsed().as_secs_f64() * self.rate);
        (self.offset + running).min(TRACK_SECONDS)
    }
}

struct SimulatedBackend {
    events: BackendEvents,
    clock: Arc<Mutex<Clock>>,
    loaded: bool,
}

impl MediaBackend for SimulatedBackend {
    fn load(&mut self, resource: &str) {
        println!("  [backend] loading {}", resource);
        *self.clock.lock() = Clock {
            rate: 1.0,
            ..Clock::default()
        };

        let events = self.events.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            events.ready();
        });
        self.loaded = true;
    }

    fn play(&mut self) {
        let mut clock = self.clock.lock();
        if clock.started.is_none() {
            clock.started = Some(Instant::now());
            self.events.playback_started();

            let events = self.events.clone();
            let remaining = (TRACK_SECONDS - clock.position()) / clock.rate.max(0.1);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs_f64(remaining)).await;
                events.ended();
            });
        }
    }

    fn pause(&mut self) {
        let mut clock = self.clock.lock();
        if clock.started.is_some() {
            clock.offset = clock.position();
            clock.started = None;
            self.events.paused();
        }
    }

    fn stop(&mut self) {
        println!("  [backend] stopped");
        *self.clock.lock() = Clock::default();
    }

    fn seek_to(&mut self, seconds: f64) {
        println!("  [backend] seek to {:.1}s", seconds);
        let mut clock = self.clock.lock();
        clock.offset = seconds.clamp(0.0, TRACK_SECONDS);
        if clock.started.is_some() {
            clock.started = Some(Instant::now());
        }
    }

    fn set_volume(&mut self, volume: f64) {
        println!("  [backend] volume {:.2}", volume);
    }

    fn set_playback_rate(&mut self, rate: f64) {
        println!("  [backend] rate {:.2}", rate);
        let mut clock = self.clock.lock();
        clock.offset = clock.position();
        if clock.started.is_some() {
            clock.started = Some(Instant::now());
        }
        clock.rate = rate;
    }

    fn duration(&self) -> Option<f64> {
        self.loaded.then_some(TRACK_SECONDS)
    }

    fn fraction_played(&self) -> Option<f64> {
        self.loaded
            .then(|| self.clock.lock().position() / TRACK_SECONDS)
    }

    fn fraction_loaded(&self) -> Option<f64> {
        self.loaded.then_some(1.0)
    }
}

struct SimulatedFileFactory;

impl BackendFactory for SimulatedFileFactory {
    fn kind(&self) -> BackendKind {
        BackendKind::File
    }

    fn create(&self, events: BackendEvents) -> Box<dyn MediaBackend> {
        Box::new(SimulatedBackend {
            events,
            clock: Arc::new(Mutex::new(Clock::default())),
            loaded: false,
        })
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    init_logging(
        LoggingConfig::default()
            .with_format(LogFormat::Compact)
            .with_level(LogLevel::Info),
    )?;

    let registry = BackendRegistry::new().with_fallback(Arc::new(SimulatedFileFactory));
    let player = Player::spawn(registry, PlayerConfig::default())?;
    let mut events = player.subscribe();

    let url = "https://example.com/audio/demo-track.mp3";
    println!("can play {}: {}", url, player.can_play(url));
    println!(
        "can play https://example.com/page.html: {}",
        player.can_play("https://example.com/page.html")
    );

    let state = PlaybackState::default()
        .with_resource(url)
        .with_playing(true)
        .with_volume(0.6)
        .with_progress_interval(Duration::from_millis(500));
    player.set_state(state.clone()).await?;

    // Requested before the backend is ready: applied at first start.
    let target = player.seek_to(0.25).await;
    println!("seek target: {:?}", target);

    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match &event {
                PlayerEvent::Progress(update) => {
                    println!("event: progress {:?}", update.played_seconds)
                }
                PlayerEvent::Ended => {
                    println!("event: {}", event.description());
                    break;
                }
                other => println!("event: {}", other.description()),
            }
        }
    });

    tokio::time::sleep(Duration::from_secs(2)).await;
    println!("current time: {:?}", player.current_time().await);

    player.set_state(state.clone().with_playback_rate(2.0)).await?;
    tokio::time::sleep(Duration::from_secs(1)).await;
    player.set_state(state.clone().with_muted(true)).await?;

    printer.await?;
    player.shutdown().await;
    Ok(())
}
