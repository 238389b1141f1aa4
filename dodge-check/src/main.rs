//! Dodge Check Demo
//!
//! Runs an arbiter and a dodger runtime on one broadcast channel, commits
//! the prefilled draft and plays the dodge game with a scripted pointer.

use std::time::Duration;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use dodge_check::{
    VERSION,
    game::state::SubjectRef,
    host::{
        ChannelAnnouncer, ChannelEditor, ChannelRenderer, Equipment, Host, InMemoryRegistry,
        ItemKind, LogAnnouncer, LogEditor, LogNotifier, NullRenderer, SubjectProfile, WindowEvent,
    },
    network::{BroadcastChannel, Participant, ParticipantId, ParticipantRuntime, RuntimeConfig},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")?;

    let config = RuntimeConfig::from_env();
    info!("Dodge Check v{}", VERSION);
    info!("Frame Rate: {} Hz", config.frame_rate);
    info!(
        "Playfield: {}x{} px",
        config.playfield.width_px, config.playfield.height_px
    );

    demo_check(config).await
}

fn demo_registry() -> InMemoryRegistry {
    InMemoryRegistry::new().with(SubjectProfile {
        subject_ref: SubjectRef::new("vex"),
        name: "Vex".to_string(),
        stealth_bonus: 6,
        equipment: vec![
            Equipment {
                name: "Studded Leather".into(),
                kind: ItemKind::Equipment,
                equipped: true,
                stealth_disadvantage: false,
            },
            Equipment {
                name: "Breastplate".into(),
                kind: ItemKind::Equipment,
                equipped: false,
                stealth_disadvantage: false,
            },
        ],
        rogue_level: 5,
    })
}

/// One full check: request, configure, play, announce.
async fn demo_check(config: RuntimeConfig) -> anyhow::Result<()> {
    info!("=== Starting Demo Check ===");

    let channel = BroadcastChannel::new(config.channel_capacity);
    let arbiter = Participant::arbiter(ParticipantId::random());
    let dodger = Participant::dodger(ParticipantId::random());
    info!("Arbiter: {}", arbiter.id.short());
    info!("Dodger: {}", dodger.id.short());

    let (editor, mut prompts) = ChannelEditor::new();
    let arbiter_host = Host::new(demo_registry(), editor, LogNotifier, NullRenderer, LogAnnouncer);

    let (renderer, mut windows) = ChannelRenderer::new();
    let (announcer, mut cards) = ChannelAnnouncer::new();
    let dodger_host = Host::new(demo_registry(), LogEditor, LogNotifier, renderer, announcer);

    let (arbiter_rt, arbiter_handle) = ParticipantRuntime::new(arbiter, arbiter_host, &channel, &config);
    let (dodger_rt, dodger_handle) = ParticipantRuntime::new(dodger, dodger_host, &channel, &config);
    let arbiter_task = tokio::spawn(arbiter_rt.run());
    let dodger_task = tokio::spawn(dodger_rt.run());

    let requested = dodger_handle.request_check(SubjectRef::new("vex")).await?;
    info!("Check requested: {}", requested);

    let prompt = prompts.recv().await.context("Arbiter editor closed")?;
    info!(
        "Arbiter commits DC {} with bonus {:+} for {}",
        prompt.draft.difficulty_class, prompt.draft.skill_bonus, prompt.subject_name
    );
    arbiter_handle.commit_config(prompt.handshake, prompt.draft)?;

    let handshake = loop {
        if let WindowEvent::Opened { handshake, .. } = windows.recv().await.context("Renderer closed")? {
            break handshake;
        }
    };
    dodger_handle.start_game(handshake)?;

    // Sweep across the playfield until the card comes in
    let mut sway = tokio::time::interval(Duration::from_millis(50));
    let mut t = 0.0f64;
    let card = loop {
        tokio::select! {
            card = cards.recv() => break card.context("Announcer closed")?,
            event = windows.recv() => {
                if let Some(WindowEvent::Hit { lives_remaining, .. }) = event {
                    info!("Hit! {} lives left", lives_remaining);
                }
            }
            _ = sway.tick() => {
                t += 0.05;
                dodger_handle.pointer_move(handshake, 0.5 + 0.45 * (t * 1.3).sin())?;
            }
        }
    };

    info!("=== Check Result ===");
    for line in card.to_string().lines() {
        info!("{}", line);
    }

    arbiter_handle.shutdown();
    dodger_handle.shutdown();
    arbiter_task.await??;
    dodger_task.await??;

    Ok(())
}
