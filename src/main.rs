//! Terminal 2048 runner (default binary).
//!
//! Uses crossterm for input and the framebuffer renderer from `tui_2048::term`.
//! When the AI adapter is enabled, commands from the controller are applied
//! between frames and every change is broadcast as an observation.

use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use env_logger::Env;

use tui_2048::adapter::{
    build_observation, create_ack, Adapter, ClientCommand, InboundPayload, OutboundMessage,
};
use tui_2048::config::{AppConfig, Setup};
use tui_2048::core::{GameEngine, GameSnapshot};
use tui_2048::input::{handle_key_event, should_quit};
use tui_2048::store::FileStore;
use tui_2048::term::{AdapterStatusView, FrameBuffer, GameView, TerminalRenderer, Viewport};
use tui_2048::types::TICK_MS;

type Game = GameEngine<FileStore>;

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let config = AppConfig::from_env();
    log::info!(
        "seed {} best score file {}",
        config.seed,
        config.best_score_path.display()
    );

    let mut game = GameEngine::with_store(config.seed, FileStore::open(&config.best_score_path));
    match config.setup {
        Some(Setup::NearGameOver) => game.load_near_game_over(),
        Some(Setup::NearWin) => game.load_near_win(),
        None => {}
    }

    let mut adapter = match Adapter::start_from_env() {
        Ok(adapter) => adapter,
        Err(e) => {
            log::warn!("AI adapter unavailable: {:#}", e);
            None
        }
    };

    let mut term = TerminalRenderer::new();
    term.enter()?;

    let result = run(&mut term, &mut game, adapter.as_mut());

    // Always try to restore terminal state.
    let _ = term.exit();
    result
}

fn run(
    term: &mut TerminalRenderer,
    game: &mut Game,
    mut adapter: Option<&mut Adapter>,
) -> Result<()> {
    let view = GameView::default();
    let mut fb = FrameBuffer::new(0, 0);
    let mut snap = GameSnapshot::default();
    let mut obs_seq: u64 = 0;
    let tick = Duration::from_millis(TICK_MS as u64);

    loop {
        let (w, h) = crossterm::terminal::size().unwrap_or((80, 24));
        game.snapshot_into(&mut snap);
        let status = adapter.as_deref().map(|a| {
            let s = a.status();
            AdapterStatusView {
                enabled: true,
                client_count: s.client_count.min(u16::MAX as usize) as u16,
                controller_id: s.controller_id,
                streaming_count: s.streaming_count.min(u16::MAX as usize) as u16,
            }
        });
        view.render_into_with_adapter(&snap, status.as_ref(), Viewport::new(w, h), &mut fb);
        term.draw_swap(&mut fb)?;

        let mut changed = false;
        if event::poll(tick)? {
            match event::read()? {
                Event::Key(key) if key.kind != KeyEventKind::Release => {
                    if should_quit(key) {
                        return Ok(());
                    }
                    if let Some(action) = handle_key_event(key) {
                        changed |= game.apply_action(action);
                    }
                }
                Event::Resize(..) => term.invalidate(),
                _ => {}
            }
        }

        if let Some(adapter) = adapter.as_deref_mut() {
            changed |= drain_adapter(adapter, game, &mut snap, &mut obs_seq);
            if changed {
                obs_seq += 1;
                game.snapshot_into(&mut snap);
                adapter.send(OutboundMessage::BroadcastObservation {
                    obs: build_observation(obs_seq, &snap),
                });
            }
        }
    }
}

/// Apply queued adapter commands, acking each one.
///
/// Returns true when an observation broadcast is due: a command was processed
/// (even a no-op one) and its ack has been queued.
fn drain_adapter(
    adapter: &mut Adapter,
    game: &mut Game,
    snap: &mut GameSnapshot,
    obs_seq: &mut u64,
) -> bool {
    let mut broadcast = false;
    while let Some(cmd) = adapter.try_recv() {
        match cmd.payload {
            InboundPayload::SnapshotRequest => {
                *obs_seq += 1;
                game.snapshot_into(snap);
                adapter.send(OutboundMessage::ToClientObservation {
                    client_id: cmd.client_id,
                    obs: build_observation(*obs_seq, snap),
                });
            }
            InboundPayload::Command(ClientCommand::Actions(actions)) => {
                let mut applied = false;
                for action in actions {
                    applied |= game.apply_action(action);
                }
                log::debug!(
                    "client {} seq {} applied={}",
                    cmd.client_id,
                    cmd.seq,
                    applied
                );
                adapter.send(OutboundMessage::ToClientAck {
                    client_id: cmd.client_id,
                    ack: create_ack(cmd.seq, applied),
                });
                broadcast = true;
            }
        }
    }
    broadcast
}
