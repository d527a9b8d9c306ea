//! Scripted multi-client session against the in-memory backend.
//!
//! One host, a configurable number of players and a spectator each run their
//! own [`SessionRuntime`]. The script drives them through contention on a
//! shared cell, a pause, a dropped feed, and the end of the game, then checks
//! that every view agrees.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tokio::task::JoinSet;
use tracing::{info, warn};

use bingo_core::{GridPosition, Lifecycle, Role, SessionView};
use bingo_runtime::{
    JoinTicket, MemoryStore, RuntimeError, SessionHandle, SessionRuntime, SessionStore,
};

use crate::config::ClientConfig;

const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Final state of every participant's view.
pub struct DemoReport {
    pub views: Vec<(String, SessionView)>,
}

impl DemoReport {
    /// True when every client shows the same grid.
    pub fn converged(&self) -> bool {
        self.views
            .windows(2)
            .all(|pair| pair[0].1.rows == pair[1].1.rows)
    }
}

struct Seat {
    name: String,
    runtime: SessionRuntime,
}

impl Seat {
    fn handle(&self) -> SessionHandle {
        self.runtime.handle()
    }
}

async fn open(
    store: &Arc<MemoryStore>,
    config: &ClientConfig,
    ticket: JoinTicket,
) -> Result<SessionRuntime> {
    SessionRuntime::builder()
        .backend(Arc::clone(store))
        .config(config.runtime.clone())
        .ticket(ticket)
        .build()
        .await
        .context("failed to open session runtime")
}

async fn wait_for<F>(handle: &SessionHandle, what: &str, mut done: F) -> Result<SessionView>
where
    F: FnMut(&SessionView) -> bool,
{
    let poll = async {
        loop {
            let view = handle.view().await?;
            if done(&view) {
                return Ok::<_, RuntimeError>(view);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };
    let view = tokio::time::timeout(SETTLE_TIMEOUT, poll)
        .await
        .with_context(|| format!("timed out waiting for {what}"))??;
    Ok(view)
}

async fn wait_all<F>(seats: &[Seat], what: &str, done: F) -> Result<()>
where
    F: Fn(&SessionView) -> bool,
{
    for seat in seats {
        wait_for(&seat.handle(), what, &done).await?;
    }
    Ok(())
}

fn quiet(view: &SessionView) -> bool {
    !view.stale && view.rows.iter().flatten().all(|cell| !cell.pending)
}

/// Marks every free cell in `row`. Marking is a toggle, so taken cells are
/// skipped rather than resubmitted.
async fn claim_row(handle: &SessionHandle, row: u8, cols: u8) -> Result<()> {
    for col in 0..cols {
        let position = GridPosition::new(row, col);
        let view = handle.view().await?;
        if view.cell(position).is_some_and(|cell| cell.is_marked()) {
            continue;
        }
        if let Err(error) = handle.mark(position).await {
            info!(participant = %handle.local(), cell = %position, error = %error, "Mark refused");
        }
    }
    Ok(())
}

/// Runs the full script and returns every client's final view.
pub async fn run(config: &ClientConfig) -> Result<DemoReport> {
    let store = Arc::new(MemoryStore::with_config(config.store.clone()));

    // ===== lobby =====
    let host_ticket = store.create_session("host", config.grid).await?;
    info!(code = %host_ticket.code, grid = %config.grid, "Session created");

    let mut tickets = vec![("host".to_string(), host_ticket.clone())];
    for i in 1..=config.players {
        let name = format!("player-{i}");
        let ticket = store.join(&host_ticket.code, &name, Role::Player).await?;
        tickets.push((name, ticket));
    }
    let watcher = store
        .join(&host_ticket.code, "watcher", Role::Spectator)
        .await?;
    tickets.push(("watcher".to_string(), watcher));

    let mut seats = Vec::with_capacity(tickets.len());
    for (name, ticket) in tickets {
        let runtime = open(&store, config, ticket).await?;
        seats.push(Seat { name, runtime });
    }
    let host = seats[0].handle();
    let players: Vec<SessionHandle> = seats[1..=config.players]
        .iter()
        .map(Seat::handle)
        .collect();
    wait_all(&seats, "full roster", |v| v.participants.len() == seats.len()).await?;

    // ===== contention on one cell =====
    host.start().await?;
    wait_all(&seats, "start", |v| v.lifecycle == Lifecycle::Active).await?;

    let center = GridPosition::new(config.grid.rows / 2, config.grid.cols / 2);
    let mut racers = JoinSet::new();
    for handle in std::iter::once(host.clone()).chain(players.iter().cloned()) {
        racers.spawn(async move { handle.mark(center).await });
    }
    while let Some(joined) = racers.join_next().await {
        if let Err(error) = joined? {
            info!(error = %error, "Mark lost the race before it was sent");
        }
    }
    wait_all(&seats, "contended cell", |v| {
        quiet(v) && v.cell(center).is_some_and(|c| c.is_marked())
    })
    .await?;
    let winner = host
        .view()
        .await?
        .cell(center)
        .and_then(|cell| cell.owner);
    info!(cell = %center, winner = ?winner, "Contended cell settled");

    // ===== each player claims a row =====
    for (i, player) in players.iter().enumerate() {
        let row = (i % config.grid.rows as usize) as u8;
        claim_row(player, row, config.grid.cols).await?;
    }
    wait_all(&seats, "row claims", quiet).await?;

    // ===== pause =====
    host.pause().await?;
    wait_all(&seats, "pause", |v| v.lifecycle == Lifecycle::Paused).await?;
    if let Some(player) = players.first() {
        match player.mark(GridPosition::new(config.grid.rows - 1, 0)).await {
            Ok(_) => bail!("marking while paused should be refused"),
            Err(error) => info!(error = %error, "Mark refused while paused"),
        }
    }
    host.resume().await?;
    wait_all(&seats, "resume", |v| v.lifecycle == Lifecycle::Active).await?;

    // ===== dropped feed =====
    let dropped = store.drop_subscribers(host_ticket.session);
    warn!(dropped, "Simulated feed outage");
    claim_row(&host, config.grid.rows - 1, config.grid.cols).await?;
    wait_all(&seats, "recovery", quiet).await?;

    // ===== end =====
    host.end().await?;
    wait_all(&seats, "end", |v| v.lifecycle == Lifecycle::Ended).await?;

    // Collect every view before anyone leaves the roster.
    let mut views = Vec::with_capacity(seats.len());
    for seat in &seats {
        views.push((seat.name.clone(), seat.handle().view().await?));
    }
    for seat in seats {
        seat.runtime.shutdown().await?;
    }

    Ok(DemoReport { views })
}
