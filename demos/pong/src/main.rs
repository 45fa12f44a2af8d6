//! Headless Pong Example
//!
//! One server and two clients play pong over a lossy in-memory link.
//! The server owns the ball; each client owns one racket and steers it
//! toward where it sees the ball. Everything the clients see of the other
//! objects arrives as interpolated snapshots.
//!
//! Run with `RUST_LOG=debug` to see buffer resets and teleports, or
//! `RUST_LOG=glide_netcode=trace` for every interpolation step.

mod codec;

use codec::{BallCodec, RacketCodec};
use glide_core::{Transform, Vec3};
use glide_netcode::{
    Channel, EntityId, MemoryTransport, NetworkTransform, Result, RoleFlags, SyncConfig,
    SyncManager,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const BALL: EntityId = EntityId(1);
const LEFT: EntityId = EntityId(2);
const RIGHT: EntityId = EntityId(3);

const TICK_RATE: u32 = 60;
const DURATION_SECS: u32 = 20;
/// Every Nth packet is lost
const DROP_EVERY: usize = 7;

const COURT_HALF_WIDTH: f32 = 8.0;
const COURT_HALF_HEIGHT: f32 = 4.0;
const RACKET_HALF_LENGTH: f32 = 1.0;
const RACKET_SPEED: f32 = 5.0;
const BALL_VELOCITY: Vec3 = Vec3::new(6.0, 3.5, 0.0);

/// A client process owning one racket
struct Peer {
    name: &'static str,
    owns: EntityId,
    manager: SyncManager,
}

impl Peer {
    fn new(
        name: &'static str,
        owns: EntityId,
        ball: &SyncConfig,
        racket: &SyncConfig,
    ) -> Result<Self> {
        let mut manager = SyncManager::new();
        manager.spawn(NetworkTransform::new(BALL, ball.clone(), BallCodec, RoleFlags::client())?);
        for id in [LEFT, RIGHT] {
            let role = RoleFlags::client().with_authority(id == owns);
            let entity = NetworkTransform::new(id, racket.clone(), RacketCodec, role)?
                .with_transform(rail(id));
            manager.spawn(entity);
        }
        Ok(Self { name, owns, manager })
    }

    /// Move the owned racket toward the ball as this client sees it
    fn steer(&mut self, dt: f32) {
        let Some(target) = self.manager.get(BALL).map(|ball| ball.transform().position.y) else {
            return;
        };
        if let Some(racket) = self.manager.get_mut(self.owns) {
            let position = &mut racket.transform_mut().position;
            let reach = RACKET_SPEED * dt;
            let step = (target - position.y).clamp(-reach, reach);
            position.y = (position.y + step).clamp(-COURT_HALF_HEIGHT, COURT_HALF_HEIGHT);
        }
    }

    fn position(&self, id: EntityId) -> Vec3 {
        self.manager
            .get(id)
            .map(|entity| entity.transform().position)
            .unwrap_or(Vec3::ZERO)
    }
}

/// Starting transform on a racket's rail
fn rail(id: EntityId) -> Transform {
    let x = if id == LEFT {
        -COURT_HALF_WIDTH
    } else {
        COURT_HALF_WIDTH
    };
    Transform::from_position(Vec3::new(x, 0.0, 0.0))
}

fn racket_y(manager: &SyncManager, id: EntityId) -> f32 {
    manager
        .get(id)
        .map(|racket| racket.transform().position.y)
        .unwrap_or(0.0)
}

/// Advance the server's ball; returns the racket that missed it, if any
fn step_ball(server: &mut SyncManager, velocity: &mut Vec3, dt: f32) -> Option<EntityId> {
    let left_y = racket_y(server, LEFT);
    let right_y = racket_y(server, RIGHT);
    let ball = server.get_mut(BALL)?;
    let position = &mut ball.transform_mut().position;

    *position += *velocity * dt;

    if position.y.abs() > COURT_HALF_HEIGHT {
        velocity.y = -velocity.y;
        position.y = position.y.clamp(-COURT_HALF_HEIGHT, COURT_HALF_HEIGHT);
    }

    if position.x.abs() >= COURT_HALF_WIDTH {
        let (racket, racket_y) = if position.x < 0.0 {
            (LEFT, left_y)
        } else {
            (RIGHT, right_y)
        };
        if (position.y - racket_y).abs() > RACKET_HALF_LENGTH {
            return Some(racket);
        }
        velocity.x = -velocity.x;
        position.x = position.x.clamp(-COURT_HALF_WIDTH, COURT_HALF_WIDTH);
    }
    None
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let ball_config = SyncConfig::from_ron_str(include_str!("../assets/ball.ron"))?;
    let racket_config = SyncConfig::from_ron_str(include_str!("../assets/racket.ron"))?;

    let mut server = SyncManager::new();
    server.spawn(NetworkTransform::new(BALL, ball_config.clone(), BallCodec, RoleFlags::server())?);
    for id in [LEFT, RIGHT] {
        let entity =
            NetworkTransform::new(id, racket_config.clone(), RacketCodec, RoleFlags::server())?
                .with_transform(rail(id));
        server.spawn(entity);
    }

    let mut peers = [
        Peer::new("left", LEFT, &ball_config, &racket_config)?,
        Peer::new("right", RIGHT, &ball_config, &racket_config)?,
    ];

    let mut link = MemoryTransport::new().with_drop_every(DROP_EVERY);
    let mut velocity = BALL_VELOCITY;
    let mut misses = [0u32; 2];
    let dt = 1.0 / f64::from(TICK_RATE);

    info!(
        duration = DURATION_SECS,
        tick_rate = TICK_RATE,
        drop_every = DROP_EVERY,
        "starting match"
    );

    for tick in 1..=TICK_RATE * DURATION_SECS {
        let now = f64::from(tick) * dt;
        link.set_clock(now);

        if let Some(missed) = step_ball(&mut server, &mut velocity, dt as f32) {
            misses[usize::from(missed == RIGHT)] += 1;
            info!(racket = %missed, time = now, "missed, serving again from the center");
            server.teleport(BALL, Vec3::ZERO, &mut link)?;
            velocity.x = -velocity.x;
        }
        server.update(now, dt, &mut link);

        for envelope in link.drain(Channel::ServerToClient) {
            for peer in &mut peers {
                peer.manager
                    .receive(Channel::ServerToClient, &envelope, now, &mut link);
            }
        }

        for peer in &mut peers {
            peer.steer(dt as f32);
            peer.manager.update(now, dt, &mut link);
        }

        for envelope in link.drain(Channel::ClientToServer) {
            server.receive(Channel::ClientToServer, &envelope, now, &mut link);
        }

        if tick % TICK_RATE == 0 {
            let ball = server.get(BALL).map(|b| b.transform().position).unwrap_or(Vec3::ZERO);
            for peer in &peers {
                let seen = peer.position(BALL);
                let diagnostics = peer.manager.diagnostics(BALL);
                info!(
                    time = now,
                    peer = peer.name,
                    ball = ?ball,
                    seen = ?seen,
                    lag = (ball - seen).length(),
                    buffered = diagnostics.map_or(0, |d| d.client_buffer),
                    catchup = diagnostics.map_or(0.0, |d| d.client_catchup_percent),
                    "ball"
                );
            }
            info!(
                time = now,
                left = racket_y(&server, LEFT),
                right = racket_y(&server, RIGHT),
                left_seen_by_right = peers[1].position(LEFT).y,
                right_seen_by_left = peers[0].position(RIGHT).y,
                "rackets"
            );
        }
    }

    info!(
        left_misses = misses[0],
        right_misses = misses[1],
        sent = link.sent(),
        dropped = link.dropped(),
        "match over"
    );
    Ok(())
}
