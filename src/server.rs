//! TCP transport and the hub actor that owns every room
//!
//! Connection tasks only decode frames and forward them to the hub over a
//! channel. The hub processes one command at a time against the
//! `RoomManager`, so no room is ever touched by two events at once.
//! Maintenance ticks arrive through the same `select!` loop.
//!
//! Persistence jobs are queued to a separate worker that runs the gateway on
//! the blocking pool; the hub never waits on the store.

use crate::error::GameError;
use crate::persistence::{
    stats_updates, PersistenceGateway, SessionId, SessionRecord, SessionSummary, StatsUpdate,
};
use crate::player::{Identity, PlayerId};
use crate::protocol::{
    decode_message, pixel_action, read_frame, write_message, ClientEvent, ServerMessage,
};
use crate::room::{RoomEvent, RoomId, RoomManager};
use crate::settings::Settings;
use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Outbound queue for one connection
pub type ClientSender = mpsc::UnboundedSender<ServerMessage>;

/// Commands processed by the hub
#[derive(Debug)]
pub enum HubCommand {
    Connect { conn: PlayerId, sender: ClientSender },
    Event { conn: PlayerId, event: ClientEvent },
    Disconnect { conn: PlayerId },
}

/// Work for the persistence worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistJob {
    CreateSession(SessionRecord),
    CompleteSession {
        session_id: SessionId,
        updates: Vec<StatsUpdate>,
        identity: Option<Identity>,
        summary: SessionSummary,
    },
}

#[derive(Debug)]
struct Connection {
    sender: ClientSender,
    identity: Identity,
    room: Option<RoomId>,
}

/// Single owner of the room registry and the connection table
pub struct Hub {
    manager: RoomManager,
    connections: HashMap<PlayerId, Connection>,
    persist_tx: mpsc::UnboundedSender<PersistJob>,
}

impl Hub {
    pub fn new(manager: RoomManager, persist_tx: mpsc::UnboundedSender<PersistJob>) -> Self {
        Self {
            manager,
            connections: HashMap::new(),
            persist_tx,
        }
    }

    pub fn rooms(&self) -> &RoomManager {
        &self.manager
    }

    /// Process one command to completion
    pub fn handle(&mut self, cmd: HubCommand, now: Instant) {
        match cmd {
            HubCommand::Connect { conn, sender } => {
                // Until a hello arrives the connection id doubles as identity
                let identity = conn.clone();
                let welcome = ServerMessage::Welcome {
                    player_id: conn.clone(),
                    identity: identity.clone(),
                };
                let _ = sender.send(welcome);
                self.connections.insert(
                    conn,
                    Connection {
                        sender,
                        identity,
                        room: None,
                    },
                );
            }
            HubCommand::Event { conn, event } => self.handle_event(&conn, event, now),
            HubCommand::Disconnect { conn } => {
                self.leave_current_room(&conn, now);
                self.connections.remove(&conn);
                debug!(conn = %conn, "Connection closed");
            }
        }
    }

    /// Fire due deletions, expire snapshots, sweep idle rooms
    pub fn maintenance(&mut self, now: Instant) {
        let report = self.manager.tick(now);
        if report.is_empty() {
            return;
        }
        for room_id in report.deleted_by_timer.iter().chain(&report.swept) {
            for connection in self.connections.values_mut() {
                if connection.room.as_deref() == Some(room_id.as_str()) {
                    connection.room = None;
                }
            }
        }
        info!(
            deleted = report.deleted_by_timer.len(),
            swept = report.swept.len(),
            snapshots_expired = report.snapshots_expired,
            "Maintenance pass"
        );
    }

    fn handle_event(&mut self, conn: &str, event: ClientEvent, now: Instant) {
        let Some(identity) = self.connections.get(conn).map(|c| c.identity.clone()) else {
            warn!(conn, "Event from unknown connection");
            return;
        };

        match event {
            ClientEvent::Hello { identity } => {
                let Some(connection) = self.connections.get_mut(conn) else {
                    return;
                };
                if connection.room.is_some() {
                    let _ = connection
                        .sender
                        .send(ServerMessage::bad_request("identity cannot change inside a room"));
                    return;
                }
                connection.identity = identity.clone();
                let _ = connection.sender.send(ServerMessage::Welcome {
                    player_id: conn.to_string(),
                    identity,
                });
            }
            ClientEvent::CreateRoom { color, rotateable } => {
                self.leave_current_room(conn, now);
                match self.manager.create_room(conn, &identity, &color, rotateable, now) {
                    Ok(outcome) => {
                        self.set_room(conn, Some(outcome.room_id.clone()));
                        if let Some(session) = outcome.session {
                            self.persist(PersistJob::CreateSession(session));
                        }
                        self.send(
                            conn,
                            ServerMessage::RoomCreated {
                                room_id: outcome.room_id,
                                state: outcome.state,
                                players: outcome.players,
                            },
                        );
                    }
                    Err(e) => self.reject(conn, None, &e),
                }
            }
            ClientEvent::JoinRoom { room_id, color } => {
                let switching = self.current_room(conn).as_deref() != Some(room_id.as_str());
                match self.manager.join_room(&room_id, conn, &identity, &color, now) {
                    Ok(outcome) => {
                        if switching {
                            self.leave_current_room(conn, now);
                        }
                        self.set_room(conn, Some(room_id.clone()));
                        let state = outcome.state.clone();
                        let players = outcome.players.clone();
                        self.send(
                            conn,
                            ServerMessage::RoomJoined {
                                room_id: room_id.clone(),
                                state: outcome.state,
                                players: outcome.players,
                                restored: outcome.restored,
                            },
                        );
                        self.broadcast_except(&room_id, conn, &ServerMessage::State { state });
                        self.broadcast_except(&room_id, conn, &ServerMessage::Players { players });
                    }
                    Err(e) => self.reject(conn, None, &e),
                }
            }
            ClientEvent::LeaveRoom { room_id } => {
                if self.current_room(conn).as_deref() == Some(room_id.as_str()) {
                    self.leave_current_room(conn, now);
                }
            }
            ClientEvent::PlacePixel {
                room_id,
                status,
                pixel,
            } => {
                let result = match pixel_action(status) {
                    Some(action) => self.manager.place_pixel(&room_id, conn, action, pixel, now),
                    None => Err(GameError::InvalidMove),
                };
                self.dispatch(conn, &room_id, result);
            }
            ClientEvent::PlaceFigure { room_id, pixels } => {
                let result = self.manager.place_figure(&room_id, conn, &pixels, now);
                self.dispatch(conn, &room_id, result);
            }
            ClientEvent::UpdatePlayerColor { room_id, color } => {
                let result = self.manager.update_player_color(&room_id, conn, &color, now);
                self.dispatch(conn, &room_id, result);
            }
            ClientEvent::RestartGame { room_id } => {
                let result = self.manager.restart_game(&room_id, conn, now);
                self.dispatch(conn, &room_id, result);
            }
            ClientEvent::GetRooms => {
                let rooms = self.manager.list();
                self.send(conn, ServerMessage::Rooms { rooms });
            }
        }
    }

    /// Broadcast a room operation's events, or tell the requester why not
    fn dispatch(&mut self, conn: &str, room_id: &str, result: Result<Vec<RoomEvent>, GameError>) {
        let events = match result {
            Ok(events) => events,
            Err(e) => {
                self.reject(conn, Some(room_id), &e);
                return;
            }
        };

        for event in events {
            match &event {
                RoomEvent::GameOver {
                    session_id,
                    result,
                    finished_by,
                } => {
                    self.persist(PersistJob::CompleteSession {
                        session_id: *session_id,
                        updates: stats_updates(result),
                        identity: finished_by.clone(),
                        summary: SessionSummary::from_result(result),
                    });
                }
                RoomEvent::Restarted(record) => {
                    self.persist(PersistJob::CreateSession(record.clone()));
                }
                RoomEvent::State(_) | RoomEvent::Players(_) => {}
            }
            self.broadcast(room_id, &ServerMessage::from(event));
        }
    }

    /// Routine rejected draws only resync the requester; structural errors
    /// are surfaced
    fn reject(&self, conn: &str, room_id: Option<&str>, err: &GameError) {
        if err.is_silent() {
            debug!(conn, error = %err, "Resynchronizing after rejected move");
            if let Some(state) = room_id.and_then(|id| self.manager.state(id).ok()) {
                self.send(conn, ServerMessage::State { state });
            }
        } else {
            debug!(conn, error = %err, "Request failed");
            self.send(conn, ServerMessage::error(err));
        }
    }

    fn leave_current_room(&mut self, conn: &str, now: Instant) {
        let Some(room_id) = self.current_room(conn) else {
            return;
        };
        self.set_room(conn, None);
        match self.manager.leave_room(&room_id, conn, now) {
            Ok(outcome) => {
                for event in outcome.events {
                    self.broadcast(&room_id, &ServerMessage::from(event));
                }
            }
            Err(e) => debug!(conn, room = %room_id, error = %e, "Leave ignored"),
        }
    }

    fn current_room(&self, conn: &str) -> Option<RoomId> {
        self.connections.get(conn)?.room.clone()
    }

    fn set_room(&mut self, conn: &str, room: Option<RoomId>) {
        if let Some(connection) = self.connections.get_mut(conn) {
            connection.room = room;
        }
    }

    fn send(&self, conn: &str, msg: ServerMessage) {
        if let Some(connection) = self.connections.get(conn) {
            if connection.sender.send(msg).is_err() {
                debug!(conn, "Dropping message for closed connection");
            }
        }
    }

    fn broadcast(&self, room_id: &str, msg: &ServerMessage) {
        self.broadcast_except(room_id, "", msg);
    }

    fn broadcast_except(&self, room_id: &str, skip: &str, msg: &ServerMessage) {
        for (conn, connection) in &self.connections {
            if conn != skip && connection.room.as_deref() == Some(room_id) {
                let _ = connection.sender.send(msg.clone());
            }
        }
    }

    fn persist(&self, job: PersistJob) {
        if self.persist_tx.send(job).is_err() {
            warn!("Persistence worker is gone; dropping job");
        }
    }
}

/// Hub main loop
pub async fn run_hub(mut hub: Hub, mut commands: mpsc::UnboundedReceiver<HubCommand>, tick: Duration) {
    use tokio::time::interval;

    let mut ticker = interval(tick);
    loop {
        tokio::select! {
            cmd = commands.recv() => match cmd {
                Some(cmd) => hub.handle(cmd, Instant::now()),
                None => break,
            },
            _ = ticker.tick() => hub.maintenance(Instant::now()),
        }
    }
    info!("Hub stopped");
}

/// Drain persistence jobs onto the blocking pool, one at a time
pub async fn run_persistence(
    mut jobs: mpsc::UnboundedReceiver<PersistJob>,
    gateway: Arc<dyn PersistenceGateway>,
) {
    while let Some(job) = jobs.recv().await {
        let gateway = Arc::clone(&gateway);
        let outcome = tokio::task::spawn_blocking(move || apply_job(gateway.as_ref(), job)).await;
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Persistence call failed"),
            Err(e) => error!(error = %e, "Persistence task panicked"),
        }
    }
}

fn apply_job(
    gateway: &dyn PersistenceGateway,
    job: PersistJob,
) -> Result<(), crate::error::PersistenceError> {
    match job {
        PersistJob::CreateSession(record) => gateway.create_session(record),
        PersistJob::CompleteSession {
            session_id,
            updates,
            identity,
            summary,
        } => gateway.complete_session_with_stats_update(
            session_id,
            &updates,
            identity.as_deref(),
            &summary,
        ),
    }
}

/// Bind the configured address and serve until the listener fails
pub async fn serve(settings: &Settings, gateway: Arc<dyn PersistenceGateway>) -> io::Result<()> {
    let listener = TcpListener::bind(&settings.server.bind).await?;
    info!("Listening on {}", listener.local_addr()?);
    serve_listener(listener, settings, gateway).await
}

/// Serve on an already bound listener
pub async fn serve_listener(
    listener: TcpListener,
    settings: &Settings,
    gateway: Arc<dyn PersistenceGateway>,
) -> io::Result<()> {
    let (persist_tx, persist_rx) = mpsc::unbounded_channel();
    tokio::spawn(run_persistence(persist_rx, gateway));

    let manager = RoomManager::new(settings.room_policy(), Instant::now());
    let (hub_tx, hub_rx) = mpsc::unbounded_channel();
    tokio::spawn(run_hub(Hub::new(manager, persist_tx), hub_rx, settings.tick_interval()));

    let mut next_conn: u64 = 0;
    loop {
        let (stream, addr) = listener.accept().await?;
        next_conn += 1;
        let conn = format!("conn-{}", next_conn);
        info!(conn = %conn, %addr, "Client connected");
        tokio::spawn(handle_connection(stream, conn, hub_tx.clone()));
    }
}

/// Per-connection task: frames in, hub commands out, server messages back
async fn handle_connection(stream: TcpStream, conn: PlayerId, hub_tx: mpsc::UnboundedSender<HubCommand>) {
    let (mut reader, mut writer) = stream.into_split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ServerMessage>();

    let writer_task = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            if write_message(&mut writer, &msg).await.is_err() {
                break;
            }
        }
    });

    let connect = HubCommand::Connect {
        conn: conn.clone(),
        sender: out_tx.clone(),
    };
    if hub_tx.send(connect).is_err() {
        error!("Hub is gone; refusing connection");
        return;
    }

    loop {
        match read_frame(&mut reader).await {
            Ok(Some(frame)) => match decode_message::<ClientEvent>(&frame) {
                Ok(event) => {
                    let cmd = HubCommand::Event {
                        conn: conn.clone(),
                        event,
                    };
                    if hub_tx.send(cmd).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(conn = %conn, error = %e, "Malformed message");
                    let _ = out_tx.send(ServerMessage::bad_request(e.to_string()));
                }
            },
            Ok(None) => break,
            Err(e) => {
                warn!(conn = %conn, error = %e, "Read failed");
                break;
            }
        }
    }

    let _ = hub_tx.send(HubCommand::Disconnect { conn: conn.clone() });
    drop(out_tx);
    let _ = writer_task.await;
    info!(conn = %conn, "Client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Cell;
    use crate::persistence::MemoryGateway;
    use crate::protocol::encode_message;
    use crate::room::RoomPolicy;
    use crate::shape::{Point, Shape, ShapeType};
    use tokio::io::AsyncWriteExt;

    struct Harness {
        hub: Hub,
        jobs: mpsc::UnboundedReceiver<PersistJob>,
        now: Instant,
    }

    impl Harness {
        fn new() -> Self {
            let now = Instant::now();
            let (persist_tx, jobs) = mpsc::unbounded_channel();
            Self {
                hub: Hub::new(RoomManager::new(RoomPolicy::default(), now), persist_tx),
                jobs,
                now,
            }
        }

        fn connect(&mut self, conn: &str, identity: &str) -> mpsc::UnboundedReceiver<ServerMessage> {
            let (sender, mut rx) = mpsc::unbounded_channel();
            self.hub.handle(
                HubCommand::Connect {
                    conn: conn.into(),
                    sender,
                },
                self.now,
            );
            self.event(conn, ClientEvent::Hello { identity: identity.into() });
            drain(&mut rx);
            rx
        }

        fn event(&mut self, conn: &str, event: ClientEvent) {
            self.hub.handle(
                HubCommand::Event {
                    conn: conn.into(),
                    event,
                },
                self.now,
            );
        }

        fn create(&mut self, conn: &str) -> RoomId {
            self.event(
                conn,
                ClientEvent::CreateRoom {
                    color: "#f00".into(),
                    rotateable: false,
                },
            );
            self.hub.current_room(conn).unwrap()
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    #[test]
    fn test_create_and_join_broadcast() {
        let mut h = Harness::new();
        let mut amy = h.connect("c1", "amy");
        let mut bob = h.connect("c2", "bob");

        let room = h.create("c1");
        assert!(matches!(drain(&mut amy).as_slice(), [ServerMessage::RoomCreated { .. }]));
        assert!(matches!(h.jobs.try_recv(), Ok(PersistJob::CreateSession(_))));

        h.event("c2", ClientEvent::JoinRoom { room_id: room.clone(), color: "#00f".into() });
        let joined = drain(&mut bob);
        assert!(matches!(joined.as_slice(), [ServerMessage::RoomJoined { restored: false, .. }]));
        let seen = drain(&mut amy);
        assert!(seen.iter().any(|m| matches!(m, ServerMessage::Players { players } if players.len() == 2)));

        h.event("c2", ClientEvent::GetRooms);
        assert_eq!(drain(&mut bob), vec![ServerMessage::Rooms { rooms: vec![room] }]);
    }

    #[test]
    fn test_unknown_room_is_surfaced() {
        let mut h = Harness::new();
        let mut amy = h.connect("c1", "amy");
        h.event("c1", ClientEvent::JoinRoom { room_id: "NOPE42".into(), color: "#f00".into() });
        let msgs = drain(&mut amy);
        assert!(matches!(
            msgs.as_slice(),
            [ServerMessage::Error { kind: crate::protocol::ErrorKind::RoomNotFound, .. }]
        ));
    }

    #[test]
    fn test_failed_join_keeps_current_room() {
        let mut h = Harness::new();
        let mut amy = h.connect("c1", "amy");
        let room = h.create("c1");
        drain(&mut amy);

        h.event("c1", ClientEvent::JoinRoom { room_id: "NOPE42".into(), color: "#f00".into() });
        assert!(matches!(drain(&mut amy).as_slice(), [ServerMessage::Error { .. }]));
        assert_eq!(h.hub.current_room("c1"), Some(room.clone()));
        assert_eq!(h.hub.rooms().get(&room).unwrap().player_count(), 1);
        assert!(h.hub.rooms().pending_deletion(&room).is_none());
    }

    #[test]
    fn test_join_elsewhere_leaves_previous_room() {
        let mut h = Harness::new();
        let _amy = h.connect("c1", "amy");
        let mut bob = h.connect("c2", "bob");
        let first = h.create("c1");
        let second = h.create("c2");
        drain(&mut bob);

        h.event("c2", ClientEvent::JoinRoom { room_id: first.clone(), color: "#00f".into() });
        assert_eq!(h.hub.current_room("c2"), Some(first.clone()));
        assert_eq!(h.hub.rooms().get(&second).unwrap().player_count(), 0);
        assert!(h.hub.rooms().pending_deletion(&second).is_some());
        assert_eq!(h.hub.rooms().get(&first).unwrap().player_count(), 2);
    }

    #[test]
    fn test_rejected_move_only_resyncs_requester() {
        let mut h = Harness::new();
        let mut amy = h.connect("c1", "amy");
        let mut bob = h.connect("c2", "bob");
        let room = h.create("c1");
        h.event("c2", ClientEvent::JoinRoom { room_id: room.clone(), color: "#00f".into() });
        drain(&mut amy);
        drain(&mut bob);

        let pixels = vec![Point::new(0, 0), Point::new(5, 5)];
        h.event("c2", ClientEvent::PlaceFigure { room_id: room, pixels });
        assert!(matches!(drain(&mut bob).as_slice(), [ServerMessage::State { .. }]));
        assert!(drain(&mut amy).is_empty());
    }

    #[test]
    fn test_pixel_broadcast_to_room() {
        let mut h = Harness::new();
        let mut amy = h.connect("c1", "amy");
        let mut bob = h.connect("c2", "bob");
        let room = h.create("c1");
        h.event("c2", ClientEvent::JoinRoom { room_id: room.clone(), color: "#00f".into() });
        drain(&mut amy);
        drain(&mut bob);

        h.event("c1", ClientEvent::PlacePixel { room_id: room, status: 1, pixel: Point::new(2, 3) });
        for rx in [&mut amy, &mut bob] {
            let msgs = drain(rx);
            let [ServerMessage::State { state }] = msgs.as_slice() else {
                panic!("expected a state broadcast, got {:?}", msgs);
            };
            assert!(state.grid.get(Point::new(2, 3)).is_some());
        }
    }

    #[test]
    fn test_disconnect_then_timer_deletes_room() {
        let mut h = Harness::new();
        let _amy = h.connect("c1", "amy");
        let room = h.create("c1");

        h.hub.handle(HubCommand::Disconnect { conn: "c1".into() }, h.now);
        assert!(h.hub.rooms().has(&room));
        assert!(h.hub.rooms().pending_deletion(&room).is_some());

        h.hub.maintenance(h.now + Duration::from_secs(61));
        assert!(!h.hub.rooms().has(&room));
    }

    #[test]
    fn test_reconnect_restores_player() {
        let mut h = Harness::new();
        let _amy = h.connect("c1", "amy");
        let mut bob = h.connect("c2", "bob");
        let room = h.create("c1");
        h.event("c2", ClientEvent::JoinRoom { room_id: room.clone(), color: "#00f".into() });
        h.hub.handle(HubCommand::Disconnect { conn: "c2".into() }, h.now);

        let mut bob_again = h.connect("c3", "bob");
        h.event("c3", ClientEvent::JoinRoom { room_id: room, color: "#00f".into() });
        assert!(matches!(
            drain(&mut bob_again).as_slice(),
            [ServerMessage::RoomJoined { restored: true, .. }]
        ));
        drop(drain(&mut bob));
    }

    #[test]
    fn test_game_over_queues_session_completion() {
        let mut h = Harness::new();
        let mut amy = h.connect("c1", "amy");
        let room = h.create("c1");
        let _ = h.jobs.try_recv();
        {
            let game = h.hub.manager.get_mut(&room).unwrap();
            for y in 0..10 {
                for x in 0..10 {
                    let corner = x < 2 && y < 2;
                    if !corner && (x + 3 * y) % 5 != 0 {
                        game.grid_mut().set(Point::new(x, y), Some(Cell::solid("x", "#000")));
                    }
                }
            }
            game.set_held_shapes("c1", [Shape::new(ShapeType::O), Shape::new(ShapeType::O)]);
        }
        drain(&mut amy);

        let square = vec![Point::new(0, 0), Point::new(1, 0), Point::new(0, 1), Point::new(1, 1)];
        h.event("c1", ClientEvent::PlaceFigure { room_id: room.clone(), pixels: square });

        assert!(drain(&mut amy).iter().any(|m| matches!(m, ServerMessage::GameOver { .. })));
        match h.jobs.try_recv() {
            Ok(PersistJob::CompleteSession { identity, updates, summary, .. }) => {
                assert_eq!(identity.as_deref(), Some("amy"));
                assert_eq!(updates.len(), 1);
                assert!(updates[0].won);
                assert_eq!(summary.room_id, room);
            }
            other => panic!("expected session completion, got {:?}", other),
        }

        h.event("c1", ClientEvent::RestartGame { room_id: room });
        assert!(drain(&mut amy).iter().any(|m| matches!(m, ServerMessage::GameRestarted { .. })));
        assert!(matches!(h.jobs.try_recv(), Ok(PersistJob::CreateSession(_))));
    }

    #[test]
    fn test_hello_inside_room_rejected() {
        let mut h = Harness::new();
        let mut amy = h.connect("c1", "amy");
        h.create("c1");
        drain(&mut amy);
        h.event("c1", ClientEvent::Hello { identity: "mallory".into() });
        assert!(matches!(
            drain(&mut amy).as_slice(),
            [ServerMessage::Error { kind: crate::protocol::ErrorKind::BadRequest, .. }]
        ));
    }

    #[tokio::test]
    async fn test_persistence_worker_applies_jobs() {
        let gateway = Arc::new(MemoryGateway::new());
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_persistence(rx, gateway.clone()));

        let record = SessionRecord {
            session_id: 42,
            room_id: "ROOM01".into(),
            rotateable: false,
            started_by: None,
        };
        tx.send(PersistJob::CreateSession(record.clone())).unwrap();
        drop(tx);
        worker.await.unwrap();

        assert_eq!(gateway.record(42), Some(record));
    }

    #[tokio::test]
    async fn test_tcp_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let settings = Settings::default();
        tokio::spawn(async move {
            let _ = serve_listener(listener, &settings, Arc::new(MemoryGateway::new())).await;
        });

        let mut stream = TcpStream::connect(addr).await.unwrap();
        let hello = ClientEvent::Hello { identity: "amy".into() };
        stream.write_all(&encode_message(&hello).unwrap()).await.unwrap();
        let create = ClientEvent::CreateRoom { color: "#f00".into(), rotateable: true };
        stream.write_all(&encode_message(&create).unwrap()).await.unwrap();

        let mut messages = Vec::new();
        while messages.len() < 3 {
            let frame = read_frame(&mut stream).await.unwrap().unwrap();
            messages.push(decode_message::<ServerMessage>(&frame).unwrap());
        }
        assert!(matches!(&messages[1], ServerMessage::Welcome { identity, .. } if identity == "amy"));
        let ServerMessage::RoomCreated { state, players, .. } = &messages[2] else {
            panic!("expected room_created, got {:?}", messages[2]);
        };
        assert!(state.rotateable);
        assert_eq!(players.len(), 1);
    }
}
