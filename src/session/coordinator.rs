//! Orchestrates room membership, persistence and broadcast for every
//! client operation.

use super::{
    ClientEvent, ConnectionRegistry, KeyedLocks, MessageLog, RoomDirectory, ServerEvent,
};
use crate::{
    conn::Transport,
    core::{
        constant::{HISTORY_CLEARED_TEXT, SYSTEM_USER},
        validator::validate_room_name,
        Error,
    },
    store::{Connection, HistoryItem, MessageKind, Store},
    util::{config::Config, password::CredentialVerifier},
};
use std::{collections::HashSet, sync::Arc};
use tokio::sync::RwLock;
use validator::Validate;

#[derive(Validate)]
struct NewRoomRequest {
    #[validate(
        custom = "validate_room_name",
        length(max = 100, message = "Room name is too long.")
    )]
    name: String,
}

pub struct SessionCoordinator {
    registry: ConnectionRegistry,
    directory: RoomDirectory,
    log: MessageLog,
    transport: Arc<dyn Transport>,
    verifier: Arc<dyn CredentialVerifier>,
    // serializes room-mutating work per connection id
    sessions: KeyedLocks,
    // connections whose Disconnect already ran, checked under the session lock
    closed: RwLock<HashSet<String>>,
    default_room: String,
}

impl SessionCoordinator {
    pub fn new(
        config: &Config,
        store: Arc<dyn Store>,
        transport: Arc<dyn Transport>,
        verifier: Arc<dyn CredentialVerifier>,
    ) -> Self {
        let timeout = config.store_timeout;

        Self {
            registry: ConnectionRegistry::new(store.clone(), timeout, config.occupant_limit),
            directory: RoomDirectory::new(store.clone(), timeout, config.room_list_limit),
            log: MessageLog::new(store, timeout, config.history_limit),
            transport,
            verifier,
            sessions: KeyedLocks::new(),
            closed: RwLock::new(HashSet::new()),
            default_room: config.default_room.clone(),
        }
    }

    /// Prepare the store for a fresh process: registry entries from a previous
    /// run have no group membership behind them, and the fallback room must exist.
    pub async fn init(&self) -> Result<(), Error> {
        let stale = self.registry.purge().await?;
        if stale > 0 {
            tracing::info!("purged {} stale connection records", stale);
        }

        let room = self.directory.ensure(&self.default_room).await?;
        tracing::info!("default room is '{}'", room.name);
        Ok(())
    }

    /// Run one client operation. Failures never escape: they are logged with
    /// their context and reported to the caller only.
    pub async fn handle(&self, connection_id: &str, event: ClientEvent) {
        let op = event.name();
        let room = match &event {
            ClientEvent::SendMessage(_) => None,
            ClientEvent::CreateRoom(name) => Some(name.clone()),
            ClientEvent::JoinRoom(_, room) => Some(room.clone()),
            ClientEvent::ClearRoomHistory(room, _) => Some(room.clone()),
        };

        let result = match event {
            ClientEvent::SendMessage(content) => self.send_message(connection_id, &content).await,
            ClientEvent::CreateRoom(name) => self.create_room(connection_id, &name).await,
            ClientEvent::JoinRoom(username, room) => {
                self.join_room(connection_id, &username, &room).await
            }
            ClientEvent::ClearRoomHistory(room, credential) => {
                self.clear_room_history(connection_id, &room, &credential)
                    .await
            }
        };

        let Err(err) = result else {
            return;
        };

        let room = room.unwrap_or_default();
        if err.is_store_failure() || matches!(err, Error::Internal(_) | Error::SerializeMessage) {
            tracing::error!(conn = connection_id, op, room = %room, "operation failed: {}", err);
        } else {
            tracing::warn!(conn = connection_id, op, room = %room, "operation rejected: {}", err);
        }

        let reply = match op {
            "CreateRoom" if err.is_room_rejection() => {
                ServerEvent::RoomCreationFailed(err.client_message())
            }
            _ => ServerEvent::OperationFailed(err.client_message()),
        };
        self.transport.send_to_caller(connection_id, &reply).await;
    }

    pub async fn create_room(&self, connection_id: &str, name: &str) -> Result<(), Error> {
        let req = NewRoomRequest {
            name: name.to_owned(),
        };
        req.validate()?;

        let room = self.directory.create(&req.name).await?;

        let content = format!("Room '{}' was created", room.name);
        self.log.record_system(&room.name, &content).await;

        // the room exists from here on, a failed listing only skips the refresh
        match self.directory.list_names().await {
            Ok(rooms) => {
                self.transport
                    .send_to_all(&ServerEvent::RoomListUpdated(rooms))
                    .await
            }
            Err(e) => tracing::error!(room = %room.name, "failed to list rooms: {}", e),
        }

        self.transport
            .send_to_caller(connection_id, &ServerEvent::RoomCreated(room.name))
            .await;
        Ok(())
    }

    /// Join a room, leaving the current one first. An empty username only
    /// asks for the room list.
    pub async fn join_room(
        &self,
        connection_id: &str,
        username: &str,
        room: &str,
    ) -> Result<(), Error> {
        if username.is_empty() {
            let rooms = self.directory.list_names().await?;
            self.transport
                .send_to_caller(connection_id, &ServerEvent::AvailableRooms(rooms))
                .await;
            return Ok(());
        }

        let room = self.resolve_room(room).await?;

        let previous = {
            let _guard = self.sessions.lock(connection_id).await;

            if self.is_closed(connection_id).await {
                None
            } else {
                let previous = self.registry.get(connection_id).await?;
                self.registry.upsert(connection_id, username, &room).await?;
                if let Some(prev) = &previous {
                    self.transport.leave_group(connection_id, &prev.room).await;
                }
                self.transport.join_group(connection_id, &room).await;
                Some(previous)
            }
        };

        // the connection went away while the join was in flight
        let Some(previous) = previous else {
            self.sessions.forget(connection_id);
            tracing::debug!(conn = connection_id, "join of a closed connection dropped");
            return Ok(());
        };

        if let Some(prev) = previous {
            self.announce_leave(&prev).await;
        }

        let content = format!("{} has joined the room", username);
        self.log.record_system(&room, &content).await;
        self.transport
            .send_to_group(&room, &ServerEvent::UserJoined(username.to_owned()))
            .await;

        self.send_history(connection_id, &room).await;
        self.send_room_details(connection_id, &room).await?;

        tracing::info!(conn = connection_id, "user '{}' joined room '{}'", username, room);
        Ok(())
    }

    /// Broadcast a chat message to the caller's room. Callers that have not
    /// joined a room are ignored.
    pub async fn send_message(&self, connection_id: &str, content: &str) -> Result<(), Error> {
        let connection = {
            let _guard = self.sessions.lock(connection_id).await;
            self.registry.get(connection_id).await?
        };

        let Some(connection) = connection else {
            tracing::warn!(conn = connection_id, "connection not found, message dropped");
            return Ok(());
        };

        let message = self.log.stamp(
            MessageKind::UserMessage,
            &connection.room,
            &connection.username,
            content,
        );

        self.transport
            .send_to_group(
                &connection.room,
                &ServerEvent::ReceiveMessage(connection.username.clone(), content.to_owned()),
            )
            .await;
        self.log.append(&message).await;

        Ok(())
    }

    /// Delete the stored history of a room, restricted to verified callers
    pub async fn clear_room_history(
        &self,
        connection_id: &str,
        room: &str,
        credential: &str,
    ) -> Result<(), Error> {
        if !self.verifier.verify(credential) {
            return Err(Error::Unauthorized);
        }

        let room = self.directory.find(room).await?.ok_or(Error::NotFound)?.name;

        let deleted = self.log.clear(&room).await?;
        tracing::info!(conn = connection_id, "cleared {} messages of room '{}'", deleted, room);

        self.log.record_system(&room, HISTORY_CLEARED_TEXT).await;
        self.transport
            .send_to_group(&room, &ServerEvent::HistoryCleared)
            .await;
        self.transport
            .send_to_group(
                &room,
                &ServerEvent::ReceiveMessage(SYSTEM_USER.to_owned(), HISTORY_CLEARED_TEXT.to_owned()),
            )
            .await;

        Ok(())
    }

    /// Connection lifecycle end. Safe to call for connections that never
    /// joined or were already cleaned up.
    pub async fn disconnect(&self, connection_id: &str) -> Result<(), Error> {
        let result = {
            let _guard = self.sessions.lock(connection_id).await;
            self.closed.write().await.insert(connection_id.to_owned());
            self.leave_current_room(connection_id).await
        };
        self.sessions.forget(connection_id);

        if let Some(connection) = result? {
            self.announce_leave(&connection).await;
            tracing::info!(
                conn = connection_id,
                "user '{}' disconnected from room '{}'",
                connection.username,
                connection.room
            );
        }
        Ok(())
    }

    /// Forget a disconnected connection once nothing can act on its behalf
    /// any more
    pub async fn release(&self, connection_id: &str) {
        self.closed.write().await.remove(connection_id);
        self.sessions.forget(connection_id);
    }

    /// Room names for read-only listings
    pub async fn room_names(&self) -> Result<Vec<String>, Error> {
        self.directory.list_names().await
    }

    // Must run under the connection's session lock
    async fn leave_current_room(&self, connection_id: &str) -> Result<Option<Connection>, Error> {
        let Some(connection) = self.registry.get(connection_id).await? else {
            return Ok(None);
        };

        // the socket is gone either way, a stale record is purged on next start
        if let Err(e) = self.registry.remove(connection_id).await {
            tracing::error!(conn = connection_id, "failed to remove connection: {}", e);
        }
        self.transport
            .leave_group(connection_id, &connection.room)
            .await;

        Ok(Some(connection))
    }

    async fn is_closed(&self, connection_id: &str) -> bool {
        self.closed.read().await.contains(connection_id)
    }

    async fn announce_leave(&self, connection: &Connection) {
        let content = format!("{} has left the room", connection.username);
        self.log.record_system(&connection.room, &content).await;
        self.transport
            .send_to_group(
                &connection.room,
                &ServerEvent::UserLeft(connection.username.clone()),
            )
            .await;
    }

    /// Stored name of the requested room, or the default room when the
    /// request is blank or unknown
    async fn resolve_room(&self, requested: &str) -> Result<String, Error> {
        if !requested.trim().is_empty() {
            if let Some(room) = self.directory.find(requested).await? {
                return Ok(room.name);
            }
            tracing::info!(
                "room '{}' not found, defaulting to {}",
                requested,
                self.default_room
            );
        }

        let room = self
            .directory
            .find(&self.default_room)
            .await?
            .map(|r| r.name)
            .unwrap_or_else(|| self.default_room.clone());
        Ok(room)
    }

    async fn send_history(&self, connection_id: &str, room: &str) {
        let messages = match self.log.recent(room).await {
            Ok(messages) => messages,
            Err(e) => {
                tracing::error!(room, "failed to retrieve message history: {}", e);
                return;
            }
        };

        if messages.is_empty() {
            return;
        }

        let items = messages.iter().map(HistoryItem::from).collect();
        self.transport
            .send_to_caller(connection_id, &ServerEvent::MessageHistory(items))
            .await;
    }

    async fn send_room_details(&self, connection_id: &str, room: &str) -> Result<(), Error> {
        let rooms = self.directory.list_names().await?;
        let users = self.registry.occupants(room).await?;

        self.transport
            .send_to_caller(connection_id, &ServerEvent::AvailableRooms(rooms))
            .await;
        self.transport
            .send_to_caller(connection_id, &ServerEvent::UsersInRoom(users))
            .await;
        self.transport
            .send_to_caller(connection_id, &ServerEvent::JoinedRoom(room.to_owned()))
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        conn::{ChannelHub, Client},
        store::{MemoryStore, Message, Room},
    };
    use async_trait::async_trait;
    use axum::extract::ws;
    use serde_json::Value;
    use std::{
        sync::atomic::{AtomicBool, AtomicU64, Ordering},
        time::Duration,
    };
    use tokio::sync::mpsc;

    struct StaticCredential(&'static str);

    impl CredentialVerifier for StaticCredential {
        fn verify(&self, credential: &str) -> bool {
            credential == self.0
        }
    }

    /// Memory store with switchable faults
    #[derive(Default)]
    struct FaultyStore {
        inner: MemoryStore,
        log_down: bool,
        rooms_down: AtomicBool,
        room_lookup_delay_ms: AtomicU64,
    }

    impl FaultyStore {
        fn log_down() -> Self {
            Self {
                log_down: true,
                ..Self::default()
            }
        }

        fn check_log(&self) -> Result<(), Error> {
            if self.log_down {
                return Err(Error::Sqlx(sqlx::Error::PoolTimedOut));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl Store for FaultyStore {
        async fn get_connection(&self, connection_id: &str) -> Result<Option<Connection>, Error> {
            self.inner.get_connection(connection_id).await
        }
        async fn put_connection(&self, connection: &Connection) -> Result<(), Error> {
            self.inner.put_connection(connection).await
        }
        async fn delete_connection(&self, connection_id: &str) -> Result<(), Error> {
            self.inner.delete_connection(connection_id).await
        }
        async fn find_connections_by_room(
            &self,
            room: &str,
            limit: usize,
        ) -> Result<Vec<Connection>, Error> {
            self.inner.find_connections_by_room(room, limit).await
        }
        async fn clear_connections(&self) -> Result<u64, Error> {
            self.inner.clear_connections().await
        }
        async fn find_room_by_name(&self, name: &str) -> Result<Option<Room>, Error> {
            let delay = self.room_lookup_delay_ms.load(Ordering::SeqCst);
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            if self.rooms_down.load(Ordering::SeqCst) {
                return Err(Error::Sqlx(sqlx::Error::PoolTimedOut));
            }
            self.inner.find_room_by_name(name).await
        }
        async fn insert_room(&self, room: &Room) -> Result<(), Error> {
            self.inner.insert_room(room).await
        }
        async fn list_rooms(&self, limit: usize) -> Result<Vec<Room>, Error> {
            self.inner.list_rooms(limit).await
        }
        async fn append_message(&self, message: &Message) -> Result<(), Error> {
            self.check_log()?;
            self.inner.append_message(message).await
        }
        async fn query_messages(&self, room: &str, limit: usize) -> Result<Vec<Message>, Error> {
            self.check_log()?;
            self.inner.query_messages(room, limit).await
        }
        async fn delete_messages(&self, room: &str) -> Result<u64, Error> {
            self.check_log()?;
            self.inner.delete_messages(room).await
        }
    }

    async fn setup_with(store: Arc<dyn Store>) -> (Arc<ChannelHub>, Arc<SessionCoordinator>) {
        setup_with_config(&Config::default(), store).await
    }

    async fn setup_with_config(
        config: &Config,
        store: Arc<dyn Store>,
    ) -> (Arc<ChannelHub>, Arc<SessionCoordinator>) {
        let hub = Arc::new(ChannelHub::new());
        let coordinator = Arc::new(SessionCoordinator::new(
            config,
            store,
            hub.clone(),
            Arc::new(StaticCredential("letmein")),
        ));
        coordinator.init().await.unwrap();
        (hub, coordinator)
    }

    async fn setup() -> (Arc<ChannelHub>, Arc<SessionCoordinator>) {
        setup_with(Arc::new(MemoryStore::new())).await
    }

    async fn connect(hub: &ChannelHub) -> (String, mpsc::Receiver<ws::Message>) {
        let (tx, rx) = mpsc::channel(64);
        let client = Client::new(tx);
        hub.register(&client).await;
        (client.id().to_owned(), rx)
    }

    fn drain(rx: &mut mpsc::Receiver<ws::Message>) -> Vec<Value> {
        let mut events = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            if let ws::Message::Text(text) = msg {
                events.push(serde_json::from_str(&text).unwrap());
            }
        }
        events
    }

    fn names(events: &[Value]) -> Vec<&str> {
        events.iter().map(|e| e["event"].as_str().unwrap()).collect()
    }

    fn find<'a>(events: &'a [Value], name: &str) -> &'a Value {
        events
            .iter()
            .find(|e| e["event"] == name)
            .unwrap_or_else(|| panic!("no {} event", name))
    }

    fn join(username: &str, room: &str) -> ClientEvent {
        ClientEvent::JoinRoom(username.into(), room.into())
    }

    #[tokio::test]
    async fn test_join_sends_room_details() {
        let (hub, coordinator) = setup().await;
        let (alice, mut rx) = connect(&hub).await;

        coordinator.handle(&alice, join("alice", "General")).await;

        let events = drain(&mut rx);
        assert_eq!(
            names(&events),
            vec![
                "UserJoined",
                "MessageHistory",
                "AvailableRooms",
                "UsersInRoom",
                "JoinedRoom"
            ]
        );
        assert_eq!(find(&events, "UsersInRoom")["args"][0], "alice");
        assert_eq!(find(&events, "JoinedRoom")["args"], "General");

        let history = &find(&events, "MessageHistory")["args"];
        assert_eq!(history[0]["type"], "SystemMessage");
        assert_eq!(history[0]["user"], "System");
        assert_eq!(history[0]["text"], "alice has joined the room");
    }

    #[tokio::test]
    async fn test_messages_reach_the_room() {
        let (hub, coordinator) = setup().await;
        let (alice, mut rx_a) = connect(&hub).await;
        let (bob, mut rx_b) = connect(&hub).await;
        let (carol, mut rx_c) = connect(&hub).await;

        coordinator.handle(&carol, ClientEvent::CreateRoom("Rust".into())).await;
        coordinator.handle(&alice, join("alice", "General")).await;
        coordinator.handle(&bob, join("bob", "general")).await;
        coordinator.handle(&carol, join("carol", "Rust")).await;

        let events = drain(&mut rx_a);
        assert_eq!(find(&events, "UserJoined")["args"], "alice");
        assert!(events
            .iter()
            .any(|e| e["event"] == "UserJoined" && e["args"] == "bob"));
        drain(&mut rx_b);
        drain(&mut rx_c);

        coordinator.handle(&bob, ClientEvent::SendMessage("hi".into())).await;

        for rx in [&mut rx_a, &mut rx_b] {
            let events = drain(rx);
            assert_eq!(names(&events), vec!["ReceiveMessage"]);
            assert_eq!(events[0]["args"], serde_json::json!(["bob", "hi"]));
        }
        assert!(drain(&mut rx_c).is_empty());

        let history = coordinator.log.recent("General").await.unwrap();
        let last = history.last().unwrap();
        assert_eq!(last.username, "bob");
        assert_eq!(last.kind, MessageKind::UserMessage);
    }

    #[tokio::test]
    async fn test_switching_rooms_leaves_previous() {
        let (hub, coordinator) = setup().await;
        let (alice, mut rx_a) = connect(&hub).await;
        let (bob, mut rx_b) = connect(&hub).await;

        coordinator.handle(&alice, ClientEvent::CreateRoom("Rust".into())).await;
        coordinator.handle(&alice, join("alice", "General")).await;
        coordinator.handle(&bob, join("bob", "General")).await;
        drain(&mut rx_a);
        drain(&mut rx_b);

        coordinator.handle(&alice, join("alice", "Rust")).await;
        drain(&mut rx_a);

        let events = drain(&mut rx_b);
        assert_eq!(names(&events), vec!["UserLeft"]);
        assert_eq!(events[0]["args"], "alice");

        assert_eq!(hub.groups_of(&alice).await, vec!["Rust"]);
        let registry = &coordinator.registry;
        assert_eq!(registry.occupants("General").await.unwrap(), vec!["bob"]);
        assert_eq!(registry.occupants("Rust").await.unwrap(), vec!["alice"]);

        // a message now only reaches the new room
        coordinator.handle(&alice, ClientEvent::SendMessage("hello".into())).await;
        assert!(drain(&mut rx_b).is_empty());
        assert_eq!(names(&drain(&mut rx_a)), vec!["ReceiveMessage"]);
    }

    #[tokio::test]
    async fn test_disconnect_cleans_up() {
        let (hub, coordinator) = setup().await;
        let (alice, _rx_a) = connect(&hub).await;
        let (bob, mut rx_b) = connect(&hub).await;

        coordinator.handle(&alice, join("alice", "General")).await;
        coordinator.handle(&bob, join("bob", "General")).await;
        drain(&mut rx_b);

        coordinator.disconnect(&alice).await.unwrap();

        let events = drain(&mut rx_b);
        assert_eq!(names(&events), vec!["UserLeft"]);
        assert!(coordinator.registry.get(&alice).await.unwrap().is_none());
        assert!(hub.groups_of(&alice).await.is_empty());
        assert_eq!(hub.members("General").await, vec![bob.clone()]);

        // second disconnect and disconnect without join are no-ops
        coordinator.disconnect(&alice).await.unwrap();
        let (idle, _rx) = connect(&hub).await;
        coordinator.disconnect(&idle).await.unwrap();
        assert!(drain(&mut rx_b).is_empty());
    }

    #[tokio::test]
    async fn test_send_without_join_is_ignored() {
        let (hub, coordinator) = setup().await;
        let (alice, mut rx) = connect(&hub).await;

        coordinator.handle(&alice, ClientEvent::SendMessage("hi".into())).await;

        assert!(drain(&mut rx).is_empty());
        assert!(coordinator.log.recent("General").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_discovery_only_lists_rooms() {
        let (hub, coordinator) = setup().await;
        let (alice, mut rx) = connect(&hub).await;

        coordinator.handle(&alice, join("", "")).await;

        let events = drain(&mut rx);
        assert_eq!(names(&events), vec!["AvailableRooms"]);
        assert_eq!(events[0]["args"], serde_json::json!(["General"]));
        assert!(coordinator.registry.get(&alice).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_room_falls_back_to_default() {
        let (hub, coordinator) = setup().await;
        let (alice, mut rx) = connect(&hub).await;

        coordinator.handle(&alice, join("alice", "Nowhere")).await;

        let events = drain(&mut rx);
        assert_eq!(find(&events, "JoinedRoom")["args"], "General");
        assert_eq!(hub.groups_of(&alice).await, vec!["General"]);
    }

    #[tokio::test]
    async fn test_create_room_rejections() {
        let (hub, coordinator) = setup().await;
        let (alice, mut rx) = connect(&hub).await;

        coordinator.handle(&alice, ClientEvent::CreateRoom("   ".into())).await;
        let events = drain(&mut rx);
        assert_eq!(names(&events), vec!["RoomCreationFailed"]);
        assert_eq!(events[0]["args"], "Room name cannot be empty.");

        coordinator.handle(&alice, ClientEvent::CreateRoom("GENERAL".into())).await;
        let events = drain(&mut rx);
        assert_eq!(names(&events), vec!["RoomCreationFailed"]);
        assert_eq!(events[0]["args"], "Room 'GENERAL' already exists.");

        coordinator
            .handle(&alice, ClientEvent::CreateRoom("x".repeat(101)))
            .await;
        let events = drain(&mut rx);
        assert_eq!(events[0]["args"], "Room name is too long.");
    }

    #[tokio::test]
    async fn test_create_room_notifies_everyone() {
        let (hub, coordinator) = setup().await;
        let (alice, mut rx_a) = connect(&hub).await;
        let (_bob, mut rx_b) = connect(&hub).await;

        coordinator.handle(&alice, ClientEvent::CreateRoom(" Rust ".into())).await;

        let events = drain(&mut rx_a);
        assert_eq!(names(&events), vec!["RoomListUpdated", "RoomCreated"]);
        assert_eq!(events[0]["args"], serde_json::json!(["General", "Rust"]));
        assert_eq!(events[1]["args"], "Rust");
        assert_eq!(names(&drain(&mut rx_b)), vec!["RoomListUpdated"]);

        let history = coordinator.log.recent("Rust").await.unwrap();
        assert_eq!(history[0].content, "Room 'Rust' was created");
    }

    #[tokio::test]
    async fn test_concurrent_create_room() {
        let (hub, coordinator) = setup().await;

        let mut clients = Vec::new();
        let mut tasks = Vec::new();
        for name in ["Lobby", "lobby", "LOBBY", "Lobby"] {
            let (id, rx) = connect(&hub).await;
            let coordinator = coordinator.clone();
            let conn = id.clone();
            tasks.push(tokio::spawn(async move {
                coordinator.handle(&conn, ClientEvent::CreateRoom(name.into())).await
            }));
            clients.push(rx);
        }
        for task in tasks {
            task.await.unwrap();
        }

        let mut created = 0;
        let mut failed = 0;
        for rx in clients.iter_mut() {
            for event in drain(rx) {
                match event["event"].as_str().unwrap() {
                    "RoomCreated" => created += 1,
                    "RoomCreationFailed" => failed += 1,
                    _ => {}
                }
            }
        }
        assert_eq!(created, 1);
        assert_eq!(failed, 3);
        assert_eq!(
            coordinator.room_names().await.unwrap(),
            vec!["General", "Lobby"]
        );
    }

    #[tokio::test]
    async fn test_clear_history_requires_credential() {
        let (hub, coordinator) = setup().await;
        let (alice, mut rx) = connect(&hub).await;
        coordinator.handle(&alice, join("alice", "General")).await;
        coordinator.handle(&alice, ClientEvent::SendMessage("hi".into())).await;
        drain(&mut rx);

        coordinator
            .handle(&alice, ClientEvent::ClearRoomHistory("General".into(), "guess".into()))
            .await;
        let events = drain(&mut rx);
        assert_eq!(names(&events), vec!["OperationFailed"]);
        assert_eq!(events[0]["args"], "Unauthorized access");
        assert_eq!(coordinator.log.recent("General").await.unwrap().len(), 2);

        coordinator
            .handle(&alice, ClientEvent::ClearRoomHistory("Nowhere".into(), "letmein".into()))
            .await;
        assert_eq!(names(&drain(&mut rx)), vec!["OperationFailed"]);

        coordinator
            .handle(&alice, ClientEvent::ClearRoomHistory("general".into(), "letmein".into()))
            .await;
        let events = drain(&mut rx);
        assert_eq!(names(&events), vec!["HistoryCleared", "ReceiveMessage"]);
        assert_eq!(
            events[1]["args"],
            serde_json::json!(["System", HISTORY_CLEARED_TEXT])
        );

        let history = coordinator.log.recent("General").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, HISTORY_CLEARED_TEXT);
    }

    #[tokio::test]
    async fn test_broken_log_still_broadcasts() {
        let (hub, coordinator) = setup_with(Arc::new(FaultyStore::log_down())).await;
        let (alice, mut rx) = connect(&hub).await;

        coordinator.handle(&alice, join("alice", "General")).await;
        let events = drain(&mut rx);
        assert_eq!(
            names(&events),
            vec!["UserJoined", "AvailableRooms", "UsersInRoom", "JoinedRoom"]
        );

        coordinator.handle(&alice, ClientEvent::SendMessage("hi".into())).await;
        assert_eq!(names(&drain(&mut rx)), vec!["ReceiveMessage"]);

        coordinator
            .handle(&alice, ClientEvent::ClearRoomHistory("General".into(), "letmein".into()))
            .await;
        let events = drain(&mut rx);
        assert_eq!(names(&events), vec!["OperationFailed"]);
        assert_eq!(events[0]["args"], "Database operation failed");
    }

    #[tokio::test]
    async fn test_disconnect_during_join_leaves_nothing_behind() {
        let store = Arc::new(FaultyStore::default());
        let (hub, coordinator) = setup_with(store.clone()).await;
        let (alice, _rx) = connect(&hub).await;

        store.room_lookup_delay_ms.store(100, Ordering::SeqCst);
        let join_task = {
            let coordinator = coordinator.clone();
            let conn = alice.clone();
            tokio::spawn(async move { coordinator.handle(&conn, join("alice", "General")).await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        coordinator.disconnect(&alice).await.unwrap();
        join_task.await.unwrap();
        hub.unregister(&alice).await;

        assert!(coordinator.registry.get(&alice).await.unwrap().is_none());
        assert!(coordinator.registry.occupants("General").await.unwrap().is_empty());
        assert!(hub.groups_of(&alice).await.is_empty());
        assert!(coordinator.sessions.is_empty());

        coordinator.release(&alice).await;
        assert!(coordinator.closed.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_joins_of_one_connection_stay_coherent() {
        let (hub, coordinator) = setup().await;
        let (alice, _rx) = connect(&hub).await;
        for name in ["Rust", "Go", "Zig"] {
            coordinator.directory.create(name).await.unwrap();
        }

        let mut tasks = Vec::new();
        for room in ["Rust", "Go", "Zig", "General", "Rust", "Go"] {
            let coordinator = coordinator.clone();
            let conn = alice.clone();
            tasks.push(tokio::spawn(async move {
                coordinator.handle(&conn, join("alice", room)).await
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let connection = coordinator.registry.get(&alice).await.unwrap().unwrap();
        assert_eq!(hub.groups_of(&alice).await, vec![connection.room.clone()]);
        for room in ["Rust", "Go", "Zig", "General"] {
            let occupants = coordinator.registry.occupants(room).await.unwrap();
            assert_eq!(occupants.len(), usize::from(room == connection.room));
        }
    }

    #[tokio::test]
    async fn test_slow_store_times_out() {
        let config = Config {
            store_timeout: Duration::from_millis(50),
            ..Config::default()
        };
        let store = Arc::new(FaultyStore::default());
        let (hub, coordinator) = setup_with_config(&config, store.clone()).await;
        let (alice, mut rx) = connect(&hub).await;

        store.room_lookup_delay_ms.store(500, Ordering::SeqCst);
        let err = coordinator.directory.find("General").await.unwrap_err();
        assert!(matches!(err, Error::StoreTimeout));

        coordinator.handle(&alice, ClientEvent::CreateRoom("Lobby".into())).await;
        let events = drain(&mut rx);
        assert_eq!(names(&events), vec!["OperationFailed"]);
        assert_eq!(events[0]["args"], "Database operation failed");

        store.room_lookup_delay_ms.store(0, Ordering::SeqCst);
        assert_eq!(coordinator.room_names().await.unwrap(), vec!["General"]);
    }

    #[tokio::test]
    async fn test_create_room_aborts_when_lookup_fails() {
        let store = Arc::new(FaultyStore::default());
        let (hub, coordinator) = setup_with(store.clone()).await;
        let (alice, mut rx) = connect(&hub).await;
        let (_bob, mut rx_b) = connect(&hub).await;

        store.rooms_down.store(true, Ordering::SeqCst);
        coordinator.handle(&alice, ClientEvent::CreateRoom("Lobby".into())).await;

        let events = drain(&mut rx);
        assert_eq!(names(&events), vec!["OperationFailed"]);
        assert_eq!(events[0]["args"], "Database operation failed");
        assert!(drain(&mut rx_b).is_empty());

        let rooms = store.inner.list_rooms(10).await.unwrap();
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].name, "General");
    }
}
