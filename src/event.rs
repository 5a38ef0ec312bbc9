//! The event server: the append-only delta stream consumed by viewers.
//!
//! Transactions append one typed event per render-tree difference; any
//! number of listeners, each with its own cursor, observe the sequence in
//! append order. Listeners may block on the next event with or without a
//! timeout, and observe a "server gone" error once the engine that owns the
//! server is dropped.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use log::trace;
use parking_lot::{Condvar, Mutex};
use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::error::{Error, Result};
use crate::geometry::Geometry;
use crate::path::Path;

/// The delta change type a thin client should act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Create a mesh at the event's path.
    Add,
    /// Delete the mesh at the path.
    Remove,
    /// Update the mesh's position.
    Move,
    /// Update the mesh's shape (clients may remove and re-add).
    Resize,
    /// Update the mesh's color and opacity.
    Recolor,
    /// Update the mesh's label.
    Retext,
}

impl EventKind {
    /// The stable wire code of the kind.
    pub fn code(self) -> u8 {
        match self {
            EventKind::Add => 0,
            EventKind::Remove => 1,
            EventKind::Move => 2,
            EventKind::Resize => 3,
            EventKind::Recolor => 4,
            EventKind::Retext => 5,
        }
    }
}

/// One delta between two rendered scenes.
#[derive(Debug, Clone)]
pub struct Event {
    /// The path the delta applies to.
    pub path: Path,
    /// A snapshot of the geometry at the path (the removed geometry for
    /// [`EventKind::Remove`]).
    pub geometry: Geometry,
    /// What changed.
    pub kind: EventKind,
}

impl Serialize for Event {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Event", 3)?;
        state.serialize_field("event_type", &self.kind.code())?;
        state.serialize_field("path", &self.path.to_string())?;
        state.serialize_field("geometry", &self.geometry)?;
        state.end()
    }
}

/// What a listener wants to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventFilter {
    /// Every event.
    ReceiveAll,
    /// Only events whose geometry is drawable; layout-only geometry changes
    /// are skipped.
    #[default]
    SkipNonDrawable,
}

/// Identifies a listener's cursor within the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerToken(u32);

struct ListenerCursor {
    filter: EventFilter,
    index: usize,
}

#[derive(Default)]
struct ServerState {
    events: Vec<Event>,
    listeners: HashMap<ListenerToken, ListenerCursor>,
    next_token: u32,
    closed: bool,
}

/// The shared append-only event sequence plus the listener cursor table.
#[derive(Default)]
pub struct EventServer {
    state: Mutex<ServerState>,
    available: Condvar,
}

impl EventServer {
    /// Builds a fresh, shareable server.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers a new listener starting at the beginning of the sequence.
    pub fn request_listener(self: &Arc<Self>, filter: EventFilter) -> EventListener {
        let mut state = self.state.lock();
        let token = ListenerToken(state.next_token);
        state.next_token += 1;
        state.listeners.insert(token, ListenerCursor { filter, index: 0 });
        EventListener { server: Arc::downgrade(self), token }
    }

    /// Appends an event and wakes every blocked listener.
    pub(crate) fn append(&self, event: Event) {
        let mut state = self.state.lock();
        trace!("event #{}: {:?} at {}", state.events.len(), event.kind, event.path);
        state.events.push(event);
        drop(state);

        self.available.notify_all();
    }

    /// Marks the server dead and wakes every blocked listener; all later
    /// listener calls observe [`Error::ServerGone`].
    pub(crate) fn close(&self) {
        self.state.lock().closed = true;
        self.available.notify_all();
    }

    fn release(&self, token: ListenerToken) {
        self.state.lock().listeners.remove(&token);
    }

    fn index_of_next_event(state: &ServerState, token: ListenerToken) -> Option<usize> {
        let cursor = state.listeners.get(&token)?;
        let mut index = cursor.index;
        while index < state.events.len() {
            let drawable = state.events[index].geometry.should_draw();
            if cursor.filter == EventFilter::SkipNonDrawable && !drawable {
                index += 1;
                continue;
            }
            break;
        }
        Some(index)
    }

    fn pop_locked(state: &mut ServerState, token: ListenerToken) -> Option<Event> {
        let index = Self::index_of_next_event(state, token)?;
        if index >= state.events.len() {
            return None;
        }
        let event = state.events[index].clone();
        if let Some(cursor) = state.listeners.get_mut(&token) {
            cursor.index = index + 1;
        }
        Some(event)
    }

    fn try_pop(&self, token: ListenerToken) -> Result<Option<Event>> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(Error::ServerGone);
        }
        Ok(Self::pop_locked(&mut state, token))
    }

    fn wait(&self, token: ListenerToken) -> Result<Event> {
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return Err(Error::ServerGone);
            }
            if let Some(event) = Self::pop_locked(&mut state, token) {
                return Ok(event);
            }
            self.available.wait(&mut state);
        }
    }

    fn wait_timeout(&self, token: ListenerToken, timeout: Duration) -> Result<Option<Event>> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return Err(Error::ServerGone);
            }
            if let Some(event) = Self::pop_locked(&mut state, token) {
                return Ok(Some(event));
            }
            if self.available.wait_until(&mut state, deadline).timed_out() {
                if state.closed {
                    return Err(Error::ServerGone);
                }
                return Ok(Self::pop_locked(&mut state, token));
            }
        }
    }
}

/// A consumer-side cursor over the event sequence.
///
/// Listeners hold only a weak reference to the server: they never keep it
/// alive, and every operation reports [`Error::ServerGone`] once the engine
/// (and with it the server) is dropped. Dropping the listener releases its
/// cursor.
pub struct EventListener {
    server: Weak<EventServer>,
    token: ListenerToken,
}

impl EventListener {
    fn server(&self) -> Result<Arc<EventServer>> {
        self.server.upgrade().ok_or(Error::ServerGone)
    }

    /// The listener's cursor token.
    pub fn token(&self) -> ListenerToken {
        self.token
    }

    /// Returns the next event if one is available, without blocking.
    pub fn poll(&self) -> Result<Option<Event>> {
        self.server()?.try_pop(self.token)
    }

    /// Blocks until the next event is available.
    pub fn wait(&self) -> Result<Event> {
        self.server()?.wait(self.token)
    }

    /// Blocks until the next event is available or the timeout elapses;
    /// `Ok(None)` means timeout.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<Option<Event>> {
        self.server()?.wait_timeout(self.token, timeout)
    }
}

impl Drop for EventListener {
    fn drop(&mut self) {
        if let Some(server) = self.server.upgrade() {
            server.release(self.token);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::Bounds;
    use crate::coords::Point;

    fn drawable_event(name: &str, kind: EventKind) -> Event {
        Event {
            path: format!(".{name}").parse().unwrap_or_else(|err| panic!("{err}")),
            geometry: Geometry::from_mesh(
                vec![Point::ZERO, Point::new(1.0, 0.0, 0.0), Point::new(0.0, 1.0, 0.0)],
                vec![[0, 1, 2]],
                Point::ZERO,
            ),
            kind,
        }
    }

    fn layout_event(name: &str) -> Event {
        Event {
            path: format!(".{name}").parse().unwrap_or_else(|err| panic!("{err}")),
            geometry: Geometry::empty(Point::ZERO, Bounds::default()),
            kind: EventKind::Resize,
        }
    }

    #[test]
    fn listeners_see_events_in_append_order_exactly_once() {
        let server = EventServer::new();
        let listener = server.request_listener(EventFilter::ReceiveAll);

        server.append(drawable_event("a", EventKind::Add));
        server.append(drawable_event("b", EventKind::Move));
        server.append(drawable_event("c", EventKind::Remove));

        let kinds: Vec<EventKind> = std::iter::from_fn(|| {
            listener.poll().unwrap_or_else(|err| panic!("{err}"))
        })
        .map(|event| event.kind)
        .collect();
        assert_eq!(kinds, vec![EventKind::Add, EventKind::Move, EventKind::Remove]);
        assert!(listener.poll().unwrap_or_else(|err| panic!("{err}")).is_none());
    }

    #[test]
    fn late_listeners_replay_from_the_start() {
        let server = EventServer::new();
        let first = server.request_listener(EventFilter::ReceiveAll);
        server.append(drawable_event("a", EventKind::Add));
        server.append(drawable_event("b", EventKind::Add));
        server.append(drawable_event("c", EventKind::Add));

        let mut first_paths = Vec::new();
        while let Some(event) = first.poll().unwrap_or_else(|err| panic!("{err}")) {
            first_paths.push(event.path);
        }
        assert_eq!(first_paths.len(), 3);

        let second = server.request_listener(EventFilter::ReceiveAll);
        let mut second_paths = Vec::new();
        while let Some(event) = second.poll().unwrap_or_else(|err| panic!("{err}")) {
            second_paths.push(event.path);
        }
        assert_eq!(first_paths, second_paths);
    }

    #[test]
    fn the_drawable_filter_skips_layout_geometry() {
        let server = EventServer::new();
        let listener = server.request_listener(EventFilter::SkipNonDrawable);

        server.append(layout_event("layout"));
        server.append(drawable_event("mesh", EventKind::Add));
        server.append(layout_event("layout2"));

        let event = listener.poll().unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(event.map(|event| event.path.to_string()), Some(".mesh".to_string()));
        assert!(listener.poll().unwrap_or_else(|err| panic!("{err}")).is_none());
    }

    #[test]
    fn wait_timeout_returns_none_without_events() {
        let server = EventServer::new();
        let listener = server.request_listener(EventFilter::ReceiveAll);
        let result = listener.wait_timeout(Duration::from_millis(20));
        assert!(matches!(result, Ok(None)));
    }

    #[test]
    fn waiting_listeners_wake_on_append() {
        let server = EventServer::new();
        let listener = server.request_listener(EventFilter::ReceiveAll);

        let appender = {
            let server = Arc::clone(&server);
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(10));
                server.append(drawable_event("a", EventKind::Add));
            })
        };

        let event = listener.wait().unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(event.kind, EventKind::Add);
        appender.join().unwrap_or_else(|_| panic!("appender thread panicked"));
    }

    #[test]
    fn a_dropped_server_is_observable() {
        let server = EventServer::new();
        let listener = server.request_listener(EventFilter::ReceiveAll);
        drop(server);
        assert!(matches!(listener.poll(), Err(Error::ServerGone)));
        assert!(matches!(listener.wait(), Err(Error::ServerGone)));
    }

    #[test]
    fn a_closed_server_wakes_blocked_waiters() {
        let server = EventServer::new();
        let listener = server.request_listener(EventFilter::ReceiveAll);

        let closer = {
            let server = Arc::clone(&server);
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(10));
                server.close();
            })
        };

        assert!(matches!(listener.wait(), Err(Error::ServerGone)));
        closer.join().unwrap_or_else(|_| panic!("closer thread panicked"));
    }

    #[test]
    fn events_serialize_to_the_wire_shape() {
        let event = drawable_event("a", EventKind::Recolor);
        let value = serde_json::to_value(&event).unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(value["event_type"], serde_json::json!(4));
        assert_eq!(value["path"], serde_json::json!(".a"));
        assert_eq!(value["geometry"]["should_draw"], serde_json::json!(true));
        assert_eq!(value["geometry"]["triangles"][0], serde_json::json!([0, 1, 2]));
    }
}
