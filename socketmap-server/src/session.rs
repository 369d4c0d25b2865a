//! Session management.

use std::net::SocketAddr;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Position of a connection in its request/reply cycle.
///
/// ```text
/// Reading -> Dispatching -> Replying -> Reading ...
///    \___________\______________\______> Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for bytes from the peer.
    Reading,
    /// A request was decoded and is being looked up.
    Dispatching,
    /// A reply is being written.
    Replying,
    /// The connection is finished. Terminal.
    Closed,
}

/// Per-connection state, passed to the backend as the lookup context.
pub struct Session {
    /// Unique session ID.
    pub id: String,

    /// Remote address.
    pub remote_addr: SocketAddr,

    state: SessionState,

    /// Requests dispatched to the backend.
    request_count: u64,

    created_at: Instant,

    last_activity: Instant,
}

impl Session {
    /// Creates a new session in the `Reading` state.
    pub fn new(remote_addr: SocketAddr) -> Self {
        let now = Instant::now();
        Self {
            id: Uuid::new_v4().to_string(),
            remote_addr,
            state: SessionState::Reading,
            request_count: 0,
            created_at: now,
            last_activity: now,
        }
    }

    /// Returns the session state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Sets the session state. `Closed` is terminal.
    pub fn set_state(&mut self, state: SessionState) {
        if self.state != SessionState::Closed {
            self.state = state;
        }
    }

    /// Moves the session to `Closed`.
    pub fn close(&mut self) {
        self.state = SessionState::Closed;
    }

    /// Returns whether the session has been closed.
    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    /// Records a dispatched request.
    pub fn record_request(&mut self) {
        self.request_count += 1;
        self.touch();
    }

    /// Marks the session as active now.
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Returns the request count.
    pub fn request_count(&self) -> u64 {
        self.request_count
    }

    /// Returns the time since last activity.
    pub fn idle_duration(&self) -> Duration {
        self.last_activity.elapsed()
    }

    /// Returns the session age.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}
