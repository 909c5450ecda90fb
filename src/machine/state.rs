//! # Membership phases and the events that move between them.
//!
//! [`State`] and [`Event`] are closed enums; they carry no behavior beyond
//! labels. Transitions live in [`transition`](super::transition).

/// Lifecycle phase of the local node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// Looking up whether a cluster identifier already exists.
    GetCluster,
    /// No cluster exists yet; establishing one.
    CreateCluster,
    /// Registering this node's presence under the cluster with a lease.
    Announce,
    /// Announced; the lease is being refreshed.
    Running,
    /// Leaving the cluster. Absorbing.
    Stop,
}

impl State {
    /// Every phase, in declaration order.
    pub const ALL: [State; 5] = [
        State::GetCluster,
        State::CreateCluster,
        State::Announce,
        State::Running,
        State::Stop,
    ];

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            State::GetCluster => "get_cluster",
            State::CreateCluster => "create_cluster",
            State::Announce => "announce",
            State::Running => "running",
            State::Stop => "stop",
        }
    }

    pub(crate) fn as_u8(self) -> u8 {
        match self {
            State::GetCluster => 0,
            State::CreateCluster => 1,
            State::Announce => 2,
            State::Running => 3,
            State::Stop => 4,
        }
    }

    pub(crate) fn from_u8(raw: u8) -> State {
        match raw {
            0 => State::GetCluster,
            1 => State::CreateCluster,
            2 => State::Announce,
            3 => State::Running,
            _ => State::Stop,
        }
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Outcome reported by a runner, or a request issued by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    /// A cluster identifier exists.
    ClusterDefined,
    /// No cluster identifier exists.
    ClusterUndefined,
    /// A cluster identifier was just established.
    ClusterCreated,
    /// This node's announcement was written.
    Announced,
    /// This node's announcement was removed.
    AnnounceCleared,
    /// Refreshing the lease failed because the key is gone.
    AnnounceRefreshFailedWithNoKey,
    /// The node is shutting down.
    Stopped,
    /// Reset request.
    Reset,
}

impl Event {
    /// Every event, in declaration order.
    pub const ALL: [Event; 8] = [
        Event::ClusterDefined,
        Event::ClusterUndefined,
        Event::ClusterCreated,
        Event::Announced,
        Event::AnnounceCleared,
        Event::AnnounceRefreshFailedWithNoKey,
        Event::Stopped,
        Event::Reset,
    ];

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            Event::ClusterDefined => "cluster_defined",
            Event::ClusterUndefined => "cluster_undefined",
            Event::ClusterCreated => "cluster_created",
            Event::Announced => "announced",
            Event::AnnounceCleared => "announce_cleared",
            Event::AnnounceRefreshFailedWithNoKey => "announce_refresh_failed_with_no_key",
            Event::Stopped => "stopped",
            Event::Reset => "reset",
        }
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_label())
    }
}
