use tokio::sync::broadcast;

/// Something in the document store changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    AssignmentsChanged { user_id: String },
    UsersChanged,
}

impl ChangeEvent {
    /// Whether a subscriber watching `user_id`'s assignments must re-snapshot.
    pub fn affects_assignments_of(&self, user_id: &str) -> bool {
        match self {
            ChangeEvent::AssignmentsChanged { user_id: owner } => owner == user_id,
            ChangeEvent::UsersChanged => false,
        }
    }

    /// Whether the admin screen (user list and app totals) must re-snapshot.
    pub fn affects_admin_view(&self) -> bool {
        match self {
            // contagens por usuário e totais por status mudam com qualquer assignment
            ChangeEvent::AssignmentsChanged { .. } => true,
            ChangeEvent::UsersChanged => true,
        }
    }
}

/// Fan-out of store mutations to live subscribers (SSE streams).
///
/// Publishing never blocks; with no subscribers the event is dropped.
/// A receiver that falls behind gets `Lagged` and should simply re-snapshot.
#[derive(Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, event: ChangeEvent) {
        let receivers = self.sender.send(event.clone()).unwrap_or(0);
        log::debug!("📣 {:?} delivered to {} subscriber(s)", event, receivers);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(64)
    }
}
