use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

/// Label of an open application window.
pub type WindowId = String;

/// Outcome of a hotkey-triggered execution, pushed to the UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CommandEvent {
    #[serde(rename_all = "camelCase")]
    Executed {
        command_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        output: Option<Value>,
    },
    #[serde(rename_all = "camelCase")]
    Error { command_id: String, error: String },
}

impl CommandEvent {
    pub const EXECUTED: &'static str = "command:executed";
    pub const ERROR: &'static str = "command:error";

    /// Channel name the event is emitted on
    pub fn name(&self) -> &'static str {
        match self {
            CommandEvent::Executed { .. } => Self::EXECUTED,
            CommandEvent::Error { .. } => Self::ERROR,
        }
    }

    pub fn command_id(&self) -> &str {
        match self {
            CommandEvent::Executed { command_id, .. } | CommandEvent::Error { command_id, .. } => {
                command_id
            }
        }
    }

    /// JSON body sent with the event
    pub fn payload(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "window")]
pub enum NotifyTarget {
    Window(WindowId),
    All,
}

/// Delivery side of the UI notification channel.
pub trait UiNotifier: Send + Sync {
    fn focused_window(&self) -> Option<WindowId>;

    fn emit(&self, target: NotifyTarget, event: &CommandEvent);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub target: NotifyTarget,
    pub event: &'static str,
    pub payload: Value,
}

/// Notifier that fans events out over a tokio broadcast channel. The host
/// keeps the focused window up to date with `set_focused_window`.
pub struct BroadcastNotifier {
    tx: broadcast::Sender<Notification>,
    focused: RwLock<Option<WindowId>>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            focused: RwLock::new(None),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn set_focused_window(&self, window: Option<WindowId>) {
        *self.focused.write() = window;
    }
}

impl UiNotifier for BroadcastNotifier {
    fn focused_window(&self) -> Option<WindowId> {
        self.focused.read().clone()
    }

    fn emit(&self, target: NotifyTarget, event: &CommandEvent) {
        tracing::debug!(
            event = event.name(),
            command_id = event.command_id(),
            notify_target = ?target,
            "Emitting command event"
        );
        let notification = Notification {
            target,
            event: event.name(),
            payload: event.payload(),
        };
        // Err only means nobody is subscribed.
        let _ = self.tx.send(notification);
    }
}
