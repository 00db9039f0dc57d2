//! Operating-system global shortcuts via the `global-hotkey` crate.
//!
//! On Linux the crate drives its own X11 thread. On macOS and Windows the
//! host must pump a platform event loop for key events to be delivered.

use anyhow::{anyhow, Context, Result};
use global_hotkey::hotkey::HotKey;
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;

use super::{CallbackTable, ShortcutBackend, ShortcutCallback};
use crate::accelerator::Accelerator;

type Reply = Sender<std::result::Result<(), global_hotkey::Error>>;

enum Request {
    Register(HotKey, Reply),
    Unregister(HotKey, Reply),
}

/// Translate an accelerator into the crate's hotkey type. `AltGr` and
/// `Meta` have no direct equivalent and map to `Alt` and `Super`.
fn to_platform_hotkey(accelerator: &str) -> Result<HotKey> {
    let parsed =
        Accelerator::parse(accelerator).ok_or_else(|| anyhow!("Invalid accelerator: {accelerator}"))?;

    let mut tokens: Vec<&str> = parsed
        .modifiers
        .iter()
        .map(|m| match *m {
            "AltGr" => "Alt",
            "Meta" => "Super",
            other => other,
        })
        .collect();
    tokens.push(parsed.key);

    tokens
        .join("+")
        .parse::<HotKey>()
        .map_err(|e| anyhow!("Unsupported accelerator {accelerator}: {e}"))
}

/// The `GlobalHotKeyManager` lives on a dedicated thread; registration
/// requests are forwarded to it and answered over a reply channel.
pub struct OsShortcuts {
    requests: Mutex<Sender<Request>>,
    registered: Mutex<HashMap<String, HotKey>>,
    callbacks: Arc<CallbackTable<u32>>,
}

impl OsShortcuts {
    pub fn new() -> Result<Self> {
        let (request_tx, request_rx) = mpsc::channel::<Request>();
        let (ready_tx, ready_rx) = mpsc::channel::<std::result::Result<(), String>>();

        std::thread::Builder::new()
            .name("global-hotkeys".to_string())
            .spawn(move || {
                let manager = match GlobalHotKeyManager::new() {
                    Ok(manager) => {
                        let _ = ready_tx.send(Ok(()));
                        manager
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };

                for request in request_rx {
                    match request {
                        Request::Register(hotkey, reply) => {
                            let _ = reply.send(manager.register(hotkey));
                        }
                        Request::Unregister(hotkey, reply) => {
                            let _ = reply.send(manager.unregister(hotkey));
                        }
                    }
                }
            })
            .context("Failed to spawn global hotkey thread")?;

        ready_rx
            .recv()
            .context("Global hotkey thread exited during startup")?
            .map_err(|e| anyhow!("Failed to start global hotkey manager: {e}"))?;

        let callbacks: Arc<CallbackTable<u32>> = Arc::new(CallbackTable::new());
        let handler_callbacks = callbacks.clone();
        GlobalHotKeyEvent::set_event_handler(Some(move |event: GlobalHotKeyEvent| {
            if matches!(event.state, HotKeyState::Pressed) {
                handler_callbacks.fire(&event.id);
            }
        }));

        Ok(Self {
            requests: Mutex::new(request_tx),
            registered: Mutex::new(HashMap::new()),
            callbacks,
        })
    }

    fn request(
        &self,
        build: impl FnOnce(Reply) -> Request,
    ) -> Result<std::result::Result<(), global_hotkey::Error>> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.requests
            .lock()
            .send(build(reply_tx))
            .map_err(|_| anyhow!("Global hotkey thread has stopped"))?;
        reply_rx
            .recv()
            .context("Global hotkey thread dropped the request")
    }
}

impl ShortcutBackend for OsShortcuts {
    fn register(&self, accelerator: &str, callback: ShortcutCallback) -> Result<bool> {
        if self.registered.lock().contains_key(accelerator) {
            return Ok(false);
        }

        let hotkey = to_platform_hotkey(accelerator)?;
        let id = hotkey.id();
        // Another spelling of the same key combination already owns this id
        if !self.callbacks.claim(id, callback) {
            return Ok(false);
        }

        match self.request(|reply| Request::Register(hotkey, reply)) {
            Ok(Ok(())) => {
                self.registered.lock().insert(accelerator.to_string(), hotkey);
                Ok(true)
            }
            Ok(Err(global_hotkey::Error::AlreadyRegistered(_))) => {
                self.callbacks.release(&id);
                Ok(false)
            }
            Ok(Err(e)) => {
                self.callbacks.release(&id);
                Err(anyhow!("Failed to register {accelerator}: {e}"))
            }
            Err(e) => {
                self.callbacks.release(&id);
                Err(e)
            }
        }
    }

    fn unregister(&self, accelerator: &str) -> Result<()> {
        let Some(hotkey) = self.registered.lock().remove(accelerator) else {
            return Ok(());
        };
        self.callbacks.release(&hotkey.id());
        self.request(|reply| Request::Unregister(hotkey, reply))?
            .map_err(|e| anyhow!("Failed to unregister {accelerator}: {e}"))
    }

    fn unregister_all(&self) -> Result<()> {
        let accelerators: Vec<String> = self.registered.lock().keys().cloned().collect();
        for accelerator in accelerators {
            self.unregister(&accelerator)?;
        }
        Ok(())
    }
}

impl Drop for OsShortcuts {
    fn drop(&mut self) {
        if let Err(e) = self.unregister_all() {
            tracing::warn!(error = %e, "Failed to release global shortcuts");
        }
        GlobalHotKeyEvent::set_event_handler(None::<fn(GlobalHotKeyEvent)>);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accelerator_translation() {
        assert!(to_platform_hotkey("CommandOrControl+Shift+P").is_ok());
        assert!(to_platform_hotkey("Meta+AltGr+K").is_ok());
        assert!(to_platform_hotkey("Hyper+K").is_err());
    }

    #[test]
    fn test_alternate_spellings_share_a_platform_id() {
        let ctrl = to_platform_hotkey("Ctrl+K").unwrap();
        let control = to_platform_hotkey("Control+K").unwrap();
        assert_eq!(ctrl.id(), control.id());

        let alt = to_platform_hotkey("Alt+K").unwrap();
        let alt_gr = to_platform_hotkey("AltGr+K").unwrap();
        assert_eq!(alt.id(), alt_gr.id());
    }
}
