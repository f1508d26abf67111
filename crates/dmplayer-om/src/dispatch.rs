//! Serialized event dispatch
//!
//! `OmBridge` expects events one at a time from a single thread. Hosts that
//! receive player events on several threads hand them to an
//! `EventDispatcher` instead: one spawned task owns the bridge and applies
//! commands strictly in the order they were sent.

use crate::{
    bridge::OmBridge,
    listener::ErrorListener,
    sdk::{HostView, PlayerState},
    types::PlayerEvent,
    Error, Result,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

enum Command {
    Event {
        view: Arc<dyn HostView>,
        event: PlayerEvent,
    },
    SetPlayerState(Option<PlayerState>),
    SetErrorListener(Option<Arc<dyn ErrorListener>>),
    EndSession,
}

/// Handle to a task that owns an `OmBridge`
pub struct EventDispatcher {
    command_tx: mpsc::UnboundedSender<Command>,
    task: JoinHandle<OmBridge>,
}

impl EventDispatcher {
    /// Move the bridge onto its own task. Must be called inside a Tokio runtime.
    pub fn spawn(mut bridge: OmBridge) -> Self {
        let (command_tx, mut command_rx) = mpsc::unbounded_channel::<Command>();

        let task = tokio::spawn(async move {
            while let Some(command) = command_rx.recv().await {
                match command {
                    Command::Event { view, event } => {
                        bridge.on_player_event(view.as_ref(), &event);
                    }
                    Command::SetPlayerState(state) => bridge.set_player_state(state),
                    Command::SetErrorListener(listener) => bridge.set_error_listener(listener),
                    Command::EndSession => bridge.end_session(),
                }
            }
            debug!("Event dispatcher drained");
            bridge
        });

        Self { command_tx, task }
    }

    /// Queue a player event; never blocks
    pub fn dispatch(&self, view: Arc<dyn HostView>, event: PlayerEvent) -> Result<()> {
        self.send(Command::Event { view, event })
    }

    pub fn set_player_state(&self, state: Option<PlayerState>) -> Result<()> {
        self.send(Command::SetPlayerState(state))
    }

    pub fn set_error_listener(&self, listener: Option<Arc<dyn ErrorListener>>) -> Result<()> {
        self.send(Command::SetErrorListener(listener))
    }

    pub fn end_session(&self) -> Result<()> {
        self.send(Command::EndSession)
    }

    /// Apply every queued command, then hand the bridge back
    pub async fn shutdown(self) -> Result<OmBridge> {
        drop(self.command_tx);
        self.task.await.map_err(|_| Error::DispatcherClosed)
    }

    fn send(&self, command: Command) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|_| Error::DispatcherClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{RecordingSdk, StaticHostView};
    use crate::types::BridgeConfig;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn test_commands_apply_in_order() {
        let sdk = RecordingSdk::new();
        let mut bridge = OmBridge::new(sdk.clone(), BridgeConfig::default());
        bridge.ensure_initialized().unwrap();

        let dispatcher = EventDispatcher::spawn(bridge);
        let view: Arc<dyn HostView> = Arc::new(StaticHostView::new("player", "omid-js"));

        assert_ok!(dispatcher.dispatch(
            Arc::clone(&view),
            PlayerEvent::AdLoaded {
                payload: None,
                position: Some("midroll".into()),
                skip_offset: 0.0,
                auto_play: false,
            },
        ));
        assert_ok!(dispatcher.dispatch(Arc::clone(&view), PlayerEvent::AdStart { ad_duration: 10.0 }));
        assert_ok!(dispatcher.set_player_state(Some(PlayerState::Fullscreen)));
        assert_ok!(dispatcher.end_session());

        let bridge = assert_ok!(dispatcher.shutdown().await);
        assert!(!bridge.has_session());
        assert_eq!(bridge.player_state(), Some(PlayerState::Fullscreen));
        assert_eq!(
            sdk.call_names(),
            vec![
                "activate",
                "create_session",
                "register_ad_view",
                "impression_occurred",
                "loaded",
                "session_start",
                "volume_change",
                "player_state_change",
                "session_finish",
            ]
        );
    }

    #[test]
    fn test_shutdown_returns_bridge_from_sync_host() {
        let sdk = RecordingSdk::new();
        let bridge = tokio_test::block_on(async {
            let dispatcher = EventDispatcher::spawn(OmBridge::new(sdk.clone(), BridgeConfig::default()));
            assert_ok!(dispatcher.set_player_state(Some(PlayerState::Normal)));
            assert_ok!(dispatcher.shutdown().await)
        });
        assert_eq!(bridge.player_state(), Some(PlayerState::Normal));
        assert!(sdk.calls().is_empty());
    }
}
