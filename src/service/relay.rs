use std::cell::Cell;
use std::rc::{Rc, Weak};

use crate::correlation::CorrelationKey;
use crate::host::{ListenerId, MessageEvent, MessageHandler, PopupWindow, WindowHost};
use crate::storage::Storage;

/// Why a message was not relayed. Rejected messages are dropped silently:
/// unrelated traffic on the same channel is expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    ForeignOrigin,
    NoSource,
    NotTopLevel,
    WrongWindow,
    PopupClosed,
    AlreadyRelayed,
}

/// The ordered authenticity checks applied to every incoming message.
pub fn screen(
    event: &MessageEvent,
    expected_origin: Option<&str>,
    key: &CorrelationKey,
    popup: &dyn PopupWindow,
) -> Result<(), Rejection> {
    if let Some(expected) = expected_origin {
        if event.origin != expected {
            return Err(Rejection::ForeignOrigin);
        }
    }
    let source = event.source.as_ref().ok_or(Rejection::NoSource)?;
    if !source.is_top_level() {
        return Err(Rejection::NotTopLevel);
    }
    if source.name().as_deref() != Some(key.as_str()) {
        return Err(Rejection::WrongWindow);
    }
    if popup.is_closed() {
        return Err(Rejection::PopupClosed);
    }
    Ok(())
}

struct RelayState {
    key: CorrelationKey,
    expected_origin: Option<String>,
    ack_message: String,
    popup: Rc<dyn PopupWindow>,
    storage: Rc<dyn Storage>,
    host: Weak<dyn WindowHost>,
    listener: Cell<Option<ListenerId>>,
    relayed: Cell<bool>,
}

impl RelayState {
    fn on_message(&self, event: MessageEvent) {
        if self.relayed.get() {
            tracing::debug!(
                key = %self.key,
                "Dropped message: {:?}",
                Rejection::AlreadyRelayed
            );
            return;
        }
        if let Err(rejection) = screen(
            &event,
            self.expected_origin.as_deref(),
            &self.key,
            self.popup.as_ref(),
        ) {
            tracing::debug!(
                key = %self.key,
                origin = %event.origin,
                "Dropped message: {rejection:?}"
            );
            return;
        }
        if let Err(e) = self.storage.set_item(self.key.as_str(), &event.data) {
            tracing::error!(key = %self.key, "Storing the relayed payload failed: {e:#}");
            return;
        }
        self.relayed.set(true);
        if let Some(source) = &event.source {
            source.post_message(&self.ack_message, &event.origin);
        }
        tracing::debug!(
            key = %self.key,
            "Relayed {} byte payload from the popup",
            event.data.len()
        );
        self.detach();
    }

    fn detach(&self) {
        let Some(id) = self.listener.take() else {
            return;
        };
        if let Some(host) = self.host.upgrade() {
            host.remove_message_listener(id);
        }
    }
}

/// The single message listener armed for one acquisition attempt.
///
/// It relays at most one authenticated payload into storage under the
/// correlation key, then detaches. Dropping the relay detaches it too.
pub struct Relay {
    state: Rc<RelayState>,
}

impl Relay {
    pub fn arm(
        host: &Rc<dyn WindowHost>,
        storage: Rc<dyn Storage>,
        popup: Rc<dyn PopupWindow>,
        key: CorrelationKey,
        expected_origin: Option<String>,
        ack_message: &str,
    ) -> Self {
        let state = Rc::new(RelayState {
            key,
            expected_origin,
            ack_message: ack_message.to_string(),
            popup,
            storage,
            host: Rc::downgrade(host),
            listener: Cell::new(None),
            relayed: Cell::new(false),
        });
        let handler_state = Rc::clone(&state);
        let handler: MessageHandler =
            Rc::new(move |event: MessageEvent| handler_state.on_message(event));
        let id = host.add_message_listener(handler);
        state.listener.set(Some(id));
        Self { state }
    }

    pub fn relayed(&self) -> bool {
        self.state.relayed.get()
    }

    #[cfg(test)]
    fn is_armed(&self) -> bool {
        self.state.listener.get().is_some()
    }
}

impl Drop for Relay {
    fn drop(&mut self) {
        self.state.detach();
    }
}
