use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::{
    ListenerId, MessageEvent, MessageHandler, PopupWindow, ScreenGeometry, WindowHost,
};

#[derive(Debug, Default)]
pub struct FakePopup {
    pub name: String,
    pub url: String,
    pub features: String,
    pub closed: Cell<bool>,
    pub top_level: Cell<bool>,
    pub close_checks: Cell<usize>,
    pub posted: RefCell<Vec<(String, String)>>,
}

impl FakePopup {
    pub fn named(name: &str) -> Rc<Self> {
        Rc::new(Self {
            name: name.to_string(),
            top_level: Cell::new(true),
            ..Default::default()
        })
    }
}

impl PopupWindow for FakePopup {
    fn name(&self) -> Option<String> {
        Some(self.name.clone())
    }

    fn is_closed(&self) -> bool {
        self.close_checks.set(self.close_checks.get() + 1);
        self.closed.get()
    }

    fn is_top_level(&self) -> bool {
        self.top_level.get()
    }

    fn post_message(&self, message: &str, target_origin: &str) {
        self.posted
            .borrow_mut()
            .push((message.to_string(), target_origin.to_string()));
    }

    fn close(&self) {
        self.closed.set(true);
    }
}

/// A scriptable host window. Popups are recorded in open order; messages are
/// delivered synchronously to every armed listener by [`FakeHost::dispatch`].
#[derive(Default)]
pub struct FakeHost {
    pub block_popups: Cell<bool>,
    pub popups: RefCell<Vec<Rc<FakePopup>>>,
    listeners: RefCell<Vec<(ListenerId, MessageHandler)>>,
    next_id: Cell<u64>,
}

impl FakeHost {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn blocking() -> Rc<Self> {
        let host = Self::default();
        host.block_popups.set(true);
        Rc::new(host)
    }

    pub fn popup(&self, index: usize) -> Rc<FakePopup> {
        self.popups.borrow()[index].clone()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn dispatch(&self, event: MessageEvent) {
        let handlers: Vec<_> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();
        for handler in handlers {
            handler(event.clone());
        }
    }

    /// Posts `data` as if sent by `popup` from `origin`.
    pub fn post_from(&self, popup: &Rc<FakePopup>, origin: &str, data: &str) {
        let source: Rc<dyn PopupWindow> = popup.clone();
        self.dispatch(MessageEvent {
            origin: origin.to_string(),
            source: Some(source),
            data: data.to_string(),
        });
    }
}

impl WindowHost for FakeHost {
    fn open(&self, url: &str, name: &str, features: &str) -> Option<Rc<dyn PopupWindow>> {
        if self.block_popups.get() {
            return None;
        }
        let popup = Rc::new(FakePopup {
            name: name.to_string(),
            url: url.to_string(),
            features: features.to_string(),
            top_level: Cell::new(true),
            ..Default::default()
        });
        self.popups.borrow_mut().push(popup.clone());
        Some(popup)
    }

    fn screen(&self) -> ScreenGeometry {
        ScreenGeometry {
            width: 1920,
            height: 1080,
            left: 0,
        }
    }

    fn add_message_listener(&self, handler: MessageHandler) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, handler));
        id
    }

    fn remove_message_listener(&self, id: ListenerId) {
        self.listeners.borrow_mut().retain(|(i, _)| *i != id);
    }
}
