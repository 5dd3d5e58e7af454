use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use anyhow::{Result, anyhow};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use super::{ListenerId, MessageEvent, MessageHandler, PopupWindow, ScreenGeometry, WindowHost};

/// A browser window handle, either an opened popup or a message source.
#[derive(Debug, Clone)]
pub struct WebPopup {
    window: web_sys::Window,
}

impl PopupWindow for WebPopup {
    fn name(&self) -> Option<String> {
        self.window.name().ok()
    }

    fn is_closed(&self) -> bool {
        // A window we can no longer inspect is as good as gone.
        self.window.closed().unwrap_or(true)
    }

    fn is_top_level(&self) -> bool {
        match js_sys::Reflect::get(&self.window, &JsValue::from_str("window")) {
            Ok(inner) => js_sys::Object::is(&inner, &self.window),
            Err(_) => false,
        }
    }

    fn post_message(&self, message: &str, target_origin: &str) {
        if let Err(e) = self
            .window
            .post_message(&JsValue::from_str(message), target_origin)
        {
            tracing::warn!("postMessage to popup failed: {e:?}");
        }
    }

    fn close(&self) {
        if let Err(e) = self.window.close() {
            tracing::warn!("Closing popup failed: {e:?}");
        }
    }
}

type JsMessageListener = Closure<dyn FnMut(web_sys::MessageEvent)>;

/// The current browser window.
pub struct WebWindowHost {
    window: web_sys::Window,
    listeners: RefCell<HashMap<ListenerId, JsMessageListener>>,
    // Listeners detach themselves from inside their own callback, so a removed
    // closure is kept alive until the next registration.
    retired: RefCell<Vec<JsMessageListener>>,
    next_id: Cell<u64>,
}

impl WebWindowHost {
    pub fn current() -> Result<Self> {
        let window = web_sys::window().ok_or_else(|| anyhow!("no global window"))?;
        Ok(Self {
            window,
            listeners: RefCell::new(HashMap::new()),
            retired: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        })
    }
}

fn message_data(data: JsValue) -> String {
    if let Some(s) = data.as_string() {
        return s;
    }
    js_sys::JSON::stringify(&data)
        .map(String::from)
        .unwrap_or_default()
}

impl WindowHost for WebWindowHost {
    fn open(&self, url: &str, name: &str, features: &str) -> Option<Rc<dyn PopupWindow>> {
        match self
            .window
            .open_with_url_and_target_and_features(url, name, features)
        {
            Ok(Some(window)) => Some(Rc::new(WebPopup { window })),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("window.open failed: {e:?}");
                None
            }
        }
    }

    fn screen(&self) -> ScreenGeometry {
        let Ok(screen) = self.window.screen() else {
            return ScreenGeometry::default();
        };
        ScreenGeometry {
            width: screen.width().unwrap_or_default(),
            height: screen.height().unwrap_or_default(),
            left: screen.avail_left().unwrap_or_default(),
        }
    }

    fn add_message_listener(&self, handler: MessageHandler) -> ListenerId {
        self.retired.borrow_mut().clear();
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        let closure = Closure::<dyn FnMut(web_sys::MessageEvent)>::new(
            move |event: web_sys::MessageEvent| {
                let source = event.source().map(|source| {
                    Rc::new(WebPopup {
                        window: source.unchecked_into::<web_sys::Window>(),
                    }) as Rc<dyn PopupWindow>
                });
                handler(MessageEvent {
                    origin: event.origin(),
                    source,
                    data: message_data(event.data()),
                });
            },
        );
        if let Err(e) = self
            .window
            .add_event_listener_with_callback("message", closure.as_ref().unchecked_ref())
        {
            tracing::error!("Registering message listener failed: {e:?}");
        }
        self.listeners.borrow_mut().insert(id, closure);
        id
    }

    fn remove_message_listener(&self, id: ListenerId) {
        let Some(closure) = self.listeners.borrow_mut().remove(&id) else {
            return;
        };
        if let Err(e) = self
            .window
            .remove_event_listener_with_callback("message", closure.as_ref().unchecked_ref())
        {
            tracing::warn!("Removing message listener failed: {e:?}");
        }
        self.retired.borrow_mut().push(closure);
    }
}
