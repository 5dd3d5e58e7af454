use std::fmt;
use std::rc::Rc;

#[cfg(test)]
pub(crate) mod fake;
#[cfg(target_arch = "wasm32")]
pub mod web;

#[cfg(target_arch = "wasm32")]
pub use web::WebWindowHost;

/// Callback registered for `message` events on the host window.
pub type MessageHandler = Rc<dyn Fn(MessageEvent)>;

/// Opaque handle returned when a message listener is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// A window opened by [`WindowHost::open`], or the source of a message.
pub trait PopupWindow {
    /// The window's declared name, as passed to `open`.
    fn name(&self) -> Option<String>;
    fn is_closed(&self) -> bool;
    /// Whether the handle is the top-level window it claims to be
    /// (`source.window === source` in browser terms).
    fn is_top_level(&self) -> bool;
    fn post_message(&self, message: &str, target_origin: &str);
    fn close(&self);
}

/// A message posted to the host window.
#[derive(Clone)]
pub struct MessageEvent {
    pub origin: String,
    pub source: Option<Rc<dyn PopupWindow>>,
    pub data: String,
}

impl fmt::Debug for MessageEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageEvent")
            .field("origin", &self.origin)
            .field(
                "source",
                &self.source.as_ref().map(|source| source.name()),
            )
            .field("data_len", &self.data.len())
            .finish()
    }
}

/// Dimensions of the screen the host window lives on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScreenGeometry {
    pub width: i32,
    pub height: i32,
    pub left: i32,
}

/// The window hosting the application: opens popups and receives messages.
pub trait WindowHost {
    fn open(&self, url: &str, name: &str, features: &str) -> Option<Rc<dyn PopupWindow>>;
    fn screen(&self) -> ScreenGeometry;
    fn add_message_listener(&self, handler: MessageHandler) -> ListenerId;
    /// Removing an unknown or already removed listener is a no-op.
    fn remove_message_listener(&self, id: ListenerId);
}

/// Placement of the login popup, centered on the host's screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopupGeometry {
    pub width: i32,
    pub height: i32,
    pub left: i32,
    pub top: i32,
}

impl PopupGeometry {
    pub fn centered(screen: ScreenGeometry, width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            left: screen.left + (screen.width - width) / 2,
            top: (screen.height - height) / 2,
        }
    }

    /// Renders the `window.open` features string.
    pub fn features(&self) -> String {
        format!(
            "width={},height={},left={},top={}",
            self.width, self.height, self.left, self.top
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_popup_centered_on_screen() {
        let screen = ScreenGeometry {
            width: 1920,
            height: 1080,
            left: 0,
        };
        let geometry = PopupGeometry::centered(screen, 500, 500);
        assert_eq!(geometry.left, 710);
        assert_eq!(geometry.top, 290);
        assert_eq!(geometry.features(), "width=500,height=500,left=710,top=290");
    }

    #[test]
    fn test_popup_honors_screen_left_offset() {
        let screen = ScreenGeometry {
            width: 1280,
            height: 1024,
            left: 1920,
        };
        let geometry = PopupGeometry::centered(screen, 500, 500);
        assert_eq!(geometry.left, 1920 + 390);
        assert_eq!(geometry.top, 262);
    }
}
