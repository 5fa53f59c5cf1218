//! Input routing for keyboard events
//!
//! The InputRouter subscribes to every keyboard the window reports at load
//! time and forwards key-down events to a [`KeyDownHandler`]. The default
//! handler logs every key and closes the window on Escape.

use tracing::{debug, trace};

use crate::app_info;
use crate::core::event::{Keyboard, KeyboardEvent, KeyboardId};
use crate::platform::WindowContext;

/// What the router should do after a key has been handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyResponse {
    /// Keep the window open
    Continue,
    /// Request a cooperative close of the window
    Close,
}

/// Reacts to key-down events from subscribed keyboards
pub trait KeyDownHandler {
    fn on_key_down(&mut self, keyboard: &Keyboard, event: &KeyboardEvent) -> KeyResponse;
}

impl<F> KeyDownHandler for F
where
    F: FnMut(&Keyboard, &KeyboardEvent) -> KeyResponse,
{
    fn on_key_down(&mut self, keyboard: &Keyboard, event: &KeyboardEvent) -> KeyResponse {
        self(keyboard, event)
    }
}

/// Default key policy: log the key, close on Escape
///
/// An optional forwarder receives every event after it has been logged.
#[derive(Default)]
pub struct EscapeClosesWindow {
    forward: Option<Box<dyn FnMut(&KeyboardEvent)>>,
}

impl EscapeClosesWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forward every key-down event to `callback`
    pub fn with_forwarder(callback: impl FnMut(&KeyboardEvent) + 'static) -> Self {
        Self {
            forward: Some(Box::new(callback)),
        }
    }
}

impl KeyDownHandler for EscapeClosesWindow {
    fn on_key_down(&mut self, keyboard: &Keyboard, event: &KeyboardEvent) -> KeyResponse {
        app_info!(keyboard = %keyboard.name, "KeyDown {}", event.key);

        if let Some(forward) = self.forward.as_mut() {
            forward(event);
        }

        if event.is_escape() {
            KeyResponse::Close
        } else {
            KeyResponse::Continue
        }
    }
}

/// Keyboard subscription and dispatch
pub struct InputRouter {
    handler: Box<dyn KeyDownHandler>,
    subscribed: Vec<Keyboard>,
}

impl InputRouter {
    /// Router with the [`EscapeClosesWindow`] policy
    pub fn new() -> Self {
        Self::with_handler(EscapeClosesWindow::new())
    }

    pub fn with_handler(handler: impl KeyDownHandler + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            subscribed: Vec::new(),
        }
    }

    /// Subscribe to every keyboard currently attached to the window
    ///
    /// Returns the number of keyboards subscribed. Keyboards connected later
    /// are not picked up.
    pub fn attach(&mut self, window: &WindowContext) -> usize {
        self.subscribed = window.keyboards().to_vec();
        for keyboard in &self.subscribed {
            debug!(id = keyboard.id.0, name = %keyboard.name, "Subscribed to keyboard");
        }
        self.subscribed.len()
    }

    pub fn subscribed(&self) -> &[Keyboard] {
        &self.subscribed
    }

    fn find(&self, id: KeyboardId) -> Option<&Keyboard> {
        self.subscribed.iter().find(|keyboard| keyboard.id == id)
    }

    /// Dispatch a key-down event
    ///
    /// Events from keyboards that were not subscribed at load are ignored.
    pub fn on_key_down(&mut self, window: &mut WindowContext, event: &KeyboardEvent) -> KeyResponse {
        let Some(keyboard) = self.find(event.keyboard).cloned() else {
            trace!(keyboard = event.keyboard.0, "Ignoring key from unsubscribed keyboard");
            return KeyResponse::Continue;
        };

        let response = self.handler.on_key_down(&keyboard, event);
        if response == KeyResponse::Close {
            debug!("Close requested from keyboard");
            window.close();
        }
        response
    }
}

impl Default for InputRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::WindowConfig;
    use crate::core::event::Key;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn window(keyboards: u32) -> WindowContext {
        WindowContext::headless(&WindowConfig::default(), keyboards)
    }

    #[test]
    fn test_attach_subscribes_all_keyboards() {
        let window = window(3);
        let mut router = InputRouter::new();

        assert_eq!(router.attach(&window), 3);
        assert_eq!(router.subscribed().len(), 3);
    }

    #[test]
    fn test_escape_closes_window() {
        let mut window = window(1);
        let mut router = InputRouter::new();
        router.attach(&window);

        let response = router.on_key_down(&mut window, &KeyboardEvent::new(KeyboardId(0), Key::Escape, 0x29));
        assert_eq!(response, KeyResponse::Close);
        assert!(window.is_closing());
    }

    #[test]
    fn test_other_keys_are_forwarded() {
        let mut window = window(1);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let mut router = InputRouter::with_handler(EscapeClosesWindow::with_forwarder(move |event| {
            sink.borrow_mut().push(event.key);
        }));
        router.attach(&window);

        router.on_key_down(&mut window, &KeyboardEvent::new(KeyboardId(0), Key::W, 0x1A));
        router.on_key_down(&mut window, &KeyboardEvent::new(KeyboardId(0), Key::F5, 0x3E));

        assert!(!window.is_closing());
        assert_eq!(*seen.borrow(), vec![Key::W, Key::F5]);
    }

    #[test]
    fn test_unsubscribed_keyboard_is_ignored() {
        let mut window = window(1);
        let mut router = InputRouter::new();
        router.attach(&window);

        let response = router.on_key_down(&mut window, &KeyboardEvent::new(KeyboardId(7), Key::Escape, 0x29));
        assert_eq!(response, KeyResponse::Continue);
        assert!(!window.is_closing());
    }

    #[test]
    fn test_closure_handler() {
        let mut window = window(2);
        let mut router = InputRouter::with_handler(|keyboard: &Keyboard, event: &KeyboardEvent| {
            if keyboard.id == KeyboardId(1) && event.key == Key::Space {
                KeyResponse::Close
            } else {
                KeyResponse::Continue
            }
        });
        router.attach(&window);

        router.on_key_down(&mut window, &KeyboardEvent::new(KeyboardId(0), Key::Space, 0x2C));
        assert!(!window.is_closing());
        router.on_key_down(&mut window, &KeyboardEvent::new(KeyboardId(1), Key::Space, 0x2C));
        assert!(window.is_closing());
    }
}
