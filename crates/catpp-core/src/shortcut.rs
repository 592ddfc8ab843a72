/// Keyboard shortcut matching and scoped listener registration.
///
/// A listener stays registered exactly as long as its [`ListenerGuard`] lives.
/// [`Playground`] keeps one guard for the submit shortcut and replaces it on every
/// code change, so the handler always sees the current code and never doubles up.
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::runtime::Handle;
use tracing::debug;

use crate::compile::CompileController;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Control,
    Meta,
    Alt,
    Shift,
}

impl Modifier {
    fn js_property(self) -> &'static str {
        match self {
            Self::Control => "ctrlKey",
            Self::Meta => "metaKey",
            Self::Alt => "altKey",
            Self::Shift => "shiftKey",
        }
    }
}

/// A key press as reported by the UI layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: String,
    pub ctrl: bool,
    pub meta: bool,
    pub alt: bool,
    pub shift: bool,
}

impl KeyEvent {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn with(mut self, modifier: Modifier) -> Self {
        match modifier {
            Modifier::Control => self.ctrl = true,
            Modifier::Meta => self.meta = true,
            Modifier::Alt => self.alt = true,
            Modifier::Shift => self.shift = true,
        }
        self
    }

    fn has(&self, modifier: Modifier) -> bool {
        match modifier {
            Modifier::Control => self.ctrl,
            Modifier::Meta => self.meta,
            Modifier::Alt => self.alt,
            Modifier::Shift => self.shift,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyCombo {
    pub modifier: Modifier,
    pub key: &'static str,
}

/// Ctrl+Enter submits the playground.
pub const SUBMIT_SHORTCUT: KeyCombo = KeyCombo {
    modifier: Modifier::Control,
    key: "Enter",
};

impl KeyCombo {
    /// Other modifiers held at the same time do not prevent a match.
    pub fn matches(&self, event: &KeyEvent) -> bool {
        event.has(self.modifier) && event.key == self.key
    }

    /// The same check as a browser `KeyboardEvent` expression over `event`.
    pub fn js_condition(&self) -> String {
        format!(
            "event.{} && event.key === \"{}\"",
            self.modifier.js_property(),
            self.key
        )
    }
}

type Handler = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: Vec<(u64, KeyCombo, Handler)>,
}

/// Registry of key listeners, shared by clones.
#[derive(Clone, Default)]
pub struct KeyListeners {
    inner: Arc<Mutex<Registry>>,
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

impl KeyListeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `combo` until the returned guard is dropped.
    #[must_use = "the listener is removed when the guard is dropped"]
    pub fn bind(&self, combo: KeyCombo, handler: impl Fn() + Send + Sync + 'static) -> ListenerGuard {
        let mut registry = lock(&self.inner);
        registry.next_id += 1;
        let id = registry.next_id;
        registry.entries.push((id, combo, Arc::new(handler)));
        debug!(id, key = combo.key, "key listener attached");
        ListenerGuard {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Run every handler whose combo matches. Returns how many ran.
    pub fn dispatch(&self, event: &KeyEvent) -> usize {
        let handlers: Vec<Handler> = lock(&self.inner)
            .entries
            .iter()
            .filter(|(_, combo, _)| combo.matches(event))
            .map(|(_, _, handler)| Arc::clone(handler))
            .collect();
        for handler in &handlers {
            handler();
        }
        handlers.len()
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Detaches its listener on drop.
pub struct ListenerGuard {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).entries.retain(|(id, _, _)| *id != self.id);
            debug!(id = self.id, "key listener detached");
        }
    }
}

/// Code box bound to a compile controller, with the submit shortcut attached
/// for as long as the playground lives. Shortcut submissions run on `runtime`,
/// so key events may be dispatched from any thread.
pub struct Playground {
    runtime: Handle,
    controller: CompileController,
    listeners: KeyListeners,
    code: String,
    shortcut: Option<ListenerGuard>,
}

impl Playground {
    pub fn mount(
        runtime: Handle,
        controller: CompileController,
        listeners: KeyListeners,
        code: impl Into<String>,
    ) -> Self {
        let mut playground = Self {
            runtime,
            controller,
            listeners,
            code: code.into(),
            shortcut: None,
        };
        playground.rebind();
        playground
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn set_code(&mut self, code: impl Into<String>) {
        self.code = code.into();
        self.rebind();
    }

    /// Explicit submit, same effect as the shortcut.
    pub async fn submit(&self) {
        self.controller.submit(&self.code).await;
    }

    fn rebind(&mut self) {
        // Detach before attaching so at most one handler exists.
        self.shortcut = None;
        let runtime = self.runtime.clone();
        let controller = self.controller.clone();
        let code = self.code.clone();
        self.shortcut = Some(self.listeners.bind(SUBMIT_SHORTCUT, move || {
            let controller = controller.clone();
            let code = code.clone();
            runtime.spawn(async move { controller.submit(&code).await });
        }));
    }
}
