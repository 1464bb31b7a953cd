//! # Sidebar Provider
//!
//! Open / closed state of the navigation sidebar.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  initialize(width)                                                      │
//! │    width < breakpoint ──► closed (not persisted)                        │
//! │    otherwise          ──► stored "true"/"false", default open           │
//! │                                                                         │
//! │  on_viewport_resize(width)                                              │
//! │    width < breakpoint ──► closed (not persisted)                        │
//! │    otherwise          ──► unchanged; growing never reopens              │
//! │                                                                         │
//! │  toggle() / set_open(b) ──► update + persist                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{Arc, PoisonError, RwLock};

use estoque_core::MOBILE_BREAKPOINT_PX;
use tracing::{debug, warn};

use crate::storage::{PreferenceStore, SIDEBAR_OPEN_KEY};

pub struct SidebarProvider {
    store: Arc<dyn PreferenceStore>,
    breakpoint_px: u32,
    is_open: RwLock<bool>,
}

impl SidebarProvider {
    /// Rehydrates the sidebar for the initial viewport width.
    pub fn initialize(store: Arc<dyn PreferenceStore>, viewport_width: u32) -> Self {
        Self::with_breakpoint(store, viewport_width, MOBILE_BREAKPOINT_PX)
    }

    pub fn with_breakpoint(
        store: Arc<dyn PreferenceStore>,
        viewport_width: u32,
        breakpoint_px: u32,
    ) -> Self {
        let is_open = if viewport_width < breakpoint_px {
            debug!(viewport_width, "Narrow viewport, sidebar starts closed");
            false
        } else {
            match store.get(SIDEBAR_OPEN_KEY) {
                Ok(Some(raw)) => raw != "false",
                Ok(None) => true,
                Err(e) => {
                    warn!(error = %e, "Failed to read sidebar preference");
                    true
                }
            }
        };

        SidebarProvider {
            store,
            breakpoint_px,
            is_open: RwLock::new(is_open),
        }
    }

    pub fn is_open(&self) -> bool {
        *self.is_open.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Forces the sidebar closed when the viewport shrinks below the
    /// breakpoint. The stored preference is left untouched.
    pub fn on_viewport_resize(&self, viewport_width: u32) {
        if viewport_width < self.breakpoint_px {
            let mut open = self.is_open.write().unwrap_or_else(PoisonError::into_inner);
            if *open {
                debug!(viewport_width, "Viewport below breakpoint, closing sidebar");
                *open = false;
            }
        }
    }

    pub fn set_open(&self, open: bool) {
        *self.is_open.write().unwrap_or_else(PoisonError::into_inner) = open;
        if let Err(e) = self.store.set(SIDEBAR_OPEN_KEY, if open { "true" } else { "false" }) {
            warn!(error = %e, "Failed to persist sidebar preference");
        }
    }

    pub fn toggle(&self) -> bool {
        let next = !self.is_open();
        self.set_open(next);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_defaults_open_on_desktop() {
        let sidebar = SidebarProvider::initialize(Arc::new(MemoryStore::new()), 1280);
        assert!(sidebar.is_open());
    }

    #[test]
    fn test_rehydrates_persisted_state() {
        let store = Arc::new(MemoryStore::with_values([(SIDEBAR_OPEN_KEY, "false")]));
        let sidebar = SidebarProvider::initialize(store, 1280);
        assert!(!sidebar.is_open());
    }

    #[test]
    fn test_narrow_viewport_forces_closed_without_persisting() {
        let store = Arc::new(MemoryStore::with_values([(SIDEBAR_OPEN_KEY, "true")]));
        let sidebar = SidebarProvider::initialize(store.clone(), 767);

        assert!(!sidebar.is_open());
        assert_eq!(store.write_count(), 0);
        assert_eq!(store.get(SIDEBAR_OPEN_KEY).unwrap().as_deref(), Some("true"));

        // Exactly at the breakpoint counts as desktop.
        let sidebar = SidebarProvider::initialize(store, 768);
        assert!(sidebar.is_open());
    }

    #[test]
    fn test_resize_is_one_way() {
        let store = Arc::new(MemoryStore::new());
        let sidebar = SidebarProvider::initialize(store.clone(), 1024);
        assert!(sidebar.is_open());

        sidebar.on_viewport_resize(500);
        assert!(!sidebar.is_open());

        sidebar.on_viewport_resize(1400);
        assert!(!sidebar.is_open());
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_toggle_persists() {
        let store = Arc::new(MemoryStore::new());
        let sidebar = SidebarProvider::initialize(store.clone(), 1024);

        assert!(!sidebar.toggle());
        assert_eq!(store.get(SIDEBAR_OPEN_KEY).unwrap().as_deref(), Some("false"));

        sidebar.set_open(true);
        let reloaded = SidebarProvider::initialize(store, 1024);
        assert!(reloaded.is_open());
    }
}
