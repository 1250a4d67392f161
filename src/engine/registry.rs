//! Instance registry keyed by application name

use super::app::AppHandle;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::Rc;

/// Applications known to one [`super::ContainerEngine`]. Entries are added on
/// attach and only removed by a destroying unmount.
#[derive(Clone, Default)]
pub struct AppRegistry {
    apps: Rc<RefCell<IndexMap<String, AppHandle>>>,
}

impl AppRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `app` under `name`, returning any instance it replaces
    pub fn insert(&self, name: &str, app: AppHandle) -> Option<AppHandle> {
        self.apps.borrow_mut().insert(name.to_string(), app)
    }

    pub fn get(&self, name: &str) -> Option<AppHandle> {
        self.apps.borrow().get(name).cloned()
    }

    pub fn remove(&self, name: &str) -> Option<AppHandle> {
        self.apps.borrow_mut().shift_remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.apps.borrow().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.apps.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.borrow().is_empty()
    }

    /// Registered names in registration order
    pub fn names(&self) -> Vec<String> {
        self.apps.borrow().keys().cloned().collect()
    }
}
