use std::collections::HashMap;
use std::sync::Arc;

/// Opaque handle to a renderable view implementation. The discovery
/// mechanism (build-time glob, startup scan) lives outside the core; only
/// lookup-by-key is needed here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewHandle {
    key: Arc<str>,
}

impl ViewHandle {
    pub fn new(key: impl AsRef<str>) -> Self {
        Self {
            key: Arc::from(key.as_ref()),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Immutable mapping from normalized view path to view handle, populated
/// once at startup and consumed read-only by the route materializer.
#[derive(Debug, Default)]
pub struct ViewRegistry {
    views: HashMap<String, ViewHandle>,
}

impl ViewRegistry {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let views = keys
            .into_iter()
            .map(|key| {
                let key = key.as_ref().to_string();
                let handle = ViewHandle::new(&key);
                (key, handle)
            })
            .collect();
        Self { views }
    }

    pub fn lookup(&self, key: &str) -> Option<ViewHandle> {
        self.views.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}
