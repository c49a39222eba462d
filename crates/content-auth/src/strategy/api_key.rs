use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Configured API keys of public-tier clients.
#[derive(Clone, Default)]
pub struct ApiKeySet {
    keys: Arc<HashSet<String>>,
}

impl ApiKeySet {
    /// Returns `true` if `key` is configured. The empty key never matches.
    pub fn contains(&self, key: &str) -> bool {
        !key.is_empty() && self.keys.contains(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for ApiKeySet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let keys = iter
            .into_iter()
            .map(Into::into)
            .map(|key: String| key.trim().to_owned())
            .filter(|key| !key.is_empty())
            .collect();

        Self {
            keys: Arc::new(keys),
        }
    }
}

impl fmt::Debug for ApiKeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeySet")
            .field("len", &self.keys.len())
            .finish()
    }
}
