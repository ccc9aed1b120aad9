use std::sync::{Mutex, PoisonError};
use url::Url;

/// Access to the address the dashboard was opened at.
///
/// In a browser this is `window.location` plus `history.replaceState`;
/// [`MemoryNavigator`] keeps it in memory for the terminal front-end and tests.
pub trait Navigator: Send + Sync {
    fn current_url(&self) -> Url;

    /// Swaps the visible address without a reload or a new history entry.
    fn replace_url(&self, url: Url);
}

pub struct MemoryNavigator {
    url: Mutex<Url>,
    replacements: Mutex<Vec<Url>>,
}

impl MemoryNavigator {
    pub fn new(url: Url) -> Self {
        Self {
            url: Mutex::new(url),
            replacements: Mutex::new(Vec::new()),
        }
    }

    pub fn parse(url: &str) -> Result<Self, url::ParseError> {
        Ok(Self::new(Url::parse(url)?))
    }

    /// Every address passed to `replace_url`, oldest first
    pub fn replacements(&self) -> Vec<Url> {
        self.replacements
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Navigator for MemoryNavigator {
    fn current_url(&self) -> Url {
        self.url
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn replace_url(&self, url: Url) {
        self.replacements
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.clone());
        *self.url.lock().unwrap_or_else(PoisonError::into_inner) = url;
    }
}
