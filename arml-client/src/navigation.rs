use std::sync::{Arc, Mutex, PoisonError};

use arml_core::route::Location;
use log::info;

pub type ArcNavigator = Arc<dyn Navigator + Send + Sync + 'static>;

pub trait Navigator {
    fn location(&self) -> Location;
    fn navigate(&self, to: &str);
}

#[derive(Debug)]
pub struct HistoryNavigator {
    history: Mutex<Vec<String>>,
}

impl HistoryNavigator {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            history: Mutex::new(vec![initial.into()]),
        }
    }

    pub fn history(&self) -> Vec<String> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Navigator for HistoryNavigator {
    fn location(&self) -> Location {
        let history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        history
            .last()
            .map(|url| Location::parse(url))
            .unwrap_or_default()
    }

    fn navigate(&self, to: &str) {
        info!("Navigating to {}", to);
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(to.to_string());
    }
}
