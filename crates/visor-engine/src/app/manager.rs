//! Bookkeeping for the available apps and the single active one.

use log::info;
use thiserror::Error;

use crate::app::{App, EventRegistry};
use crate::render::Frame;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("app '{0}' is not registered")]
    Unknown(String),
}

/// Owns every registered app. At most one is active; activations
/// requested from outside the loop are queued and promoted at the top
/// of the next tick.
pub struct AppManager {
    apps: Vec<Box<dyn App>>,
    active: Option<usize>,
    pending: Option<String>,
    last_frame: Option<Frame>,
}

impl AppManager {
    /// Build from the static app registry. Registration order is kept
    /// for listings.
    pub fn new(apps: Vec<Box<dyn App>>) -> Self {
        Self {
            apps,
            active: None,
            pending: None,
            last_frame: None,
        }
    }

    /// Collect every app's event types into a registry (built-ins
    /// included).
    pub fn build_event_registry(&self) -> EventRegistry {
        let mut registry = EventRegistry::new();
        for app in &self.apps {
            for spec in app.events() {
                registry.register(app.name(), spec);
            }
        }
        registry
    }

    pub fn names(&self) -> Vec<String> {
        self.apps.iter().map(|a| a.name().to_string()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.apps.iter().any(|a| a.name() == name)
    }

    pub fn active_name(&self) -> Option<&str> {
        self.active.map(|i| self.apps[i].name())
    }

    pub fn active_mut(&mut self) -> Option<&mut dyn App> {
        let idx = self.active?;
        Some(self.apps[idx].as_mut())
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut dyn App> {
        let idx = self.apps.iter().position(|a| a.name() == name)?;
        Some(self.apps[idx].as_mut())
    }

    /// Stop the current app and start `name`. Returns whether there was
    /// a previously active app (the caller decides about transitions).
    pub fn activate(&mut self, name: &str) -> Result<bool, AppError> {
        let idx = self
            .apps
            .iter()
            .position(|a| a.name() == name)
            .ok_or_else(|| AppError::Unknown(name.to_string()))?;

        let had_previous = self.active.is_some();
        if let Some(current) = self.active {
            info!("stopping app '{}'", self.apps[current].name());
            self.apps[current].stop();
        }
        self.active = Some(idx);
        info!("starting app '{}'", name);
        self.apps[idx].start();
        Ok(had_previous)
    }

    /// Queue an activation to be applied at the top of the next tick.
    pub fn set_pending(&mut self, name: &str) {
        self.pending = Some(name.to_string());
    }

    /// Take the queued activation, if any. No-op when nothing is
    /// pending.
    pub fn take_pending(&mut self) -> Option<String> {
        self.pending.take()
    }

    /// Store the last frame the loop produced, for inter-app
    /// transitions.
    pub fn save_last_frame(&mut self, frame: Frame) {
        self.last_frame = Some(frame);
    }

    pub fn last_frame(&self) -> Option<&Frame> {
        self.last_frame.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{Event, EventType, FieldKind, FieldSpec};
    use crate::render::RenderOutput;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingApp {
        name: &'static str,
        starts: Arc<AtomicUsize>,
        stops: Arc<AtomicUsize>,
    }

    impl App for CountingApp {
        fn name(&self) -> &str {
            self.name
        }

        fn events(&self) -> Vec<EventType> {
            const FIELDS: &[FieldSpec] = &[FieldSpec::optional("strength", FieldKind::Number)];
            vec![EventType {
                name: "poke",
                fields: FIELDS,
            }]
        }

        fn update(&mut self, _dt: f32, _events: &[Event]) {}

        fn render(&mut self) -> Option<RenderOutput> {
            None
        }

        fn start(&mut self) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn stop(&mut self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn manager_with_two_apps() -> (AppManager, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let starts = Arc::new(AtomicUsize::new(0));
        let stops = Arc::new(AtomicUsize::new(0));
        let apps: Vec<Box<dyn App>> = vec![
            Box::new(CountingApp {
                name: "first",
                starts: Arc::clone(&starts),
                stops: Arc::clone(&stops),
            }),
            Box::new(CountingApp {
                name: "second",
                starts: Arc::clone(&starts),
                stops: Arc::clone(&stops),
            }),
        ];
        (AppManager::new(apps), starts, stops)
    }

    #[test]
    fn activation_runs_lifecycle_hooks() {
        let (mut mgr, starts, stops) = manager_with_two_apps();
        assert_eq!(mgr.activate("first").unwrap(), false);
        assert_eq!(starts.load(Ordering::SeqCst), 1);
        assert_eq!(stops.load(Ordering::SeqCst), 0);

        assert_eq!(mgr.activate("second").unwrap(), true);
        assert_eq!(starts.load(Ordering::SeqCst), 2);
        assert_eq!(stops.load(Ordering::SeqCst), 1);
        assert_eq!(mgr.active_name(), Some("second"));
    }

    #[test]
    fn unknown_app_is_an_error() {
        let (mut mgr, ..) = manager_with_two_apps();
        assert!(mgr.activate("third").is_err());
        assert!(mgr.active_name().is_none());
    }

    #[test]
    fn pending_is_taken_once() {
        let (mut mgr, ..) = manager_with_two_apps();
        assert!(mgr.take_pending().is_none());
        mgr.set_pending("second");
        assert_eq!(mgr.take_pending().as_deref(), Some("second"));
        assert!(mgr.take_pending().is_none());
    }

    #[test]
    fn registry_collects_app_events() {
        let (mgr, ..) = manager_with_two_apps();
        let registry = mgr.build_event_registry();
        assert!(registry.contains("poke"));
        assert!(registry.contains("button"));
    }
}
