use crate::types::CrewEvent;

/// Receives progress events while a crew runs.
pub trait CrewObserver: Send + Sync {
    fn on_event(&self, event: CrewEvent);
}

pub struct NoopObserver;

impl CrewObserver for NoopObserver {
    fn on_event(&self, _event: CrewEvent) {}
}

impl<F> CrewObserver for F
where
    F: Fn(CrewEvent) + Send + Sync,
{
    fn on_event(&self, event: CrewEvent) {
        self(event)
    }
}
