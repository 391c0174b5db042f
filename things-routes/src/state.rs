use crate::service::ThingService;
use axum::extract::FromRef;
use things_core::ThingEngine;

/// Everything the thing routes share. Metrics are off unless asked for.
#[derive(Clone)]
pub struct ThingAppState<T: ThingEngine> {
    pub service: ThingService<T>,
    pub metrics_enabled: bool,
}

impl<T: ThingEngine> ThingAppState<T> {
    pub fn new(engine: T) -> Self {
        Self {
            service: ThingService::new(engine),
            metrics_enabled: false,
        }
    }

    pub fn with_metrics(self, metrics_enabled: bool) -> Self {
        Self {
            metrics_enabled,
            ..self
        }
    }
}

impl<T: ThingEngine> FromRef<ThingAppState<T>> for ThingService<T> {
    fn from_ref(input: &ThingAppState<T>) -> Self {
        input.service.clone()
    }
}
