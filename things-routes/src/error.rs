#[derive(Debug, thiserror::Error)]
#[error("thing service failed")]
pub struct ThingServiceError;
