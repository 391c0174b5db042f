use crate::error::ThingServiceError;
use error_stack::Report;

pub type ServiceResult<T> = Result<T, Report<ThingServiceError>>;
pub type OptServiceResult<T> = Result<Option<T>, Report<ThingServiceError>>;

mod cors;
pub mod error;
mod metrics;
pub mod routes;
pub mod service;
pub mod state;
mod stream;
