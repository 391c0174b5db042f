use crate::error::ThingServiceError;
use crate::{OptServiceResult, ServiceResult};
use error_stack::{Report, ResultExt};
use things_core::model::{NewThing, Thing};
use things_core::{ThingEngine, ThingFields, ThingRepository};
use tracing::{debug, instrument};

#[derive(Debug, Clone)]
pub struct ThingService<T> {
    engine: T,
}

impl<T> ThingService<T>
where
    T: ThingEngine,
{
    pub fn new(engine: T) -> Self {
        ThingService { engine }
    }

    /// Path segments become ids here, so a malformed id fails like any other storage call.
    fn parse_id(raw_id: &str) -> ServiceResult<T::ThingId> {
        raw_id
            .parse::<T::ThingId>()
            .map_err(Report::new)
            .change_context(ThingServiceError)
    }

    #[instrument(skip(self), name = "service#get")]
    pub async fn get(&self, raw_id: &str) -> OptServiceResult<Thing<T::ThingId>> {
        let id = Self::parse_id(raw_id)?;

        self.engine
            .repo()
            .get(id)
            .await
            .change_context(ThingServiceError)
    }

    #[instrument(skip(self), name = "service#list")]
    pub async fn list(&self) -> ServiceResult<Vec<Thing<T::ThingId>>> {
        self.engine
            .repo()
            .list()
            .await
            .change_context(ThingServiceError)
    }

    #[instrument(skip_all, name = "service#create")]
    pub async fn create(&self, fields: ThingFields) -> ServiceResult<Thing<T::ThingId>> {
        self.engine
            .repo()
            .create(NewThing::from_fields(fields))
            .await
            .change_context(ThingServiceError)
    }

    /// Nothing stored under the id is not an error, the same as a successful replace.
    #[instrument(skip(self, fields), name = "service#replace")]
    pub async fn replace(&self, raw_id: &str, fields: ThingFields) -> ServiceResult<()> {
        let id = Self::parse_id(raw_id)?;

        let replaced = self
            .engine
            .repo()
            .replace(id, NewThing::from_fields(fields))
            .await
            .change_context(ThingServiceError)?;

        if replaced.is_none() {
            debug!("no thing stored under {raw_id}, nothing replaced");
        }
        Ok(())
    }

    /// Nothing stored under the id is not an error, the same as a successful delete.
    #[instrument(skip(self), name = "service#delete")]
    pub async fn delete(&self, raw_id: &str) -> ServiceResult<()> {
        let id = Self::parse_id(raw_id)?;

        let deleted = self
            .engine
            .repo()
            .delete(id)
            .await
            .change_context(ThingServiceError)?;

        if deleted.is_none() {
            debug!("no thing stored under {raw_id}, nothing deleted");
        }
        Ok(())
    }
}
