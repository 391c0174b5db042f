use model::{NewThing, Thing};
use result::{OptRepoResult, RepoResult};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Debug, Display};
use std::str::FromStr;
use std::sync::Arc;

pub mod model;
pub mod result;

pub use model::ThingFields;

pub trait ThingEngine: Clone + Send + Sync + 'static {
    type ThingId: ThingId;
    type Repo: ThingRepository<ThingId = Self::ThingId> + Send + Sync + 'static;

    fn repo(&self) -> Self::Repo;
}

pub trait ThingRepository {
    type ThingId: ThingId;

    fn get(
        &self,
        id: Self::ThingId,
    ) -> impl Future<Output = OptRepoResult<Thing<Self::ThingId>>> + Send;

    fn list(&self) -> impl Future<Output = RepoResult<Vec<Thing<Self::ThingId>>>> + Send;

    fn create(
        &self,
        new_thing: NewThing,
    ) -> impl Future<Output = RepoResult<Thing<Self::ThingId>>> + Send;

    /// Replace every field of the thing stored under `id`. The stored id never changes.
    /// `None` means nothing was stored under `id`.
    fn replace(
        &self,
        id: Self::ThingId,
        thing: NewThing,
    ) -> impl Future<Output = OptRepoResult<()>> + Send;

    fn delete(&self, id: Self::ThingId) -> impl Future<Output = OptRepoResult<()>> + Send;
}

impl<R> ThingRepository for Arc<R>
where
    R: ThingRepository + Send + Sync,
{
    type ThingId = R::ThingId;

    fn get(
        &self,
        id: Self::ThingId,
    ) -> impl Future<Output = OptRepoResult<Thing<Self::ThingId>>> + Send {
        (**self).get(id)
    }

    fn list(&self) -> impl Future<Output = RepoResult<Vec<Thing<Self::ThingId>>>> + Send {
        (**self).list()
    }

    fn create(
        &self,
        new_thing: NewThing,
    ) -> impl Future<Output = RepoResult<Thing<Self::ThingId>>> + Send {
        (**self).create(new_thing)
    }

    fn replace(
        &self,
        id: Self::ThingId,
        thing: NewThing,
    ) -> impl Future<Output = OptRepoResult<()>> + Send {
        (**self).replace(id, thing)
    }

    fn delete(&self, id: Self::ThingId) -> impl Future<Output = OptRepoResult<()>> + Send {
        (**self).delete(id)
    }
}

/// Identifier assigned to a thing by the storage engine.
/// Ids arrive as path segments, so they must parse from a string.
pub trait ThingId:
    Debug
    + Display
    + FromStr<Err: Error + Send + Sync + 'static>
    + Send
    + Sync
    + Serialize
    + Clone
    + PartialEq
    + 'static
{
}

impl<T> ThingId for T where
    T: Debug
        + Display
        + FromStr<Err: Error + Send + Sync + 'static>
        + Send
        + Sync
        + Serialize
        + Clone
        + PartialEq
        + 'static
{
}
