use bson::oid::ObjectId;
use bson::{Bson, Document, doc};
use error_stack::{Report, ResultExt};
use mongodb::{Client, Collection, Database};
use serde::{Serialize, Serializer};
use serde_json::{Number, Value};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;
use things_core::ThingRepository;
use things_core::model::{NewThing, Thing, ThingFields};
use things_core::result::{OptRepoResult, RepoResult, ThingRepoError};
use tokio_stream::StreamExt;
use tracing::{debug, error, info, instrument};

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[repr(transparent)]
pub struct ThingId(#[serde(serialize_with = "obj_id_serialize")] ObjectId);

fn obj_id_serialize<S>(id: &ObjectId, ser: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    id.to_hex().serialize(ser)
}

impl ThingId {
    pub fn new_with(id: ObjectId) -> Self {
        Self(id)
    }

    pub fn object_id(&self) -> ObjectId {
        self.0
    }
}

impl From<ThingId> for Bson {
    fn from(value: ThingId) -> Self {
        value.0.into()
    }
}

impl Display for ThingId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("'{id}' is not a valid thing id")]
pub struct InvalidThingId {
    id: String,
    #[source]
    source: bson::oid::Error,
}

impl FromStr for ThingId {
    type Err = InvalidThingId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectId::parse_str(s)
            .map(Self)
            .map_err(|source| InvalidThingId {
                id: s.to_owned(),
                source,
            })
    }
}

pub enum ConnectionDetails {
    Url(String),
}

impl ConnectionDetails {
    /// Reads the connection string from the environment variable `var`.
    pub fn from_env(var: &str) -> Result<Self, Report<ConnectError>> {
        std::env::var(var)
            .change_context(ConnectError::MissingUrl)
            .attach_with(|| format!("{var} is not set"))
            .map(Self::Url)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("no mongodb connection string was given")]
    MissingUrl,
    #[error("failed to create client connection to mongodb instance")]
    Client,
    #[error("mongodb instance did not answer a ping")]
    Ping,
    #[error("mongodb connection is unavailable: {0}")]
    Unavailable(Arc<str>),
}

#[derive(Debug, thiserror::Error)]
enum DocumentError {
    #[error("thing fields could not be converted to a document")]
    Fields,
    #[error("stored thing does not have an ObjectId under _id")]
    MissingId,
}

#[derive(Debug, Clone)]
enum Connection {
    Live(Database),
    Unavailable(Arc<str>),
}

/// Things stored in a single mongodb collection.
///
/// The repo is cheap to clone, every clone shares the driver's connection pool.
#[derive(Debug, Clone)]
pub struct ThingRepo {
    connection: Connection,
}

/// Used when the connection string does not name a database, same as the driver's shell.
const DEFAULT_DB_NAME: &str = "test";
const THINGS_COLLECTION_NAME: &str = "things";

impl ThingRepo {
    pub fn new(client: Client) -> Self {
        let db = client
            .default_database()
            .unwrap_or_else(|| client.database(DEFAULT_DB_NAME));

        Self {
            connection: Connection::Live(db),
        }
    }

    /// A repo whose every operation fails with `reason`.
    pub fn unavailable(reason: impl Display) -> Self {
        Self {
            connection: Connection::Unavailable(reason.to_string().into()),
        }
    }

    /// Creates the client and makes sure the instance answers before returning.
    pub async fn init(
        connection_details: ConnectionDetails,
    ) -> Result<ThingRepo, Report<ConnectError>> {
        let repo = Self::new(create_client(connection_details).await?);
        repo.ping().await?;
        Ok(repo)
    }

    /// Creates the client and checks the connection once in the background.
    /// The outcome is only logged. If no client can be created at all,
    /// an unavailable repo is returned so the service can still start.
    pub async fn connect(connection_details: ConnectionDetails) -> ThingRepo {
        let client = match create_client(connection_details).await {
            Ok(client) => client,
            Err(e) => {
                error!("failed to connect to mongodb: {e:?}");
                return Self::unavailable(format!("{e:#}"));
            }
        };

        let repo = Self::new(client);
        let pinged = repo.clone();
        tokio::spawn(async move {
            match pinged.ping().await {
                Ok(()) => info!("connected to mongodb"),
                Err(e) => error!("failed to connect to mongodb: {e:?}"),
            }
        });

        repo
    }

    pub async fn ping(&self) -> Result<(), Report<ConnectError>> {
        self.database()?
            .run_command(doc! { "ping": 1 })
            .await
            .change_context(ConnectError::Ping)
            .map(|_| ())
    }

    fn database(&self) -> Result<&Database, Report<ConnectError>> {
        match &self.connection {
            Connection::Live(db) => Ok(db),
            Connection::Unavailable(reason) => {
                Err(Report::new(ConnectError::Unavailable(Arc::clone(reason))))
            }
        }
    }

    fn collection(&self) -> Result<Collection<Document>, Report<ConnectError>> {
        self.database()
            .map(|db| db.collection::<Document>(THINGS_COLLECTION_NAME))
    }
}

async fn create_client(
    connection_details: ConnectionDetails,
) -> Result<Client, Report<ConnectError>> {
    match connection_details {
        ConnectionDetails::Url(url) => Client::with_uri_str(url)
            .await
            .change_context(ConnectError::Client),
    }
}

fn thing_document(new_thing: &NewThing) -> Result<Document, Report<DocumentError>> {
    fields_document(new_thing.fields())
}

/// Objects are stored as plain documents, even when their keys look like
/// extended json type tags (`$date`, `$oid`, `$numberLong`, ..).
fn fields_document(fields: &ThingFields) -> Result<Document, Report<DocumentError>> {
    fields
        .iter()
        .map(|(name, value)| field_bson(value).map(|bson| (name.clone(), bson)))
        .collect()
}

fn field_bson(value: &Value) -> Result<Bson, Report<DocumentError>> {
    let bson = match value {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(*b),
        Value::Number(number) => number_bson(number)?,
        Value::String(s) => Bson::String(s.clone()),
        Value::Array(values) => {
            Bson::Array(values.iter().map(field_bson).collect::<Result<Vec<_>, _>>()?)
        }
        Value::Object(fields) => Bson::Document(fields_document(fields)?),
    };
    Ok(bson)
}

fn number_bson(number: &Number) -> Result<Bson, Report<DocumentError>> {
    if let Some(n) = number.as_i64() {
        return Ok(Bson::Int64(n));
    }

    match number.as_f64() {
        Some(n) if number.is_f64() => Ok(Bson::Double(n)),
        _ => Err(Report::new(DocumentError::Fields))
            .attach_with(|| format!("{number} does not fit a 64 bit signed integer")),
    }
}

fn thing_from_document(mut document: Document) -> Result<Thing<ThingId>, Report<DocumentError>> {
    let id = match document.remove("_id") {
        Some(Bson::ObjectId(id)) => ThingId(id),
        other => {
            return Err(Report::new(DocumentError::MissingId))
                .attach_with(|| format!("found {other:?} under _id"));
        }
    };

    let fields = document
        .into_iter()
        .map(|(name, value)| (name, value.into_relaxed_extjson()))
        .collect::<ThingFields>();

    Ok(Thing::new(id, fields))
}

impl ThingRepository for ThingRepo {
    type ThingId = ThingId;

    #[instrument(skip(self), name = "repo#get")]
    async fn get(&self, id: Self::ThingId) -> OptRepoResult<Thing<Self::ThingId>> {
        self.collection()
            .change_context(ThingRepoError::Get)?
            .find_one(doc! { "_id": id })
            .await
            .change_context(ThingRepoError::Get)?
            .map(thing_from_document)
            .transpose()
            .change_context(ThingRepoError::Get)
    }

    #[instrument(skip(self), name = "repo#list")]
    async fn list(&self) -> RepoResult<Vec<Thing<Self::ThingId>>> {
        self.collection()
            .change_context(ThingRepoError::List)?
            .find(Document::new())
            .await
            .change_context(ThingRepoError::List)?
            .map(|document| {
                document
                    .change_context(ThingRepoError::List)
                    .and_then(|d| thing_from_document(d).change_context(ThingRepoError::List))
            })
            .collect::<Result<_, _>>()
            .await
    }

    #[instrument(skip_all, name = "repo#create")]
    async fn create(&self, new_thing: NewThing) -> RepoResult<Thing<Self::ThingId>> {
        let document = thing_document(&new_thing).change_context(ThingRepoError::Create)?;

        let result = self
            .collection()
            .change_context(ThingRepoError::Create)?
            .insert_one(document)
            .await
            .change_context(ThingRepoError::Create)?;

        let id = result
            .inserted_id
            .as_object_id()
            .ok_or(ThingRepoError::Create)
            .attach_with(|| format!("inserted id {:?} was not an ObjectId", result.inserted_id))?;

        debug!(%id, "thing created");
        Ok(Thing::from_new(ThingId(id), new_thing))
    }

    #[instrument(skip(self, thing), name = "repo#replace")]
    async fn replace(&self, id: Self::ThingId, thing: NewThing) -> OptRepoResult<()> {
        let mut document = thing_document(&thing).change_context(ThingRepoError::Replace)?;
        document.insert("_id", id);

        let result = self
            .collection()
            .change_context(ThingRepoError::Replace)?
            .replace_one(doc! { "_id": id }, document)
            .await
            .change_context(ThingRepoError::Replace)?;

        Ok((result.matched_count > 0).then_some(()))
    }

    #[instrument(skip(self), name = "repo#delete")]
    async fn delete(&self, id: Self::ThingId) -> OptRepoResult<()> {
        let result = self
            .collection()
            .change_context(ThingRepoError::Delete)?
            .delete_one(doc! { "_id": id })
            .await
            .change_context(ThingRepoError::Delete)?;

        Ok((result.deleted_count > 0).then_some(()))
    }
}
