//! Versioned entities and their row codec

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::store::{Fields, Query, Record, RecordId, StoreError, StoreResult, Transaction};

/// Monotonically advancing version token
pub type Version = i64;

/// Column holding the version token
pub const VERSION_COLUMN: &str = "version";

/// Version assigned on insert
pub const INITIAL_VERSION: Version = 1;

/// Highest version an update can still advance from
pub const MAX_VERSION: Version = Version::MAX - 1;

/// A mutable record guarded by a version token
///
/// The serialized form must contain `id` and `version` fields.
pub trait Versioned: Serialize + DeserializeOwned + Send {
    /// Table the entity is stored in
    const TABLE: &'static str;

    fn id(&self) -> RecordId;

    fn version(&self) -> Version;
}

/// Decode a row into an entity
pub fn decode<E: Versioned>(record: Record) -> StoreResult<E> {
    let mut fields = record.fields;
    fields.insert("id".to_string(), json!(record.id));
    Ok(serde_json::from_value(Value::Object(fields))?)
}

/// Encode an entity's columns, without its primary key
pub fn encode<E: Serialize>(entity: &E) -> StoreResult<Fields> {
    match serde_json::to_value(entity)? {
        Value::Object(mut fields) => {
            fields.remove("id");
            Ok(fields)
        }
        other => Err(StoreError::Codec(format!(
            "entity must serialize to an object, got {}",
            other
        ))),
    }
}

/// Read one entity by id
pub async fn find<E, Tx>(tx: &mut Tx, id: RecordId) -> StoreResult<Option<E>>
where
    E: Versioned,
    Tx: Transaction,
{
    match tx.find(E::TABLE, id).await? {
        Some(record) => decode(record).map(Some),
        None => Ok(None),
    }
}

/// Insert a new entity from its columns; the version starts at 1
pub async fn insert<E, Tx>(tx: &mut Tx, mut fields: Fields) -> StoreResult<E>
where
    E: Versioned,
    Tx: Transaction,
{
    fields.insert(VERSION_COLUMN.to_string(), json!(INITIAL_VERSION));
    let record = tx.insert(E::TABLE, fields).await?;
    decode(record)
}

/// Read the entities matching `query`
pub async fn select<E, Tx>(tx: &mut Tx, query: Query) -> StoreResult<Vec<E>>
where
    E: Versioned,
    Tx: Transaction,
{
    tx.select(E::TABLE, query)
        .await?
        .into_iter()
        .map(decode)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Note {
        id: RecordId,
        body: String,
        version: Version,
    }

    impl Versioned for Note {
        const TABLE: &'static str = "notes";

        fn id(&self) -> RecordId {
            self.id
        }

        fn version(&self) -> Version {
            self.version
        }
    }

    #[test]
    fn test_encode_strips_id() {
        let note = Note {
            id: 4,
            body: "hi".into(),
            version: 2,
        };
        let fields = encode(&note).unwrap();
        assert!(!fields.contains_key("id"));
        assert_eq!(fields["version"], 2);
    }

    #[test]
    fn test_decode_restores_id() {
        let record = Record {
            id: 9,
            fields: json!({"body": "x", "version": 1}).as_object().cloned().unwrap(),
        };
        let note: Note = decode(record).unwrap();
        assert_eq!(note.id(), 9);
        assert_eq!(note.version(), 1);
    }

    #[test]
    fn test_encode_rejects_scalars() {
        assert!(matches!(encode(&5), Err(StoreError::Codec(_))));
    }
}
