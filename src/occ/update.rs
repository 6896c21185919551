//! Compare-and-swap update keyed by the version token
//!
//! `UPDATE t SET <mutation>, version = expected + 1 WHERE id = ? AND version = expected`
//!
//! One affected row means the caller's read is still current. Zero rows means
//! the row is gone or another writer got there first; no retry is attempted.

use serde::Serialize;
use serde_json::{json, Value};

use crate::store::{Fields, Predicate, RecordId, StoreError, Transaction};

use super::entity::{decode, Version, Versioned, VERSION_COLUMN};
use super::errors::ConcurrencyError;

/// Column changes applied by a versioned update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mutation {
    fields: Fields,
}

impl Mutation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `column` to `value`; `id` and `version` are owned by the update
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        let column = column.into();
        if column != "id" && column != VERSION_COLUMN {
            self.fields.insert(column, value.into());
        }
        self
    }

    /// Build from a patch struct; `null` (unset `Option`) fields are skipped
    pub fn from_patch<P: Serialize>(patch: &P) -> Result<Self, ConcurrencyError> {
        match serde_json::to_value(patch)? {
            Value::Object(fields) => Ok(fields
                .into_iter()
                .filter(|(_, value)| !value.is_null())
                .fold(Self::new(), |m, (column, value)| m.set(column, value))),
            other => Err(ConcurrencyError::InvalidMutation(format!(
                "patch must serialize to an object, got {}",
                other
            ))),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    fn into_values(self, next_version: Version) -> Fields {
        let mut values = self.fields;
        values.insert(VERSION_COLUMN.to_string(), json!(next_version));
        values
    }
}

/// Apply `mutation` only if the stored version still equals `expected_version`
///
/// Zero affected rows is reported as [`ConcurrencyError::Conflict`] without
/// looking further; callers that checked existence earlier in the same
/// transaction can rely on that. Use [`update_versioned_checked`] otherwise.
pub async fn update_versioned<E, Tx>(
    tx: &mut Tx,
    id: RecordId,
    expected_version: Version,
    mutation: Mutation,
) -> Result<E, ConcurrencyError>
where
    E: Versioned,
    Tx: Transaction,
{
    // A version that cannot advance can never have been stored
    let Some(next_version) = expected_version.checked_add(1) else {
        return Err(ConcurrencyError::Conflict {
            id,
            expected: expected_version,
            actual: None,
        });
    };

    let predicate = Predicate::by_id(id).and_eq(VERSION_COLUMN, expected_version);
    let affected = tx
        .update(E::TABLE, predicate, mutation.into_values(next_version))
        .await?;

    match affected {
        0 => Err(ConcurrencyError::Conflict {
            id,
            expected: expected_version,
            actual: None,
        }),
        1 => {
            let record = tx.find(E::TABLE, id).await?.ok_or_else(|| {
                StoreError::Internal(format!("record {} vanished after update", id))
            })?;
            Ok(decode(record)?)
        }
        n => Err(StoreError::Internal(format!(
            "conditional update on record {} affected {} rows",
            id, n
        ))
        .into()),
    }
}

/// Like [`update_versioned`], but re-reads the row in the same transaction
/// after a zero-row update to tell a missing row from a lost race
pub async fn update_versioned_checked<E, Tx>(
    tx: &mut Tx,
    id: RecordId,
    expected_version: Version,
    mutation: Mutation,
) -> Result<E, ConcurrencyError>
where
    E: Versioned,
    Tx: Transaction,
{
    match update_versioned::<E, Tx>(tx, id, expected_version, mutation).await {
        Err(ConcurrencyError::Conflict { .. }) => match tx.find(E::TABLE, id).await? {
            None => Err(ConcurrencyError::NotFound { id }),
            Some(record) => Err(ConcurrencyError::Conflict {
                id,
                expected: expected_version,
                actual: record.fields.get(VERSION_COLUMN).and_then(Value::as_i64),
            }),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize)]
    struct Patch {
        email: Option<String>,
        age: Option<i32>,
        version: i64,
    }

    #[test]
    fn test_from_patch_skips_unset_and_owned_columns() {
        let patch = Patch {
            email: Some("new@x.co".into()),
            age: None,
            version: 3,
        };
        let mutation = Mutation::from_patch(&patch).unwrap();

        assert_eq!(mutation.len(), 1);
        let values = mutation.into_values(4);
        assert_eq!(values["email"], "new@x.co");
        assert_eq!(values["version"], 4);
        assert!(!values.contains_key("age"));
    }

    #[test]
    fn test_set_ignores_id() {
        let mutation = Mutation::new().set("id", 99).set("age", 5);
        assert_eq!(mutation.len(), 1);
    }

    #[test]
    fn test_from_patch_rejects_non_objects() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper(i32);

        assert!(matches!(
            Mutation::from_patch(&Wrapper(1)),
            Err(ConcurrencyError::InvalidMutation(_))
        ));
    }
}
