//! Generic collection operations: list, get, append, update, delete.

use rusqlite::{ErrorCode, OptionalExtension};
use tracing::debug;
use uuid::Uuid;

use super::{Change, ChangeKind, Document, Result, Storage, StorageError};

impl Storage {
    /// Lists every document of a collection, in insertion order.
    pub fn list<T: Document>(&self) -> Result<Vec<T>> {
        let table = T::COLLECTION.table();
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT body FROM {table} ORDER BY seq"))?;
        let bodies = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut docs = Vec::new();
        for body in bodies {
            docs.push(serde_json::from_str(&body?)?);
        }
        Ok(docs)
    }

    /// Loads one document by id.
    pub fn get<T: Document>(&self, id: Uuid) -> Result<T> {
        let table = T::COLLECTION.table();
        let body = self
            .conn
            .query_row(
                &format!("SELECT body FROM {table} WHERE id = ?1"),
                [id.to_string()],
                |row| row.get::<_, String>(0),
            )
            .optional()?
            .ok_or(StorageError::NotFound {
                collection: T::COLLECTION,
                id,
            })?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Appends a document under a freshly generated id and returns it.
    ///
    /// Any id already set on `doc` is replaced. An existing row is never
    /// overwritten.
    pub fn append<T: Document>(&self, mut doc: T) -> Result<T> {
        let id = Uuid::new_v4();
        doc.set_id(id);
        let body = serde_json::to_string(&doc)?;

        let table = T::COLLECTION.table();
        let inserted = self.conn.execute(
            &format!("INSERT INTO {table} (id, body) VALUES (?1, ?2)"),
            rusqlite::params![id.to_string(), body],
        );
        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                return Err(StorageError::AlreadyExists {
                    collection: T::COLLECTION,
                    id,
                });
            }
            Err(e) => return Err(e.into()),
        }

        debug!(collection = %T::COLLECTION, %id, label = %doc.label(), "appended");
        self.notify(&Change {
            collection: T::COLLECTION,
            kind: ChangeKind::Appended,
            id,
        });
        Ok(doc)
    }

    /// Replaces a stored document, keyed by its id.
    pub fn update<T: Document>(&self, doc: &T) -> Result<()> {
        if !T::MUTABLE {
            return Err(StorageError::Immutable(T::COLLECTION));
        }
        let id = doc.id();
        let body = serde_json::to_string(doc)?;

        let table = T::COLLECTION.table();
        let rows = self.conn.execute(
            &format!("UPDATE {table} SET body = ?1 WHERE id = ?2"),
            rusqlite::params![body, id.to_string()],
        )?;
        if rows == 0 {
            return Err(StorageError::NotFound {
                collection: T::COLLECTION,
                id,
            });
        }

        debug!(collection = %T::COLLECTION, %id, "updated");
        self.notify(&Change {
            collection: T::COLLECTION,
            kind: ChangeKind::Updated,
            id,
        });
        Ok(())
    }

    /// Deletes a document by id.
    ///
    /// Nothing else is touched: results referring to a deleted class,
    /// sheet, or sport stay in place and are simply no longer reachable
    /// through statistics.
    pub fn delete<T: Document>(&self, id: Uuid) -> Result<()> {
        let table = T::COLLECTION.table();
        let rows = self.conn.execute(
            &format!("DELETE FROM {table} WHERE id = ?1"),
            [id.to_string()],
        )?;
        if rows == 0 {
            return Err(StorageError::NotFound {
                collection: T::COLLECTION,
                id,
            });
        }

        debug!(collection = %T::COLLECTION, %id, "deleted");
        self.notify(&Change {
            collection: T::COLLECTION,
            kind: ChangeKind::Deleted,
            id,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::BTreeMap;

    use jiff::Timestamp;
    use tempfile::TempDir;

    use crate::model::*;
    use crate::storage::Collection;

    fn test_storage() -> (TempDir, Storage) {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path().join("eps")).unwrap();
        (dir, storage)
    }

    fn sample_class(name: &str) -> ClassData {
        ClassData::new(name, "secret").unwrap()
    }

    fn sample_result() -> ObservationResult {
        let mut data = BTreeMap::new();
        data.insert("tours".to_string(), ObservedValue::Count(4));
        ObservationResult {
            id: Uuid::nil(),
            student_id: Uuid::new_v4(),
            class_id: Uuid::new_v4(),
            sheet_id: Uuid::new_v4(),
            sport_id: Uuid::new_v4(),
            created_at: Timestamp::now(),
            data,
        }
    }

    #[test]
    fn append_assigns_id_and_get_loads_it() {
        let (_dir, storage) = test_storage();
        let class = storage.append(sample_class("2nde A")).unwrap();

        assert!(!class.id.is_nil());
        let loaded: ClassData = storage.get(class.id).unwrap();
        assert_eq!(loaded, class);
    }

    #[test]
    fn list_returns_insertion_order() {
        let (_dir, storage) = test_storage();
        storage.append(sample_class("Second")).unwrap();
        storage.append(sample_class("First")).unwrap();

        let names: Vec<_> = storage
            .list::<ClassData>()
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Second", "First"]);
    }

    #[test]
    fn list_empty_collection() {
        let (_dir, storage) = test_storage();
        assert!(storage.list::<SoftwareTool>().unwrap().is_empty());
    }

    #[test]
    fn get_missing_fails() {
        let (_dir, storage) = test_storage();
        let err = storage.get::<ClassData>(Uuid::new_v4()).unwrap_err();
        assert!(matches!(
            err,
            StorageError::NotFound {
                collection: Collection::Classes,
                ..
            }
        ));
    }

    #[test]
    fn update_replaces_body() {
        let (_dir, storage) = test_storage();
        let mut class = storage.append(sample_class("2nde A")).unwrap();
        class.add_students([StudentRecord::new("Jean", "Dupont", Gender::M).unwrap()]);
        storage.update(&class).unwrap();

        let loaded: ClassData = storage.get(class.id).unwrap();
        assert_eq!(loaded.students.len(), 1);
    }

    #[test]
    fn update_missing_fails() {
        let (_dir, storage) = test_storage();
        let mut class = sample_class("Ghost");
        class.id = Uuid::new_v4();
        let err = storage.update(&class).unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[test]
    fn results_are_append_only() {
        let (_dir, storage) = test_storage();
        let result = storage.append(sample_result()).unwrap();
        let err = storage.update(&result).unwrap_err();
        assert!(matches!(err, StorageError::Immutable(Collection::Results)));

        storage.delete::<ObservationResult>(result.id).unwrap();
        assert!(storage.list::<ObservationResult>().unwrap().is_empty());
    }

    #[test]
    fn delete_missing_fails() {
        let (_dir, storage) = test_storage();
        let err = storage.delete::<SoftwareTool>(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[test]
    fn appending_the_same_result_twice_keeps_both() {
        let (_dir, storage) = test_storage();
        let result = sample_result();

        let a = storage.append(result.clone()).unwrap();
        let b = storage.append(result).unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(storage.list::<ObservationResult>().unwrap().len(), 2);
    }

    #[test]
    fn two_connections_append_independently() {
        let dir = TempDir::new().unwrap();
        let first = Storage::new(dir.path()).unwrap();
        let second = Storage::new(dir.path()).unwrap();

        first.append(sample_result()).unwrap();
        second.append(sample_result()).unwrap();

        assert_eq!(first.list::<ObservationResult>().unwrap().len(), 2);
    }

    #[test]
    fn deleting_a_class_leaves_its_results() {
        let (_dir, storage) = test_storage();
        let class = storage.append(sample_class("2nde A")).unwrap();
        let mut result = sample_result();
        result.class_id = class.id;
        storage.append(result).unwrap();

        storage.delete::<ClassData>(class.id).unwrap();
        let results = storage.list::<ObservationResult>().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].class_id, class.id);
    }

    #[test]
    fn subscribers_see_every_mutation() {
        let (_dir, storage) = test_storage();
        let changes = storage.subscribe();

        let mut tool = storage
            .append(SoftwareTool::new("Chrono", "⏱", "<p>hi</p>".into()).unwrap())
            .unwrap();
        tool.name = "Chrono 2".into();
        storage.update(&tool).unwrap();
        storage.delete::<SoftwareTool>(tool.id).unwrap();

        let kinds: Vec<_> = changes.try_iter().map(|c| (c.collection, c.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                (Collection::Tools, ChangeKind::Appended),
                (Collection::Tools, ChangeKind::Updated),
                (Collection::Tools, ChangeKind::Deleted),
            ]
        );
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let (_dir, storage) = test_storage();
        drop(storage.subscribe());
        let live = storage.subscribe();

        storage.append(sample_class("2nde A")).unwrap();

        assert_eq!(storage.subscribers.borrow().len(), 1);
        assert_eq!(live.try_iter().count(), 1);
    }
}
