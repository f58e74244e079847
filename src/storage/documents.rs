//! Which model type lives in which collection.

use uuid::Uuid;

use crate::model::{ClassData, ObservationResult, ObservationSheet, SoftwareTool, Sport};

use super::{Collection, Document};

impl Document for ClassData {
    const COLLECTION: Collection = Collection::Classes;

    fn id(&self) -> Uuid {
        self.id
    }

    fn set_id(&mut self, id: Uuid) {
        self.id = id;
    }

    fn label(&self) -> String {
        self.name.clone()
    }
}

impl Document for Sport {
    const COLLECTION: Collection = Collection::Sports;

    fn id(&self) -> Uuid {
        self.id
    }

    fn set_id(&mut self, id: Uuid) {
        self.id = id;
    }

    fn label(&self) -> String {
        self.name.clone()
    }
}

impl Document for ObservationSheet {
    const COLLECTION: Collection = Collection::Sheets;

    fn id(&self) -> Uuid {
        self.id
    }

    fn set_id(&mut self, id: Uuid) {
        self.id = id;
    }

    fn label(&self) -> String {
        self.title.clone()
    }
}

impl Document for ObservationResult {
    const COLLECTION: Collection = Collection::Results;
    const MUTABLE: bool = false;

    fn id(&self) -> Uuid {
        self.id
    }

    fn set_id(&mut self, id: Uuid) {
        self.id = id;
    }

    fn label(&self) -> String {
        self.created_at.to_string()
    }
}

impl Document for SoftwareTool {
    const COLLECTION: Collection = Collection::Tools;

    fn id(&self) -> Uuid {
        self.id
    }

    fn set_id(&mut self, id: Uuid) {
        self.id = id;
    }

    fn label(&self) -> String {
        self.name.clone()
    }
}
