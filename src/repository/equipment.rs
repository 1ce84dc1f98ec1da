//! Equipment domain methods on Repository

use uuid::Uuid;

use super::{from_document, to_document, Repository, EQUIPMENT_COLLECTION};
use crate::{
    error::AppResult,
    models::equipment::EquipmentRecord,
    store::FieldFilter,
};

impl Repository {
    /// List equipment, optionally only one exact type
    pub async fn equipment_list(&self, equipment_type: Option<&str>) -> AppResult<Vec<EquipmentRecord>> {
        let filter = equipment_type.map(|t| FieldFilter::equals("EquipmentType", t));
        self.store
            .list(EQUIPMENT_COLLECTION, filter)
            .await?
            .into_iter()
            .map(|doc| from_document(EQUIPMENT_COLLECTION, doc))
            .collect()
    }

    /// Get equipment by ID
    pub async fn equipment_get(&self, id: Uuid) -> AppResult<Option<EquipmentRecord>> {
        self.store
            .get(EQUIPMENT_COLLECTION, &id.to_string())
            .await?
            .map(|doc| from_document(EQUIPMENT_COLLECTION, doc))
            .transpose()
    }

    /// Create equipment keyed by its generated id
    pub async fn equipment_create(&self, record: &EquipmentRecord) -> AppResult<()> {
        self.store
            .set(EQUIPMENT_COLLECTION, &record.equipment_id.to_string(), to_document(record)?)
            .await?;
        Ok(())
    }

    /// Overwrite an existing equipment record; NotFound if absent
    pub async fn equipment_replace(&self, record: &EquipmentRecord) -> AppResult<()> {
        self.store
            .update(EQUIPMENT_COLLECTION, &record.equipment_id.to_string(), to_document(record)?)
            .await?;
        Ok(())
    }

    /// Delete equipment by key, returning whether it existed
    pub async fn equipment_delete(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.store.delete(EQUIPMENT_COLLECTION, &id.to_string()).await?)
    }
}
