//! Equipment service

use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::equipment::{CreateEquipment, Equipment, EquipmentQuery, EquipmentRecord, UpdateEquipment},
    repository::Repository,
};

#[derive(Clone)]
pub struct EquipmentService {
    repository: Repository,
}

fn parse_id(id: &str) -> AppResult<Uuid> {
    Uuid::parse_str(id.trim())
        .map_err(|_| AppError::Validation(format!("'{}' is not a valid equipment id", id)))
}

impl EquipmentService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self, query: &EquipmentQuery) -> AppResult<Vec<Equipment>> {
        let equipment_type = query.equipment_type.as_deref().filter(|t| !t.is_empty());
        let records = self.repository.equipment_list(equipment_type).await?;
        Ok(records.into_iter().map(Equipment::from).collect())
    }

    pub async fn get_by_id(&self, id: &str) -> AppResult<Equipment> {
        let id = parse_id(id)?;
        self.repository
            .equipment_get(id)
            .await?
            .map(Equipment::from)
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
    }

    pub async fn create(&self, data: &CreateEquipment) -> AppResult<Equipment> {
        data.validate()?;

        let record = EquipmentRecord::normalized(
            Uuid::new_v4(),
            &data.equipment_type,
            &data.building,
            data.floor,
            &data.location,
        );
        self.repository.equipment_create(&record).await?;

        tracing::info!("Added equipment {} ({})", record.equipment_id, record.equipment_type);
        Ok(record.into())
    }

    /// Replace every field of existing equipment
    pub async fn update(&self, id: &str, data: &UpdateEquipment) -> AppResult<Equipment> {
        let id = parse_id(id)?;
        data.validate()?;

        let record = EquipmentRecord::normalized(
            id,
            &data.equipment_type,
            &data.building,
            data.floor,
            &data.location,
        );
        self.repository.equipment_replace(&record).await?;

        tracing::info!("Updated equipment {}", id);
        Ok(record.into())
    }

    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let id = parse_id(id)?;
        if !self.repository.equipment_delete(id).await? {
            return Err(AppError::NotFound(format!("Equipment {} not found", id)));
        }
        tracing::info!("Deleted equipment {}", id);
        Ok(())
    }
}
