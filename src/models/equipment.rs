//! Equipment model

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::validate_not_blank;

/// Equipment as persisted in the `Equipment` collection (PascalCase keys)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EquipmentRecord {
    pub equipment_id: Uuid,
    pub equipment_type: String,
    pub building: String,
    pub floor: i32,
    pub location: String,
}

impl EquipmentRecord {
    /// Build a record with the stored casing: type and location lower case,
    /// building upper case.
    pub fn normalized(
        equipment_id: Uuid,
        equipment_type: &str,
        building: &str,
        floor: i32,
        location: &str,
    ) -> Self {
        Self {
            equipment_id,
            equipment_type: equipment_type.to_lowercase(),
            building: building.to_uppercase(),
            floor,
            location: location.to_lowercase(),
        }
    }
}

/// Equipment record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Equipment {
    pub equipment_id: Uuid,
    /// Kind of equipment, e.g. "fire extinguisher"
    pub equipment_type: String,
    pub building: String,
    pub floor: i32,
    /// Where on the floor the equipment is mounted
    pub location: String,
}

impl From<EquipmentRecord> for Equipment {
    fn from(record: EquipmentRecord) -> Self {
        Self {
            equipment_id: record.equipment_id,
            equipment_type: record.equipment_type,
            building: record.building,
            floor: record.floor,
            location: record.location,
        }
    }
}

/// Create equipment request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEquipment {
    #[validate(custom(function = "validate_not_blank"))]
    pub equipment_type: String,
    #[validate(custom(function = "validate_not_blank"))]
    pub building: String,
    pub floor: i32,
    #[validate(custom(function = "validate_not_blank"))]
    pub location: String,
}

/// Update equipment request; every field is replaced
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEquipment {
    #[validate(custom(function = "validate_not_blank"))]
    pub equipment_type: String,
    #[validate(custom(function = "validate_not_blank"))]
    pub location: String,
    pub floor: i32,
    #[validate(custom(function = "validate_not_blank"))]
    pub building: String,
}

/// Equipment list filter
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct EquipmentQuery {
    /// Exact, case-sensitive equipment type
    pub equipment_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_casing() {
        let id = Uuid::new_v4();
        let record = EquipmentRecord::normalized(id, "Fire Extinguisher", "a", 3, "HallWay");
        assert_eq!(record.equipment_type, "fire extinguisher");
        assert_eq!(record.building, "A");
        assert_eq!(record.location, "hallway");
        assert_eq!(record.floor, 3);
        assert_eq!(record.equipment_id, id);
    }

    #[test]
    fn whitespace_only_fields_are_invalid() {
        let request = CreateEquipment {
            equipment_type: "fire extinguisher".into(),
            building: "A".into(),
            floor: 1,
            location: "   ".into(),
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("location"));

        let request = UpdateEquipment {
            equipment_type: " ".into(),
            location: "lobby".into(),
            floor: 1,
            building: "\t".into(),
        };
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("equipment_type"));
        assert!(fields.contains_key("building"));
        assert!(!fields.contains_key("location"));
    }

    #[test]
    fn reads_legacy_documents() {
        let record: EquipmentRecord = serde_json::from_value(serde_json::json!({
            "EquipmentId": "0b5c3f4e-1111-4c2a-9a55-6d2f0e7d9a01",
            "EquipmentType": "fire extinguisher",
            "Building": "B",
            "Floor": -1,
            "Location": "boiler room"
        }))
        .unwrap();
        assert_eq!(record.floor, -1);
        assert_eq!(
            record.equipment_id.to_string(),
            "0b5c3f4e-1111-4c2a-9a55-6d2f0e7d9a01"
        );
    }
}
