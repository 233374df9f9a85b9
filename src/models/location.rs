//! Location registry model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::enums::LocationType;

/// Named physical location
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: Uuid,
    pub name: String,
    /// WAREHOUSE, HEADQUARTERS, BRANCH, CUSTOMER, SERVICE_CENTER, INSTALLATION_TEAM, OTHER
    pub location_type: String,
    pub address: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Location {
    pub fn kind(&self) -> Option<LocationType> {
        LocationType::parse(&self.location_type)
    }

    /// Name-based headquarters heuristic
    pub fn name_marks_headquarters(name: &str, markers: &[String]) -> bool {
        let name = name.to_lowercase();
        markers
            .iter()
            .any(|marker| !marker.is_empty() && name.contains(&marker.to_lowercase()))
    }
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct LocationQuery {
    /// Only active locations (default: true)
    pub active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markers() -> Vec<String> {
        vec!["merkez".to_string(), "headquarter".to_string()]
    }

    #[test]
    fn test_headquarters_markers() {
        assert!(Location::name_marks_headquarters("Merkez Depo", &markers()));
        assert!(Location::name_marks_headquarters("İstanbul MERKEZ", &markers()));
        assert!(Location::name_marks_headquarters("Company Headquarters", &markers()));
        assert!(!Location::name_marks_headquarters("Ankara Şube", &markers()));
        assert!(!Location::name_marks_headquarters("anything", &[String::new()]));
    }
}
