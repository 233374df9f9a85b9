//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{cargo, health, inventory, locations, reconcile, repairs};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Cargoline API",
        version = "0.3.0",
        description = "Cargo, equivalent-device inventory and repair status synchronization"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Locations
        locations::list_locations,
        locations::get_headquarters,
        // Inventory
        inventory::list_devices,
        inventory::get_device,
        inventory::list_movements,
        inventory::dispatch,
        // Cargo
        cargo::list_cargo,
        cargo::get_cargo,
        cargo::create_cargo,
        cargo::update_cargo,
        cargo::update_repair_details,
        // Repairs
        repairs::get_repair,
        repairs::create_repair,
        repairs::update_repair,
        repairs::link_repair,
        // Reconciliation
        reconcile::drain_pending,
    ),
    components(
        schemas(
            // Locations
            crate::models::location::Location,
            crate::models::location::LocationQuery,
            // Inventory
            crate::models::device::EquivalentDevice,
            crate::models::device::DeviceQuery,
            crate::models::device::DeviceMovement,
            crate::models::device::DispatchRequest,
            crate::models::device::DispatchResponse,
            // Cargo
            crate::models::cargo::CargoDetails,
            crate::models::cargo::CargoDevice,
            crate::models::cargo::CargoDeviceInput,
            crate::models::cargo::CreateCargo,
            crate::models::cargo::UpdateCargo,
            crate::models::cargo::UpdateRepairDetails,
            crate::models::cargo::CargoQuery,
            crate::models::enums::RecordStatus,
            // Repair metadata
            crate::models::repair_metadata::RepairMetadata,
            crate::models::repair_metadata::MetadataStatus,
            crate::models::repair_metadata::ApprovalState,
            crate::models::repair_metadata::RepairCosts,
            crate::models::repair_metadata::SparePart,
            crate::models::repair_metadata::HistoryEntry,
            // Repairs
            crate::models::repair::RepairTicketDetails,
            crate::models::repair::CreateRepair,
            crate::models::repair::UpdateRepair,
            crate::models::repair::LinkRepairRequest,
            crate::models::repair::ReconcileSummary,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "locations", description = "Location registry"),
        (name = "inventory", description = "Equivalent devices and movement ledger"),
        (name = "cargo", description = "Cargo records and record status"),
        (name = "repairs", description = "Repair tickets"),
        (name = "reconcile", description = "Cargo/repair status reconciliation")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
