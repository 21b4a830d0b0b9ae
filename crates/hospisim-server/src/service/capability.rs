//! Capability document derived from the store's configuration.

use hospisim_core::{FHIR_VERSION, FhirDateTime, now_utc};
use hospisim_storage::ResourceStore;
use serde::Serialize;

const SOFTWARE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Interactions every hosted type supports. There is no history, so no `vread`.
const INTERACTIONS: [&str; 5] = ["read", "update", "delete", "create", "search-type"];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityStatement {
    pub resource_type: &'static str,
    pub id: String,
    pub status: &'static str,
    pub date: FhirDateTime,
    pub kind: &'static str,
    pub software: Software,
    pub fhir_version: &'static str,
    pub format: Vec<&'static str>,
    pub rest: Vec<RestComponent>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Software {
    pub name: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct RestComponent {
    pub mode: &'static str,
    pub resource: Vec<ResourceCapability>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceCapability {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub interaction: Vec<Interaction>,
    pub versioning: &'static str,
    pub read_history: bool,
    pub update_create: bool,
    pub search_param: Vec<SearchParamCapability>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Interaction {
    pub code: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchParamCapability {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: &'static str,
}

pub fn capability_statement(store: &ResourceStore) -> CapabilityStatement {
    let service = store.service();
    let search_param: Vec<SearchParamCapability> = store
        .registry()
        .all()
        .iter()
        .map(|def| SearchParamCapability {
            name: def.name.clone(),
            param_type: def.param_type.as_str(),
        })
        .collect();

    let resource = store
        .resource_types()
        .iter()
        .map(|rt| ResourceCapability {
            resource_type: rt.to_string(),
            interaction: INTERACTIONS.into_iter().map(|code| Interaction { code }).collect(),
            versioning: "versioned",
            read_history: false,
            update_create: false,
            search_param: search_param.clone(),
        })
        .collect();

    CapabilityStatement {
        resource_type: "CapabilityStatement",
        id: format!("{service}-capability"),
        status: "active",
        date: now_utc(),
        kind: "instance",
        software: Software {
            name: service.display_name(),
            version: SOFTWARE_VERSION,
        },
        fhir_version: FHIR_VERSION,
        format: vec!["json"],
        rest: vec![RestComponent {
            mode: "server",
            resource,
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hospisim_core::{ResourceType, ServiceKind};
    use hospisim_db_memory::InMemoryStorage;
    use hospisim_storage::NoopPublisher;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn lists_hosted_types_and_search_parameters() {
        let store = ResourceStore::new(
            ServiceKind::Pharmacy,
            Arc::new(InMemoryStorage::new()),
            Arc::new(NoopPublisher),
        )
        .unwrap()
        .with_resource_types(vec![ResourceType::Medication, ResourceType::MedicationRequest]);

        let doc = serde_json::to_value(capability_statement(&store)).unwrap();
        assert_eq!(doc["id"], "pharmacy-capability");
        assert_eq!(doc["software"]["name"], "Healthcare POC - Pharmacy");
        assert_eq!(doc["fhirVersion"], "4.0.1");

        let resources = doc["rest"][0]["resource"].as_array().unwrap();
        assert_eq!(resources.len(), 2);
        assert_eq!(resources[1]["type"], "MedicationRequest");
        assert_eq!(resources[0]["readHistory"], false);
        assert_eq!(resources[0]["updateCreate"], false);
        assert_eq!(
            resources[0]["searchParam"][3],
            json!({"name": "patient", "type": "reference"})
        );
        let codes: Vec<_> = resources[0]["interaction"]
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["code"].as_str().unwrap())
            .collect();
        assert!(!codes.contains(&"vread"));
    }
}
