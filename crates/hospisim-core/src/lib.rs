pub mod catalog;
pub mod document;
pub mod error;
pub mod events;
pub mod id;
pub mod resource;
pub mod time;

pub use catalog::ServiceKind;
pub use document::{Categories, CodeableConcept, Coding, Document, Identifier, Reference, ResourceMeta};
pub use error::{CoreError, ErrorCategory, Result};
pub use id::{IdError, generate_id, validate_id};
pub use resource::ResourceType;
pub use time::{FhirDateTime, now_utc};

/// Version string advertised in capability documents.
pub const FHIR_VERSION: &str = "4.0.1";

/// Content type of every resource body and event payload.
pub const FHIR_JSON: &str = "application/fhir+json";
