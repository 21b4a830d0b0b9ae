//! Typed view of a stored resource document.
//!
//! Only the fields the store and the query engine reason about are typed; every other
//! member of the incoming JSON object is kept verbatim in [`Document::extra`] so that a
//! document survives a parse/serialize cycle without losing data.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CoreError, Result};
use crate::id::validate_id;
use crate::resource::ResourceType;
use crate::time::FhirDateTime;

static BIRTH_DATE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\d{4}(-\d{2}(-\d{2})?)?$").ok());

const GENDERS: &[&str] = &["male", "female", "other", "unknown"];
const ALLERGY_CATEGORIES: &[&str] = &["food", "medication", "environment", "biologic"];

/// Server-managed metadata stamped on every write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMeta {
    pub version_id: String,
    pub last_updated: FhirDateTime,
}

impl ResourceMeta {
    pub fn new(version: u64, last_updated: FhirDateTime) -> Self {
        Self {
            version_id: version.to_string(),
            last_updated,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Reference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Identifier {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Coding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CodeableConcept {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coding: Option<Vec<Coding>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CodeableConcept {
    /// True when any coding carries exactly `code`.
    pub fn has_code(&self, code: &str) -> bool {
        self.coding
            .iter()
            .flatten()
            .any(|coding| coding.code.as_deref() == Some(code))
    }
}

/// A category entry. Most resource types use coded concepts; AllergyIntolerance uses
/// bare codes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Category {
    Code(String),
    Concept(CodeableConcept),
}

/// `category` as sent: most types carry a list, some (Procedure, the medication
/// events) a single concept. The shape is kept on the way back out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Categories {
    Many(Vec<Category>),
    One(CodeableConcept),
}

impl Categories {
    pub fn entries(&self) -> Vec<Category> {
        match self {
            Categories::Many(entries) => entries.clone(),
            Categories::One(concept) => vec![Category::Concept(concept.clone())],
        }
    }
}

/// A resource document as persisted by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub resource_type: ResourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResourceMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<Reference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<Vec<Identifier>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Categories>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<CodeableConcept>,
    /// Every member not typed above, kept as received.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Document {
    /// Parses a client body as a document of `resource_type`.
    ///
    /// `resourceType`, `id` and `meta` in the body are replaced by the given values; the
    /// rest of the body is typed and validated.
    pub fn from_client_json(
        resource_type: ResourceType,
        body: Value,
        id: &str,
        meta: ResourceMeta,
    ) -> Result<Self> {
        let Value::Object(mut object) = body else {
            return Err(CoreError::invalid_resource(
                "resource body must be a JSON object",
            ));
        };
        object.remove("resourceType");
        object.remove("id");
        object.remove("meta");

        let mut document = Self::from_object(resource_type, object)?;
        document.id = Some(id.to_string());
        document.meta = Some(meta);
        document.validate()?;
        Ok(document)
    }

    fn from_object(resource_type: ResourceType, mut object: Map<String, Value>) -> Result<Self> {
        object.insert(
            "resourceType".to_string(),
            Value::String(resource_type.as_str().to_string()),
        );
        serde_json::from_value(Value::Object(object))
            .map_err(|e| CoreError::invalid_resource(format!("{resource_type}: {e}")))
    }

    pub fn version(&self) -> Option<&str> {
        self.meta.as_ref().map(|m| m.version_id.as_str())
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Applies the per-type shape rules.
    pub fn validate(&self) -> Result<()> {
        if let Some(id) = &self.id {
            validate_id(id).map_err(|e| CoreError::invalid_id(e.to_string()))?;
        }
        if let Some(status) = &self.status
            && status.trim().is_empty()
        {
            return Err(self.invalid("status must not be blank"));
        }
        if let Some(subject) = &self.subject
            && subject.reference.as_deref().is_some_and(str::is_empty)
        {
            return Err(self.invalid("subject.reference must not be empty"));
        }

        self.validate_category()?;

        match self.resource_type {
            ResourceType::Patient => {
                self.check_enum("gender", GENDERS)?;
                self.check_bool("active")?;
                if let Some(birth_date) = self.extra.get("birthDate") {
                    let valid = birth_date
                        .as_str()
                        .zip(BIRTH_DATE.as_ref())
                        .is_some_and(|(s, pattern)| pattern.is_match(s));
                    if !valid {
                        return Err(self.invalid("birthDate must be YYYY, YYYY-MM or YYYY-MM-DD"));
                    }
                }
            }
            ResourceType::Practitioner => {
                self.check_enum("gender", GENDERS)?;
                self.check_bool("active")?;
            }
            ResourceType::PractitionerRole | ResourceType::Organization => {
                self.check_bool("active")?;
            }
            ResourceType::Observation => {
                if let Some(quantity) = self.extra.get("valueQuantity")
                    && !quantity.get("value").is_none_or(Value::is_number)
                {
                    return Err(self.invalid("valueQuantity.value must be a number"));
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn validate_category(&self) -> Result<()> {
        let allergy = self.resource_type == ResourceType::AllergyIntolerance;
        for entry in self.category.iter().flat_map(Categories::entries) {
            match entry {
                Category::Code(code) if allergy => {
                    if !ALLERGY_CATEGORIES.contains(&code.as_str()) {
                        return Err(self.invalid(format!("unknown allergy category '{code}'")));
                    }
                }
                Category::Code(_) => {
                    return Err(self.invalid("category entries must be CodeableConcepts"));
                }
                Category::Concept(_) if allergy => {
                    return Err(self.invalid("category entries must be codes"));
                }
                Category::Concept(_) => {}
            }
        }
        Ok(())
    }

    fn check_enum(&self, field: &str, allowed: &[&str]) -> Result<()> {
        match self.extra.get(field) {
            None | Some(Value::Null) => Ok(()),
            Some(Value::String(s)) if allowed.contains(&s.as_str()) => Ok(()),
            Some(other) => Err(self.invalid(format!(
                "{field} must be one of {allowed:?}, got {other}"
            ))),
        }
    }

    fn check_bool(&self, field: &str) -> Result<()> {
        match self.extra.get(field) {
            None | Some(Value::Null) | Some(Value::Bool(_)) => Ok(()),
            Some(_) => Err(self.invalid(format!("{field} must be a boolean"))),
        }
    }

    fn invalid(&self, message: impl std::fmt::Display) -> CoreError {
        CoreError::invalid_resource(format!("{}: {message}", self.resource_type))
    }
}
