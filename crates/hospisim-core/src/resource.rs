use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

macro_rules! resource_types {
    ($($variant:ident),+ $(,)?) => {
        /// Closed set of resource types any clinical service may host.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum ResourceType {
            $($variant),+
        }

        impl ResourceType {
            /// Every known resource type, in declaration order.
            pub const ALL: &'static [ResourceType] = &[$(ResourceType::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(ResourceType::$variant => stringify!($variant)),+
                }
            }
        }

        impl FromStr for ResourceType {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $(stringify!($variant) => Ok(ResourceType::$variant),)+
                    other => Err(CoreError::unknown_resource_type(other)),
                }
            }
        }
    };
}

resource_types!(
    Account,
    AllergyIntolerance,
    Appointment,
    CarePlan,
    CareTeam,
    ChargeItem,
    Claim,
    ClaimResponse,
    Condition,
    Coverage,
    DiagnosticReport,
    DocumentReference,
    Encounter,
    EpisodeOfCare,
    ExplanationOfBenefit,
    ImagingStudy,
    Invoice,
    Location,
    Medication,
    MedicationAdministration,
    MedicationDispense,
    MedicationRequest,
    MedicationStatement,
    Observation,
    Organization,
    Patient,
    Practitioner,
    PractitionerRole,
    Procedure,
    Schedule,
    ServiceRequest,
    Slot,
    Specimen,
    Task,
);

impl ResourceType {
    /// Lowercased name used as the middle segment of event topics.
    pub fn topic_segment(&self) -> String {
        self.as_str().to_ascii_lowercase()
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ResourceType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ResourceType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ResourceType::from_str(&s).map_err(serde::de::Error::custom)
    }
}
