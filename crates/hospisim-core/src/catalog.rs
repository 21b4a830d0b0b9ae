//! The six simulated clinical systems and the resource types each one hosts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::resource::ResourceType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    /// Electronic health record
    Ehr,
    /// Laboratory information system
    Lis,
    /// Radiology information system
    Ris,
    Pharmacy,
    /// Patient administration system (ADT, scheduling)
    Pas,
    Billing,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 6] = [
        ServiceKind::Ehr,
        ServiceKind::Lis,
        ServiceKind::Ris,
        ServiceKind::Pharmacy,
        ServiceKind::Pas,
        ServiceKind::Billing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::Ehr => "ehr",
            ServiceKind::Lis => "lis",
            ServiceKind::Ris => "ris",
            ServiceKind::Pharmacy => "pharmacy",
            ServiceKind::Pas => "pas",
            ServiceKind::Billing => "billing",
        }
    }

    /// Human readable product name used in capability documents.
    pub fn display_name(&self) -> &'static str {
        match self {
            ServiceKind::Ehr => "Healthcare POC - EHR",
            ServiceKind::Lis => "Healthcare POC - LIS",
            ServiceKind::Ris => "Healthcare POC - RIS",
            ServiceKind::Pharmacy => "Healthcare POC - Pharmacy",
            ServiceKind::Pas => "Healthcare POC - PAS",
            ServiceKind::Billing => "Healthcare POC - Billing",
        }
    }

    /// Resource types hosted by this service out of the box.
    pub fn default_resource_types(&self) -> &'static [ResourceType] {
        use ResourceType::*;
        match self {
            ServiceKind::Ehr => &[
                Patient,
                Practitioner,
                PractitionerRole,
                Organization,
                Encounter,
                Condition,
                AllergyIntolerance,
                Procedure,
                CarePlan,
                CareTeam,
                DocumentReference,
                Observation,
            ],
            ServiceKind::Lis => &[
                Patient,
                ServiceRequest,
                Specimen,
                Observation,
                DiagnosticReport,
                Task,
            ],
            ServiceKind::Ris => &[
                Patient,
                ServiceRequest,
                Appointment,
                ImagingStudy,
                DiagnosticReport,
                Observation,
                Task,
            ],
            ServiceKind::Pharmacy => &[
                Medication,
                MedicationRequest,
                MedicationDispense,
                MedicationAdministration,
                MedicationStatement,
            ],
            ServiceKind::Pas => &[
                Patient,
                Encounter,
                Appointment,
                Schedule,
                Slot,
                Location,
                EpisodeOfCare,
            ],
            ServiceKind::Billing => &[
                Patient,
                Coverage,
                Claim,
                ClaimResponse,
                ExplanationOfBenefit,
                Account,
                ChargeItem,
                Invoice,
            ],
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ServiceKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| CoreError::unknown_service(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_service_names() {
        assert_eq!(ServiceKind::from_str("pas").unwrap(), ServiceKind::Pas);
        assert_eq!(ServiceKind::from_str("EHR").unwrap(), ServiceKind::Ehr);
        assert!(ServiceKind::from_str("icu").is_err());
    }

    #[test]
    fn presets_are_non_empty_and_unique() {
        for kind in ServiceKind::ALL {
            let types = kind.default_resource_types();
            assert!(!types.is_empty());
            let mut sorted = types.to_vec();
            sorted.sort();
            sorted.dedup();
            assert_eq!(sorted.len(), types.len(), "{kind} has duplicates");
        }
    }

    #[test]
    fn pharmacy_does_not_host_patients() {
        assert!(
            !ServiceKind::Pharmacy
                .default_resource_types()
                .contains(&ResourceType::Patient)
        );
        assert!(
            ServiceKind::Lis
                .default_resource_types()
                .contains(&ResourceType::Specimen)
        );
    }
}
