use std::cmp::Ordering;

use serde::Deserialize;
use uuid::Uuid;

use crate::models::{
    Address, Establishment, EstablishmentView, Procedure, ProcedureOffering, ProcedureOfferingView,
    ProcedureType, ProcedureView, ProfessionalType, ProfessionalView, Specialty,
    SpecialtySimpleView,
};

/// OfferingFilter
///
/// Query parameters of GET /v1/procedimentooferecido. All three filters are optional and
/// combine conjunctively. Substring matches are case-sensitive.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OfferingFilter {
    /// Substring of the procedure name.
    pub name: Option<String>,
    /// Substring of the establishment's district or city.
    #[serde(rename = "bairroOuCidade")]
    pub district_or_city: Option<String>,
    /// Exact procedure type.
    #[serde(rename = "tipo")]
    pub kind: Option<ProcedureType>,
}

impl OfferingFilter {
    /// Empty strings coming from `?name=` are treated as absent filters.
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.filter(|s| !s.is_empty()),
            district_or_city: self.district_or_city.filter(|s| !s.is_empty()),
            kind: self.kind,
        }
    }

    pub fn matches(&self, record: &OfferingRecord) -> bool {
        if let Some(name) = &self.name {
            if !record.procedure.name.contains(name.as_str()) {
                return false;
            }
        }
        if let Some(place) = &self.district_or_city {
            let address = &record.address;
            if !address.district.contains(place.as_str()) && !address.city.contains(place.as_str()) {
                return false;
            }
        }
        if let Some(kind) = self.kind {
            if record.procedure.kind != kind {
                return false;
            }
        }
        true
    }
}

/// The professional side of an offering, already resolved from its account.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProfessionalRecord {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub kind: ProfessionalType,
}

/// OfferingRecord
///
/// One row of the five-way join: offering, procedure, establishment with its address, and the
/// professional with its specialty. Stores produce these; `project` turns them into views.
#[derive(Debug, Clone, PartialEq)]
pub struct OfferingRecord {
    pub offering: ProcedureOffering,
    pub procedure: Procedure,
    pub establishment: Establishment,
    pub address: Address,
    pub professional: ProfessionalRecord,
    pub specialty: Specialty,
}

impl OfferingRecord {
    /// (procedure name, professional name, establishment name, formatted address, offering id)
    pub fn cmp_listing(&self, other: &Self) -> Ordering {
        self.procedure
            .name
            .cmp(&other.procedure.name)
            .then_with(|| self.professional.name.cmp(&other.professional.name))
            .then_with(|| self.establishment.name.cmp(&other.establishment.name))
            .then_with(|| self.address.formatted().cmp(&other.address.formatted()))
            .then_with(|| self.offering.id.cmp(&other.offering.id))
    }
}

/// Filters and orders joined rows exactly as the listing endpoint returns them.
pub fn select(records: Vec<OfferingRecord>, filter: &OfferingFilter) -> Vec<OfferingRecord> {
    let mut selected: Vec<_> = records.into_iter().filter(|r| filter.matches(r)).collect();
    selected.sort_by(OfferingRecord::cmp_listing);
    selected
}

pub fn project(record: &OfferingRecord) -> ProcedureOfferingView {
    let duration = record.offering.duration;
    // Microsecond precision, as stored; millisecond fallback only for spans beyond i64 micros.
    let seconds = match duration.num_microseconds() {
        Some(micros) => micros as f64 / 1_000_000.0,
        None => duration.num_milliseconds() as f64 / 1_000.0,
    };

    ProcedureOfferingView {
        id: record.offering.id,
        procedure: ProcedureView {
            id: record.procedure.id,
            name: record.procedure.name.clone(),
            description: record.procedure.description.clone(),
            kind: record.procedure.kind,
        },
        establishment: EstablishmentView {
            id: record.establishment.id,
            name: record.establishment.name.clone(),
            legal_name: record.establishment.legal_name.clone(),
            kind: record.establishment.kind,
            address: record.address.formatted(),
        },
        professional: ProfessionalView {
            id: record.professional.id,
            name: record.professional.name.clone(),
            email: record.professional.email.clone(),
            kind: record.professional.kind,
            specialty: SpecialtySimpleView {
                id: record.specialty.id,
                name: record.specialty.name.clone(),
            },
        },
        schedule: record.offering.schedule,
        duration: seconds,
    }
}
