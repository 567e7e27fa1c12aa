//! Facility enrichment for accepted campsites.
//!
//! For each accepted campsite the joiner looks up the parent facility
//! (`GET <facilities>/<FacilityID>?full=true`), takes the facility's first
//! organization, and copies a configured set of renamed columns onto a copy of
//! the campsite's own fields. Each facility is fetched at most once per run,
//! guarded by [`SeenKeys`].

mod seen;

pub use seen::SeenKeys;

use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::transport::Transport;
use crate::types::{
    Campsite, FACILITY_ID_FIELD, Facility, FacilityId, JsonObject, ORGANIZATION_FIELD,
    OutputRecord,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Where a mapped column reads its value from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelatedSource {
    /// The facility object itself
    Facility,
    /// The facility's first organization entry
    Organization,
}

/// One output column pulled from the related facility
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    /// Column name in the output record
    pub column: String,
    /// Object the value is read from
    pub source: RelatedSource,
    /// Source field names tried in order; the first present non-null wins
    pub keys: Vec<String>,
    /// Value used when none of `keys` is present
    #[serde(default)]
    pub default: Value,
}

impl FieldMapping {
    fn new(column: &str, source: RelatedSource, keys: &[&str]) -> Self {
        Self {
            column: column.to_string(),
            source,
            keys: keys.iter().map(|k| k.to_string()).collect(),
            default: Value::Null,
        }
    }

    /// Facility and organization columns added to every campsite
    pub fn facility_defaults() -> Vec<Self> {
        use RelatedSource::{Facility, Organization};

        let mut organization_list =
            Self::new("FacilityOrganization", Facility, &[ORGANIZATION_FIELD]);
        organization_list.default = Value::Array(Vec::new());

        vec![
            Self::new("FacilityName", Facility, &["FacilityName"]),
            Self::new("FacilityTypeDescription", Facility, &["FacilityTypeDescription"]),
            Self::new("FacilityLongitude", Facility, &["FacilityLongitude"]),
            Self::new("FacilityLatitude", Facility, &["FacilityLatitude"]),
            organization_list,
            Self::new("OrgId", Organization, &["OrgID", "ParentOrgID"]),
            Self::new("OrgName", Organization, &["OrgName"]),
            Self::new("OrgURLAddress", Organization, &["OrgURLAddress"]),
            Self::new("OrgType", Organization, &["OrgType"]),
            Self::new("OrgParentID", Organization, &["OrgParentID"]),
            Self::new("OrgAbbrevName", Organization, &["OrgAbbrevName"]),
        ]
    }

    fn resolve(&self, facility: &Facility, organization: &JsonObject) -> Value {
        self.keys
            .iter()
            .find_map(|key| {
                let value = match self.source {
                    RelatedSource::Facility => facility.get(key),
                    RelatedSource::Organization => organization.get(key),
                };
                value.filter(|v| !v.is_null())
            })
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}

/// Outcome of claiming a campsite's facility key
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Claim {
    /// The key was newly claimed; its facility should be fetched
    New(FacilityId),
    /// The key was claimed earlier in the run
    Duplicate(FacilityId),
    /// The campsite carries no usable facility key
    NoKey,
}

/// Claim the facility key of `campsite` in `seen`
pub fn claim(campsite: &Campsite, seen: &mut SeenKeys) -> Claim {
    let Some(key) = campsite.facility_id() else {
        debug!(campsite = ?campsite.id(), "Campsite has no FacilityID, skipping");
        return Claim::NoKey;
    };
    if seen.claim(&key) {
        Claim::New(key)
    } else {
        debug!(facility_id = %key, "Facility already enriched, skipping");
        Claim::Duplicate(key)
    }
}

/// Outcome of [`Enricher::enrich`]
#[derive(Clone, Debug, PartialEq)]
pub enum Enrichment {
    /// The campsite was joined with its facility
    Merged(OutputRecord),
    /// The facility was already handled (or the campsite has no facility key)
    Skip,
}

/// Joins campsites with their facility and organization
#[derive(Clone)]
pub struct Enricher {
    transport: Arc<dyn Transport>,
    api: ApiConfig,
    fields: Vec<FieldMapping>,
}

impl Enricher {
    /// Create a joiner using `fields` as the column mapping
    pub fn new(transport: Arc<dyn Transport>, api: ApiConfig, fields: Vec<FieldMapping>) -> Self {
        Self {
            transport,
            api,
            fields,
        }
    }

    /// Header used when no record was accepted
    pub fn columns(&self) -> Vec<String> {
        std::iter::once(FACILITY_ID_FIELD.to_string())
            .chain(self.fields.iter().map(|f| f.column.clone()))
            .collect()
    }

    /// Enrich one accepted campsite unless its facility was already claimed
    ///
    /// # Errors
    /// Returns [`Error::EnrichmentFetch`] if the facility lookup fails after
    /// the transport's retries. The key stays claimed.
    pub async fn enrich(&self, campsite: &Campsite, seen: &mut SeenKeys) -> Result<Enrichment> {
        let Claim::New(key) = claim(campsite, seen) else {
            return Ok(Enrichment::Skip);
        };

        let facility = self.fetch_facility(&key).await?;
        Ok(Enrichment::Merged(self.merge(campsite, &key, &facility)))
    }

    /// Fetch the full facility record for `key`
    pub async fn fetch_facility(&self, key: &FacilityId) -> Result<Facility> {
        let url = self.api.facility_url(key.as_str())?;
        let body = self
            .transport
            .get_json(&url, &[("full", "true".to_string())])
            .await
            .map_err(|source| Error::EnrichmentFetch {
                facility_id: key.to_string(),
                source,
            })?;
        Ok(Facility::from_value(body))
    }

    /// Copy the campsite and add the mapped facility/organization columns
    pub fn merge(
        &self,
        campsite: &Campsite,
        key: &FacilityId,
        facility: &Facility,
    ) -> OutputRecord {
        let empty = JsonObject::new();
        let organization = facility.first_organization().unwrap_or(&empty);

        let mut fields = campsite.fields().clone();
        fields.insert(
            FACILITY_ID_FIELD.to_string(),
            Value::String(key.to_string()),
        );
        for mapping in &self.fields {
            fields.insert(mapping.column.clone(), mapping.resolve(facility, organization));
        }
        OutputRecord::new(fields)
    }
}
