//! Shared test helpers: an in-memory RIDB that records every request.

use crate::error::TransportError;
use crate::transport::{HttpResponse, Query, Transport};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use url::Url;

/// A request seen by [`FakeRidb`]
#[derive(Clone, Debug)]
pub(crate) struct RecordedRequest {
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl RecordedRequest {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Serves `/campsites` by slicing `campsites` with limit/offset and
/// `/facilities/<id>` from a map; unknown facilities answer 404.
pub(crate) struct FakeRidb {
    campsites: Vec<Value>,
    total_override: Option<u64>,
    facilities: HashMap<String, Value>,
    failing: HashSet<String>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl FakeRidb {
    pub fn new(campsites: Vec<Value>) -> Self {
        Self {
            campsites,
            total_override: None,
            facilities: HashMap::new(),
            failing: HashSet::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Report this TOTAL_COUNT regardless of how many campsites exist
    pub fn with_total(mut self, total: u64) -> Self {
        self.total_override = Some(total);
        self
    }

    pub fn with_facility(mut self, id: &str, body: Value) -> Self {
        self.facilities.insert(id.to_string(), body);
        self
    }

    /// Facility lookups for `id` answer 500
    pub fn with_failing_facility(mut self, id: &str) -> Self {
        self.failing.insert(id.to_string());
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// `(limit, offset)` of every campsite request, probe included
    pub fn campsite_calls(&self) -> Vec<(u64, u64)> {
        self.requests()
            .iter()
            .filter(|r| r.path.ends_with("/campsites"))
            .map(|r| {
                (
                    r.param("limit").unwrap().parse().unwrap(),
                    r.param("offset").unwrap().parse().unwrap(),
                )
            })
            .collect()
    }

    /// Facility ids looked up, in request order
    pub fn facility_calls(&self) -> Vec<String> {
        self.requests()
            .iter()
            .filter(|r| r.path.contains("/facilities/"))
            .map(|r| r.path.rsplit('/').next().unwrap().to_string())
            .collect()
    }

    fn campsite_page(&self, request: &RecordedRequest) -> Value {
        let limit: usize = request.param("limit").unwrap().parse().unwrap();
        let offset: usize = request.param("offset").unwrap().parse().unwrap();
        let items: Vec<Value> = self
            .campsites
            .iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        let total = self
            .total_override
            .unwrap_or(self.campsites.len() as u64);

        json!({
            "RECDATA": items,
            "METADATA": {
                "RESULTS": {"CURRENT_COUNT": items.len(), "TOTAL_COUNT": total},
                "SEARCH_PARAMETERS": {"LIMIT": limit, "OFFSET": offset}
            }
        })
    }
}

#[async_trait]
impl Transport for FakeRidb {
    async fn get(&self, url: &Url, query: &Query<'_>) -> Result<HttpResponse, TransportError> {
        let request = RecordedRequest {
            path: url.path().to_string(),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        };
        self.requests.lock().unwrap().push(request.clone());

        let body = if request.path.ends_with("/campsites") {
            self.campsite_page(&request)
        } else {
            let id = request.path.rsplit('/').next().unwrap_or_default();
            let status = if self.failing.contains(id) { 500 } else { 404 };
            match self.facilities.get(id) {
                Some(body) if !self.failing.contains(id) => body.clone(),
                _ => {
                    return Err(TransportError::Status {
                        status,
                        url: url.to_string(),
                        transient: false,
                        retry_after: None,
                    });
                }
            }
        };

        Ok(HttpResponse {
            status: 200,
            headers: HeaderMap::new(),
            body: body.to_string(),
        })
    }
}

/// Campsite that passes the default RV hookup filter
pub(crate) fn rv_campsite(id: &str, facility_id: &str) -> Value {
    json!({
        "CampsiteID": id,
        "FacilityID": facility_id,
        "CampsiteName": format!("Site {id}"),
        "CampsiteType": "STANDARD ELECTRIC",
        "PERMITTEDEQUIPMENT": [{"EquipmentName": "RV", "MaxLength": 35}],
        "ATTRIBUTES": [
            {"AttributeName": "Water Hookup", "AttributeValue": "Yes"},
            {"AttributeName": "Electricity Hookup", "AttributeValue": "50"},
            {"AttributeName": "Sewer Hookup", "AttributeValue": "Yes"}
        ]
    })
}

/// Campsite rejected by the default filter
pub(crate) fn tent_campsite(id: &str, facility_id: &str) -> Value {
    json!({
        "CampsiteID": id,
        "FacilityID": facility_id,
        "CampsiteType": "TENT ONLY NONELECTRIC",
        "PERMITTEDEQUIPMENT": [{"EquipmentName": "Tent"}],
        "ATTRIBUTES": []
    })
}

/// Facility body with one organization
pub(crate) fn facility(name: &str) -> Value {
    json!({
        "FacilityName": name,
        "FacilityTypeDescription": "Campground",
        "FacilityLongitude": -119.5,
        "FacilityLatitude": 37.7,
        "ORGANIZATION": [{
            "OrgID": "128",
            "OrgName": "National Park Service",
            "OrgType": "Federal Agency",
            "OrgAbbrevName": "NPS",
            "OrgURLAddress": "https://www.nps.gov",
            "OrgParentID": "139"
        }]
    })
}
