//! RIDB response fixtures

use serde_json::{Value, json};

/// Campsite accepted by the default RV hookup filter
pub fn rv_campsite(id: &str, facility_id: &str) -> Value {
    json!({
        "CampsiteID": id,
        "FacilityID": facility_id,
        "CampsiteName": format!("Site {id}"),
        "CampsiteType": "RV ELECTRIC",
        "Loop": "A",
        "PERMITTEDEQUIPMENT": [
            {"EquipmentName": "Tent", "MaxLength": 0},
            {"EquipmentName": "RV", "MaxLength": 40}
        ],
        "ATTRIBUTES": [
            {"AttributeName": "Driveway Surface", "AttributeValue": "Paved"},
            {"AttributeName": "Water Hookup", "AttributeValue": "Yes"},
            {"AttributeName": "Electricity Hookup", "AttributeValue": "30/50"},
            {"AttributeName": "Sewer Hookup", "AttributeValue": "Yes"}
        ]
    })
}

/// RV campsite whose attribute list lacks a sewer hookup
pub fn no_sewer_campsite(id: &str, facility_id: &str) -> Value {
    let mut campsite = rv_campsite(id, facility_id);
    if let Some(attributes) = campsite["ATTRIBUTES"].as_array_mut() {
        attributes.retain(|a| a["AttributeName"] != "Sewer Hookup");
    }
    campsite
}

/// Walk-in tent site
pub fn tent_campsite(id: &str, facility_id: &str) -> Value {
    json!({
        "CampsiteID": id,
        "FacilityID": facility_id,
        "CampsiteType": "WALK TO",
        "PERMITTEDEQUIPMENT": [{"EquipmentName": "Tent", "MaxLength": 0}],
        "ATTRIBUTES": [{"AttributeName": "Water Hookup", "AttributeValue": "No"}]
    })
}

/// Full facility body with one organization
pub fn facility(name: &str) -> Value {
    json!({
        "FacilityID": "ignored",
        "FacilityName": name,
        "FacilityTypeDescription": "Campground",
        "FacilityLongitude": -119.56,
        "FacilityLatitude": 37.74,
        "ORGANIZATION": [{
            "OrgID": "128",
            "OrgName": "National Park Service",
            "OrgType": "Department of the Interior",
            "OrgAbbrevName": "NPS",
            "OrgURLAddress": "https://www.nps.gov",
            "OrgParentID": "139"
        }]
    })
}

/// Facility body whose organization list is empty
pub fn orphan_facility(name: &str) -> Value {
    json!({
        "FacilityName": name,
        "FacilityTypeDescription": "Campground",
        "ORGANIZATION": []
    })
}

/// One page of the campsite collection in RIDB's envelope
pub fn campsite_page(items: &[Value], total: usize, limit: usize, offset: usize) -> Value {
    json!({
        "RECDATA": items,
        "METADATA": {
            "RESULTS": {"CURRENT_COUNT": items.len(), "TOTAL_COUNT": total},
            "SEARCH_PARAMETERS": {"QUERY": "", "LIMIT": limit, "OFFSET": offset}
        }
    })
}
