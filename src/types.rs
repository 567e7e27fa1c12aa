//! Core record types for ridb-dl
//!
//! Campsites and facilities are kept as the raw JSON objects the API returns
//! (field order preserved) so that every upstream column survives into the CSV.
//! Typed accessors cover the handful of fields the pipeline actually reads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A JSON object with insertion-ordered keys
pub type JsonObject = serde_json::Map<String, Value>;

/// Campsite field holding the parent facility key
pub const FACILITY_ID_FIELD: &str = "FacilityID";

/// Facility field holding the organization list
pub const ORGANIZATION_FIELD: &str = "ORGANIZATION";

/// Foreign key joining a campsite to its facility
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FacilityId(pub String);

impl FacilityId {
    /// Normalize a JSON value into a key
    ///
    /// Strings are trimmed, numbers rendered in decimal. Null, empty strings and
    /// structured values are not usable keys.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| Self(trimmed.to_string()))
            }
            Value::Number(n) => Some(Self(n.to_string())),
            _ => None,
        }
    }

    /// Borrow the key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FacilityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for FacilityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One item of the paginated campsite collection
#[derive(Clone, Debug, PartialEq)]
pub struct Campsite {
    fields: JsonObject,
}

impl Campsite {
    /// Wrap a raw campsite object
    pub fn new(fields: JsonObject) -> Self {
        Self { fields }
    }

    /// Wrap a JSON value, if it is an object
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    /// All fields as returned by the API
    pub fn fields(&self) -> &JsonObject {
        &self.fields
    }

    /// Field lookup by exact name
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Campsite identifier (`CampsiteID`)
    pub fn id(&self) -> Option<&str> {
        self.fields.get("CampsiteID").and_then(Value::as_str)
    }

    /// Parent facility key (`FacilityID`)
    pub fn facility_id(&self) -> Option<FacilityId> {
        self.fields
            .get(FACILITY_ID_FIELD)
            .and_then(FacilityId::from_value)
    }

    /// Free-text campsite type (`CampsiteType`)
    pub fn campsite_type(&self) -> Option<&str> {
        self.fields.get("CampsiteType").and_then(Value::as_str)
    }

    /// Value of the first attribute whose name matches, ignoring case
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.fields
            .get("ATTRIBUTES")
            .and_then(Value::as_array)?
            .iter()
            .filter_map(Value::as_object)
            .find(|attr| {
                attr.get("AttributeName")
                    .and_then(Value::as_str)
                    .is_some_and(|n| n.eq_ignore_ascii_case(name))
            })
            .and_then(|attr| attr.get("AttributeValue"))
            .and_then(Value::as_str)
    }
}

/// Facility returned by the secondary lookup
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Facility {
    fields: JsonObject,
}

impl Facility {
    /// Wrap a facility response body; anything but an object is an empty facility
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self { fields },
            _ => Self::default(),
        }
    }

    /// Field lookup by exact name
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Facility display name (`FacilityName`)
    pub fn name(&self) -> Option<&str> {
        self.fields.get("FacilityName").and_then(Value::as_str)
    }

    /// Organization entries, empty when absent or null
    pub fn organizations(&self) -> &[Value] {
        self.fields
            .get(ORGANIZATION_FIELD)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// First organization entry, if it is an object
    pub fn first_organization(&self) -> Option<&JsonObject> {
        self.organizations().first().and_then(Value::as_object)
    }
}

/// A campsite merged with its facility and organization columns
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct OutputRecord {
    fields: JsonObject,
}

impl OutputRecord {
    /// Wrap merged fields
    pub fn new(fields: JsonObject) -> Self {
        Self { fields }
    }

    /// All merged fields in column order
    pub fn fields(&self) -> &JsonObject {
        &self.fields
    }

    /// Field lookup by exact name
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Parent facility key carried by the record
    pub fn facility_id(&self) -> Option<FacilityId> {
        self.fields
            .get(FACILITY_ID_FIELD)
            .and_then(FacilityId::from_value)
    }
}

/// One batch of campsites from a single paginated response
#[derive(Clone, Debug, Default)]
pub struct Page {
    /// Offset the page was requested at
    pub offset: u64,
    /// Items in server order
    pub items: Vec<Campsite>,
}
