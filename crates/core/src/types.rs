//! Core type definitions for Proplink
//!
//! Records are owned by the Listing Service. The gateway only reads them, so
//! every upstream field we do not interpret is carried through untouched in
//! an `extra` map.

use crate::{ProplinkError, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Treats a JSON `null` flag as `false`
fn null_as_false<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

/// Treats a JSON `null` list as empty
fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Alternative renditions of a listing photo
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhotoFormats {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub large: Option<String>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// A listing photo as returned by the Listing Service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formats: Option<PhotoFormats>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Photo {
    /// Best available rendition: the large format when present, else the raw URL
    pub fn best_url(&self) -> &str {
        self.formats
            .as_ref()
            .and_then(|f| f.large.as_deref())
            .filter(|large| !large.is_empty())
            .unwrap_or(self.url.as_str())
    }
}

/// A property listing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub cap_rate: Option<f64>,
    /// Building size in square feet
    #[serde(default)]
    pub building_size: Option<f64>,
    #[serde(default, deserialize_with = "null_as_false")]
    pub sale: bool,
    #[serde(default, deserialize_with = "null_as_false")]
    pub sale_listing_published: bool,
    #[serde(default, deserialize_with = "null_as_false")]
    pub lease: bool,
    #[serde(default, deserialize_with = "null_as_false")]
    pub lease_listing_published: bool,
    #[serde(default)]
    pub sale_title: Option<String>,
    #[serde(default)]
    pub lease_title: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub photos: Vec<Photo>,
    #[serde(default)]
    pub broker_id: Option<i64>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub broker_ids: Vec<i64>,
    #[serde(default)]
    pub property_type_id: Option<i64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Narrative and other fields passed through verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A broker profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Broker {
    pub id: i64,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub specialties: Vec<String>,
    #[serde(default)]
    pub profile_photo_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Broker {
    /// "First Last", skipping whichever part is missing
    pub fn full_name(&self) -> String {
        [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A record type served by a paginated Listing Service collection
pub trait Resource: DeserializeOwned + Clone + Send + Sync + 'static {
    /// Endpoint path relative to the authenticated base URL
    const ENDPOINT: &'static str;
    /// Envelope field holding the page's records
    const COLLECTION: &'static str;

    fn id(&self) -> i64;
}

impl Resource for Listing {
    const ENDPOINT: &'static str = "properties.json";
    const COLLECTION: &'static str = "properties";

    fn id(&self) -> i64 {
        self.id
    }
}

impl Resource for Broker {
    const ENDPOINT: &'static str = "brokers.json";
    const COLLECTION: &'static str = "brokers";

    fn id(&self) -> i64 {
        self.id
    }
}

/// One page of a Listing Service collection
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub records: Vec<T>,
    /// Total number of records in the collection, independent of the page size
    pub count: usize,
}

impl<T: Resource> Page<T> {
    /// Decode an upstream envelope `{ "<collection>": [...], "count": n }`
    ///
    /// A missing `count` falls back to the number of records on the page.
    pub fn from_value(value: &Value) -> Result<Self> {
        let items = value.get(T::COLLECTION).ok_or_else(|| {
            ProplinkError::malformed(format!(
                "response from {} has no '{}' field",
                T::ENDPOINT,
                T::COLLECTION
            ))
        })?;

        let records: Vec<T> = Vec::<T>::deserialize(items).map_err(|e| {
            ProplinkError::malformed(format!(
                "could not decode '{}' from {}: {}",
                T::COLLECTION,
                T::ENDPOINT,
                e
            ))
        })?;

        let count = value
            .get("count")
            .and_then(Value::as_u64)
            .map(|c| c as usize)
            .unwrap_or(records.len());

        Ok(Self { records, count })
    }
}

/// Sale/lease status requested by a search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaleOrLease {
    Sale,
    Lease,
    Both,
}

impl From<&str> for SaleOrLease {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "sale" | "forsale" | "for-sale" => Self::Sale,
            "lease" | "forlease" | "for-lease" => Self::Lease,
            _ => Self::Both,
        }
    }
}

impl std::fmt::Display for SaleOrLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sale => write!(f, "sale"),
            Self::Lease => write!(f, "lease"),
            Self::Both => write!(f, "both"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_listing_deserializes_camel_case_and_keeps_extra_fields() {
        let listing: Listing = serde_json::from_value(json!({
            "id": 12,
            "name": "Harbor Plaza",
            "address": "1 Dock St",
            "price": 1250000.0,
            "capRate": 6.25,
            "buildingSize": 18000,
            "sale": true,
            "saleListingPublished": true,
            "lease": null,
            "photos": [{"url": "https://img/1.jpg", "formats": {"large": "https://img/1-large.jpg"}}],
            "brokerIds": [3, 4],
            "createdAt": "2024-03-01T12:00:00Z",
            "saleDescription": "Waterfront retail"
        }))
        .unwrap();

        assert_eq!(listing.id, 12);
        assert_eq!(listing.cap_rate, Some(6.25));
        assert_eq!(listing.building_size, Some(18000.0));
        assert!(listing.sale && listing.sale_listing_published);
        assert!(!listing.lease);
        assert_eq!(listing.broker_ids, vec![3, 4]);
        assert!(listing.created_at.is_some());
        assert_eq!(
            listing.extra.get("saleDescription"),
            Some(&json!("Waterfront retail"))
        );

        let back = serde_json::to_value(&listing).unwrap();
        assert_eq!(back["saleDescription"], json!("Waterfront retail"));
        assert_eq!(back["capRate"], json!(6.25));
    }

    #[test]
    fn test_listing_null_lists_become_empty() {
        let listing: Listing =
            serde_json::from_value(json!({"id": 1, "photos": null, "brokerIds": null})).unwrap();
        assert!(listing.photos.is_empty());
        assert!(listing.broker_ids.is_empty());
    }

    #[test]
    fn test_photo_best_url() {
        let large = Photo {
            url: "raw.jpg".to_string(),
            formats: Some(PhotoFormats {
                large: Some("large.jpg".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(large.best_url(), "large.jpg");

        let raw = Photo {
            url: "raw.jpg".to_string(),
            formats: Some(PhotoFormats {
                large: Some(String::new()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(raw.best_url(), "raw.jpg");
    }

    #[test]
    fn test_page_from_value() {
        let page = Page::<Listing>::from_value(&json!({
            "properties": [{"id": 1}, {"id": 2}],
            "count": 220
        }))
        .unwrap();
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.count, 220);

        let brokers = Page::<Broker>::from_value(&json!({"brokers": [{"id": 9}]})).unwrap();
        assert_eq!(brokers.count, 1);
    }

    #[test]
    fn test_page_from_value_rejects_wrong_shape() {
        let err = Page::<Listing>::from_value(&json!({"brokers": []})).unwrap_err();
        assert!(matches!(err, ProplinkError::MalformedResponse { .. }));

        let err = Page::<Listing>::from_value(&json!({"properties": [{"name": "no id"}]}))
            .unwrap_err();
        assert!(matches!(err, ProplinkError::MalformedResponse { .. }));
    }

    #[test]
    fn test_broker_full_name() {
        let broker = Broker {
            id: 1,
            first_name: Some("Dana".to_string()),
            last_name: Some("Reyes".to_string()),
            ..Default::default()
        };
        assert_eq!(broker.full_name(), "Dana Reyes");

        let first_only = Broker {
            id: 2,
            first_name: Some("Sam".to_string()),
            ..Default::default()
        };
        assert_eq!(first_only.full_name(), "Sam");
    }

    #[test]
    fn test_sale_or_lease_from_str() {
        assert_eq!(SaleOrLease::from("sale"), SaleOrLease::Sale);
        assert_eq!(SaleOrLease::from("LEASE"), SaleOrLease::Lease);
        assert_eq!(SaleOrLease::from("both"), SaleOrLease::Both);
        assert_eq!(SaleOrLease::from("whatever"), SaleOrLease::Both);
    }
}
