//! Card projection of listings
//!
//! Cards carry just enough of a listing to draw a map pin or a result tile
//! and to filter on the client: one photo, no narrative fields.

use crate::types::Listing;
use serde::{Deserialize, Serialize};

/// Reduced listing record used for transport
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: i64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub price: Option<f64>,
    pub cap_rate: Option<f64>,
    pub building_size: Option<f64>,
    pub sale: bool,
    pub sale_listing_published: bool,
    pub lease: bool,
    pub lease_listing_published: bool,
    pub property_type_id: Option<i64>,
    pub broker_id: Option<i64>,
    /// Best rendition of the first photo, or an empty string
    pub photo: String,
}

/// Project a listing onto its card
///
/// # Examples
///
/// ```
/// use proplink_core::projection::to_card;
/// use proplink_core::types::{Listing, Photo};
///
/// let listing = Listing {
///     id: 7,
///     photos: vec![
///         Photo { url: "a.jpg".to_string(), ..Default::default() },
///         Photo { url: "b.jpg".to_string(), ..Default::default() },
///     ],
///     ..Default::default()
/// };
/// let card = to_card(&listing);
/// assert_eq!(card.id, 7);
/// assert_eq!(card.photo, "a.jpg");
/// ```
pub fn to_card(listing: &Listing) -> Card {
    Card {
        id: listing.id,
        latitude: listing.latitude,
        longitude: listing.longitude,
        name: listing.name.clone(),
        address: listing.address.clone(),
        city: listing.city.clone(),
        state: listing.state.clone(),
        zip: listing.zip.clone(),
        price: listing.price,
        cap_rate: listing.cap_rate,
        building_size: listing.building_size,
        sale: listing.sale,
        sale_listing_published: listing.sale_listing_published,
        lease: listing.lease,
        lease_listing_published: listing.lease_listing_published,
        property_type_id: listing.property_type_id,
        broker_id: listing.broker_id,
        photo: listing
            .photos
            .first()
            .map(|p| p.best_url().to_string())
            .unwrap_or_default(),
    }
}

impl From<&Listing> for Card {
    fn from(listing: &Listing) -> Self {
        to_card(listing)
    }
}
