//! Post-filtering and re-pagination of listings
//!
//! The Listing Service can only filter by broker and property type. Every
//! other constraint is applied here, over an aggregated result set, and the
//! filtered set is then sliced by the caller's offset and limit. Filtering
//! always happens before slicing, otherwise totals would be wrong.

use crate::types::{Listing, SaleOrLease};
use serde::{Deserialize, Serialize};

/// Optional constraints that the Listing Service cannot evaluate itself
///
/// Every field is optional; `None` means "no constraint". A record whose
/// value is missing never satisfies a range bound on that value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingFilters {
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub sale_or_lease: Option<SaleOrLease>,
    pub min_cap_rate: Option<f64>,
    pub max_cap_rate: Option<f64>,
    pub min_square_footage: Option<f64>,
    pub max_square_footage: Option<f64>,
    pub search: Option<String>,
}

/// A slice of filtered records plus the size of the whole filtered set
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredPage<T> {
    pub page: Vec<T>,
    pub total_matched: usize,
}

impl ListingFilters {
    /// True when no constraint would be applied
    pub fn is_empty(&self) -> bool {
        self.min_price.is_none()
            && self.max_price.is_none()
            && self.status().is_none()
            && self.min_cap_rate.is_none()
            && self.max_cap_rate.is_none()
            && self.min_square_footage.is_none()
            && self.max_square_footage.is_none()
            && self.search_term().is_none()
    }

    fn status(&self) -> Option<SaleOrLease> {
        self.sale_or_lease.filter(|s| *s != SaleOrLease::Both)
    }

    /// Lower-cased search term, or `None` when blank
    fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    /// Evaluate every supplied predicate against `listing`
    pub fn matches(&self, listing: &Listing) -> bool {
        self.matches_with_term(listing, self.search_term().as_deref())
    }

    fn matches_with_term(&self, listing: &Listing, term: Option<&str>) -> bool {
        within(listing.price, self.min_price, self.max_price)
            && within(listing.cap_rate, self.min_cap_rate, self.max_cap_rate)
            && within(
                listing.building_size,
                self.min_square_footage,
                self.max_square_footage,
            )
            && self.matches_status(listing)
            && term.map_or(true, |t| matches_text(listing, t))
    }

    fn matches_status(&self, listing: &Listing) -> bool {
        match self.status() {
            Some(SaleOrLease::Sale) => listing.sale && listing.sale_listing_published,
            Some(SaleOrLease::Lease) => listing.lease && listing.lease_listing_published,
            Some(SaleOrLease::Both) | None => true,
        }
    }

    /// Keep only the records that satisfy every supplied predicate
    pub fn filter<'a, I>(&self, records: I) -> Vec<Listing>
    where
        I: IntoIterator<Item = &'a Listing>,
    {
        let term = self.search_term();
        records
            .into_iter()
            .filter(|l| self.matches_with_term(l, term.as_deref()))
            .cloned()
            .collect()
    }
}

/// Inclusive range check with null exclusion
fn within(value: Option<f64>, min: Option<f64>, max: Option<f64>) -> bool {
    if min.is_none() && max.is_none() {
        return true;
    }
    let Some(value) = value else {
        return false;
    };
    min.map_or(true, |m| value >= m) && max.map_or(true, |m| value <= m)
}

/// Case-insensitive substring match against any of the searchable fields
fn matches_text(listing: &Listing, term: &str) -> bool {
    [
        listing.address.as_deref(),
        listing.city.as_deref(),
        listing.state.as_deref(),
        listing.zip.as_deref(),
        listing.name.as_deref(),
        listing.sale_title.as_deref(),
        listing.lease_title.as_deref(),
    ]
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(term))
}

/// Slice `records[offset .. min(offset + limit, len)]`
pub fn paginate<T: Clone>(records: &[T], offset: usize, limit: usize) -> Vec<T> {
    if offset >= records.len() {
        return Vec::new();
    }
    let end = offset.saturating_add(limit).min(records.len());
    records[offset..end].to_vec()
}

/// Filter `records`, then slice the filtered set
///
/// # Examples
///
/// ```
/// use proplink_core::filter::{apply, ListingFilters};
/// use proplink_core::types::Listing;
///
/// let records: Vec<Listing> = (1..=5)
///     .map(|id| Listing { id, price: Some(id as f64 * 100.0), ..Default::default() })
///     .collect();
/// let filters = ListingFilters { min_price: Some(200.0), ..Default::default() };
///
/// let result = apply(&records, &filters, 1, 2);
/// assert_eq!(result.total_matched, 4);
/// assert_eq!(result.page.iter().map(|l| l.id).collect::<Vec<_>>(), vec![3, 4]);
/// ```
pub fn apply(
    records: &[Listing],
    filters: &ListingFilters,
    offset: usize,
    limit: usize,
) -> FilteredPage<Listing> {
    let matched = filters.filter(records);
    FilteredPage {
        total_matched: matched.len(),
        page: paginate(&matched, offset, limit),
    }
}
