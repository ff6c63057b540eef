use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, CatalogResult};
use crate::models::{DealType, Detail, Language, Property, PropertyId, PropertyType};

/// Filter parameters for a property listing
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PropertyFilter {
    pub property_type: Option<PropertyType>,
    pub deal_type: Option<DealType>,
    /// Unset matches both active and inactive listings
    pub is_active: Option<bool>,
    /// Case-insensitive substring of the localized city
    pub city: Option<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub rooms_min: Option<i32>,
    pub rooms_max: Option<i32>,
    /// Living area in square meters
    pub area_min: Option<f64>,
    pub area_max: Option<f64>,
}

impl PropertyFilter {
    fn city_needle(&self) -> Option<String> {
        self.city
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_lowercase)
    }

    /// Translates the filter into store criteria for one language
    pub fn to_query(&self, language: Language) -> CatalogResult<PropertyQuery> {
        let price = Bounds::checked("price", self.price_min, self.price_max)?;
        let rooms = Bounds::checked("rooms", self.rooms_min, self.rooms_max)?;
        let area = Bounds::checked("area", self.area_min, self.area_max)?;

        let predicate = DetailPredicate {
            city: self.city_needle(),
            price,
            rooms,
            area,
        };

        Ok(PropertyQuery {
            ids: None,
            property_type: self.property_type,
            deal_type: self.deal_type,
            is_active: self.is_active,
            language,
            detail: (!predicate.is_empty()).then_some(predicate),
        })
    }
}

/// Inclusive range; an unset end is unbounded
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounds<T> {
    pub min: Option<T>,
    pub max: Option<T>,
}

impl<T: PartialOrd + Copy + Default + std::fmt::Display> Bounds<T> {
    fn checked(name: &str, min: Option<T>, max: Option<T>) -> CatalogResult<Self> {
        for value in [min, max].into_iter().flatten() {
            if value < T::default() {
                return Err(CatalogError::Validation(format!(
                    "{name} bound must not be negative, got {value}"
                )));
            }
        }
        if let (Some(lo), Some(hi)) = (min, max) {
            if lo > hi {
                return Err(CatalogError::Validation(format!(
                    "{name}_min ({lo}) is greater than {name}_max ({hi})"
                )));
            }
        }
        Ok(Self { min, max })
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    pub fn contains(&self, value: T) -> bool {
        self.min.map_or(true, |lo| value >= lo) && self.max.map_or(true, |hi| value <= hi)
    }
}

/// Conditions evaluated against the detail row of the requested language
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailPredicate {
    /// Already lowercased
    pub city: Option<String>,
    pub price: Bounds<f64>,
    pub rooms: Bounds<i32>,
    pub area: Bounds<f64>,
}

impl DetailPredicate {
    pub fn is_empty(&self) -> bool {
        self.city.is_none()
            && self.price.is_unbounded()
            && self.rooms.is_unbounded()
            && self.area.is_unbounded()
    }

    pub fn matches(&self, detail: &Detail) -> bool {
        if let Some(needle) = &self.city {
            if !detail.city.to_lowercase().contains(needle.as_str()) {
                return false;
            }
        }
        self.price.contains(detail.price)
            && self.rooms.contains(detail.rooms)
            && self.area.contains(detail.living_area)
    }
}

/// Criteria handed to the persistence layer
///
/// Stores return matching properties with only the `language` detail row
/// attached. When `detail` is set, a property qualifies only if that row
/// exists and satisfies the predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyQuery {
    pub ids: Option<Vec<PropertyId>>,
    pub property_type: Option<PropertyType>,
    pub deal_type: Option<DealType>,
    pub is_active: Option<bool>,
    pub language: Language,
    pub detail: Option<DetailPredicate>,
}

impl PropertyQuery {
    pub fn by_ids(ids: Vec<PropertyId>, language: Language) -> Self {
        Self {
            ids: Some(ids),
            property_type: None,
            deal_type: None,
            is_active: None,
            language,
            detail: None,
        }
    }

    /// Direct column predicates, independent of any detail row
    pub fn admits(&self, property: &Property) -> bool {
        if let Some(ids) = &self.ids {
            if !ids.contains(&property.id) {
                return false;
            }
        }
        self.property_type.map_or(true, |t| property.property_type == t)
            && self.deal_type.map_or(true, |t| property.deal_type == t)
            && self.is_active.map_or(true, |a| property.is_active == a)
    }
}

/// Which documents of a property a lookup returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentScope {
    PublicOnly,
    All,
}

impl DocumentScope {
    pub fn admits(&self, is_public: bool) -> bool {
        match self {
            DocumentScope::PublicOnly => is_public,
            DocumentScope::All => true,
        }
    }
}
