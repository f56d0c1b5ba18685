//! Parking-lot catalog.
//!
//! The set of lots a principal can book against, with text search and a coarse
//! availability level. The catalog is static reference data: booking does not
//! decrement `available_slots`.

use crate::types::{LotId, Money};
use serde::{Deserialize, Serialize};

/// Geographic position of a lot.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lng: f64,
}

/// Coarse availability bucket shown next to each lot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Availability {
    /// More than half of the slots are free
    High,
    /// More than a fifth of the slots are free
    Medium,
    /// A fifth or less of the slots are free
    Low,
}

/// A bookable parking lot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParkingLot {
    /// Lot identifier
    pub id: LotId,
    /// Display name
    pub name: String,
    /// Area / neighbourhood
    pub location: String,
    /// Street address
    pub address: String,
    /// Capacity
    pub total_slots: u32,
    /// Free slots as last reported
    pub available_slots: u32,
    /// Hourly rate
    pub price_per_hour: Money,
    /// Amenity labels
    pub amenities: Vec<String>,
    /// Position on the map
    pub coordinates: Coordinates,
}

impl ParkingLot {
    /// Availability bucket from `available_slots / total_slots`.
    ///
    /// A lot with no capacity is `Low`.
    #[must_use]
    pub fn availability(&self) -> Availability {
        if self.total_slots == 0 {
            return Availability::Low;
        }
        // Integer form of `available / total > 0.5` and `> 0.2`.
        let available = u64::from(self.available_slots) * 10;
        let total = u64::from(self.total_slots);
        if available > total * 5 {
            Availability::High
        } else if available > total * 2 {
            Availability::Medium
        } else {
            Availability::Low
        }
    }

    /// Price of booking this lot for `hours`, `None` on overflow.
    #[must_use]
    pub const fn quote(&self, hours: u32) -> Option<Money> {
        self.price_per_hour.checked_multiply(hours)
    }

    /// Slot numbers a booking may pick: `1..=min(available_slots, cap)`.
    pub fn selectable_slots(&self, cap: u32) -> impl Iterator<Item = u32> {
        1..=self.available_slots.min(cap)
    }

    fn matches(&self, needle: &str) -> bool {
        [&self.name, &self.location, &self.address]
            .iter()
            .any(|field| field.to_lowercase().contains(needle))
    }
}

/// The lots available for booking.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    lots: Vec<ParkingLot>,
}

impl Catalog {
    /// Build a catalog from an explicit list of lots
    #[must_use]
    pub const fn new(lots: Vec<ParkingLot>) -> Self {
        Self { lots }
    }

    /// The built-in lots.
    #[must_use]
    pub fn default_lots() -> Self {
        Self::new(vec![
            lot(
                "1",
                "Downtown Plaza Parking",
                "Downtown",
                "123 Main Street, Downtown",
                (200, 45, 5),
                &["24/7 Security", "CCTV", "Covered Parking"],
                (40.7128, -74.0060),
            ),
            lot(
                "2",
                "Metro Station Parking",
                "Metro Area",
                "456 Transit Ave, Metro District",
                (150, 28, 4),
                &["Metro Access", "EV Charging", "Security"],
                (40.7589, -73.9851),
            ),
            lot(
                "3",
                "Mall Parking Complex",
                "Shopping District",
                "789 Commerce Blvd, Shopping Center",
                (500, 120, 3),
                &["Shopping Access", "Food Court", "Restrooms"],
                (40.7505, -73.9934),
            ),
            lot(
                "4",
                "Airport Long-term Parking",
                "Airport",
                "321 Airport Rd, Terminal Area",
                (800, 200, 8),
                &["Shuttle Service", "Long-term Rates", "Indoor Parking"],
                (40.6892, -74.1745),
            ),
            lot(
                "5",
                "Business District Garage",
                "Business District",
                "555 Corporate Ave, Financial District",
                (300, 75, 6),
                &["Valet Service", "Car Wash", "Reserved Spots"],
                (40.7416, -74.0114),
            ),
            lot(
                "6",
                "Stadium Event Parking",
                "Entertainment District",
                "777 Sports Complex Dr, Stadium Area",
                (1000, 350, 10),
                &["Event Parking", "Tailgating Area", "Security Patrol"],
                (40.8296, -73.9262),
            ),
        ])
    }

    /// All lots in catalog order
    #[must_use]
    pub fn lots(&self) -> &[ParkingLot] {
        &self.lots
    }

    /// Look a lot up by id
    #[must_use]
    pub fn get(&self, id: &LotId) -> Option<&ParkingLot> {
        self.lots.iter().find(|lot| &lot.id == id)
    }

    /// Lots whose name, location or address contains `term`, ignoring case.
    ///
    /// An empty term matches every lot.
    #[must_use]
    pub fn search(&self, term: &str) -> Vec<&ParkingLot> {
        let needle = term.trim().to_lowercase();
        self.lots.iter().filter(|lot| lot.matches(&needle)).collect()
    }
}

fn lot(
    id: &str,
    name: &str,
    location: &str,
    address: &str,
    (total_slots, available_slots, dollars_per_hour): (u32, u32, u64),
    amenities: &[&str],
    (lat, lng): (f64, f64),
) -> ParkingLot {
    ParkingLot {
        id: LotId::new(id),
        name: name.to_string(),
        location: location.to_string(),
        address: address.to_string(),
        total_slots,
        available_slots,
        price_per_hour: Money::from_cents(dollars_per_hour * 100),
        amenities: amenities.iter().map(ToString::to_string).collect(),
        coordinates: Coordinates { lat, lng },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_has_six_lots() {
        let catalog = Catalog::default_lots();
        assert_eq!(catalog.lots().len(), 6);
        let airport = catalog.get(&LotId::new("4")).unwrap();
        assert_eq!(airport.price_per_hour, Money::from_cents(800));
    }

    #[test]
    fn search_is_case_insensitive_across_fields() {
        let catalog = Catalog::default_lots();

        let by_name: Vec<_> = catalog.search("METRO").iter().map(|l| l.id.clone()).collect();
        assert_eq!(by_name, vec![LotId::new("2")]);

        let by_address = catalog.search("sports complex");
        assert_eq!(by_address.len(), 1);
        assert_eq!(by_address[0].name, "Stadium Event Parking");

        assert_eq!(catalog.search("").len(), 6);
        assert!(catalog.search("harbour").is_empty());
    }

    #[test]
    fn availability_thresholds() {
        let mut lot = Catalog::default_lots().lots()[0].clone();
        lot.total_slots = 100;

        lot.available_slots = 51;
        assert_eq!(lot.availability(), Availability::High);
        lot.available_slots = 50;
        assert_eq!(lot.availability(), Availability::Medium);
        lot.available_slots = 21;
        assert_eq!(lot.availability(), Availability::Medium);
        lot.available_slots = 20;
        assert_eq!(lot.availability(), Availability::Low);

        lot.total_slots = 0;
        assert_eq!(lot.availability(), Availability::Low);
    }

    #[test]
    fn quote_and_slot_choices() {
        let catalog = Catalog::default_lots();
        let metro = catalog.get(&LotId::new("2")).unwrap();
        assert_eq!(metro.quote(3), Some(Money::from_cents(1200)));
        assert_eq!(metro.selectable_slots(20).last(), Some(20));

        let mut nearly_full = metro.clone();
        nearly_full.available_slots = 4;
        assert_eq!(nearly_full.selectable_slots(20).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    }
}
