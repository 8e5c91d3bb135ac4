use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::AppError;
use crate::geo::haversine_km;
use crate::models::profile::{GeoPoint, Lifecycle, Profile, Role};

/// Profiles come from the identity system; the dispatch engine only reads
/// them. The registry additionally answers the nearest-driver query over
/// drivers with a known location.
#[derive(Default)]
pub struct ProfileRegistry {
    profiles: DashMap<Uuid, Profile>,
}

impl ProfileRegistry {
    pub fn new() -> Self {
        Self {
            profiles: DashMap::new(),
        }
    }

    pub fn insert(&self, profile: Profile) {
        self.profiles.insert(profile.id, profile);
    }

    pub fn get(&self, id: Uuid) -> Result<Profile, AppError> {
        self.profiles
            .get(&id)
            .filter(|entry| entry.lifecycle == Lifecycle::Active)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::NotFound(format!("profile {id} not found")))
    }

    pub fn list(&self) -> Vec<Profile> {
        self.profiles
            .iter()
            .filter(|entry| entry.lifecycle == Lifecycle::Active)
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn set_location(&self, id: Uuid, location: GeoPoint) -> Result<Profile, AppError> {
        let mut profile = self
            .profiles
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("profile {id} not found")))?;

        profile.location = Some(location);
        profile.updated_at = Utc::now();

        Ok(profile.clone())
    }

    pub fn set_availability(&self, id: Uuid, available: bool) -> Result<Profile, AppError> {
        let mut profile = self
            .profiles
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("profile {id} not found")))?;

        profile.available = available;
        profile.updated_at = Utc::now();

        Ok(profile.clone())
    }

    /// Minimum-haversine-distance available driver within `radius_km` of
    /// `point`. Ties resolve to the smallest id so repeated queries over
    /// the same fleet are deterministic.
    pub fn nearest_driver(&self, point: &GeoPoint, radius_km: f64) -> Option<Profile> {
        self.profiles
            .iter()
            .filter(|entry| {
                entry.role == Role::Driver
                    && entry.available
                    && entry.lifecycle == Lifecycle::Active
            })
            .filter_map(|entry| {
                let location = entry.location?;
                let distance = haversine_km(point, &location);
                (distance <= radius_km).then(|| (distance, entry.value().clone()))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.id.cmp(&b.1.id)))
            .map(|(_, profile)| profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver(id_seed: u128, location: Option<GeoPoint>, available: bool) -> Profile {
        Profile {
            id: Uuid::from_u128(id_seed),
            name: format!("driver-{id_seed}"),
            role: Role::Driver,
            location,
            available,
            lifecycle: Lifecycle::Active,
            updated_at: Utc::now(),
        }
    }

    fn at(lat: f64, lng: f64) -> GeoPoint {
        GeoPoint { lat, lng }
    }

    #[test]
    fn nearest_driver_within_radius_wins() {
        let registry = ProfileRegistry::new();
        registry.insert(driver(1, Some(at(0.0, 0.02)), true));
        registry.insert(driver(2, Some(at(0.0, 0.01)), true));

        let found = registry.nearest_driver(&at(0.0, 0.0), 5.0).unwrap();
        assert_eq!(found.id, Uuid::from_u128(2));
    }

    #[test]
    fn no_driver_within_radius_yields_none() {
        let registry = ProfileRegistry::new();
        registry.insert(driver(1, Some(at(10.0, 10.0)), true));

        assert!(registry.nearest_driver(&at(0.0, 0.01), 5.0).is_none());
    }

    #[test]
    fn equidistant_drivers_resolve_to_smallest_id() {
        let registry = ProfileRegistry::new();
        registry.insert(driver(7, Some(at(0.0, 0.01)), true));
        registry.insert(driver(3, Some(at(0.0, -0.01)), true));

        let found = registry.nearest_driver(&at(0.0, 0.0), 5.0).unwrap();
        assert_eq!(found.id, Uuid::from_u128(3));
    }

    #[test]
    fn unlocated_busy_and_non_driver_profiles_are_skipped() {
        let registry = ProfileRegistry::new();
        registry.insert(driver(1, None, true));
        registry.insert(driver(2, Some(at(0.0, 0.01)), false));
        registry.insert(Profile {
            role: Role::Rider,
            ..driver(3, Some(at(0.0, 0.001)), true)
        });

        assert!(registry.nearest_driver(&at(0.0, 0.0), 5.0).is_none());
    }
}
