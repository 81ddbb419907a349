use alloc::{boxed::Box, collections::BTreeMap, vec::Vec};

use bon::Builder;

use crate::state::Location;

dyn_clone::clone_trait_object!(BeaconFilter);

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct BeaconId {
    pub major: u16,
    pub minor: u16,
}

impl BeaconId {
    pub fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }
}

/// One received signal strength reading, in dBm.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Beacon {
    pub id: BeaconId,
    pub rssi: f64,
}

impl Beacon {
    pub fn new(major: u16, minor: u16, rssi: f64) -> Self {
        Self {
            id: BeaconId::new(major, minor),
            rssi,
        }
    }
}

/// All beacons heard in one scan.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct Beacons {
    pub timestamp: i64,
    pub beacons: Vec<Beacon>,
}

impl Beacons {
    pub fn new(timestamp: i64, beacons: Vec<Beacon>) -> Self {
        Self { timestamp, beacons }
    }

    pub fn len(&self) -> usize {
        self.beacons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.beacons.is_empty()
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Beacon> {
        self.beacons.iter()
    }

    /// Copy of this scan holding only the readings `keep` accepts.
    pub fn retain<F: FnMut(&Beacon) -> bool>(&self, mut keep: F) -> Self {
        Self {
            timestamp: self.timestamp,
            beacons: self.beacons.iter().copied().filter(|b| keep(b)).collect(),
        }
    }
}

/// Pre-processing step applied to a scan before it is scored.
///
/// A filter may drop readings but never adds any.
pub trait BeaconFilter: dyn_clone::DynClone {
    fn filter(&self, beacons: &Beacons) -> Beacons;
}

/// Leaves scans untouched.
#[derive(Clone, Copy, Debug, Default)]
pub struct PassThroughFilter;

impl BeaconFilter for PassThroughFilter {
    fn filter(&self, beacons: &Beacons) -> Beacons {
        beacons.clone()
    }
}

#[derive(Clone, Copy, PartialEq, Debug, Builder)]
pub struct CleansingParameters {
    /// Readings at or above this value are placeholders for "unknown".
    #[builder(default = 0.0)]
    pub max_rssi: f64,

    /// Readings below this value are treated as noise.
    #[builder(default = -100.0)]
    pub min_rssi: f64,
}

impl Default for CleansingParameters {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Drops invalid readings and keeps only the strongest reading per beacon.
#[derive(Clone, Copy, Debug, Default)]
pub struct CleansingBeaconFilter {
    parameters: CleansingParameters,
}

impl CleansingBeaconFilter {
    pub fn new(parameters: CleansingParameters) -> Self {
        Self { parameters }
    }
}

impl BeaconFilter for CleansingBeaconFilter {
    fn filter(&self, beacons: &Beacons) -> Beacons {
        let mut strongest: BTreeMap<BeaconId, usize> = BTreeMap::new();
        let mut kept: Vec<Beacon> = Vec::with_capacity(beacons.len());
        for beacon in beacons.iter() {
            let valid = beacon.rssi < self.parameters.max_rssi
                && beacon.rssi >= self.parameters.min_rssi;
            if !valid {
                continue;
            }
            match strongest.get(&beacon.id) {
                Some(&idx) if kept[idx].rssi >= beacon.rssi => {}
                Some(&idx) => kept[idx] = *beacon,
                None => {
                    strongest.insert(beacon.id, kept.len());
                    kept.push(*beacon);
                }
            }
        }
        Beacons::new(beacons.timestamp, kept)
    }
}

/// Applies filters in order.
#[derive(Clone, Default)]
pub struct BeaconFilterChain {
    filters: Vec<Box<dyn BeaconFilter>>,
}

impl BeaconFilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, filter: Box<dyn BeaconFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl BeaconFilter for BeaconFilterChain {
    fn filter(&self, beacons: &Beacons) -> Beacons {
        self.filters
            .iter()
            .fold(beacons.clone(), |scan, filter| filter.filter(&scan))
    }
}

/// Known beacon positions on the floor plan.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct BeaconMap {
    locations: BTreeMap<BeaconId, Location>,
}

impl BeaconMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: BeaconId, location: Location) -> Option<Location> {
        self.locations.insert(id, location)
    }

    pub fn location(&self, id: &BeaconId) -> Option<&Location> {
        self.locations.get(id)
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

impl FromIterator<(BeaconId, Location)> for BeaconMap {
    fn from_iter<I: IntoIterator<Item = (BeaconId, Location)>>(iter: I) -> Self {
        Self {
            locations: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    #[derive(Clone)]
    struct MajorFilter(u16);

    impl BeaconFilter for MajorFilter {
        fn filter(&self, beacons: &Beacons) -> Beacons {
            beacons.retain(|b| b.id.major == self.0)
        }
    }

    fn scan() -> Beacons {
        Beacons::new(
            42,
            vec![
                Beacon::new(1, 1, -70.0),
                Beacon::new(1, 2, 0.0),
                Beacon::new(1, 1, -60.0),
                Beacon::new(2, 1, -80.0),
                Beacon::new(2, 2, f64::NAN),
                Beacon::new(2, 3, -120.0),
            ],
        )
    }

    #[test]
    fn cleansing_drops_invalid_and_duplicate_readings() {
        let cleansed = CleansingBeaconFilter::default().filter(&scan());
        assert_eq!(cleansed.timestamp, 42);
        assert_eq!(
            cleansed.beacons,
            vec![Beacon::new(1, 1, -60.0), Beacon::new(2, 1, -80.0)]
        );
    }

    #[test]
    fn chain_applies_filters_in_order_and_clones() {
        let chain = BeaconFilterChain::new()
            .with(Box::new(CleansingBeaconFilter::default()))
            .with(Box::new(MajorFilter(2)));
        let copy = chain.clone();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.filter(&scan()).beacons, vec![Beacon::new(2, 1, -80.0)]);
        assert_eq!(copy.filter(&scan()), chain.filter(&scan()));
    }

    #[test]
    fn filters_never_grow_a_scan() {
        let raw = scan();
        assert_eq!(PassThroughFilter.filter(&raw).len(), raw.len());
        assert!(CleansingBeaconFilter::default().filter(&raw).len() <= raw.len());
    }

    #[test]
    fn beacon_map_lookup() {
        let map: BeaconMap = [(BeaconId::new(1, 1), Location::new(2.0, 3.0))]
            .into_iter()
            .collect();
        assert_eq!(map.location(&BeaconId::new(1, 1)), Some(&Location::new(2.0, 3.0)));
        assert!(map.location(&BeaconId::new(9, 9)).is_none());
    }
}
