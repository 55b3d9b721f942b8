use std::collections::HashMap;

use crate::catalog::StationCatalog;
use crate::model::{BoundingBox, Station, StationId};

/// Catalog entries inside a bounding box, in catalog order.
///
/// Holds identities and catalog slots only, so attributes are always read
/// from the catalog and can never diverge from it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisibleSet {
    bounds: Option<BoundingBox>,
    members: Vec<StationId>,
    slots: HashMap<StationId, usize>,
}

impl VisibleSet {
    pub fn bounds(&self) -> Option<BoundingBox> {
        self.bounds
    }

    pub fn ids(&self) -> &[StationId] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: StationId) -> bool {
        self.slots.contains_key(&id)
    }

    pub(crate) fn slot(&self, id: StationId) -> Option<usize> {
        self.slots.get(&id).copied()
    }

    pub fn stations<'a>(
        &'a self,
        catalog: &'a StationCatalog,
    ) -> impl Iterator<Item = &'a Station> + 'a {
        self.members
            .iter()
            .filter_map(move |id| self.slot(*id).map(|slot| catalog.at(slot)))
    }
}

pub struct ViewportIndex;

impl ViewportIndex {
    /// Linear scan keeping every station inside `bounds` (edges included).
    pub fn recompute(bounds: &BoundingBox, catalog: &StationCatalog) -> VisibleSet {
        let mut members = Vec::new();
        let mut slots = HashMap::new();
        for (slot, station) in catalog.iter().enumerate() {
            if bounds.contains(&station.coordinates) {
                members.push(station.id);
                slots.insert(station.id, slot);
            }
        }
        VisibleSet {
            bounds: Some(*bounds),
            members,
            slots,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Coordinates;

    fn grid_catalog() -> StationCatalog {
        let mut stations = Vec::new();
        let mut id = 0;
        for lat in [59.0, 60.0, 60.5, 61.0, 62.0] {
            for lon in [23.0, 24.0, 24.5, 25.0, 26.0] {
                id += 1;
                stations.push(Station::new(StationId(id), "", Coordinates::new(lat, lon)));
            }
        }
        StationCatalog::new(stations)
    }

    #[test]
    fn recompute_matches_closed_interval_filter() {
        let catalog = grid_catalog();
        let bounds = BoundingBox::new(60.0, 61.0, 24.0, 25.0);
        let visible = ViewportIndex::recompute(&bounds, &catalog);

        let expected: Vec<StationId> = catalog
            .iter()
            .filter(|s| {
                s.coordinates.lat >= 60.0
                    && s.coordinates.lat <= 61.0
                    && s.coordinates.lon >= 24.0
                    && s.coordinates.lon <= 25.0
            })
            .map(|s| s.id)
            .collect();
        assert_eq!(visible.ids(), expected.as_slice());
        assert_eq!(visible.len(), 9);
    }

    #[test]
    fn recompute_includes_each_edge() {
        let catalog = StationCatalog::new(vec![
            Station::new(StationId(1), "south", Coordinates::new(60.0, 24.5)),
            Station::new(StationId(2), "north", Coordinates::new(61.0, 24.5)),
            Station::new(StationId(3), "west", Coordinates::new(60.5, 24.0)),
            Station::new(StationId(4), "east", Coordinates::new(60.5, 25.0)),
        ]);
        let visible = ViewportIndex::recompute(&BoundingBox::new(60.0, 61.0, 24.0, 25.0), &catalog);
        assert_eq!(
            visible.ids(),
            &[StationId(1), StationId(2), StationId(3), StationId(4)]
        );
    }

    #[test]
    fn recompute_is_idempotent() {
        let catalog = grid_catalog();
        let bounds = BoundingBox::new(59.5, 61.5, 23.5, 25.5);
        let first = ViewportIndex::recompute(&bounds, &catalog);
        let second = ViewportIndex::recompute(&bounds, &catalog);
        assert_eq!(first, second);
        assert_eq!(first.ids(), second.ids());
    }

    #[test]
    fn visible_stations_are_read_from_the_catalog() {
        let catalog = grid_catalog();
        let visible = ViewportIndex::recompute(&BoundingBox::new(62.0, 62.0, 26.0, 26.0), &catalog);
        let stations: Vec<&Station> = visible.stations(&catalog).collect();
        assert_eq!(stations.len(), 1);
        assert!(std::ptr::eq(stations[0], catalog.get(StationId(25)).unwrap()));
    }

    #[test]
    fn empty_catalog_yields_empty_set() {
        let visible = ViewportIndex::recompute(
            &BoundingBox::new(60.0, 61.0, 24.0, 25.0),
            &StationCatalog::default(),
        );
        assert!(visible.is_empty());
    }
}
