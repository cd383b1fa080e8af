//! Lane registry: the static mapping from selector symbols to lane rooms
//!
//! Each lane binds one participant-visible selector to one named destination
//! voice room. The registry is injected into the controller rather than living
//! as a global, so tests can construct isolated instances.

use crate::types::{LaneName, Selector};

/// One selectable team lane
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lane {
    /// Selector symbol participants apply to the announcement artifact
    pub selector: Selector,
    /// Name of the destination voice room
    pub name: LaneName,
}

/// Ordered set of lanes available in a match
#[derive(Debug, Clone)]
pub struct LaneRegistry {
    lanes: Vec<Lane>,
}

impl LaneRegistry {
    /// Build a registry from (selector, room name) pairs
    pub fn new(entries: impl IntoIterator<Item = (impl Into<Selector>, impl Into<LaneName>)>) -> Self {
        Self {
            lanes: entries
                .into_iter()
                .map(|(selector, name)| Lane {
                    selector: selector.into(),
                    name: name.into(),
                })
                .collect(),
        }
    }

    /// Look up the lane a selector maps to
    pub fn lane_for_selector(&self, selector: &str) -> Option<&Lane> {
        self.lanes.iter().find(|lane| lane.selector == selector)
    }

    /// Look up a lane by its room name
    pub fn lane_by_name(&self, name: &str) -> Option<&Lane> {
        self.lanes.iter().find(|lane| lane.name == name)
    }

    /// Iterate lanes in announcement order
    pub fn lanes(&self) -> impl Iterator<Item = &Lane> {
        self.lanes.iter()
    }

    /// Selector symbols in announcement order
    pub fn selectors(&self) -> Vec<Selector> {
        self.lanes.iter().map(|lane| lane.selector.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }
}

impl Default for LaneRegistry {
    /// The standard three-lane setup
    fn default() -> Self {
        Self::new([
            ("\u{1F7E1}", "Lane - Yellow"),
            ("\u{1F535}", "Lane - Blue"),
            ("\u{1F7E2}", "Lane - Green"),
        ])
    }
}
