use crate::{arena::EntityId, corridor::NavigationLink, extent::Extent};

use serde::{Deserialize, Serialize};

/// A walkable surface handed to the navigation backend, in world space.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct SurfaceRegion {
    pub owner: EntityId,
    pub extent: Extent,
}

/// Implement this to bake navigation for a finished level. The generator only calls it once every
/// room of the level has been placed successfully.
pub trait NavigationBackend {
    fn build_surface(&mut self, region: &SurfaceRegion);

    /// `link` is in world space.
    fn add_link(&mut self, link: &NavigationLink);

    /// Called once after every surface and link was submitted.
    fn bake(&mut self) {}
}

/// A [`NavigationBackend`] that just remembers what it was given.
#[derive(Clone, Debug, Default)]
pub struct NavBake {
    pub surfaces: Vec<SurfaceRegion>,
    pub links: Vec<NavigationLink>,
    pub bakes: usize,
}

impl NavigationBackend for NavBake {
    fn build_surface(&mut self, region: &SurfaceRegion) {
        self.surfaces.push(*region);
    }

    fn add_link(&mut self, link: &NavigationLink) {
        self.links.push(*link);
    }

    fn bake(&mut self) {
        self.bakes += 1;
    }
}
