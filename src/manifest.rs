use serde::{Deserialize, Serialize};

/// How the placer treats a manifest tag. Any tag without a dedicated category is a generic "big
/// object".
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum SpawnCategory {
    WallDisplay,
    Container,
    Computer,
    WindowWall,
    Generic,
    /// Spawned by the agent systems, never by the placer.
    Agent,
    /// Built by room geometry, never by the placer.
    Wall,
}

impl SpawnCategory {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "WallDisplay" => SpawnCategory::WallDisplay,
            "Container" => SpawnCategory::Container,
            "Computer" => SpawnCategory::Computer,
            "WindowWall" => SpawnCategory::WindowWall,
            "Agent" => SpawnCategory::Agent,
            "Wall" => SpawnCategory::Wall,
            _ => SpawnCategory::Generic,
        }
    }

    pub fn is_placed(self) -> bool {
        !matches!(self, SpawnCategory::Agent | SpawnCategory::Wall)
    }

    pub fn is_wall_mounted(self) -> bool {
        matches!(self, SpawnCategory::WallDisplay | SpawnCategory::WindowWall)
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ManifestEntry {
    pub tag: String,
    pub count: usize,
}

impl ManifestEntry {
    pub fn category(&self) -> SpawnCategory {
        SpawnCategory::from_tag(&self.tag)
    }
}

/// What one room asks for, in placement order.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct SpawnManifest {
    pub entries: Vec<ManifestEntry>,
}

impl SpawnManifest {
    pub fn with(mut self, tag: &str, count: usize) -> Self {
        self.entries.push(ManifestEntry {
            tag: tag.to_string(),
            count,
        });

        self
    }

    /// Instances the placer is responsible for.
    pub fn placed_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.category().is_placed())
            .map(|e| e.count)
            .sum()
    }
}
