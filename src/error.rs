use thiserror::Error;

/// A level spec that can't be generated from.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Could not parse level spec: {0}")]
    Parse(String),

    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: f32 },

    #[error("Room dimension range [{min}, {max}] holds no odd value")]
    NoOddDimension { min: u32, max: u32 },

    #[error("Bad shape weights: {0}")]
    ShapeWeights(String),

    #[error("Window probability {0} is outside [0, 1]")]
    WindowProbability(f64),

    #[error("Wall thickness {thickness} doesn't fit in a tile of {tile_size}")]
    WallThickness { thickness: f32, tile_size: f32 },
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum GenerateError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to generate level after {attempts} tries")]
    TooManyTries { attempts: usize },
}
