mod types;

pub use types::{CaDefaults, IssuerConfig, LeafDefaults};
