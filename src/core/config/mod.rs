pub mod model;
pub mod store;

pub use model::{
    ChatRestriction, Difficulty, GameMode, PermissionLevel, ServerConfiguration, PROPERTY_KEYS,
};
pub use store::{load, parse_properties, render_properties, save};
