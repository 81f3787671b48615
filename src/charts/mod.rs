//! Charts module - state accident maps

mod basemap;
mod map;
mod renderer;

pub use basemap::BaseMap;
pub use map::{
    filter_state, map_state, map_state_input, plottable_points, sanitize_coordinates, states_in,
    GeoBounds, MapError, MapOptions, MapOutcome,
};
pub use renderer::{StaticMapRenderer, POINT_COLOR};
