mod orbit;
mod spherical;
mod view;

pub use orbit::{OrbitController, OrbitSettings, OrbitSettingsError};
pub use spherical::{Spherical, POLE_EPSILON};
pub use view::{Camera, Projection, Viewpoint};
