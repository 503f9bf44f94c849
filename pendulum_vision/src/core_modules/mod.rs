// Stateless building blocks of the vision chain plus the frame hand-off between
// the camera thread and the cycle driver.

pub mod blob_extractor;
pub mod blur;
pub mod contour;
pub mod depth;
pub mod frame;
pub mod frame_channel;
pub mod geometry;
pub mod overlay;
pub mod role_disambiguator;
pub mod segmenter;
