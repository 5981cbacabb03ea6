pub mod error;
pub mod image;
pub mod layers;
pub mod traits;
