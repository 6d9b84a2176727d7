//! File storage adapters: local filesystem and Cloudinary.

mod cloudinary;
mod local;

pub use cloudinary::{CloudinaryConfig, CloudinaryFileStorage};
pub use local::LocalFileStorage;
