pub mod config;
pub mod error;
pub mod geometry;
pub mod io;
pub mod origin;
pub mod positioning;
pub mod scene;
pub mod system;
pub mod tracking;
pub mod viz;

pub use config::ArConfig;
pub use error::ArError;
pub use system::{ArEvent, ArSystem};
