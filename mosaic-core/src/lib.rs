pub mod bezier;
pub mod blend;
pub mod boundary;
pub mod buffer;
pub mod config;
pub mod history;
pub mod id;
pub mod state;
pub mod tile;
pub mod undo;
pub mod units;
pub mod util;

pub use id::UniqueID;
