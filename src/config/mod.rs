// Configuration: image, mount targets and launch options, optionally read from `.txtprep.yaml`.

mod loader;
mod types;

pub use loader::{CONFIG_FILE, load};
pub use types::{Config, MountTargets};
