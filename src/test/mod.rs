mod fixtures;
mod players;
mod progress;
mod utils;

pub use utils::*;
