//! Time-windowed blocks.

mod model;
mod resolver;

pub use model::BlockSchedule;
pub use resolver::{block_title, resolve_current_block};
