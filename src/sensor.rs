mod field;
mod reading;
mod snapshot;

pub use field::*;
pub use reading::*;
pub use snapshot::*;
