pub mod analysis;
pub mod intake;

pub use analysis::*;
pub use intake::*;
