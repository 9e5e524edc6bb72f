mod barrier;
mod drops;
mod signals;
mod slots;

pub use barrier::*;
pub use drops::*;
pub use signals::*;
pub use slots::*;
