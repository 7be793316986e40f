pub mod logging;
pub mod scoped;
pub mod signals;
