pub mod drying;
pub mod rock;
pub mod route;
pub mod weather;

pub use drying::*;
pub use rock::*;
pub use route::*;
pub use weather::*;
