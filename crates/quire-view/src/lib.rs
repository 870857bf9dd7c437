mod hotkeys;
mod render;
mod session;
mod storage;
mod toolbar;

pub use hotkeys::*;
pub use render::*;
pub use session::*;
pub use storage::*;
pub use toolbar::*;
