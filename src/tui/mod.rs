pub mod app;
pub mod error;
pub mod events;
pub mod layout;
pub mod render;
pub mod widgets;

pub use app::{App, Completion, Mode, Tab};
pub use error::TuiError;
pub use events::{KeyMap, handle_key_event, run_event_loop};
pub use layout::Layout;
pub use render::render;
