pub mod command;
pub mod render_queue;
pub mod surface;

pub use command::{Command, Tool};
pub use render_queue::{CompletedRender, RenderQueue, RenderTicket};
pub use surface::OverlaySurface;
