pub mod events;
pub mod jobs;

pub use events::{channel, EventReceiver, EventSender};
pub use jobs::JobSystem;
