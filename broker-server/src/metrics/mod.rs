pub mod pickle;
pub mod pusher;

pub use pusher::{spawn, GraphiteConfig};
