pub mod discord;
pub mod traits;

pub use discord::{DiscordGateway, DiscordRest};
pub use traits::{GatewayEvent, MessageHandle, MessageSink};
