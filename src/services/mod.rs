pub mod completion_client;
pub mod prompt;

pub use completion_client::{ApiFlavor, CompletionEndpoint, HttpCompletionClient};
pub use prompt::{build_itinerary_prompt, SYSTEM_PROMPT};
