// Adapters layer: concrete implementations of the domain ports.

pub mod memory;
pub mod notify;
pub mod postgrest;

pub use memory::{InMemoryStore, StaticSession};
pub use notify::{RecordingNotifier, TracingNotifier};
pub use postgrest::{PostgrestStore, SupabaseAuth};
