//! Application layer use cases for the tablet client.
//!
//! - **`stream_events`** – The [`NetworkClient`](stream_events::NetworkClient)
//!   facade.  Producers submit events and host changes through it; it owns
//!   the lifecycle of the single network worker.
//!
//! - **`follow_settings`** – A background task that watches the settings
//!   store and retargets the stream whenever the configured host changes.
//!
//! - **`capture_input`** – Turns raw surface samples (pixels, float pressure,
//!   hover/touch actions) into normalized events, including the proximity
//!   handling host drivers expect.

pub mod capture_input;
pub mod follow_settings;
pub mod stream_events;
