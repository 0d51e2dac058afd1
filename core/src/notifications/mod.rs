//! Ephemeral notifications.
//!
//! - **Store**: process-wide queue of visible notifications with auto-expiry
//! - **Sequencer**: reveals a batch one at a time with a fixed gap
//! - **Presets**: the drafts features emit (unlocks, failures, claims)
//!
//! ```text
//!   present([a, b, c])        stage: Pending
//!          │
//!          ├── t+0     reveal a   ──► Visible ──(lifetime)──► Dismissed(Expired)
//!          ├── t+gap   reveal b
//!          └── t+2gap  reveal c
//! ```

pub mod presets;
mod sequencer;
mod store;

pub use sequencer::NotificationSequencer;
pub use store::NotificationStore;
