pub mod controller;
pub mod item;
pub mod state;

pub use controller::{StateChange, SyncController};
pub use item::{ItemSnapshot, Notice, NoticeKind, ToggleRefused};
pub use state::{transition, Event, MembershipState};
