//! Ports - the seams to external collaborators.
//!
//! Every collaborator is injected through a constructor as `Arc<dyn ...>` (or a
//! generic parameter); nothing in the core reaches for global state.

pub mod clock;
pub mod id_generator;
pub mod remote;
pub mod task_store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::remote::{DispatchCall, RemoteDispatcher, Target};
pub use self::task_store::TaskStore;
