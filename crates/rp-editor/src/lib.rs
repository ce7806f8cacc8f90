pub mod editing;
pub mod engine;
pub mod mutation;
pub mod persist;
pub mod placement;
pub mod scroll;
pub mod sync;
pub mod timing;

pub use editing::{EditOutcome, EditSession, ReportEdit};
pub use engine::ReportEngine;
pub use persist::{DraftStore, PersistError, ReportStore};
pub use placement::{Moves, Placement, PlacementDriver, PlacementMachine, Placer, Refusal, Transition};
