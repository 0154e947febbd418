pub mod constants;
pub mod error;
pub mod event;
pub mod instruction;
pub mod state;

pub use alloy_primitives::U256;
pub use error::{EngineError, EngineResult, ErrorKind};
pub use event::EngineEvent;
pub use instruction::EngineInstruction;
pub use state::{Address, AssetId, EngineState, Position};
