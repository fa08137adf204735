// JSONify Infrastructure - In-Process Adapters
// Implements: ExecutionEngine + TaskSource, Projector

pub mod field_projector;
pub mod in_process_engine;

pub use field_projector::FieldProjector;
pub use in_process_engine::InProcessEngine;
