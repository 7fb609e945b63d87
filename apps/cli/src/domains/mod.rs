pub mod queue;
pub mod sync;
