pub mod ids;
pub mod position;
pub mod task;

pub use ids::*;
pub use position::*;
pub use task::*;
