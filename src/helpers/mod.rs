//! Shared helper types used across staging, learning and scoring.

pub mod column_description;
pub mod importance_maker;
pub mod marker;
pub mod placeholder;
pub mod saver;
pub mod schema;
pub mod subrole;
pub mod vocabulary;

pub use column_description::{ColumnDescription, Marker};
pub use importance_maker::ImportanceMaker;
pub use placeholder::Placeholder;
pub use saver::Format;
pub use schema::Schema;
pub use subrole::Subrole;
pub use vocabulary::Vocabulary;
