//! Runtime table containers.
//!
//! Columns are typed: categoricals and join keys are `Int`, numericals,
//! targets and time stamps are `Float`, text and unused columns are
//! `String`. Column data is shared through `Arc` so cloning a data frame
//! during staging never copies the payload.

pub mod column;
pub mod data_frame;
pub mod encoding;
pub mod features;

pub use column::Column;
pub use data_frame::{DataFrame, Role};
pub use encoding::{ColumnEncoding, Encoding};
pub use features::{CategoricalFeatures, Feature, NumericalFeatures};
