//! Preprocessors rewrite the staged tables before feature learning.
//!
//! Each preprocessor is a fit/transform pair over the whole
//! (population, peripherals) set. Fitting is strictly sequential because a
//! preprocessor may consume columns produced by its predecessors; the
//! fingerprint chain threads forward accordingly.

pub mod category_trimmer;
pub mod email_domain;
pub mod imputation;
pub mod preprocessor;
pub mod preprocessor_impl;
pub mod seasonal;
pub mod substring;
pub mod text_field_splitter;

pub use category_trimmer::CategoryTrimmer;
pub use email_domain::EMailDomain;
pub use imputation::Imputation;
pub use preprocessor::{parse, Preprocessor, PreprocessorParams, MAPPING};
pub use preprocessor_impl::FittedColumn;
pub use seasonal::Seasonal;
pub use substring::Substring;
pub use text_field_splitter::TextFieldSplitter;
