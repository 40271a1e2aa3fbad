//! Predictors and the column-layout descriptor they share.
//!
//! The feature selectors and the final predictors are the same capability;
//! they differ only in purpose. Predictors are replicated per target and
//! ensembled by unweighted mean at inference.

pub mod glm;
pub mod linear_regression;
pub mod logistic_regression;
pub mod predictor;
pub mod predictor_impl;
pub mod xgboost;

pub use linear_regression::LinearRegression;
pub use logistic_regression::LogisticRegression;
pub use predictor::{parse, Predictor};
pub use predictor_impl::PredictorImpl;
pub use xgboost::XGBoost;
