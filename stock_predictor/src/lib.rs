//! Application layer of the stock predictor: configuration, the
//! train/predict pipeline over [`price_store`] and [`forecast`], the model
//! slot shared by readers, and the credential gate in front of prediction.

pub mod accounts;
pub mod config;
pub mod model_handle;
pub mod pipeline;
