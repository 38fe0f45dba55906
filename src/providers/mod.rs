pub mod fxratesapi;

pub use fxratesapi::FxRatesApiProvider;
