//! Signal processing primitives
//!
//! - [`windowing`]: Window functions and fixed-length partitioning
//! - [`bispectrum`]: Segment-averaged bispectrum and bicoherence
//! - [`wavelet`]: MODWT multi-resolution analysis
//! - [`moments`]: Windowed central moments

pub mod bispectrum;
pub mod moments;
pub mod wavelet;
pub mod windowing;
