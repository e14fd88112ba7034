//! Backing storage for feature values

pub mod columnar;
pub mod derived;

pub use columnar::Column;
pub use derived::DerivedSlot;
