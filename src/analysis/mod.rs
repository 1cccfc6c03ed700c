pub mod grouping;
pub mod shaping;
pub mod stats;
pub mod validation;
