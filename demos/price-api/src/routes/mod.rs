pub mod cards;
pub mod pricing;
pub mod sets;
pub mod status;
