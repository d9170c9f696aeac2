pub mod action;
pub mod attributes;
pub mod element;
pub mod policy;

pub use action::*;
pub use attributes::*;
pub use element::*;
pub use policy::*;
