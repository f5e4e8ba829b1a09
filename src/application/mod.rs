//! # Application Layer
//!
//! Use cases and orchestration logic coordinating domain and connector layers.

pub mod interfaces;
pub mod joint_space;
pub mod use_cases;

pub use interfaces::*;
pub use joint_space::*;
pub use use_cases::*;
