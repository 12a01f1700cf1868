pub mod arbitration;
pub mod authority;
pub mod collaborators;
pub mod destruction;
pub mod error;
pub mod geometry;
pub mod hitscan;
pub mod reload;
pub mod scatter;
