pub mod controller;
pub mod intersection;
pub mod state_machine;
