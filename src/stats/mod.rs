//! Statistical toolkit shared by the behavioral components

pub mod distributions;
pub mod matrix;

pub use matrix::{CholeskyFactor, CorrelationMatrix, MotorTrait, MOTOR_TRAIT_COUNT};
