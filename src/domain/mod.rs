// Domain-specific error types
pub mod errors;

// Numeric feature contract
pub mod ml;

// Port interfaces
pub mod ports;

// Requests, estimates, explanations
pub mod types;
