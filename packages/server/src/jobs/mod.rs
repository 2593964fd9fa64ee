pub mod phase_transition;

pub use phase_transition::{PhaseTransitionReport, run_phase_transition, run_scheduler};
