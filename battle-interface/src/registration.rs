//! Registration API handed to plugin artefacts during activation.
//!
//! An artefact does not mutate process-global registries. Instead the loader
//! creates a pending registration, resolves the artefact's entry point and
//! passes the registration in; the entry point attaches its factories and
//! the loader validates the result. Missing or duplicate registrations are
//! reported per artefact, never asserted.
//!
//! Algorithm artefacts export [`ALGORITHM_ENTRY_SYMBOL`] with the signature
//! [`AlgorithmEntryFn`]; arbiter artefacts export [`ARBITER_ENTRY_SYMBOL`]
//! with the signature [`ArbiterEntryFn`].

use std::fmt;
use std::sync::Arc;

use crate::action::Side;
use crate::{Arbiter, Controller, Strategist};

/// Creates one strategist for `(side, width, height, max_steps, num_shells)`.
pub type StrategistFactory =
    Arc<dyn Fn(Side, usize, usize, usize, usize) -> Box<dyn Strategist> + Send + Sync>;

/// Creates one controller for `(side, tank_index)`.
pub type ControllerFactory = Arc<dyn Fn(Side, usize) -> Box<dyn Controller> + Send + Sync>;

/// Creates one arbiter for `verbose`.
pub type ArbiterFactory = Arc<dyn Fn(bool) -> Box<dyn Arbiter> + Send + Sync>;

/// Entry point signature of an algorithm artefact.
pub type AlgorithmEntryFn = fn(&mut AlgorithmRegistration);

/// Entry point signature of an arbiter artefact.
pub type ArbiterEntryFn = fn(&mut ArbiterRegistration);

/// Exported symbol name for algorithm artefacts.
pub const ALGORITHM_ENTRY_SYMBOL: &str = "tank_sim_register_algorithm";

/// Exported symbol name for arbiter artefacts.
pub const ARBITER_ENTRY_SYMBOL: &str = "tank_sim_register_arbiter";

/// What went wrong while an artefact registered its factories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// Required factories were never attached.
    Missing(Vec<&'static str>),
    /// A factory was attached more than once.
    Duplicate(Vec<&'static str>),
}

impl RegistrationError {
    /// The parts this error is about, for diagnostics.
    pub fn parts(&self) -> &[&'static str] {
        match self {
            RegistrationError::Missing(parts) | RegistrationError::Duplicate(parts) => parts,
        }
    }
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationError::Missing(parts) => {
                write!(f, "missing registrations: {}", parts.join(", "))
            }
            RegistrationError::Duplicate(parts) => {
                write!(f, "duplicate registrations: {}", parts.join(", "))
            }
        }
    }
}

impl std::error::Error for RegistrationError {}

/// Pending registration for one algorithm artefact. Must end up with
/// exactly one strategist factory and exactly one controller factory.
#[derive(Default)]
pub struct AlgorithmRegistration {
    strategist: Option<StrategistFactory>,
    controller: Option<ControllerFactory>,
    duplicates: Vec<&'static str>,
}

impl AlgorithmRegistration {
    pub fn new() -> AlgorithmRegistration {
        AlgorithmRegistration::default()
    }

    /// Attach the strategist factory.
    pub fn register_strategist<F>(&mut self, factory: F)
    where
        F: Fn(Side, usize, usize, usize, usize) -> Box<dyn Strategist> + Send + Sync + 'static,
    {
        if self.strategist.is_some() {
            self.duplicates.push("strategist factory");
        } else {
            self.strategist = Some(Arc::new(factory));
        }
    }

    /// Attach the controller factory.
    pub fn register_controller<F>(&mut self, factory: F)
    where
        F: Fn(Side, usize) -> Box<dyn Controller> + Send + Sync + 'static,
    {
        if self.controller.is_some() {
            self.duplicates.push("controller factory");
        } else {
            self.controller = Some(Arc::new(factory));
        }
    }

    /// Validate completeness and hand out the factories.
    pub fn finish(self) -> Result<(StrategistFactory, ControllerFactory), RegistrationError> {
        if !self.duplicates.is_empty() {
            return Err(RegistrationError::Duplicate(self.duplicates));
        }
        let mut missing = Vec::new();
        if self.strategist.is_none() {
            missing.push("strategist factory");
        }
        if self.controller.is_none() {
            missing.push("controller factory");
        }
        if !missing.is_empty() {
            return Err(RegistrationError::Missing(missing));
        }
        Ok((self.strategist.unwrap(), self.controller.unwrap()))
    }
}

/// Pending registration for one arbiter artefact. Must end up with exactly
/// one arbiter factory.
#[derive(Default)]
pub struct ArbiterRegistration {
    factory: Option<ArbiterFactory>,
    duplicates: Vec<&'static str>,
}

impl ArbiterRegistration {
    pub fn new() -> ArbiterRegistration {
        ArbiterRegistration::default()
    }

    /// Attach the arbiter factory.
    pub fn register_arbiter<F>(&mut self, factory: F)
    where
        F: Fn(bool) -> Box<dyn Arbiter> + Send + Sync + 'static,
    {
        if self.factory.is_some() {
            self.duplicates.push("arbiter factory");
        } else {
            self.factory = Some(Arc::new(factory));
        }
    }

    /// Validate completeness and hand out the factory.
    pub fn finish(self) -> Result<ArbiterFactory, RegistrationError> {
        if !self.duplicates.is_empty() {
            return Err(RegistrationError::Duplicate(self.duplicates));
        }
        match self.factory {
            Some(factory) => Ok(factory),
            None => Err(RegistrationError::Missing(vec!["arbiter factory"])),
        }
    }
}
