//! Artefact activation and factory validation.
//!
//! Loading an artefact is a four step dance: create a pending registration
//! named after the file, activate the library, resolve and invoke its entry
//! point with the registration, then validate that exactly the expected
//! factories were attached. Anything that goes wrong surfaces as a
//! [`PluginError`] carrying the artefact name; the artefact is discarded and
//! the caller decides whether the run can continue.
//!
//! Activation handles are shared, not scoped by convention: the
//! [`PluginHost`] retains one reference per artefact and every validated
//! handle co-owns the library its factories came from. Cloning a handle
//! across worker threads keeps the artefact activated, and the library is
//! torn down only after the host and the last factory clone are gone, so
//! no refactor of binding order can unload code a live factory still
//! references.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use libloading::Library;
use tracing::info;

use battle_interface::registration::{
    AlgorithmEntryFn, AlgorithmRegistration, ArbiterEntryFn, ArbiterRegistration,
    ALGORITHM_ENTRY_SYMBOL, ARBITER_ENTRY_SYMBOL,
};
use battle_interface::{ArbiterFactory, ControllerFactory, RegistrationError, StrategistFactory};

/// Validated factories of one algorithm artefact.
///
/// Field order matters for teardown: the factories drop before the library
/// reference that keeps their code mapped.
#[derive(Clone)]
pub struct AlgorithmHandle {
    pub name: String,
    pub strategist: StrategistFactory,
    pub controller: ControllerFactory,
    /// Keeps the originating artefact activated for as long as any clone of
    /// the factories lives. `None` for in-process registrations.
    _library: Option<Arc<Library>>,
}

impl fmt::Debug for AlgorithmHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlgorithmHandle")
            .field("name", &self.name)
            .finish()
    }
}

/// Validated factory of one arbiter artefact.
///
/// See [`AlgorithmHandle`] for the teardown ordering.
#[derive(Clone)]
pub struct ArbiterHandle {
    pub name: String,
    pub factory: ArbiterFactory,
    _library: Option<Arc<Library>>,
}

impl fmt::Debug for ArbiterHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArbiterHandle")
            .field("name", &self.name)
            .finish()
    }
}

/// Why an artefact was discarded.
#[derive(Debug)]
pub enum PluginErrorKind {
    /// The library could not be activated.
    Activation(String),
    /// The library lacks the expected entry point symbol.
    MissingEntryPoint(&'static str),
    /// The entry point ran but the registration is incomplete or overfull.
    BadRegistration(RegistrationError),
}

/// An artefact that failed to load, by name.
#[derive(Debug)]
pub struct PluginError {
    pub name: String,
    pub kind: PluginErrorKind,
}

impl fmt::Display for PluginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            PluginErrorKind::Activation(message) => {
                write!(f, "artefact '{}' failed to activate: {message}", self.name)
            }
            PluginErrorKind::MissingEntryPoint(symbol) => {
                write!(f, "artefact '{}' has no '{symbol}' entry point", self.name)
            }
            PluginErrorKind::BadRegistration(err) => {
                write!(f, "artefact '{}': {err}", self.name)
            }
        }
    }
}

impl std::error::Error for PluginError {}

/// Display name of an artefact: file stem with any `lib` prefix stripped.
pub fn artefact_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    stem.strip_prefix("lib").map(str::to_owned).unwrap_or(stem)
}

/// Retains one reference to every loaded artefact's library.
///
/// The handles built from an artefact co-own its library, so the library is
/// unloaded only after both the host and the last factory clone are gone.
#[derive(Default)]
pub struct PluginHost {
    libraries: Vec<Arc<Library>>,
}

impl PluginHost {
    pub fn new() -> PluginHost {
        PluginHost::default()
    }

    /// Activate an algorithm artefact and validate its registration.
    pub fn load_algorithm(&mut self, path: &Path) -> Result<AlgorithmHandle, PluginError> {
        let name = artefact_name(path);
        let library = Arc::new(self.activate(path, &name)?);
        let entry = *unsafe {
            library.get::<AlgorithmEntryFn>(ALGORITHM_ENTRY_SYMBOL.as_bytes())
        }
        .map_err(|_| PluginError {
            name: name.clone(),
            kind: PluginErrorKind::MissingEntryPoint(ALGORITHM_ENTRY_SYMBOL),
        })?;
        // Retained even when validation fails below: the entry point has
        // already run, so any partially registered factory must drop while
        // its code is still mapped.
        self.libraries.push(Arc::clone(&library));
        let mut handle = algorithm_from_entry(&name, entry)?;
        handle._library = Some(library);
        info!(artefact = %handle.name, "algorithm loaded");
        Ok(handle)
    }

    /// Activate an arbiter artefact and validate its registration.
    pub fn load_arbiter(&mut self, path: &Path) -> Result<ArbiterHandle, PluginError> {
        let name = artefact_name(path);
        let library = Arc::new(self.activate(path, &name)?);
        let entry = *unsafe { library.get::<ArbiterEntryFn>(ARBITER_ENTRY_SYMBOL.as_bytes()) }
            .map_err(|_| PluginError {
                name: name.clone(),
                kind: PluginErrorKind::MissingEntryPoint(ARBITER_ENTRY_SYMBOL),
            })?;
        self.libraries.push(Arc::clone(&library));
        let mut handle = arbiter_from_entry(&name, entry)?;
        handle._library = Some(library);
        info!(artefact = %handle.name, "arbiter loaded");
        Ok(handle)
    }

    fn activate(&self, path: &Path, name: &str) -> Result<Library, PluginError> {
        unsafe { Library::new(path) }.map_err(|err| PluginError {
            name: name.to_string(),
            kind: PluginErrorKind::Activation(err.to_string()),
        })
    }
}

/// Run an algorithm entry point against a fresh registration and validate
/// it. Also the in-process path used by the test-suite.
pub fn algorithm_from_entry(
    name: &str,
    entry: AlgorithmEntryFn,
) -> Result<AlgorithmHandle, PluginError> {
    let mut registration = AlgorithmRegistration::new();
    entry(&mut registration);
    let (strategist, controller) = registration.finish().map_err(|err| PluginError {
        name: name.to_string(),
        kind: PluginErrorKind::BadRegistration(err),
    })?;
    Ok(AlgorithmHandle {
        name: name.to_string(),
        strategist,
        controller,
        _library: None,
    })
}

/// Run an arbiter entry point against a fresh registration and validate it.
pub fn arbiter_from_entry(name: &str, entry: ArbiterEntryFn) -> Result<ArbiterHandle, PluginError> {
    let mut registration = ArbiterRegistration::new();
    entry(&mut registration);
    let factory = registration.finish().map_err(|err| PluginError {
        name: name.to_string(),
        kind: PluginErrorKind::BadRegistration(err),
    })?;
    Ok(ArbiterHandle {
        name: name.to_string(),
        factory,
        _library: None,
    })
}
