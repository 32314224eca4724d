use license_core::{
    io::Source,
    license::License,
    manager::{LicenseConsumerManager, LicenseManagementError},
};

use crate::state::StateGuard;

/// A license consumer manager that disables a resource before it forwards
/// [`install`](LicenseConsumerManager::install) or
/// [`uninstall`](LicenseConsumerManager::uninstall) to the delegate manager.
///
/// If the operation succeeds, the resource remains disabled. Otherwise the
/// resource is restored to the state it had before the call, and the error
/// of the delegate is returned as is.
///
/// [`load`](LicenseConsumerManager::load) and
/// [`verify`](LicenseConsumerManager::verify) do not change the installed
/// license and are forwarded without touching the resource.
///
/// Calls must not overlap on the same resource: a second call would capture
/// the disabled state of the first one as its restore value. Callers that
/// share a resource between threads serialize the calls themselves.
pub struct DisablingManager<G, M> {
    guard: G,
    manager: M,
}

impl<G: StateGuard, M> DisablingManager<G, M> {
    pub fn new(guard: G, manager: M) -> DisablingManager<G, M> {
        DisablingManager { guard, manager }
    }

    pub fn guard(&self) -> &G {
        &self.guard
    }

    pub fn manager(&self) -> &M {
        &self.manager
    }

    pub fn into_inner(self) -> (G, M) {
        (self.guard, self.manager)
    }

    /// Run `operation` with the resource disabled.
    ///
    /// On `Ok` the resource is left disabled. On `Err`, and when `operation`
    /// panics, the previous state is restored before the error or panic
    /// reaches the caller.
    pub fn guarded_run<T, E>(&self, operation: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
        let rollback = Rollback::disable(&self.guard);
        match operation() {
            Ok(value) => {
                rollback.commit();
                Ok(value)
            }
            Err(e) => {
                drop(rollback);
                Err(e)
            }
        }
    }
}

impl<G: StateGuard, M: LicenseConsumerManager> LicenseConsumerManager for DisablingManager<G, M> {
    fn install(&self, source: &dyn Source) -> Result<(), LicenseManagementError> {
        self.guarded_run(|| self.manager.install(source))
    }

    fn uninstall(&self) -> Result<(), LicenseManagementError> {
        self.guarded_run(|| self.manager.uninstall())
    }

    fn load(&self) -> Result<License, LicenseManagementError> {
        self.manager.load()
    }

    fn verify(&self) -> Result<(), LicenseManagementError> {
        self.manager.verify()
    }
}

/// Restores the captured state when dropped, unless committed.
///
/// The restore also runs while unwinding from a panic in the operation or in
/// the guard itself. A guard that panics again on the restore aborts the
/// process, as any panic during unwinding does.
struct Rollback<'a, G: StateGuard + ?Sized> {
    guard: &'a G,
    enabled: bool,
    armed: bool,
}

impl<'a, G: StateGuard + ?Sized> Rollback<'a, G> {
    fn disable(guard: &'a G) -> Rollback<'a, G> {
        // Armed before disabling, so that a panicking guard is restored too
        let rollback = Rollback {
            guard,
            enabled: guard.is_enabled(),
            armed: true,
        };
        guard.set_enabled(false);
        tracing::debug!(was_enabled = rollback.enabled, "disabled resource");
        rollback
    }

    fn commit(mut self) {
        self.armed = false;
        tracing::debug!("resource remains disabled");
    }
}

impl<G: StateGuard + ?Sized> Drop for Rollback<'_, G> {
    fn drop(&mut self) {
        if self.armed {
            self.guard.set_enabled(self.enabled);
            tracing::debug!(enabled = self.enabled, "restored resource");
        }
    }
}
