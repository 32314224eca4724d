//! Keep a resource disabled while its license changes.
//!
//! [`disabling::DisablingManager`] decorates a
//! [`license_core::manager::LicenseConsumerManager`]: before a license is
//! installed or uninstalled it disables a resource through a
//! [`state::StateGuard`]. If the operation succeeds the resource stays
//! disabled, so that the application can re-enable it once it has picked up
//! the new license. If the operation fails, the resource is put back into the
//! state it had before the call.

pub mod disabling;
pub mod state;
