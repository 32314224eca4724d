//! Interfaces for consuming licenses: the byte streams license material is
//! read from and written to, the codecs that turn license beans into bytes,
//! and the license consumer manager that installs, loads, verifies and
//! uninstalls them.
//!
//! Decorators around [`manager::LicenseConsumerManager`] live in separate
//! crates, e.g. `license-guard`.

pub mod codec;
pub mod io;
pub mod license;
pub mod manager;
