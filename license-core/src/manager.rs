use std::io;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    codec::{Codec, DecodingError, EncodingError},
    io::{PathStore, Source},
    license::License,
};

#[derive(Debug, Error)]
pub enum LicenseManagementError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error(transparent)]
    Decoding(#[from] DecodingError),
    #[error("license store i/o failed")]
    Io(#[from] io::Error),
    #[error("no license installed for subject {0:?}")]
    NotInstalled(String),
    #[error("license is for subject {actual:?}, expected {expected:?}")]
    SubjectMismatch { expected: String, actual: String },
    #[error("license is not valid before {0}")]
    NotYetValid(DateTime<Utc>),
    #[error("license expired at {0}")]
    Expired(DateTime<Utc>),
    #[error("invalid license: {0}")]
    Invalid(String),
}

/// The operations a license consuming application performs on its license.
pub trait LicenseConsumerManager {
    /// Decode, validate and store the license provided by `source`.
    fn install(&self, source: &dyn Source) -> Result<(), LicenseManagementError>;

    /// Remove the installed license.
    fn uninstall(&self) -> Result<(), LicenseManagementError>;

    /// Return the installed license without validating it.
    fn load(&self) -> Result<License, LicenseManagementError>;

    /// Validate the installed license.
    fn verify(&self) -> Result<(), LicenseManagementError>;
}

impl<M: LicenseConsumerManager + ?Sized> LicenseConsumerManager for &M {
    fn install(&self, source: &dyn Source) -> Result<(), LicenseManagementError> {
        (**self).install(source)
    }
    fn uninstall(&self) -> Result<(), LicenseManagementError> {
        (**self).uninstall()
    }
    fn load(&self) -> Result<License, LicenseManagementError> {
        (**self).load()
    }
    fn verify(&self) -> Result<(), LicenseManagementError> {
        (**self).verify()
    }
}

impl<M: LicenseConsumerManager + ?Sized> LicenseConsumerManager for Box<M> {
    fn install(&self, source: &dyn Source) -> Result<(), LicenseManagementError> {
        (**self).install(source)
    }
    fn uninstall(&self) -> Result<(), LicenseManagementError> {
        (**self).uninstall()
    }
    fn load(&self) -> Result<License, LicenseManagementError> {
        (**self).load()
    }
    fn verify(&self) -> Result<(), LicenseManagementError> {
        (**self).verify()
    }
}

/// A manager that keeps the installed license in a file, encoded with `C`.
///
/// Licenses are decoded with the same codec they are stored with, so a
/// license key must use the codec of the manager it is installed into.
pub struct StoreManager<C> {
    subject: String,
    store: PathStore,
    codec: C,
}

impl<C: Codec> StoreManager<C> {
    pub fn new(subject: impl Into<String>, store: PathStore, codec: C) -> StoreManager<C> {
        StoreManager {
            subject: subject.into(),
            store,
            codec,
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn store(&self) -> &PathStore {
        &self.store
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }
}

impl<C: Codec> LicenseConsumerManager for StoreManager<C> {
    fn install(&self, source: &dyn Source) -> Result<(), LicenseManagementError> {
        let license: License = self.codec.decode(source)?;
        license.validate(&self.subject, Utc::now())?;
        self.codec.encode(&self.store, &license)?;
        tracing::info!(
            subject = %license.subject,
            holder = %license.holder,
            store = %self.store.path().display(),
            "installed license"
        );
        Ok(())
    }

    fn uninstall(&self) -> Result<(), LicenseManagementError> {
        if !self.store.exists() {
            return Err(LicenseManagementError::NotInstalled(self.subject.clone()));
        }
        self.store.delete()?;
        tracing::info!(subject = %self.subject, "uninstalled license");
        Ok(())
    }

    fn load(&self) -> Result<License, LicenseManagementError> {
        if !self.store.exists() {
            return Err(LicenseManagementError::NotInstalled(self.subject.clone()));
        }
        Ok(self.codec.decode(&self.store)?)
    }

    fn verify(&self) -> Result<(), LicenseManagementError> {
        self.load()?.validate(&self.subject, Utc::now())
    }
}
