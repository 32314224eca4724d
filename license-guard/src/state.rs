use std::{
    fs::{self, OpenOptions},
    io,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

/// Read and write access to the enabled flag of some resource: a UI control,
/// a device, a service endpoint, a configuration flag.
///
/// Setting the flag cannot fail at this layer. A resource that cannot be
/// toggled is defective; implementations report that on their own terms.
pub trait StateGuard {
    fn is_enabled(&self) -> bool;
    fn set_enabled(&self, enabled: bool);
}

impl<G: StateGuard + ?Sized> StateGuard for &G {
    fn is_enabled(&self) -> bool {
        (**self).is_enabled()
    }
    fn set_enabled(&self, enabled: bool) {
        (**self).set_enabled(enabled)
    }
}

impl<G: StateGuard + ?Sized> StateGuard for Box<G> {
    fn is_enabled(&self) -> bool {
        (**self).is_enabled()
    }
    fn set_enabled(&self, enabled: bool) {
        (**self).set_enabled(enabled)
    }
}

impl<G: StateGuard + ?Sized> StateGuard for Arc<G> {
    fn is_enabled(&self) -> bool {
        (**self).is_enabled()
    }
    fn set_enabled(&self, enabled: bool) {
        (**self).set_enabled(enabled)
    }
}

/// An in-process flag. Clones control the same flag.
#[derive(Debug, Clone)]
pub struct Switch {
    enabled: Arc<AtomicBool>,
}

impl Switch {
    pub fn new(enabled: bool) -> Switch {
        Switch {
            enabled: Arc::new(AtomicBool::new(enabled)),
        }
    }
}

impl Default for Switch {
    fn default() -> Self {
        Switch::new(true)
    }
}

impl StateGuard for Switch {
    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst)
    }
}

/// A resource that is disabled for as long as a marker file exists.
///
/// Other processes disable the resource by creating the marker and observe
/// it with [`FlagFile::is_enabled`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagFile {
    marker: PathBuf,
}

impl FlagFile {
    pub fn new(marker: impl Into<PathBuf>) -> FlagFile {
        FlagFile {
            marker: marker.into(),
        }
    }

    pub fn marker(&self) -> &Path {
        &self.marker
    }

    fn try_set_enabled(&self, enabled: bool) -> io::Result<()> {
        if enabled {
            match fs::remove_file(&self.marker) {
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                r => r,
            }
        } else {
            OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(false)
                .open(&self.marker)
                .map(drop)
        }
    }
}

impl StateGuard for FlagFile {
    fn is_enabled(&self) -> bool {
        !self.marker.exists()
    }

    fn set_enabled(&self, enabled: bool) {
        if let Err(e) = self.try_set_enabled(enabled) {
            tracing::error!(
                marker = %self.marker.display(),
                enabled,
                "could not toggle resource: {}",
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_switch_clones_share_state() {
        let switch = Switch::default();
        let handle = switch.clone();
        assert!(handle.is_enabled());
        switch.set_enabled(false);
        assert!(!handle.is_enabled());
    }

    #[test]
    fn test_guard_through_pointers() {
        let switch = Switch::new(false);
        let boxed: Box<dyn StateGuard> = Box::new(switch.clone());
        let shared = Arc::new(switch.clone());
        boxed.set_enabled(true);
        assert!(shared.is_enabled());
        let by_ref: &dyn StateGuard = &shared;
        by_ref.set_enabled(false);
        assert!(!switch.is_enabled());
    }

    #[test]
    fn test_flag_file() {
        let dir = tempfile::tempdir().unwrap();
        let flag = FlagFile::new(dir.path().join("resource.disabled"));
        assert!(flag.is_enabled());

        flag.set_enabled(false);
        assert!(flag.marker().exists());
        assert!(!flag.is_enabled());
        flag.set_enabled(false);
        assert!(!flag.is_enabled());

        flag.set_enabled(true);
        assert!(!flag.marker().exists());
        assert!(flag.is_enabled());
        flag.set_enabled(true);
        assert!(flag.is_enabled());
    }

    #[test]
    fn test_flag_file_keeps_marker_contents() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("resource.disabled");
        fs::write(&marker, "disabled by operator").unwrap();
        let flag = FlagFile::new(&marker);
        flag.set_enabled(false);
        assert_eq!(fs::read_to_string(&marker).unwrap(), "disabled by operator");
    }

    #[test]
    fn test_flag_file_untoggleable() {
        let dir = tempfile::tempdir().unwrap();
        let flag = FlagFile::new(dir.path().join("missing-dir").join("resource.disabled"));
        // Logged, not propagated
        flag.set_enabled(false);
        assert!(flag.is_enabled());
    }
}
