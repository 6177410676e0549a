use crate::log::{error_missing_template, Error};
use std::{collections::HashMap, fs, path::PathBuf};

/// Describes a type that can read the source text of a template.
///
/// Specs passed to a loader are normalized by the engine: they carry the
/// template suffix and never begin with `/`.
pub trait Loader: Send + Sync {
    /// Return the source text of the template with the given spec.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when the template does not exist or cannot be read.
    fn load(&self, spec: &str) -> Result<String, Error>;
}

/// Reads templates from files below a root directory.
#[derive(Debug, Clone)]
pub struct FileLoader {
    root: PathBuf,
}

impl FileLoader {
    /// Create a new [`FileLoader`] that reads from the given directory.
    #[inline]
    pub fn new<P>(root: P) -> Self
    where
        P: Into<PathBuf>,
    {
        Self { root: root.into() }
    }
}

impl Loader for FileLoader {
    fn load(&self, spec: &str) -> Result<String, Error> {
        let path = self.root.join(spec.trim_start_matches('/'));

        fs::read_to_string(&path).map_err(|e| {
            error_missing_template(spec)
                .with_help(format!("could not read `{}`: {e}", path.display()))
        })
    }
}

/// Holds template source text in memory.
///
/// # Examples
///
/// ```
/// use vellum::{Loader, MemoryLoader};
///
/// let loader = MemoryLoader::new().with("page.tmpl", "hello, {{ name }}!");
///
/// assert!(loader.load("page.tmpl").is_ok());
/// assert!(loader.load("ghost.tmpl").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    templates: HashMap<String, String>,
}

impl MemoryLoader {
    /// Create a new, empty [`MemoryLoader`].
    #[inline]
    pub fn new() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    /// Insert the source text of a template.
    ///
    /// The spec should carry the template suffix, as the engine appends it
    /// before loading.
    #[inline]
    pub fn insert<S, T>(&mut self, spec: S, source: T)
    where
        S: Into<String>,
        T: Into<String>,
    {
        self.templates.insert(spec.into(), source.into());
    }

    /// Insert the source text of a template.
    ///
    /// Returns the [`MemoryLoader`], so additional methods may be chained.
    #[inline]
    pub fn with<S, T>(mut self, spec: S, source: T) -> Self
    where
        S: Into<String>,
        T: Into<String>,
    {
        self.insert(spec, source);

        self
    }
}

impl Loader for MemoryLoader {
    fn load(&self, spec: &str) -> Result<String, Error> {
        self.templates
            .get(spec.trim_start_matches('/'))
            .cloned()
            .ok_or_else(|| error_missing_template(spec))
    }
}

#[cfg(test)]
mod tests {
    use super::{FileLoader, Loader, MemoryLoader};
    use crate::log::ErrorKind;
    use std::fs;

    #[test]
    fn test_file_loader_reads_below_root() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("pages")).unwrap();
        fs::write(root.path().join("pages/home.tmpl"), "home").unwrap();

        let loader = FileLoader::new(root.path());

        assert_eq!(loader.load("pages/home.tmpl").unwrap(), "home");
        assert_eq!(loader.load("/pages/home.tmpl").unwrap(), "home");
    }

    #[test]
    fn test_file_loader_missing() {
        let root = tempfile::tempdir().unwrap();
        let error = FileLoader::new(root.path()).load("ghost.tmpl").unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Load);
    }

    #[test]
    fn test_memory_loader() {
        let mut loader = MemoryLoader::new();
        loader.insert("a.tmpl", "a");

        assert_eq!(loader.load("a.tmpl").unwrap(), "a");
        assert_eq!(loader.load("b.tmpl").unwrap_err().kind(), ErrorKind::Load);
    }
}
