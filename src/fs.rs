//! Read-only filesystem layer used to load the documents of a stack trace.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;

/// A source of file contents.
pub trait ReadFileFs {
    fn read_file(&self, path: &Path) -> io::Result<String>;

    fn exists(&self, path: &Path) -> bool;
}

/// The host filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawFs;

impl ReadFileFs for RawFs {
    fn read_file(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// An in-memory filesystem.
///
/// Files can be looked up by their exact path or by file name alone, which
/// lets a language stub library sources (`Integer.java`) that only appear in
/// stack traces by name. Stub files read as empty.
#[derive(Debug, Clone, Default)]
pub struct VirtualFs {
    files: BTreeMap<String, String>,
}

impl VirtualFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<String>, contents: impl Into<String>) -> Self {
        self.add_file(path, contents);
        self
    }

    pub fn add_file(&mut self, path: impl Into<String>, contents: impl Into<String>) {
        self.files.insert(path.into(), contents.into());
    }

    /// Adds an empty stub file.
    pub fn stub(mut self, path: impl Into<String>) -> Self {
        self.add_file(path, "");
        self
    }

    fn lookup(&self, path: &Path) -> Option<&String> {
        let key = path.to_string_lossy();
        self.files.get(key.as_ref()).or_else(|| {
            let name = path.file_name()?.to_string_lossy();
            self.files.get(name.as_ref())
        })
    }
}

impl ReadFileFs for VirtualFs {
    fn read_file(&self, path: &Path) -> io::Result<String> {
        self.lookup(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            )
        })
    }

    fn exists(&self, path: &Path) -> bool {
        self.lookup(path).is_some()
    }
}

/// Layers of filesystems, consulted from the most recently attached.
pub struct MultiReadFileFs {
    layers: Vec<(String, Box<dyn ReadFileFs>)>,
}

impl MultiReadFileFs {
    /// A layered filesystem backed by the host filesystem.
    pub fn new() -> Self {
        Self {
            layers: vec![("raw".to_string(), Box::new(RawFs))],
        }
    }

    pub fn empty() -> Self {
        Self { layers: Vec::new() }
    }

    pub fn has_layer(&self, name: &str) -> bool {
        self.layers.iter().any(|(n, _)| n == name)
    }

    /// Adds a named layer; a layer with the same name is kept.
    pub fn attach(&mut self, name: impl Into<String>, fs: Box<dyn ReadFileFs>) {
        let name = name.into();
        if !self.has_layer(&name) {
            self.layers.push((name, fs));
        }
    }

    /// Adds a named layer, replacing a layer with the same name.
    pub fn attach_or_replace(&mut self, name: impl Into<String>, fs: Box<dyn ReadFileFs>) {
        let name = name.into();
        match self.layers.iter_mut().find(|(n, _)| *n == name) {
            Some(layer) => layer.1 = fs,
            None => self.layers.push((name, fs)),
        }
    }
}

impl Default for MultiReadFileFs {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadFileFs for MultiReadFileFs {
    fn read_file(&self, path: &Path) -> io::Result<String> {
        for (_, fs) in self.layers.iter().rev() {
            if fs.exists(path) {
                return fs.read_file(path);
            }
        }
        match self.layers.first() {
            Some((_, fs)) => fs.read_file(path),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            )),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.layers.iter().any(|(_, fs)| fs.exists(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_virtual_fs_lookup() {
        let fs = VirtualFs::new()
            .stub("Integer.java")
            .with_file("/src/a.py", "a = 1");
        assert_eq!(fs.read_file(Path::new("/jdk/java/lang/Integer.java")).unwrap(), "");
        assert_eq!(fs.read_file(Path::new("/src/a.py")).unwrap(), "a = 1");
        assert!(fs.read_file(Path::new("/src/b.py")).is_err());
    }

    #[test]
    fn test_layers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.py");
        std::fs::write(&path, "print(1)").unwrap();

        let mut fs = MultiReadFileFs::new();
        assert_eq!(fs.read_file(&path).unwrap(), "print(1)");

        fs.attach("stubs", Box::new(VirtualFs::new().stub("main.py")));
        assert_eq!(fs.read_file(&path).unwrap(), "");

        fs.attach_or_replace("stubs", Box::new(VirtualFs::new()));
        assert_eq!(fs.read_file(&path).unwrap(), "print(1)");
        assert!(fs.read_file(&dir.path().join("missing.py")).is_err());
    }
}
