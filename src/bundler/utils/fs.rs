//! File system abstraction for bundling.
//!
//! The bundler never touches `std::fs` directly: it writes through a
//! [`FileSystem`] handed to it at construction. [`OsFs`] is the real host
//! filesystem, [`MemoryFs`] an isolated, ephemeral store for tests and dry runs.

use std::{
    collections::BTreeMap,
    fmt,
    io::{self, Read, Write},
    path::{Component, Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};

/// Permission bits for executables.
pub const EXECUTABLE_MODE: u32 = 0o755;

/// Permission bits for plain data files.
pub const FILE_MODE: u32 = 0o644;

/// Metadata about a filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryMetadata {
    /// Whether the entry is a directory.
    pub is_dir: bool,
    /// Size in bytes (0 for directories).
    pub len: u64,
    /// Unix permission bits. Always `0o755` for directories.
    pub mode: u32,
}

/// Operations the bundler needs from a filesystem.
pub trait FileSystem: Send + Sync + fmt::Debug {
    /// Creates `path` and all missing parents. Existing directories are not an error.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Opens an existing file for reading.
    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send>>;

    /// Creates (or truncates) a file with the given permission bits.
    ///
    /// The parent directory must exist.
    fn create(&self, path: &Path, mode: u32) -> io::Result<Box<dyn Write + Send>>;

    /// Returns metadata for `path`.
    fn metadata(&self, path: &Path) -> io::Result<EntryMetadata>;

    /// Lists the direct children of a directory, sorted.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    /// Deletes a file. Directories are not removed.
    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Reads a whole file.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.open(path)?.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Writes a whole file, creating or truncating it.
    fn write(&self, path: &Path, data: &[u8], mode: u32) -> io::Result<()> {
        let mut file = self.create(path, mode)?;
        file.write_all(data)?;
        file.flush()
    }

    /// Returns whether `path` exists.
    fn exists(&self, path: &Path) -> bool {
        self.metadata(path).is_ok()
    }

    /// Recursively lists every entry below `root` (excluding `root`), sorted.
    fn walk(&self, root: &Path) -> io::Result<Vec<PathBuf>> {
        let mut out = Vec::new();
        let mut pending = vec![root.to_path_buf()];
        while let Some(dir) = pending.pop() {
            for child in self.read_dir(&dir)? {
                if self.metadata(&child)?.is_dir {
                    pending.push(child.clone());
                }
                out.push(child);
            }
        }
        out.sort();
        Ok(out)
    }
}

/// The host operating system's filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFs;

impl FileSystem for OsFs {
    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(io::BufReader::new(std::fs::File::open(path)?)))
    }

    fn create(&self, path: &Path, mode: u32) -> io::Result<Box<dyn Write + Send>> {
        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(mode);
        }
        let file = options.open(path)?;

        // The creation mode is filtered by the umask, so apply it explicitly.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(mode))?;
        }
        #[cfg(not(unix))]
        let _ = mode;

        Ok(Box::new(io::BufWriter::new(file)))
    }

    fn metadata(&self, path: &Path) -> io::Result<EntryMetadata> {
        let meta = std::fs::metadata(path)?;
        #[cfg(unix)]
        let mode = {
            use std::os::unix::fs::PermissionsExt;
            meta.permissions().mode() & 0o7777
        };
        #[cfg(not(unix))]
        let mode = if meta.permissions().readonly() { 0o444 } else { 0o644 };
        Ok(EntryMetadata {
            is_dir: meta.is_dir(),
            len: if meta.is_dir() { 0 } else { meta.len() },
            mode,
        })
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut entries = std::fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<io::Result<Vec<_>>>()?;
        entries.sort();
        Ok(entries)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }

    fn walk(&self, root: &Path) -> io::Result<Vec<PathBuf>> {
        let mut out = Vec::new();
        for entry in walkdir::WalkDir::new(root).min_depth(1).sort_by_file_name() {
            out.push(entry.map_err(io::Error::other)?.into_path());
        }
        out.sort();
        Ok(out)
    }
}

#[derive(Debug, Clone)]
enum Node {
    Dir,
    File { data: Vec<u8>, mode: u32 },
}

/// An in-memory filesystem.
///
/// Cloning yields another handle onto the same store. Paths are normalized
/// lexically (`.` dropped, `..` pops), relative and absolute paths are kept
/// distinct.
#[derive(Debug, Clone, Default)]
pub struct MemoryFs {
    nodes: Arc<Mutex<BTreeMap<PathBuf, Node>>>,
}

impl MemoryFs {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries (files and directories) in the store.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns whether nothing has been written yet.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<PathBuf, Node>> {
        // A poisoned store still holds consistent nodes; every mutation is a single insert or removal.
        self.nodes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn parent_is_dir(nodes: &BTreeMap<PathBuf, Node>, path: &Path) -> bool {
        match path.parent() {
            None => true,
            Some(parent) if parent.as_os_str().is_empty() || parent == Path::new("/") => true,
            Some(parent) => matches!(nodes.get(parent), Some(Node::Dir)),
        }
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("{} not found", path.display()))
}

impl FileSystem for MemoryFs {
    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let path = normalize(path);
        let mut nodes = self.lock();
        let mut current = PathBuf::new();
        for component in path.components() {
            current.push(component.as_os_str());
            if matches!(component, Component::RootDir | Component::Prefix(_)) {
                continue;
            }
            match nodes.get(&current) {
                Some(Node::Dir) => {}
                Some(Node::File { .. }) => {
                    return Err(io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        format!("{} is a file", current.display()),
                    ));
                }
                None => {
                    nodes.insert(current.clone(), Node::Dir);
                }
            }
        }
        Ok(())
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        let path = normalize(path);
        match self.lock().get(&path) {
            Some(Node::File { data, .. }) => Ok(Box::new(io::Cursor::new(data.clone()))),
            Some(Node::Dir) => Err(io::Error::other(format!(
                "{} is a directory",
                path.display()
            ))),
            None => Err(not_found(&path)),
        }
    }

    fn create(&self, path: &Path, mode: u32) -> io::Result<Box<dyn Write + Send>> {
        let path = normalize(path);
        let mut nodes = self.lock();
        if !Self::parent_is_dir(&nodes, &path) {
            return Err(not_found(path.parent().unwrap_or(&path)));
        }
        if let Some(Node::Dir) = nodes.get(&path) {
            return Err(io::Error::other(format!("{} is a directory", path.display())));
        }
        nodes.insert(
            path.clone(),
            Node::File {
                data: Vec::new(),
                mode,
            },
        );
        Ok(Box::new(MemoryFile {
            fs: self.clone(),
            path,
        }))
    }

    fn metadata(&self, path: &Path) -> io::Result<EntryMetadata> {
        let path = normalize(path);
        match self.lock().get(&path) {
            Some(Node::Dir) => Ok(EntryMetadata {
                is_dir: true,
                len: 0,
                mode: 0o755,
            }),
            Some(Node::File { data, mode }) => Ok(EntryMetadata {
                is_dir: false,
                len: data.len() as u64,
                mode: *mode,
            }),
            None => Err(not_found(&path)),
        }
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let path = normalize(path);
        let nodes = self.lock();
        if !matches!(nodes.get(&path), Some(Node::Dir)) {
            return Err(not_found(&path));
        }
        Ok(nodes
            .keys()
            .filter(|candidate| candidate.parent() == Some(path.as_path()))
            .cloned()
            .collect())
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        let path = normalize(path);
        let mut nodes = self.lock();
        match nodes.get(&path) {
            Some(Node::File { .. }) => {
                nodes.remove(&path);
                Ok(())
            }
            Some(Node::Dir) => Err(io::Error::other(format!("{} is a directory", path.display()))),
            None => Err(not_found(&path)),
        }
    }
}

/// Write handle into a [`MemoryFs`] file; bytes land in the store immediately.
struct MemoryFile {
    fs: MemoryFs,
    path: PathBuf,
}

impl Write for MemoryFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.fs.lock().get_mut(&self.path) {
            Some(Node::File { data, .. }) => {
                data.extend_from_slice(buf);
                Ok(buf.len())
            }
            _ => Err(not_found(&self.path)),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
