use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufReader, Cursor, ErrorKind, Read, Seek};

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

pub trait Storage {
    type Reader: Read + Seek;

    fn list_wav(&self) -> io::Result<Vec<String>>;

    fn open(&self, name: &str) -> io::Result<Self::Reader>;

    fn location(&self) -> String;
}

/// True for visible files with a `.wav` extension in any case. Names starting
/// with a dot (hidden files, `._` resource forks) are skipped.
pub fn is_sample_file(name: &str) -> bool {
    if name.starts_with('.') {
        return false;
    }
    Utf8Path::new(name)
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("wav"))
}

fn sorted_samples<I: IntoIterator<Item = String>>(names: I) -> Vec<String> {
    let mut names: Vec<String> = names.into_iter().filter(|n| is_sample_file(n)).collect();
    names.sort();
    names
}

/// Samples in a directory on disk. Subdirectories are not searched.
#[derive(Debug)]
pub struct DirStorage {
    root: Utf8PathBuf,
}

impl DirStorage {
    pub fn new<P: AsRef<Utf8Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let root = Utf8PathBuf::from_path_buf(path.canonicalize()?).map_err(|p| {
            io::Error::new(
                ErrorKind::InvalidData,
                format!("invalid path {}", p.display()),
            )
        })?;
        if !root.is_dir() {
            return Err(io::Error::new(
                ErrorKind::NotFound,
                format!("{} is not a directory", root),
            ));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }
}

impl Storage for DirStorage {
    type Reader = BufReader<File>;

    fn list_wav(&self) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(name) => debug!(?name, "skipping non utf-8 file name"),
            }
        }
        Ok(sorted_samples(names))
    }

    fn open(&self, name: &str) -> io::Result<Self::Reader> {
        let path = self.root.join(name.trim_start_matches('/'));
        Ok(BufReader::new(File::open(path)?))
    }

    fn location(&self) -> String {
        self.root.to_string()
    }
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<S: Into<String>>(&mut self, name: S, bytes: Vec<u8>) {
        self.files.insert(name.into(), bytes);
    }

    pub fn with_file<S: Into<String>>(mut self, name: S, bytes: Vec<u8>) -> Self {
        self.insert(name, bytes);
        self
    }
}

impl Storage for MemoryStorage {
    type Reader = Cursor<Vec<u8>>;

    fn list_wav(&self) -> io::Result<Vec<String>> {
        Ok(sorted_samples(self.files.keys().cloned()))
    }

    fn open(&self, name: &str) -> io::Result<Self::Reader> {
        self.files
            .get(name.trim_start_matches('/'))
            .map(|bytes| Cursor::new(bytes.clone()))
            .ok_or_else(|| io::Error::new(ErrorKind::NotFound, format!("{} not found", name)))
    }

    fn location(&self) -> String {
        String::from("memory")
    }
}
