#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum EntryKind {
    File,
    Directory,
    Link,
}

/// One entry of a source directory listing.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct FileCandidate {
    pub name: String,
    pub kind: EntryKind,
}

impl FileCandidate {
    pub fn new(name: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn file(name: impl Into<String>) -> Self {
        Self::new(name, EntryKind::File)
    }

    pub fn directory(name: impl Into<String>) -> Self {
        Self::new(name, EntryKind::Directory)
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    /// Path used for RETR/DELE. Listings only carry base names, so the
    /// configured directory has to be put back in front.
    pub fn remote_path(&self, directory: Option<&str>) -> String {
        match directory.map(|d| d.trim_end_matches('/')) {
            Some("") => format!("/{}", self.name),
            Some(dir) => format!("{}/{}", dir, self.name),
            None => self.name.clone(),
        }
    }
}
