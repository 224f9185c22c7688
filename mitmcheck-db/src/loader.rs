use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;

/// Source of named corpus blobs. Implement this to read fingerprint files
/// from object storage or any other datasource; the engine only needs the
/// read-a-named-blob contract.
pub trait Loader: Send + Sync {
    fn load_file(&self, file_name: &str) -> io::Result<Box<dyn Read>>;
}

/// Loads corpus files from the local filesystem, optionally under a base
/// directory.
#[derive(Debug, Clone, Default)]
pub struct FileLoader {
    base_dir: Option<PathBuf>,
}

impl FileLoader {
    pub fn new() -> FileLoader {
        FileLoader { base_dir: None }
    }

    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> FileLoader {
        FileLoader {
            base_dir: Some(base_dir.into()),
        }
    }
}

impl Loader for FileLoader {
    fn load_file(&self, file_name: &str) -> io::Result<Box<dyn Read>> {
        let path = match &self.base_dir {
            Some(base) => base.join(file_name),
            None => PathBuf::from(file_name),
        };
        Ok(Box::new(File::open(path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_loader_missing_file_errors() {
        let loader = FileLoader::new();
        assert!(loader.load_file("definitely/not/a/real/file.txt").is_err());
    }

    #[test]
    fn file_loader_reads_contents() {
        let dir = std::env::temp_dir();
        let path = dir.join("mitmcheck-loader-test.txt");
        std::fs::write(&path, "hello\n").unwrap();

        let loader = FileLoader::with_base_dir(&dir);
        let mut contents = String::new();
        loader
            .load_file("mitmcheck-loader-test.txt")
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "hello\n");

        std::fs::remove_file(&path).ok();
    }
}
