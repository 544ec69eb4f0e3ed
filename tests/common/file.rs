use derive_new::new;
use fake::Fake;
use fake::faker::lorem::en::{Word, Words};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct FileSpec {
    pub path: PathBuf,
    pub content: String,
}

pub fn write_file(file_spec: &FileSpec) {
    // make sure the parent directory exists
    if let Some(parent) = file_spec.path.parent() {
        std::fs::create_dir_all(parent)
            .unwrap_or_else(|e| panic!("Failed to create directory {:?}: {}", parent, e));
    }

    std::fs::write(&file_spec.path, &file_spec.content)
        .unwrap_or_else(|e| panic!("Failed to write file {:?}: {}", file_spec.path, e));
}

/// Random word-based file name, unique within one call site's batch
pub fn fake_file_name(taken: &[FileSpec]) -> String {
    loop {
        let name = format!("{}.txt", Word().fake::<String>());
        if !taken.iter().any(|spec| spec.path.ends_with(&name)) {
            return name;
        }
    }
}

pub fn fake_content() -> String {
    Words(5..10).fake::<Vec<String>>().join(" ")
}

/// Write `files_count` files with generated names and content directly in `dir`
pub fn write_generated_files(dir: &Path, files_count: usize) -> Vec<FileSpec> {
    let mut files = Vec::with_capacity(files_count);

    for _ in 0..files_count {
        let file_spec = FileSpec::new(dir.join(fake_file_name(&files)), fake_content());
        write_file(&file_spec);
        files.push(file_spec);
    }

    files
}
