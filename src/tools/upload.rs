//! `FileManager`: the ordered list of files a caller made available for
//! `upload`, plus the system-prompt text describing them.

#[derive(Debug, Clone, Default)]
pub struct FileManager {
    paths: Vec<String>,
}

impl FileManager {
    pub fn new(paths: Vec<String>) -> Self {
        Self { paths }
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn get_path(&self, index: i64) -> Result<&str, String> {
        if index < 0 || index as usize >= self.paths.len() {
            return Err(format!("File index {index} out of range"));
        }
        Ok(&self.paths[index as usize])
    }

    pub fn get_paths(&self, indexes: &[i64]) -> Result<Vec<String>, String> {
        indexes.iter().map(|&i| self.get_path(i).map(str::to_string)).collect()
    }

    /// Renders `"Files:\n- [0] path\n- [1] path\n..."`, or an empty string
    /// when no files are configured.
    pub fn format_context(&self) -> String {
        if self.paths.is_empty() {
            return String::new();
        }
        let mut out = String::from("Files:\n");
        for (i, path) in self.paths.iter().enumerate() {
            out.push_str(&format!("- [{i}] {path}\n"));
        }
        out
    }
}
