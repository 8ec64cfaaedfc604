//! Where the shared persona system prompt comes from.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::lirith::orchestration::ExperimentError;

/// Supplies the system prompt once, before the first turn.
pub trait SystemPromptSource: Send + Sync {
    /// The trimmed prompt, or `MissingPrecondition` if there is none.
    fn load(&self) -> Result<String, ExperimentError>;
}

/// Reads the prompt from a UTF-8 file, `system_prompt.txt` by default.
#[derive(Debug, Clone)]
pub struct FileSystemPrompt {
    path: PathBuf,
}

impl FileSystemPrompt {
    pub fn new(path: impl AsRef<Path>) -> Self {
        FileSystemPrompt {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileSystemPrompt {
    fn default() -> Self {
        FileSystemPrompt::new("system_prompt.txt")
    }
}

impl SystemPromptSource for FileSystemPrompt {
    fn load(&self) -> Result<String, ExperimentError> {
        let raw = fs::read_to_string(&self.path).map_err(|e| {
            let what = match e.kind() {
                io::ErrorKind::NotFound => "not found".to_string(),
                _ => e.to_string(),
            };
            ExperimentError::MissingPrecondition(format!(
                "system prompt {}: {}",
                self.path.display(),
                what
            ))
        })?;
        let prompt = raw.trim();
        if prompt.is_empty() {
            return Err(ExperimentError::MissingPrecondition(format!(
                "system prompt {} is empty",
                self.path.display()
            )));
        }
        Ok(prompt.to_string())
    }
}

/// An in-memory prompt.
#[derive(Debug, Clone)]
pub struct StaticSystemPrompt(pub String);

impl StaticSystemPrompt {
    pub fn new(prompt: impl Into<String>) -> Self {
        StaticSystemPrompt(prompt.into())
    }
}

impl SystemPromptSource for StaticSystemPrompt {
    fn load(&self) -> Result<String, ExperimentError> {
        let prompt = self.0.trim();
        if prompt.is_empty() {
            return Err(ExperimentError::MissingPrecondition(
                "system prompt is empty".to_string(),
            ));
        }
        Ok(prompt.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_is_a_missing_precondition() {
        let source = FileSystemPrompt::new("/definitely/not/here/system_prompt.txt");
        match source.load() {
            Err(ExperimentError::MissingPrecondition(msg)) => assert!(msg.contains("not found")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn file_contents_are_trimmed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "\n  너는 리리스다.  \n").unwrap();
        let prompt = FileSystemPrompt::new(file.path()).load().unwrap();
        assert_eq!(prompt, "너는 리리스다.");
    }

    #[test]
    fn blank_prompts_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "   ").unwrap();
        assert!(FileSystemPrompt::new(file.path()).load().is_err());
        assert!(StaticSystemPrompt::new(" \n").load().is_err());
        assert_eq!(StaticSystemPrompt::new(" hi ").load().unwrap(), "hi");
    }
}
