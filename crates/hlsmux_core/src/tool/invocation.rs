//! A single external tool command line.

use std::path::{Path, PathBuf};

use crate::source::SourceUrl;

/// One invocation of the media tool.
///
/// `args` holds the real arguments. Arguments added with
/// [`ToolInvocation::source`] are swapped for their redacted form in
/// [`ToolInvocation::display_args`], so commands can be logged without
/// leaking playlist tokens.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    /// Short label of the pipeline operation ("download", "audio", "mux").
    pub label: String,
    /// Executable to run.
    pub program: PathBuf,
    /// Arguments passed to the executable.
    pub args: Vec<String>,
    /// (index into `args`, replacement shown in logs)
    redactions: Vec<(usize, String)>,
}

impl ToolInvocation {
    pub fn new(label: impl Into<String>, program: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            program: program.into(),
            args: Vec::new(),
            redactions: Vec::new(),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append a filesystem path argument.
    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy().into_owned())
    }

    /// Append the playlist URL; logged in redacted form.
    pub fn source(mut self, source: &SourceUrl) -> Self {
        self.redactions.push((self.args.len(), source.redacted()));
        self.args.push(source.as_str().to_string());
        self
    }

    /// Arguments with secrets replaced.
    pub fn display_args(&self) -> Vec<String> {
        let mut shown = self.args.clone();
        for (index, replacement) in &self.redactions {
            if let Some(arg) = shown.get_mut(*index) {
                *arg = replacement.clone();
            }
        }
        shown
    }

    /// Program name for display.
    pub fn display_program(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    /// Full command line for display, secrets replaced.
    pub fn display(&self) -> String {
        let mut line = self.display_program();
        for arg in self.display_args() {
            line.push(' ');
            line.push_str(&arg);
        }
        line
    }

    /// Whether `value` appears verbatim among the arguments.
    pub fn has_arg(&self, value: &str) -> bool {
        self.args.iter().any(|a| a == value)
    }
}
