//! Runs an external process against a document

use std::path::Path;
use std::process::{ExitStatus, Stdio};

use bytes::Bytes;
use tempfile::TempPath;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStdin, Command};
use tracing::{debug, instrument, warn};

use super::command::{build_argv, Bindings};
use super::metadata_io::{read_metadata, write_metadata};
use crate::domain::document::{ContentFactory, DocumentContent};
use crate::domain::extraction::FieldExtraction;
use crate::domain::metadata::Metadata;
use crate::domain::process::{ExternalProcessConfig, Placeholder};
use crate::domain::ImporterError;

/// Everything captured from one process run
#[derive(Debug)]
pub struct ProcessOutput {
    /// Exit code, `None` when terminated by a signal
    pub exit_code: Option<i32>,
    pub success: bool,
    /// Output file content when `${OUTPUT}` is used, stdout otherwise
    pub content: DocumentContent,
    pub stderr: Bytes,
    /// Fields from stdout, stderr and the output metadata file, in that order
    pub metadata: Metadata,
    /// Extraction rules that could not be applied
    pub extraction_errors: Vec<ImporterError>,
}

impl ProcessOutput {
    /// Turn an unsuccessful exit into an error when configured to
    pub fn check_exit(&self, config: &ExternalProcessConfig) -> Result<(), ImporterError> {
        if self.success {
            return Ok(());
        }

        if config.fail_on_non_zero_exit {
            return Err(ImporterError::process_exit(&config.command, self.exit_code));
        }

        warn!(
            command = %config.command,
            exit_code = ?self.exit_code,
            "External process exited unsuccessfully, keeping its output"
        );
        Ok(())
    }
}

/// Temp files reserved for one invocation, removed on drop
#[derive(Default)]
struct TempFiles {
    input: Option<TempPath>,
    output: Option<TempPath>,
    input_meta: Option<TempPath>,
    output_meta: Option<TempPath>,
}

/// Launches a configured external program
#[derive(Debug, Clone)]
pub struct ExternalProcessRunner {
    config: ExternalProcessConfig,
    factory: ContentFactory,
}

impl ExternalProcessRunner {
    pub fn new(config: ExternalProcessConfig, factory: ContentFactory) -> Self {
        Self { config, factory }
    }

    pub fn config(&self) -> &ExternalProcessConfig {
        &self.config
    }

    /// Run the process with the document's content and metadata
    ///
    /// Dropping the returned future kills the process.
    #[instrument(skip_all, fields(reference = %reference, command = %self.config.command))]
    pub async fn run(
        &self,
        reference: &str,
        content: &DocumentContent,
        metadata: &Metadata,
    ) -> Result<ProcessOutput, ImporterError> {
        let files = self.prepare_files(reference, content, metadata).await?;
        let bindings = bind(reference, &files);

        let argv = build_argv(&self.config.command, &bindings)?;
        let mut command = Command::new(&argv[0]);
        command
            .args(&argv[1..])
            .envs(
                self.config
                    .environment
                    .iter()
                    .map(|(key, value)| (key, bindings.resolve(value))),
            )
            .stdin(if files.input.is_some() {
                Stdio::null()
            } else {
                Stdio::piped()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(program = %argv[0], args = argv.len() - 1, "Launching external process");

        let mut child = command
            .spawn()
            .map_err(|e| ImporterError::process_launch(&self.config.command, e.to_string()))?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let io = async {
            let (written, out, err) =
                tokio::join!(feed_stdin(stdin, content), drain(stdout), drain(stderr));
            let status = child.wait().await?;
            written?;
            Ok::<(ExitStatus, Vec<u8>, Vec<u8>), std::io::Error>((status, out?, err?))
        };

        let captured = match self.config.timeout() {
            Some(limit) => {
                let outcome = tokio::time::timeout(limit, io).await;
                match outcome {
                    Ok(result) => result,
                    Err(_) => {
                        warn!(timeout_ms = limit.as_millis() as u64, "External process timed out");
                        if let Err(e) = child.kill().await {
                            debug!(error = %e, "Could not kill timed out process");
                        }
                        return Err(ImporterError::process_timeout(
                            &self.config.command,
                            limit.as_millis() as u64,
                        ));
                    }
                }
            }
            None => io.await,
        };
        let (status, stdout, stderr) = captured?;

        debug!(
            exit_code = ?status.code(),
            stdout_bytes = stdout.len(),
            stderr_bytes = stderr.len(),
            "External process finished"
        );

        let mut extraction = FieldExtraction::default();
        let rules = &self.config.metadata_extraction_patterns;
        if !rules.is_empty() {
            extraction.extend(rules.extract(&String::from_utf8_lossy(&stdout)));
            extraction.extend(rules.extract(&String::from_utf8_lossy(&stderr)));
        }

        let mut extracted = Metadata::new();
        extraction.apply_to(&mut extracted);

        if let Some(ref path) = files.output_meta {
            let text = read_optional(path).await?;
            let from_file = read_metadata(
                &String::from_utf8_lossy(&text),
                self.config.metadata_output_format,
            )?;
            extracted.merge(from_file);
        }

        let content = match files.output {
            Some(ref path) => self.factory.create(read_optional(path).await?).await?,
            None => self.factory.create(stdout).await?,
        };

        Ok(ProcessOutput {
            exit_code: status.code(),
            success: status.success(),
            content,
            stderr: Bytes::from(stderr),
            metadata: extracted,
            extraction_errors: extraction.errors,
        })
    }

    /// Reserve temp files for the placeholders in use
    async fn prepare_files(
        &self,
        reference: &str,
        content: &DocumentContent,
        metadata: &Metadata,
    ) -> Result<TempFiles, ImporterError> {
        let mut files = TempFiles::default();

        if self.config.uses(Placeholder::Input) {
            let path = self.factory.temp_path("input", &extension_of(reference))?;
            content.write_to_path(&path).await?;
            files.input = Some(path);
        }

        if self.config.uses(Placeholder::InputMeta) {
            let path = self.factory.temp_path("input-meta", "")?;
            let text = write_metadata(metadata, self.config.metadata_input_format)?;
            tokio::fs::write(&path, text).await?;
            files.input_meta = Some(path);
        }

        if self.config.uses(Placeholder::Output) {
            files.output = Some(self.factory.temp_path("output", "")?);
        }

        if self.config.uses(Placeholder::OutputMeta) {
            files.output_meta = Some(self.factory.temp_path("output-meta", "")?);
        }

        Ok(files)
    }
}

fn bind(reference: &str, files: &TempFiles) -> Bindings {
    let mut bindings = Bindings::new();
    bindings.bind(Placeholder::Reference, reference);

    let paths = [
        (Placeholder::Input, &files.input),
        (Placeholder::Output, &files.output),
        (Placeholder::InputMeta, &files.input_meta),
        (Placeholder::OutputMeta, &files.output_meta),
    ];
    for (placeholder, path) in paths {
        if let Some(path) = path {
            bindings.bind(placeholder, path.display().to_string());
        }
    }
    bindings
}

/// Extension of the reference's last path segment, with the dot
fn extension_of(reference: &str) -> String {
    let path = reference.split(['?', '#']).next().unwrap_or(reference);
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);

    match name.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty() && !ext.is_empty() && ext.chars().all(char::is_alphanumeric) =>
        {
            format!(".{}", ext)
        }
        _ => String::new(),
    }
}

/// Read a file the process may not have written
async fn read_optional(path: &Path) -> Result<Vec<u8>, ImporterError> {
    match tokio::fs::read(path).await {
        Ok(data) => Ok(data),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

/// Write content to stdin and close it; a reader that stops early is fine
async fn feed_stdin(stdin: Option<ChildStdin>, content: &DocumentContent) -> std::io::Result<()> {
    let Some(mut stdin) = stdin else {
        return Ok(());
    };

    let written = match content.copy_to(&mut stdin).await {
        Ok(_) => stdin.shutdown().await,
        Err(e) => Err(e),
    };

    match written {
        Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => Err(e),
        _ => Ok(()),
    }
}

async fn drain<R: AsyncRead + Unpin>(reader: Option<R>) -> std::io::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    if let Some(mut reader) = reader {
        reader.read_to_end(&mut buffer).await?;
    }
    Ok(buffer)
}
