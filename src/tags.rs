//! Batch reads over a list of tags, one read command per tag.

use std::path::Path;
use tracing::{debug, warn};

use crate::client::RegisterTransport;
use crate::command::ReadRequest;
use crate::error::CommandError;
use crate::interpreter::read_values;

/// Marker written in place of a value when a tag could not be read.
pub const ERROR_MARKER: &str = "!ERROR!";

/// Reads every non-blank tag in order, producing one `<tag>=<value>` line each.
/// A failing tag yields `<tag>=!ERROR!` and never stops the rest of the batch.
pub async fn read_tags<'a, T, I>(transport: &mut T, tags: I) -> Vec<String>
where
    T: RegisterTransport,
    I: IntoIterator<Item = &'a str>,
{
    let mut lines = Vec::new();
    for tag in tags.into_iter().map(str::trim).filter(|t| !t.is_empty()) {
        let value = match ReadRequest::parse(tag) {
            Ok(request) => read_values(transport, &request).await.map_err(CommandError::from),
            Err(e) => Err(e),
        };
        match value {
            Ok(value) => lines.push(format!("{tag}={value}")),
            Err(e) => {
                warn!(tag, error = %e, "tag read failed");
                lines.push(format!("{tag}={ERROR_MARKER}"));
            }
        }
    }
    lines
}

/// Reads the tags listed in `input`. With an `output` path the results are
/// written there (newline joined) and an empty list is returned; otherwise the
/// result lines are returned for printing.
pub async fn read_tag_file<T: RegisterTransport>(
    transport: &mut T,
    input: &Path,
    output: Option<&Path>,
) -> Result<Vec<String>, CommandError> {
    let contents = tokio::fs::read_to_string(input)
        .await
        .map_err(|source| CommandError::File {
            path: input.to_path_buf(),
            source,
        })?;
    let lines = read_tags(transport, contents.lines()).await;
    debug!(input = %input.display(), tags = lines.len(), "tag file processed");

    match output {
        Some(path) => {
            tokio::fs::write(path, lines.join("\n"))
                .await
                .map_err(|source| CommandError::File {
                    path: path.to_path_buf(),
                    source,
                })?;
            Ok(Vec::new())
        }
        None => Ok(lines),
    }
}
