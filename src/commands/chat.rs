//! Interactive chat command implementation

use super::stream_answer;
use crate::config::Config;
use crate::error::Result;
use crate::fetch::is_remote;
use crate::pipeline::RetrievalPipeline;
use crate::progress::add_spinner;
use crate::store::VectorStore;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::warn;

const PROMPT: &str = "> ";

#[derive(Debug, Clone, Default, Serialize)]
pub struct ChatStats {
    pub chunks: usize,
    pub answered: usize,
    pub failed: usize,
}

/// Whether `source` names a saved store snapshot rather than a document
fn is_snapshot(source: &str) -> bool {
    !is_remote(source)
        && Path::new(source)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Load a snapshot or ingest a document, then answer questions read from
/// `input` until a line reading exactly `exit` (any case) or end of input.
///
/// A failed question is reported on `out` and the loop carries on.
pub async fn cmd_chat<R, W>(
    config: &Config,
    source: &str,
    mut input: R,
    out: &mut W,
) -> Result<ChatStats>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let pipeline = RetrievalPipeline::from_config(config)?;

    let store = if is_snapshot(source) {
        VectorStore::load(Path::new(source))?
    } else {
        let spinner = add_spinner(format!("Ingesting {}", source));
        let result = pipeline.ingest(source).await;
        spinner.finish_and_clear();
        result?
    };

    let mut stats = ChatStats {
        chunks: store.len(),
        ..ChatStats::default()
    };
    writeln!(out, "Loaded {} chunks. Type 'exit' to quit.", stats.chunks)?;

    let mut line = String::new();
    loop {
        write!(out, "{}", PROMPT)?;
        out.flush()?;

        line.clear();
        if input.read_line(&mut line).await? == 0 {
            writeln!(out)?;
            break;
        }

        // Only the line terminator is dropped; " exit" is a question
        let question = line.trim_end_matches(|c| c == '\n' || c == '\r');
        if question.eq_ignore_ascii_case("exit") {
            break;
        }

        let answered = match pipeline.answer(question, &store).await {
            Ok(stream) => stream_answer(stream, out).await,
            Err(e) => Err(e),
        };
        match answered {
            Ok(_) => stats.answered += 1,
            Err(e) => {
                warn!("Question failed: {}", e);
                writeln!(out, "Error: {}", e)?;
                stats.failed += 1;
            }
        }
    }

    Ok(stats)
}
