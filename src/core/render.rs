//! Renderers for cycle outputs

use std::io::Write;
use tokio::sync::broadcast;
use crate::core::Renderer;
use crate::types::CycleOutput;

/// How a terminal renderer formats each line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// ANSI colors
    Terminal,
    /// key=value, no colors
    Parseable,
    /// One JSON object per line
    JsonLines,
}

/// Writes one line per cycle
pub struct TerminalRenderer<W: Write> {
    out: W,
    format: OutputFormat,
}

impl TerminalRenderer<std::io::Stdout> {
    pub fn stdout(format: OutputFormat) -> Self {
        Self::new(std::io::stdout(), format)
    }
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self { out, format }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&self, output: &CycleOutput) -> String {
        match self.format {
            OutputFormat::Terminal => output.to_terminal_string(),
            OutputFormat::Parseable => output.to_parseable_string(),
            OutputFormat::JsonLines => serde_json::to_string(output).unwrap_or_default(),
        }
    }
}

impl<W: Write> Renderer for TerminalRenderer<W> {
    fn render(&mut self, output: &CycleOutput) {
        let line = self.line(output);
        if let Err(e) = writeln!(self.out, "{}", line) {
            tracing::warn!(error = %e, "failed to write cycle output");
        }
    }
}

/// Collects outputs in memory
impl Renderer for Vec<CycleOutput> {
    fn render(&mut self, output: &CycleOutput) {
        self.push(output.clone());
    }
}

/// Publishes outputs to live subscribers (WebSocket clients)
#[derive(Debug, Clone)]
pub struct BroadcastRenderer {
    tx: broadcast::Sender<CycleOutput>,
}

impl BroadcastRenderer {
    pub fn new(tx: broadcast::Sender<CycleOutput>) -> Self {
        Self { tx }
    }
}

impl Renderer for BroadcastRenderer {
    fn render(&mut self, output: &CycleOutput) {
        // No subscribers is not an error.
        let _ = self.tx.send(output.clone());
    }
}

/// Renders to two sinks in order
pub struct Tee<A: Renderer, B: Renderer>(pub A, pub B);

impl<A: Renderer, B: Renderer> Renderer for Tee<A, B> {
    fn render(&mut self, output: &CycleOutput) {
        self.0.render(output);
        self.1.render(output);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ReasonCode, PLACEHOLDER_TEXT};

    #[test]
    fn test_parseable_placeholder_line() {
        let mut renderer = TerminalRenderer::new(Vec::new(), OutputFormat::Parseable);
        renderer.render(&CycleOutput::degraded(7, ReasonCode::R102_LANDMARKS_UNAVAILABLE, "no face"));
        let text = String::from_utf8(renderer.into_inner()).unwrap();
        assert!(text.contains("cycle=7"));
        assert!(text.contains(PLACEHOLDER_TEXT));
        assert!(text.contains("R102_LANDMARKS_UNAVAILABLE"));
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn test_json_lines_are_valid() {
        let mut renderer = TerminalRenderer::new(Vec::new(), OutputFormat::JsonLines);
        renderer.render(&CycleOutput::degraded(1, ReasonCode::R103_EMOTION_UNAVAILABLE, "timeout"));
        let text = String::from_utf8(renderer.into_inner()).unwrap();
        let value: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(value["kind"], "degraded");
        assert_eq!(value["reason"], "R103_EMOTION_UNAVAILABLE");
    }

    #[test]
    fn test_broadcast_renderer_delivers() {
        let (tx, mut rx) = broadcast::channel(4);
        let mut renderer = BroadcastRenderer::new(tx);
        renderer.render(&CycleOutput::degraded(2, ReasonCode::R103_EMOTION_UNAVAILABLE, "x"));
        assert_eq!(rx.try_recv().unwrap().cycle(), 2);
    }

    #[test]
    fn test_tee_renders_both() {
        let mut tee = Tee(Vec::new(), Vec::new());
        tee.render(&CycleOutput::degraded(3, ReasonCode::R103_EMOTION_UNAVAILABLE, "x"));
        assert_eq!(tee.0.len(), 1);
        assert_eq!(tee.1.len(), 1);
    }
}
