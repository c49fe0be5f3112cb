//! mut - Prints a source file with syntax and semantic colors.
//!
//! Usage: mut [OPTIONS] FILE

use clap::Parser;
use mut_core::{Color, ConfigError, EditorConfig, EvictionPolicy, RenderLine, TextEditor};
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(name = "mut")]
#[command(about = "Print a source file with syntax and semantic colors")]
#[command(version)]
/// Command-line arguments.
struct Cli {
    /// File to open
    file: PathBuf,

    /// Cache eviction policy (clear-all or lru)
    #[arg(long, default_value_t = EvictionPolicy::ClearAll, conflicts_with = "lru")]
    eviction: EvictionPolicy,

    /// Shorthand for --eviction lru
    #[arg(long)]
    lru: bool,

    /// Number of lines to print
    #[arg(long, default_value_t = 40)]
    lines: usize,

    /// Number of columns to print
    #[arg(long, default_value_t = 120)]
    columns: usize,

    /// How long to wait for highlighting to finish, in milliseconds
    #[arg(long = "wait-ms", default_value_t = 5000)]
    wait_ms: u64,

    /// Print text without colors
    #[arg(long)]
    plain: bool,
}

impl Cli {
    fn config(&self) -> Result<EditorConfig, ConfigError> {
        let eviction = if self.lru { EvictionPolicy::Lru } else { self.eviction };
        let config = EditorConfig::default().with_eviction(eviction);
        config.validate()?;
        Ok(config)
    }
}

fn rgb(color: Color) -> (u8, u8, u8) {
    let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    (channel(color[0]), channel(color[1]), channel(color[2]))
}

/// Renders the visible columns of one line with 24-bit ANSI colors.
fn paint(line: &RenderLine, first_column: usize, column_count: usize, foreground: Color) -> String {
    let chars: Vec<char> = line.text.chars().collect();
    let mut colors = vec![foreground; chars.len()];
    for span in &line.spans {
        let end = (span.column + span.length).min(colors.len());
        for color in &mut colors[span.column.min(end)..end] {
            *color = span.color;
        }
    }

    let end = (first_column + column_count).min(chars.len());
    let start = first_column.min(end);
    let mut out = String::new();
    let mut current = None;
    for (ch, color) in chars[start..end].iter().zip(&colors[start..end]) {
        let color = rgb(*color);
        if current != Some(color) {
            out.push_str(&format!("\x1b[38;2;{};{};{}m", color.0, color.1, color.2));
            current = Some(color);
        }
        out.push(*ch);
    }
    out.push_str("\x1b[0m");
    out
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = match cli.config() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let mut editor = match TextEditor::open(&cli.file, config) {
        Ok(editor) => editor,
        Err(e) => {
            log::error!("Failed to open file '{}': {}", cli.file.display(), e);
            return ExitCode::FAILURE;
        }
    };
    log::info!(
        "Opened {} ({} lines, {})",
        cli.file.display(),
        editor.line_count(),
        editor.language().name()
    );
    editor.set_viewport(0, cli.lines, 0, cli.columns);

    let wait = Duration::from_millis(cli.wait_ms);
    let deadline = Instant::now() + wait;
    editor.render_tick();
    while !editor.is_idle() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
        editor.render_tick();
    }
    // draw whatever the last poll applied
    let lines = editor.render_tick();
    if !editor.is_idle() {
        log::warn!("background work still running after {wait:?}");
    }

    let foreground = editor.theme().foreground;
    for line in &lines {
        if cli.plain {
            println!("{}", line.text);
        } else {
            println!("{}", paint(line, 0, cli.columns, foreground));
        }
    }

    log::info!("highlight: {}", editor.highlight_stats());
    log::info!("semantic: {}", editor.semantic_stats());
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use mut_core::{RenderSpan, TokenKind};

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_options() {
        let cli = Cli::try_parse_from(["mut", "--eviction", "lru", "--lines", "5", "main.c"]).unwrap();
        assert_eq!(cli.file, PathBuf::from("main.c"));
        assert_eq!(cli.lines, 5);
        assert_eq!(cli.columns, 120);
        assert_eq!(cli.config().unwrap().eviction, EvictionPolicy::Lru);
        assert!(!cli.plain);

        let cli = Cli::try_parse_from(["mut", "--lru", "--plain", "a.cpp"]).unwrap();
        assert_eq!(cli.config().unwrap().eviction, EvictionPolicy::Lru);
        assert!(cli.plain);

        let cli = Cli::try_parse_from(["mut", "a.cpp"]).unwrap();
        assert_eq!(cli.config().unwrap().eviction, EvictionPolicy::ClearAll);
        assert_eq!(cli.wait_ms, 5000);
    }

    #[test]
    fn test_rejects_bad_options() {
        assert!(Cli::try_parse_from(["mut", "--lines", "many", "main.c"]).is_err());
        assert!(Cli::try_parse_from(["mut", "--eviction", "fifo", "main.c"]).is_err());
        assert!(Cli::try_parse_from(["mut", "--lru", "--eviction", "lru", "main.c"]).is_err());
        assert!(Cli::try_parse_from(["mut"]).is_err());
    }

    #[test]
    fn test_paint_clips_and_colors() {
        let red = [1.0, 0.0, 0.0, 1.0];
        let line = RenderLine {
            line: 0,
            text: "int x;".to_string(),
            spans: vec![RenderSpan {
                column: 0,
                length: 3,
                kind: TokenKind::PrimitiveType,
                color: red,
                symbol: None,
            }],
        };
        let painted = paint(&line, 0, 4, [1.0; 4]);
        assert_eq!(
            painted,
            "\x1b[38;2;255;0;0mint\x1b[38;2;255;255;255m \x1b[0m"
        );
    }
}
