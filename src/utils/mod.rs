/// Outcome of an operation whose failure must not abort the caller
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BestEffort<T> {
    Done(T),
    Skipped,
    Failed(String),
}

/// Elapsed time for log lines: `850ms`, `12.4s`, `3m 07s`, `1h 02m`
pub fn format_duration(seconds: f64) -> String {
    if seconds < 1.0 {
        return format!("{}ms", (seconds.max(0.0) * 1000.0).round() as u64);
    }
    if seconds < 60.0 {
        return format!("{:.1}s", seconds);
    }

    let total = seconds as u64;
    match total / 3600 {
        0 => format!("{}m {:02}s", total / 60, total % 60),
        hours => format!("{}h {:02}m", hours, (total % 3600) / 60),
    }
}

/// Longest file stem produced from a video title
const MAX_STEM_LEN: usize = 100;

/// File stem derived from a video title.
///
/// Path separators and shell-hostile characters become `_`, runs of whitespace
/// collapse to one space, and the result is capped at a sane length.
pub fn sanitize_filename(title: &str) -> String {
    let cleaned = title
        .chars()
        .map(|c| match c {
            c if c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ' ') => c,
            c if c.is_whitespace() => ' ',
            _ => '_',
        })
        .collect::<String>();

    cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches('.')
        .chars()
        .take(MAX_STEM_LEN)
        .collect::<String>()
        .trim()
        .to_string()
}

/// Check if the current environment has required tools
pub async fn check_dependencies(speech_cli: Option<&str>) -> Vec<String> {
    let mut missing = Vec::new();

    if !check_command_available("yt-dlp", "--version").await {
        missing.push("yt-dlp - required for captions and audio download".to_string());
    }

    if !check_command_available("ffmpeg", "-version").await {
        missing.push("ffmpeg - required for audio decoding and mp3 copies".to_string());
    }

    if let Some(command) = speech_cli {
        if !check_command_available(command, "--help").await {
            missing.push(format!("{} - required for speech-to-text", command));
        }
    }

    missing
}

/// Check if a command is available in PATH
async fn check_command_available(command: &str, probe_arg: &str) -> bool {
    use tokio::process::Command;

    Command::new(command)
        .arg(probe_arg)
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}
