use console::{Term, style};
use indicatif::{ProgressBar, ProgressStyle};

/// Informational line on stderr, for commands whose stdout carries rendered output.
pub fn note(text: &str) {
    eprintln!("{}", style(text).for_stderr().dim());
}

pub fn warn(text: &str) {
    eprintln!("{}", style(text).for_stderr().yellow());
}

pub fn error(text: &str) {
    eprintln!("{}", style(text).for_stderr().red());
}

pub fn spinner(message: &str) -> ProgressBar {
    let pb = if Term::stderr().is_term() {
        ProgressBar::new_spinner()
    } else {
        ProgressBar::hidden()
    };
    pb.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
