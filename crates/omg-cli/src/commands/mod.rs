pub mod codebase;
pub mod init;
pub mod inspect;
pub mod manifest;
pub mod scaffold;
pub mod skeleton;

use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar over `len` items named `unit`
pub(crate) fn progress_bar(len: usize, unit: &str) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    let template = format!(
        "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} {{msg}}",
        unit
    );
    if let Ok(style) = ProgressStyle::default_bar().template(&template) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}
