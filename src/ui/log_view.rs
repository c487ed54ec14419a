use crate::backend::process::{LauncherEvent, OutputLevel};
use crate::constant::MAX_LOG_LINES;
use crate::style::{ERROR_TEXT, MUTED_TEXT};
use chrono::{DateTime, Local};
use egui::{RichText, Ui};
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq)]
pub struct LogLine {
    pub time: DateTime<Local>,
    pub level: OutputLevel,
    pub text: String,
}

/// Scrolling renderer log, capped at `MAX_LOG_LINES`
pub struct LogView {
    lines: VecDeque<LogLine>,
    follow: bool,
    errors_only: bool,
}

impl Default for LogView {
    fn default() -> Self {
        Self {
            lines: VecDeque::new(),
            follow: true,
            errors_only: false,
        }
    }
}

impl LogView {
    pub fn push(&mut self, level: OutputLevel, text: impl Into<String>) {
        if self.lines.len() >= MAX_LOG_LINES {
            self.lines.pop_front();
        }
        self.lines.push_back(LogLine {
            time: Local::now(),
            level,
            text: text.into(),
        });
    }

    pub fn push_event(&mut self, event: &LauncherEvent) {
        match event {
            LauncherEvent::Launched {
                wallpaper_id,
                command,
            } => {
                self.push(OutputLevel::Info, format!("Launching wallpaper: {}", wallpaper_id));
                self.push(OutputLevel::Info, format!("Command: {}", command));
            }
            LauncherEvent::Output { line, .. } => self.push(line.level, line.text.clone()),
            LauncherEvent::Finished {
                wallpaper_id,
                outcome,
            } => self.push(
                if outcome.is_success() {
                    OutputLevel::Info
                } else {
                    OutputLevel::Error
                },
                format!("Wallpaper {} finished ({})", wallpaper_id, outcome),
            ),
            LauncherEvent::Stopped { wallpaper_id } => {
                self.push(OutputLevel::Info, format!("Wallpaper {} stopped", wallpaper_id))
            }
            LauncherEvent::Error(message) => self.push(OutputLevel::Error, message.clone()),
        }
    }

    pub fn lines(&self) -> &VecDeque<LogLine> {
        &self.lines
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn show(&mut self, ui: &mut Ui) {
        ui.horizontal(|ui| {
            ui.label(RichText::new("Output").strong());
            ui.checkbox(&mut self.follow, "Follow");
            ui.checkbox(&mut self.errors_only, "Errors only");
            if ui.button("Copy").clicked() {
                let text = self
                    .lines
                    .iter()
                    .map(|l| format!("[{}] {}", l.time.format("%H:%M:%S"), l.text))
                    .collect::<Vec<_>>()
                    .join("\n");
                ui.ctx().copy_text(text);
            }
            if ui.button("Clear").clicked() {
                self.clear();
            }
        });
        ui.separator();

        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .stick_to_bottom(self.follow)
            .show(ui, |ui| {
                for line in &self.lines {
                    if self.errors_only && line.level != OutputLevel::Error {
                        continue;
                    }
                    let text = RichText::new(format!(
                        "[{}] {}",
                        line.time.format("%H:%M:%S"),
                        line.text
                    ))
                    .monospace()
                    .size(11.0);
                    let text = match line.level {
                        OutputLevel::Error => text.color(ERROR_TEXT),
                        OutputLevel::Log => text.color(MUTED_TEXT),
                        OutputLevel::Info => text,
                    };
                    ui.label(text);
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::process::{ExitOutcome, OutputLine, OutputStream};

    #[test]
    fn test_log_is_capped() {
        let mut log = LogView::default();
        for i in 0..MAX_LOG_LINES + 5 {
            log.push(OutputLevel::Info, format!("line {}", i));
        }
        assert_eq!(log.lines().len(), MAX_LOG_LINES);
        assert_eq!(log.lines().front().unwrap().text, "line 5");
    }

    #[test]
    fn test_push_event_levels() {
        let mut log = LogView::default();
        log.push_event(&LauncherEvent::Launched {
            wallpaper_id: "1".to_string(),
            command: "engine 1".to_string(),
        });
        log.push_event(&LauncherEvent::Output {
            wallpaper_id: "1".to_string(),
            line: OutputLine {
                stream: OutputStream::Stderr,
                level: OutputLevel::Error,
                text: "FATAL".to_string(),
            },
        });
        log.push_event(&LauncherEvent::Finished {
            wallpaper_id: "1".to_string(),
            outcome: ExitOutcome::Crashed(Some(11)),
        });

        let levels: Vec<OutputLevel> = log.lines().iter().map(|l| l.level).collect();
        assert_eq!(
            levels,
            vec![
                OutputLevel::Info,
                OutputLevel::Info,
                OutputLevel::Error,
                OutputLevel::Error
            ]
        );
        assert_eq!(log.lines()[1].text, "Command: engine 1");
    }
}
