use std::io::{BufRead, BufReader};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread;

use tracing::{debug, warn};

use super::{
    RecognitionEvent, RecognitionSession, RecognizerInfo, SessionId, SessionRequest, SpeechBackend,
};
use crate::error::{EditorError, Result};

/// Runs an external recognizer program and reads its results from stdout.
///
/// The program owns the audio device. Each stdout line is one event:
/// `partial: <text>` is a hypothesis, `final: <text>` or any other non-empty
/// line is a finalized segment. The session ends when stdout closes.
/// The requested locale is passed in `DICTAPAD_LOCALE`.
#[derive(Clone, Debug, Default)]
pub struct CommandBackend {
    command: Option<String>,
    locales: Vec<String>,
}

impl CommandBackend {
    pub fn new(command: Option<String>, locales: Vec<String>) -> Self {
        Self {
            command: command.filter(|c| !c.trim().is_empty()),
            locales,
        }
    }

    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }
}

impl SpeechBackend for CommandBackend {
    fn installed_recognizers(&self) -> Vec<RecognizerInfo> {
        let Some(command) = &self.command else {
            return Vec::new();
        };
        let name = command.split_whitespace().next().unwrap_or(command).to_string();
        if self.locales.is_empty() {
            return vec![RecognizerInfo { name, locale: None }];
        }
        self.locales
            .iter()
            .map(|locale| RecognizerInfo {
                name: name.clone(),
                locale: Some(locale.clone()),
            })
            .collect()
    }

    fn has_default_input(&self) -> bool {
        self.command.is_some()
    }

    fn begin(
        &mut self,
        request: SessionRequest,
        events: Sender<RecognitionEvent>,
    ) -> Result<Box<dyn RecognitionSession>> {
        let command = self.command.as_deref().ok_or_else(|| {
            EditorError::RecognitionUnavailable("no recognizer command configured".to_string())
        })?;
        let mut parts = command.split_whitespace();
        let program = parts.next().ok_or_else(|| {
            EditorError::RecognitionUnavailable("no recognizer command configured".to_string())
        })?;

        let mut child = Command::new(program)
            .args(parts)
            .env(
                "DICTAPAD_LOCALE",
                request.recognizer.locale.as_deref().unwrap_or(""),
            )
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| {
                EditorError::RecognitionUnavailable(format!("failed to start `{program}`: {err}"))
            })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            EditorError::RecognitionUnavailable("recognizer has no output stream".to_string())
        })?;
        let child = Arc::new(Mutex::new(child));
        let session = request.session;
        let reader_child = Arc::clone(&child);

        thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(err) => {
                        warn!(session, %err, "failed reading recognizer output");
                        break;
                    }
                };
                if let Some(event) = parse_line(session, &line) {
                    if events.send(event).is_err() {
                        break;
                    }
                }
            }
            let _ = events.send(RecognitionEvent::Stopped { session });
            reap(session, &reader_child);
        });

        Ok(Box::new(CommandSession { session, child }))
    }
}

struct CommandSession {
    session: SessionId,
    child: Arc<Mutex<Child>>,
}

impl RecognitionSession for CommandSession {
    fn request_stop(&mut self) {
        let Ok(mut child) = self.child.lock() else {
            return;
        };
        if let Err(err) = child.kill() {
            debug!(session = self.session, %err, "recognizer already gone");
        }
    }
}

/// Collects the exit status once output has closed. A recognizer that keeps
/// running without output is killed; the lock is never held across a
/// blocking wait.
fn reap(session: SessionId, child: &Mutex<Child>) {
    let Ok(mut child) = child.lock() else {
        return;
    };
    match child.try_wait() {
        Ok(Some(status)) => {
            debug!(session, %status, "recognizer exited");
            return;
        }
        Ok(None) => {
            debug!(session, "recognizer closed its output, stopping it");
            if let Err(err) = child.kill() {
                debug!(session, %err, "recognizer already gone");
            }
        }
        Err(err) => {
            warn!(session, %err, "failed checking recognizer status");
            return;
        }
    }
    match child.wait() {
        Ok(status) => debug!(session, %status, "recognizer exited"),
        Err(err) => warn!(session, %err, "failed waiting for recognizer"),
    }
}

fn parse_line(session: SessionId, line: &str) -> Option<RecognitionEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if let Some(text) = line.strip_prefix("partial:") {
        return Some(RecognitionEvent::Hypothesis {
            session,
            text: text.trim().to_string(),
        });
    }
    let text = line.strip_prefix("final:").unwrap_or(line).trim();
    if text.is_empty() {
        return None;
    }
    Some(RecognitionEvent::Recognized {
        session,
        text: text.to_string(),
        confidence: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn parse_line_distinguishes_partial_and_final() {
        assert_eq!(
            parse_line(3, "partial: hel"),
            Some(RecognitionEvent::Hypothesis {
                session: 3,
                text: "hel".to_string()
            })
        );
        assert_eq!(
            parse_line(3, "final: hello there"),
            Some(RecognitionEvent::Recognized {
                session: 3,
                text: "hello there".to_string(),
                confidence: None,
            })
        );
        assert_eq!(
            parse_line(3, "plain words"),
            Some(RecognitionEvent::Recognized {
                session: 3,
                text: "plain words".to_string(),
                confidence: None,
            })
        );
        assert_eq!(parse_line(3, "   "), None);
        assert_eq!(parse_line(3, "final:"), None);
    }

    #[test]
    fn without_command_nothing_is_installed() {
        let backend = CommandBackend::new(None, vec!["en-US".to_string()]);
        assert!(backend.installed_recognizers().is_empty());
        assert!(!backend.has_default_input());

        let blank = CommandBackend::new(Some("  ".to_string()), Vec::new());
        assert!(blank.command().is_none());
    }

    #[test]
    fn recognizers_follow_configured_locales() {
        let backend = CommandBackend::new(
            Some("recognize --model small".to_string()),
            vec!["en-US".to_string(), "de-DE".to_string()],
        );
        let recognizers = backend.installed_recognizers();
        assert_eq!(recognizers.len(), 2);
        assert_eq!(recognizers[0].name, "recognize");
        assert_eq!(recognizers[1].locale.as_deref(), Some("de-DE"));
    }

    #[cfg(unix)]
    #[test]
    fn echo_command_produces_segment_then_stops() {
        let mut backend = CommandBackend::new(Some("echo dictated words".to_string()), Vec::new());
        let (tx, rx) = mpsc::channel();
        let recognizer = backend.installed_recognizers().remove(0);
        let _session = backend
            .begin(SessionRequest { session: 7, recognizer }, tx)
            .unwrap();

        let first = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(
            first,
            RecognitionEvent::Recognized {
                session: 7,
                text: "dictated words".to_string(),
                confidence: None,
            }
        );
        let second = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(second, RecognitionEvent::Stopped { session: 7 });
    }

    #[cfg(unix)]
    #[test]
    fn recognizer_that_closes_output_is_stopped_without_blocking() {
        let script = std::env::temp_dir().join(format!(
            "dictapad-silent-recognizer-{}.sh",
            std::process::id()
        ));
        std::fs::write(&script, "exec >&-\nsleep 30\n").unwrap();
        let mut backend =
            CommandBackend::new(Some(format!("sh {}", script.display())), Vec::new());
        let (tx, rx) = mpsc::channel();
        let recognizer = backend.installed_recognizers().remove(0);
        let mut session = backend
            .begin(SessionRequest { session: 4, recognizer }, tx)
            .unwrap();

        let event = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(event, RecognitionEvent::Stopped { session: 4 });

        let started = std::time::Instant::now();
        session.request_stop();
        assert!(started.elapsed() < Duration::from_secs(5));
        let _ = std::fs::remove_file(&script);
    }

    #[test]
    fn missing_program_is_unavailable() {
        let mut backend = CommandBackend::new(
            Some("dictapad-no-such-recognizer-binary".to_string()),
            Vec::new(),
        );
        let (tx, _rx) = mpsc::channel();
        let recognizer = backend.installed_recognizers().remove(0);
        let result = backend.begin(SessionRequest { session: 1, recognizer }, tx);
        assert!(matches!(result, Err(EditorError::RecognitionUnavailable(_))));
    }
}
