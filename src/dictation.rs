//! Continuous dictation: one recognition session at a time, whose finalized
//! segments are appended to the document as new paragraphs.
//!
//! The recognizer runs on its own execution context and reports through a
//! channel. [`DictationController::pump`] drains that channel on the thread
//! that owns the [`NoteEditor`], which is the only place the document is
//! mutated.

use std::collections::HashSet;
use std::env;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use tracing::{debug, info, trace, warn};

use crate::editor::NoteEditor;
use crate::error::{EditorError, Result};

mod command;

pub use command::CommandBackend;

pub type SessionId = u64;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecognizerInfo {
    pub name: String,
    /// BCP 47 style tag such as `en-US`; `None` for a locale-agnostic engine.
    pub locale: Option<String>,
}

/// Parameters for a continuous, open-vocabulary dictation session on the
/// default audio input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionRequest {
    pub session: SessionId,
    pub recognizer: RecognizerInfo,
}

#[derive(Clone, Debug, PartialEq)]
pub enum RecognitionEvent {
    /// A partial guess that may still change. Never committed.
    Hypothesis { session: SessionId, text: String },
    /// A finalized utterance.
    Recognized {
        session: SessionId,
        text: String,
        confidence: Option<f32>,
    },
    /// The session has fully stopped and will send nothing else.
    Stopped { session: SessionId },
}

/// Handle to a running recognition session.
pub trait RecognitionSession {
    /// Asks the session to wind down. Segments already in flight may still
    /// arrive before its `Stopped` event.
    fn request_stop(&mut self);
}

/// The audio/recognition collaborator.
pub trait SpeechBackend {
    fn installed_recognizers(&self) -> Vec<RecognizerInfo>;

    fn has_default_input(&self) -> bool;

    /// Starts a session that reports through `events` until stopped.
    fn begin(
        &mut self,
        request: SessionRequest,
        events: Sender<RecognitionEvent>,
    ) -> Result<Box<dyn RecognitionSession>>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DictationState {
    Stopped,
    Listening,
}

pub struct DictationController<B: SpeechBackend> {
    backend: B,
    locale: Option<String>,
    state: DictationState,
    active: Option<(SessionId, Box<dyn RecognitionSession>)>,
    /// Sessions asked to stop that have not reported `Stopped` yet.
    draining: HashSet<SessionId>,
    next_session: SessionId,
    events_tx: Sender<RecognitionEvent>,
    events_rx: Receiver<RecognitionEvent>,
}

impl<B: SpeechBackend> DictationController<B> {
    /// Creates a stopped controller that prefers recognizers for `locale`.
    pub fn new(backend: B, locale: Option<String>) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            backend,
            locale,
            state: DictationState::Stopped,
            active: None,
            draining: HashSet::new(),
            next_session: 1,
            events_tx,
            events_rx,
        }
    }

    pub fn state(&self) -> DictationState {
        self.state
    }

    pub fn is_listening(&self) -> bool {
        self.state == DictationState::Listening
    }

    /// Begins listening. A no-op while already listening; on failure the
    /// controller stays stopped.
    pub fn start(&mut self) -> Result<()> {
        if self.state == DictationState::Listening {
            return Ok(());
        }
        if !self.backend.has_default_input() {
            return Err(EditorError::RecognitionUnavailable(
                "no audio input device".to_string(),
            ));
        }
        let recognizers = self.backend.installed_recognizers();
        let Some(recognizer) = choose_recognizer(&recognizers, self.locale.as_deref()) else {
            return Err(EditorError::RecognitionUnavailable(
                "no speech recognizer installed".to_string(),
            ));
        };

        let session = self.next_session;
        let request = SessionRequest {
            session,
            recognizer: recognizer.clone(),
        };
        let handle = self.backend.begin(request, self.events_tx.clone())?;
        self.next_session += 1;
        self.active = Some((session, handle));
        self.state = DictationState::Listening;
        info!(
            session,
            recognizer = recognizer.name.as_str(),
            locale = recognizer.locale.as_deref().unwrap_or("default"),
            "dictation started"
        );
        Ok(())
    }

    /// Requests the running session to stop. A no-op while stopped.
    pub fn stop(&mut self) {
        if self.state == DictationState::Stopped {
            return;
        }
        if let Some((session, mut handle)) = self.active.take() {
            handle.request_stop();
            self.draining.insert(session);
            info!(session, "dictation stop requested");
        }
        self.state = DictationState::Stopped;
    }

    /// Flips between listening and stopped; returns the new state.
    pub fn toggle(&mut self) -> Result<DictationState> {
        match self.state {
            DictationState::Stopped => self.start()?,
            DictationState::Listening => self.stop(),
        }
        Ok(self.state)
    }

    /// Applies every event received so far. Must run on the thread owning
    /// the editor. Returns the number of paragraphs appended.
    pub fn pump(&mut self, editor: &mut NoteEditor) -> usize {
        let mut appended = 0;
        loop {
            match self.events_rx.try_recv() {
                Ok(event) => {
                    if self.handle_event(event, editor) {
                        appended += 1;
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        appended
    }

    fn handle_event(&mut self, event: RecognitionEvent, editor: &mut NoteEditor) -> bool {
        match event {
            RecognitionEvent::Hypothesis { session, text } => {
                trace!(session, text = text.as_str(), "ignoring hypothesis");
                false
            }
            RecognitionEvent::Recognized {
                session,
                text,
                confidence,
            } => {
                if !self.accepts(session) {
                    debug!(session, "dropping segment from finished session");
                    return false;
                }
                // A paragraph may only be empty in an empty document.
                if text.is_empty() {
                    return false;
                }
                editor.append_paragraph(&text);
                debug!(
                    session,
                    chars = text.chars().count(),
                    ?confidence,
                    "appended dictated segment"
                );
                true
            }
            RecognitionEvent::Stopped { session } => {
                self.draining.remove(&session);
                if self.active.as_ref().is_some_and(|(id, _)| *id == session) {
                    warn!(session, "recognition session ended unexpectedly");
                    self.active = None;
                    self.state = DictationState::Stopped;
                } else {
                    info!(session, "dictation session stopped");
                }
                false
            }
        }
    }

    fn accepts(&self, session: SessionId) -> bool {
        self.active.as_ref().is_some_and(|(id, _)| *id == session)
            || self.draining.contains(&session)
    }
}

impl<B: SpeechBackend> Drop for DictationController<B> {
    fn drop(&mut self) {
        if let Some((_, mut handle)) = self.active.take() {
            handle.request_stop();
        }
    }
}

/// Picks the recognizer for `locale`: an exact match, then a match on the
/// language alone, then the first installed engine.
pub fn choose_recognizer<'a>(
    recognizers: &'a [RecognizerInfo],
    locale: Option<&str>,
) -> Option<&'a RecognizerInfo> {
    if let Some(locale) = locale.map(normalize_locale) {
        let exact = recognizers.iter().find(|r| {
            r.locale
                .as_deref()
                .is_some_and(|l| normalize_locale(l).eq_ignore_ascii_case(&locale))
        });
        if exact.is_some() {
            return exact;
        }
        let language = language_of(&locale);
        let by_language = recognizers.iter().find(|r| {
            r.locale
                .as_deref()
                .is_some_and(|l| language_of(&normalize_locale(l)).eq_ignore_ascii_case(language))
        });
        if by_language.is_some() {
            return by_language;
        }
    }
    recognizers.first()
}

/// Turns POSIX locale names like `en_US.UTF-8` into `en-US`.
pub fn normalize_locale(raw: &str) -> String {
    let base = raw.split(['.', '@']).next().unwrap_or(raw);
    base.replace('_', "-")
}

fn language_of(locale: &str) -> &str {
    locale.split('-').next().unwrap_or(locale)
}

/// The user's locale from `LC_ALL`, `LC_MESSAGES` or `LANG`.
pub fn active_locale() -> Option<String> {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .filter_map(|key| env::var(key).ok())
        .find(|value| !value.is_empty())
        .filter(|value| value != "C" && value != "POSIX")
        .map(|value| normalize_locale(&value))
}
