use std::path::Path;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use futures_util::StreamExt;
use tokio::sync::mpsc;

use crate::application::{ChatSession, StreamEvent};
use crate::domain::DomainError;

use super::{ui, EventHandler, TerminalEvent, Tui};

type StreamMessage = Result<StreamEvent, DomainError>;

/// Interactive chat surface state.
///
/// The select loop in [`App::run`] is the single scheduling context: terminal
/// events and stream events arrive on channels and are applied one at a time,
/// each fully processed (session mutated, frame drawn) before the next is
/// awaited. The input surface rejects submissions while a response is open.
pub struct App {
    pub(crate) session: ChatSession,
    pub(crate) input: String,
    pub(crate) notice: Option<String>,
    pub(crate) scroll: u16,
    pub(crate) stick_to_bottom: bool,
    pub(crate) spinner_frame: u8,
    should_quit: bool,
}

impl App {
    pub fn new(session: ChatSession) -> Self {
        Self {
            session,
            input: String::new(),
            notice: None,
            scroll: 0,
            stick_to_bottom: true,
            spinner_frame: 0,
            should_quit: false,
        }
    }

    pub async fn run(mut self, terminal: &mut Tui) -> Result<()> {
        let mut events = EventHandler::new();
        let (stream_tx, mut stream_rx) = mpsc::unbounded_channel::<StreamMessage>();

        while !self.should_quit {
            terminal.draw(|frame| ui::render(frame, &mut self))?;

            tokio::select! {
                Some(event) = events.next() => {
                    self.handle_terminal_event(event, &stream_tx).await;
                }
                Some(event) = stream_rx.recv() => {
                    self.session.apply_event(event);
                    self.stick_to_bottom = true;
                }
            }
        }
        Ok(())
    }

    async fn handle_terminal_event(
        &mut self,
        event: TerminalEvent,
        stream_tx: &mpsc::UnboundedSender<StreamMessage>,
    ) {
        match event {
            TerminalEvent::Tick => {
                if self.session.is_awaiting() {
                    self.spinner_frame = self.spinner_frame.wrapping_add(1);
                }
            }
            TerminalEvent::Resize => self.stick_to_bottom = true,
            TerminalEvent::Key(key) => self.handle_key(key, stream_tx).await,
        }
    }

    async fn handle_key(&mut self, key: KeyEvent, stream_tx: &mpsc::UnboundedSender<StreamMessage>) {
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Enter => self.submit_line(stream_tx).await,
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Up => self.scroll_up(1),
            KeyCode::Down => self.scroll_down(1),
            KeyCode::PageUp => self.scroll_up(10),
            KeyCode::PageDown => self.scroll_down(10),
            KeyCode::Char(c) => self.input.push(c),
            _ => {}
        }
    }

    fn scroll_up(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_sub(lines);
        self.stick_to_bottom = false;
    }

    fn scroll_down(&mut self, lines: u16) {
        // Clamped against the rendered height on the next draw.
        self.scroll = self.scroll.saturating_add(lines);
    }

    async fn submit_line(&mut self, stream_tx: &mpsc::UnboundedSender<StreamMessage>) {
        let line = self.input.trim().to_string();

        if line == "/attach" {
            self.notice = Some("usage: /attach <path to .pdf>".to_string());
            self.input.clear();
            return;
        }
        if let Some(rest) = line.strip_prefix("/attach ") {
            self.handle_attach(rest.trim());
            self.input.clear();
            return;
        }
        match line.as_str() {
            "/detach" => {
                self.session.clear_attachment();
                self.notice = Some("attachment cleared".to_string());
                self.input.clear();
                return;
            }
            "/quit" => {
                self.should_quit = true;
                return;
            }
            _ => {}
        }

        if self.session.is_awaiting() {
            self.notice = Some("still waiting for the current response".to_string());
            return;
        }

        // One cycle: mutate the conversation first, then let a background
        // task forward stream events into the select loop.
        match self.session.begin_submit(&line).await {
            Ok(Some(request)) => {
                self.input.clear();
                self.notice = None;
                self.stick_to_bottom = true;
                self.spinner_frame = 0;

                let client = self.session.client();
                let tx = stream_tx.clone();
                tokio::spawn(async move {
                    match client
                        .stream_chat(&request.system, request.messages, request.params)
                        .await
                    {
                        Ok(mut stream) => {
                            while let Some(event) = stream.next().await {
                                if tx.send(event).is_err() {
                                    return;
                                }
                            }
                            // A stream that ends without an explicit Done
                            // still completed; the session drops duplicates.
                            let _ = tx.send(Ok(StreamEvent::Done));
                        }
                        Err(e) => {
                            let _ = tx.send(Err(e));
                        }
                    }
                });
            }
            Ok(None) => {
                self.input.clear();
                self.stick_to_bottom = true;
            }
            Err(e) => {
                self.notice = Some(e.to_string());
            }
        }
    }

    fn handle_attach(&mut self, path: &str) {
        if path.is_empty() {
            self.notice = Some("usage: /attach <path to .pdf>".to_string());
            return;
        }
        match self.session.attach(Path::new(path)) {
            Ok(()) => {
                let summary = self
                    .session
                    .pending_attachment()
                    .map(|pending| pending.summary())
                    .unwrap_or_default();
                self.notice = Some(format!("attached {summary}"));
            }
            Err(e) => self.notice = Some(e.to_string()),
        }
    }
}
