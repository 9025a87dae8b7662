//! Error reporting bound to the actor a host is serving

use tracing::{debug, error};

use tickscript_api::{Actor, Message, SourceRef, StackFrame, Token, Tone};

use crate::error::ScriptError;

/// Marker placed at the offending column when quoting source
pub const POSITION_MARKER: &str = " HERE>> ";

/// Capability to report failures to one actor
///
/// Delivery never fails. Reports for an actor with no chat outbox go to the
/// process log; reports for a player who has disconnected are dropped.
#[derive(Debug, Clone)]
pub struct ReportSink {
    actor: Actor,
}

impl ReportSink {
    pub fn new(actor: Actor) -> Self {
        Self { actor }
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    /// Report a failure: source context (players only), the call stack, then
    /// the intro line
    pub fn report_failure(&self, intro: &str, error: &ScriptError) {
        if let Some(e) = error.eval_error() {
            if self.actor.is_player() {
                for message in render_position(&e.message, e.source.as_ref(), e.token.as_ref()) {
                    self.deliver(message);
                }
            }
            for frame in &e.stack {
                self.deliver(render_frame(frame));
            }
        }
        self.deliver(Message::error(headline(intro, &error.message())));
    }

    /// Send a plain error line
    pub fn report_message(&self, text: impl Into<String>) {
        self.deliver(Message::error(text));
    }

    fn deliver(&self, message: Message) {
        if !self.actor.has_outbox() {
            error!(target: "scripting", "{}", message);
        } else if !self.actor.send(message) {
            debug!(target: "scripting", "Dropping report for unreachable actor {}", self.actor.name());
        }
    }
}

/// `intro: message`, or just the intro for an empty message
pub fn headline(intro: &str, message: &str) -> String {
    if message.is_empty() {
        intro.to_string()
    } else {
        format!("{}: {}", intro, message)
    }
}

/// Render a message with its origin and, when a token is known, the
/// offending line plus one line of context either side
pub fn render_position(
    message: &str,
    source: Option<&SourceRef>,
    token: Option<&Token>,
) -> Vec<Message> {
    let mut shebang = message.to_string();
    match source.and_then(|s| s.module.as_deref()) {
        Some(module) => shebang.push_str(&format!(" in {}", module)),
        None => shebang.push_str(" in system chat"),
    }

    let (Some(source), Some(token)) = (source, token) else {
        return vec![Message::error(shebang)];
    };

    let lines: Vec<&str> = source.code.split('\n').collect();
    let multiline = lines.len() > 1;
    if multiline {
        shebang.push_str(&format!(
            " at line {}, pos {}",
            token.lineno + 1,
            token.linepos + 1
        ));
    } else {
        shebang.push_str(&format!(" at pos {}", token.pos + 1));
    }

    let Some(line) = lines.get(token.lineno) else {
        return vec![Message::error(shebang)];
    };

    let mut messages = vec![Message::error(shebang)];
    if multiline && token.lineno > 0 {
        messages.push(Message::detail(lines[token.lineno - 1]));
    }
    let split = line
        .char_indices()
        .nth(token.linepos)
        .map_or(line.len(), |(i, _)| i);
    messages.push(
        Message::detail(&line[..split])
            .push(Tone::Error, POSITION_MARKER)
            .push(Tone::Detail, &line[split..]),
    );
    if multiline && token.lineno + 1 < lines.len() {
        messages.push(Message::detail(lines[token.lineno + 1]));
    }
    messages
}

fn render_frame(frame: &StackFrame) -> Message {
    match &frame.token {
        Some(token) => Message::trace(format!(
            "  ... in {} (line {})",
            frame.function,
            token.lineno + 1
        )),
        None => Message::trace(format!("  ... in {}", frame.function)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;
    use tickscript_api::{EvalError, TokenKind};
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc;

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn capture_logs(f: impl FnOnce()) -> String {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = buffer.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    fn source(module: Option<&str>, code: &str) -> SourceRef {
        SourceRef {
            module: module.map(str::to_string),
            code: Rc::from(code),
        }
    }

    fn texts(messages: &[Message]) -> Vec<String> {
        messages.iter().map(|m| m.to_string()).collect()
    }

    #[test]
    fn test_single_line_position() {
        let token = Token::new(TokenKind::Variable, "y").at(4, 0, 4);
        let messages = render_position("Unknown variable", Some(&source(Some("calc"), "x = y + 1")), Some(&token));
        assert_eq!(
            texts(&messages),
            vec![
                "Unknown variable in calc at pos 5".to_string(),
                "x =  HERE>> y + 1".to_string(),
            ]
        );
    }

    #[test]
    fn test_multi_line_context() {
        let code = "a() -> 1;\nb() -> foo(;\nc() -> 3;";
        let token = Token::new(TokenKind::OpenParen, "(").at(20, 1, 10);
        let messages = render_position("Syntax error", Some(&source(Some("app"), code)), Some(&token));
        assert_eq!(
            texts(&messages),
            vec![
                "Syntax error in app at line 2, pos 11".to_string(),
                "a() -> 1;".to_string(),
                "b() -> foo HERE>> (;".to_string(),
                "c() -> 3;".to_string(),
            ]
        );
    }

    #[test]
    fn test_first_line_has_no_line_above() {
        let code = "oops;\nfine;";
        let token = Token::new(TokenKind::Variable, "oops").at(0, 0, 0);
        let messages = render_position("bad", Some(&source(None, code)), Some(&token));
        assert_eq!(
            texts(&messages),
            vec![
                "bad in system chat at line 1, pos 1".to_string(),
                " HERE>> oops;".to_string(),
                "fine;".to_string(),
            ]
        );
    }

    #[test]
    fn test_no_token() {
        let messages = render_position("boom", None, None);
        assert_eq!(texts(&messages), vec!["boom in system chat".to_string()]);
    }

    #[test]
    fn test_report_to_player() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = ReportSink::new(Actor::player("alice", tx));
        let error = ScriptError::Evaluation(
            EvalError::runtime("Division by zero")
                .at(source(Some("calc"), "1/0"), Token::new(TokenKind::Operator, "/").at(1, 0, 1))
                .with_frame("calc.divide", None),
        );
        sink.report_failure("Error while running custom command", &error);

        let mut received = Vec::new();
        while let Ok(message) = rx.try_recv() {
            received.push(message.to_string());
        }
        assert_eq!(
            received,
            vec![
                "Division by zero in calc at pos 2".to_string(),
                "1 HERE>> /0".to_string(),
                "  ... in calc.divide".to_string(),
                "Error while running custom command: Division by zero".to_string(),
            ]
        );
    }

    #[test]
    fn test_console_gets_no_source_context() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = ReportSink::new(Actor::console(tx));
        let error = ScriptError::Evaluation(
            EvalError::runtime("bad").at(source(Some("calc"), "x"), Token::new(TokenKind::Variable, "x")),
        );
        sink.report_failure("Callback failed", &error);
        assert_eq!(rx.try_recv().unwrap().to_string(), "Callback failed: bad");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_disconnected_actor_is_silent() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let sink = ReportSink::new(Actor::player("gone", tx));
        let logs = capture_logs(|| sink.report_failure("Callback failed", &ScriptError::Paused));
        assert!(!logs.contains("Callback failed"));
    }

    #[test]
    fn test_server_reports_go_to_the_log() {
        let sink = ReportSink::new(Actor::server());
        let error = ScriptError::Evaluation(EvalError::runtime("bad").with_frame("app.run", None));
        let logs = capture_logs(|| sink.report_failure("Callback failed", &error));
        assert!(logs.contains("ERROR"));
        assert!(logs.contains("  ... in app.run"));
        assert!(logs.contains("Callback failed: bad"));
        assert!(!logs.contains("system chat"));
    }
}
