//! Shared fixtures: a scripted evaluator, a small tokenizer and a world that
//! records what hosts did to it
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, UnboundedReceiver};

use tickscript_host::api::{
    Actor, EvalError, FunctionValue, LazyValue, Message, Module, Token, TokenKind, Tokenizer,
    Value,
};
use tickscript_host::{
    Context, Evaluator, HostId, HostSettings, MemoryModuleSource, MemoryStore, ScriptServer, World,
};

pub type Body = Rc<dyn Fn(&mut Context<'_>, Vec<Value>) -> Result<Value, EvalError>>;
pub type Program = Rc<dyn Fn(&mut Context<'_>) -> Result<(), EvalError>>;

/// Runs closures registered per module name instead of parsing code
#[derive(Default)]
pub struct FakeEvaluator {
    programs: RefCell<HashMap<String, Program>>,
    calls: Cell<usize>,
}

impl FakeEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn program(
        &self,
        module: &str,
        program: impl Fn(&mut Context<'_>) -> Result<(), EvalError> + 'static,
    ) {
        self.programs
            .borrow_mut()
            .insert(module.to_string(), Rc::new(program));
    }

    /// Number of function bodies evaluated so far
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl Evaluator for FakeEvaluator {
    fn run_module(&self, ctx: &mut Context<'_>, module: &Module) -> Result<Value, EvalError> {
        let program = self.programs.borrow().get(module.name()).cloned();
        if let Some(program) = program {
            program(ctx)?;
        }
        Ok(Value::Null)
    }

    fn call_function(
        &self,
        ctx: &mut Context<'_>,
        function: &FunctionValue,
        args: Vec<LazyValue>,
    ) -> Result<Value, EvalError> {
        self.calls.set(self.calls.get() + 1);
        let body = function
            .body()
            .downcast_ref::<Body>()
            .cloned()
            .ok_or_else(|| EvalError::internal("not a fake function"))?;
        let values = args.iter().map(LazyValue::eval).collect();
        body(ctx, values)
    }
}

/// Build a function value whose body is a closure
pub fn function(
    module: &str,
    name: &str,
    args: &[&str],
    body: impl Fn(&mut Context<'_>, Vec<Value>) -> Result<Value, EvalError> + 'static,
) -> FunctionValue {
    let body: Body = Rc::new(body);
    FunctionValue::new(
        name,
        Some(module.to_string()),
        args.iter().map(|s| s.to_string()).collect(),
        Rc::new(body),
    )
}

/// Define a function from inside a program
pub fn define(
    ctx: &mut Context<'_>,
    module: &str,
    name: &str,
    args: &[&str],
    body: impl Fn(&mut Context<'_>, Vec<Value>) -> Result<Value, EvalError> + 'static,
) -> Result<(), EvalError> {
    ctx.define_function(function(module, name, args, body))
}

pub fn map(entries: &[(&str, Value)]) -> Value {
    Value::Map(
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect(),
    )
}

/// Flat tokenizer covering what text commands send
pub struct FakeTokenizer;

impl Tokenizer for FakeTokenizer {
    fn simple_pass(&self, input: &str) -> Result<Vec<Token>, EvalError> {
        let chars: Vec<char> = input.chars().collect();
        let mut tokens: Vec<Token> = Vec::new();
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            let start = i;
            if c.is_whitespace() {
                i += 1;
                continue;
            }
            let token = if c.is_ascii_digit() {
                if c == '0' && matches!(chars.get(i + 1), Some('x') | Some('X')) {
                    i += 2;
                    while i < chars.len() && chars[i].is_ascii_alphanumeric() {
                        i += 1;
                    }
                    Token::new(TokenKind::HexLiteral, chars[start..i].iter().collect::<String>())
                } else {
                    while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '.') {
                        i += 1;
                    }
                    Token::new(TokenKind::Literal, chars[start..i].iter().collect::<String>())
                }
            } else if c.is_alphabetic() || c == '_' {
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                let mut j = i;
                while j < chars.len() && chars[j].is_whitespace() {
                    j += 1;
                }
                if chars.get(j) == Some(&'(') {
                    Token::new(TokenKind::Function, word)
                } else {
                    Token::new(TokenKind::Variable, word)
                }
            } else if c == '\'' || c == '"' {
                i += 1;
                while i < chars.len() && chars[i] != c {
                    i += 1;
                }
                if i >= chars.len() {
                    return Err(EvalError::runtime("Program truncated"));
                }
                let text: String = chars[start + 1..i].iter().collect();
                i += 1;
                Token::new(TokenKind::StringParam, text)
            } else {
                i += 1;
                match c {
                    '(' => Token::new(TokenKind::OpenParen, "("),
                    ')' => Token::new(TokenKind::CloseParen, ")"),
                    ',' => Token::new(TokenKind::Comma, ","),
                    ';' => Token::new(TokenKind::Marker, ";"),
                    '-' if tokens.last().map_or(true, |t| {
                        matches!(
                            t.kind,
                            TokenKind::Operator
                                | TokenKind::UnaryOperator
                                | TokenKind::OpenParen
                                | TokenKind::Comma
                        )
                    }) =>
                    {
                        Token::new(TokenKind::UnaryOperator, "-u")
                    }
                    _ => Token::new(TokenKind::Operator, c.to_string()),
                }
            };
            tokens.push(token.at(start, 0, start));
        }
        Ok(tokens)
    }
}

/// World with a fixed set of online players and recorded marker removals
#[derive(Default, Clone)]
pub struct TestWorld {
    pub players: Rc<RefCell<HashMap<String, Actor>>>,
    pub removed_tags: Rc<RefCell<Vec<String>>>,
}

impl World for TestWorld {
    fn server_actor(&self) -> Actor {
        Actor::server()
    }

    fn find_player(&self, name: &str) -> Option<Actor> {
        self.players.borrow().get(name).cloned()
    }

    fn remove_tagged_markers(&mut self, tag: &str) -> usize {
        self.removed_tags.borrow_mut().push(tag.to_string());
        1
    }
}

pub fn player(name: &str) -> (Actor, UnboundedReceiver<Message>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Actor::player(name, tx), rx)
}

pub fn drain(rx: &mut UnboundedReceiver<Message>) -> Vec<String> {
    let mut received = Vec::new();
    while let Ok(message) = rx.try_recv() {
        received.push(message.to_string());
    }
    received
}

/// A server wired to fakes, with handles kept for inspection
pub struct Harness {
    pub server: ScriptServer,
    pub evaluator: Rc<FakeEvaluator>,
    pub store: Rc<RefCell<MemoryStore>>,
    pub world: TestWorld,
}

impl Harness {
    /// Register `code`-less programs as apps named after each program
    pub fn new(apps: &[&str], evaluator: FakeEvaluator) -> Self {
        let mut modules = MemoryModuleSource::new();
        for app in apps {
            modules.insert(Module::new(*app, Some("// scripted")));
        }
        Self::with_modules(modules, evaluator)
    }

    pub fn with_modules(modules: MemoryModuleSource, evaluator: FakeEvaluator) -> Self {
        let evaluator = Rc::new(evaluator);
        let store = Rc::new(RefCell::new(MemoryStore::new()));
        let world = TestWorld::default();
        let server = ScriptServer::new(evaluator.clone(), Rc::new(FakeTokenizer), Box::new(modules))
            .with_store(Box::new(store.clone()))
            .with_world(Box::new(world.clone()));
        Self {
            server,
            evaluator,
            store,
            world,
        }
    }

    /// Use a save debounce window of `ticks`
    pub fn debounce(mut self, ticks: u32) -> Self {
        let settings = HostSettings {
            save_debounce_ticks: ticks,
            ..HostSettings::default()
        };
        self.server = self.server.with_settings(settings);
        self
    }

    pub fn function(&self, host: HostId, name: &str) -> FunctionValue {
        self.server
            .host(host)
            .and_then(|h| h.function(name))
            .cloned()
            .unwrap_or_else(|| panic!("{} is not defined", name))
    }

    pub fn writes(&self) -> usize {
        self.store.borrow().write_count()
    }
}

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

/// Run `f` with a subscriber that records INFO and above, returning the output
pub fn capture_logs(f: impl FnOnce()) -> String {
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
