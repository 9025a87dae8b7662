use std::rc::Rc;

/// A named unit of script source
///
/// The name is the module's identity, including for persistence. Code may be
/// absent when the source could not be read; hosts refuse to load such
/// modules.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    name: String,
    code: Option<Rc<str>>,
    library: bool,
}

impl Module {
    pub fn new(name: impl Into<String>, code: Option<&str>) -> Self {
        Self {
            name: name.into(),
            code: code.map(Rc::from),
            library: false,
        }
    }

    pub fn library(name: impl Into<String>, code: Option<&str>) -> Self {
        Self {
            library: true,
            ..Self::new(name, code)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn code(&self) -> Option<&Rc<str>> {
        self.code.as_ref()
    }

    pub fn is_library(&self) -> bool {
        self.library
    }
}
