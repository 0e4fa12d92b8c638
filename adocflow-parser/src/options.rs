use std::{
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use rustc_hash::FxHashMap;

use crate::model::{AttributeValue, DocumentAttributes};

/// Default bound on nested `include::` directives.
pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 64;

/// Default capacity of each inter-stage channel in threaded execution.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// How the pipeline stages are scheduled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum Execution {
    /// All stages are driven on the calling thread, one fragment at a time.
    #[default]
    Sequential,
    /// Each stage runs on its own scoped thread, connected by bounded channels.
    Threaded { capacity: usize },
}

/// A cooperative cancellation token shared by every stage of a parse.
///
/// Clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct Options {
    /// Path of the document being parsed, used to resolve relative includes.
    pub filename: Option<PathBuf>,
    /// Attributes seeded before the document is read.
    pub document_attributes: DocumentAttributes,
    /// User-defined inline macros: macro name to template.
    ///
    /// Templates may reference `{target}` and any named attribute of the
    /// macro invocation.
    pub macros: FxHashMap<String, String>,
    pub execution: Execution,
    pub cancellation: Cancellation,
    pub max_include_depth: usize,
}

impl Options {
    /// Create a new `OptionsBuilder` for fluent configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use adocflow_parser::Options;
    ///
    /// let options = Options::builder()
    ///     .with_attribute("toc", "left")
    ///     .with_soft_attribute("imagesdir", "images")
    ///     .build();
    /// ```
    #[must_use]
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder::default()
    }

    /// Create a new `Options` with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    #[must_use]
    pub(crate) fn base_dir(&self) -> PathBuf {
        self.filename
            .as_ref()
            .and_then(|path| path.parent())
            .map_or_else(|| PathBuf::from("."), std::path::Path::to_path_buf)
    }

    /// The intrinsic attributes with the configured ones layered on top.
    pub(crate) fn initial_attributes(&self) -> DocumentAttributes {
        let mut attributes = DocumentAttributes::intrinsic();
        attributes.overlay(&self.document_attributes);
        attributes
    }
}

/// Builder for `Options`.
///
/// Create an `OptionsBuilder` using `Options::builder()`.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct OptionsBuilder {
    filename: Option<PathBuf>,
    document_attributes: DocumentAttributes,
    macros: FxHashMap<String, String>,
    execution: Execution,
    cancellation: Cancellation,
    max_include_depth: usize,
}

impl Default for OptionsBuilder {
    fn default() -> Self {
        Self {
            filename: None,
            document_attributes: DocumentAttributes::default(),
            macros: FxHashMap::default(),
            execution: Execution::default(),
            cancellation: Cancellation::default(),
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
        }
    }
}

impl OptionsBuilder {
    /// Set the path of the document, used as the base for relative includes.
    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<PathBuf>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Add a locked document attribute.
    ///
    /// The document cannot change or unset a locked attribute. A value (or
    /// name) ending in `@` is seeded as a soft default instead, which the
    /// document may override.
    #[must_use]
    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.document_attributes.seed(name.into(), value.into());
        self
    }

    /// Add a soft default for a document attribute; the document may override it.
    #[must_use]
    pub fn with_soft_attribute(
        mut self,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.document_attributes.seed_soft(name.into(), value.into());
        self
    }

    /// Register a user-defined inline macro.
    ///
    /// # Example
    ///
    /// ```
    /// use adocflow_parser::Options;
    ///
    /// let options = Options::builder()
    ///     .with_macro("issue", "https://tracker.example.com/{target}")
    ///     .build();
    /// ```
    #[must_use]
    pub fn with_macro(mut self, name: impl Into<String>, template: impl Into<String>) -> Self {
        self.macros.insert(name.into(), template.into());
        self
    }

    #[must_use]
    pub fn with_execution(mut self, execution: Execution) -> Self {
        self.execution = match execution {
            Execution::Threaded { capacity } => Execution::Threaded {
                capacity: capacity.max(1),
            },
            Execution::Sequential => Execution::Sequential,
        };
        self
    }

    /// Run every stage on its own thread with bounded channels of `capacity`.
    #[must_use]
    pub fn with_threads(self, capacity: usize) -> Self {
        self.with_execution(Execution::Threaded { capacity })
    }

    #[must_use]
    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    #[must_use]
    pub fn with_max_include_depth(mut self, depth: usize) -> Self {
        self.max_include_depth = depth;
        self
    }

    /// Build the `Options` from this builder.
    #[must_use]
    pub fn build(self) -> Options {
        Options {
            filename: self.filename,
            document_attributes: self.document_attributes,
            macros: self.macros,
            execution: self.execution,
            cancellation: self.cancellation,
            max_include_depth: self.max_include_depth,
        }
    }
}
