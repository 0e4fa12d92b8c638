//! Wires preprocessor, assembler, substitution engine and aggregator
//! together, either on the calling thread or on scoped worker threads joined
//! by bounded channels.
use std::sync::mpsc::{Receiver, SyncSender, sync_channel};

use crate::{
    Error, Options,
    aggregator::Aggregator,
    assembler::Assembler,
    model::Document,
    options::{Cancellation, Execution},
    preprocessor::Preprocessor,
    substitution::{Event, SubstitutionEngine},
};

/// A pipeline stage: consumes items in order and emits zero or more items
/// per input, plus whatever it still holds once the input ends.
pub(crate) trait Stage {
    type Input;
    type Output;

    fn accept(&mut self, input: Self::Input, output: &mut Vec<Self::Output>);

    fn finish(&mut self, output: &mut Vec<Self::Output>);
}

/// Feed one item, or the end of the stream when `input` is `None`.
fn step<S: Stage>(stage: &mut S, input: Option<S::Input>, output: &mut Vec<S::Output>) {
    match input {
        Some(input) => stage.accept(input, output),
        None => stage.finish(output),
    }
}

/// The last stage, always on the calling thread. Stops at the first fatal
/// error and keeps what was built before it.
struct Collector {
    aggregator: Aggregator,
    error: Option<Error>,
}

impl Collector {
    fn new(options: &Options) -> Self {
        Self {
            aggregator: Aggregator::new(options),
            error: None,
        }
    }

    /// Returns `false` once the parse has to stop.
    fn accept(&mut self, event: Result<Event, Error>, cancellation: &Cancellation) -> bool {
        if cancellation.is_cancelled() {
            self.fail(Error::Cancelled);
            return false;
        }
        match event {
            Ok(event) => {
                self.aggregator.accept(event);
                true
            }
            Err(error) if !error.is_fatal() => {
                tracing::warn!(%error, "recovered, content kept as raw text");
                true
            }
            Err(error) => {
                self.fail(error);
                false
            }
        }
    }

    fn fail(&mut self, error: Error) {
        tracing::error!(error = ?error, location = ?error.location(), "parse failed");
        self.error = Some(error);
    }

    fn finish(mut self, cancellation: &Cancellation) -> (Document, Option<Error>) {
        if self.error.is_none() && cancellation.is_cancelled() {
            self.fail(Error::Cancelled);
        }
        (self.aggregator.finish(), self.error)
    }
}

/// Run every stage over `input`, returning the document built so far and
/// the first fatal error, if any.
#[tracing::instrument(skip_all, fields(filename = ?options.filename, execution = ?options.execution))]
pub(crate) fn run(input: String, options: &Options) -> (Document, Option<Error>) {
    match options.execution {
        Execution::Sequential => sequential(input, options),
        Execution::Threaded { capacity } => threaded(input, options, capacity.max(1)),
    }
}

fn sequential(input: String, options: &Options) -> (Document, Option<Error>) {
    let cancellation = &options.cancellation;
    let mut assembler = Assembler::new();
    let mut engine = SubstitutionEngine::new(options);
    let mut collector = Collector::new(options);
    let mut assembled = Vec::new();
    let mut events = Vec::new();

    let fragments = Preprocessor::new(input, options)
        .map(Some)
        .chain(std::iter::once(None));
    for fragment in fragments {
        if cancellation.is_cancelled() {
            break;
        }
        let end = fragment.is_none();
        step(&mut assembler, fragment, &mut assembled);
        for element in assembled.drain(..) {
            engine.accept(element, &mut events);
        }
        if end {
            engine.finish(&mut events);
        }
        for event in events.drain(..) {
            if !collector.accept(event, cancellation) {
                return collector.finish(cancellation);
            }
        }
    }
    collector.finish(cancellation)
}

/// Forward everything `input` delivers through `stage` into `output`. Stops
/// early on cancellation or when the next stage has gone away.
fn forward<S: Stage>(
    mut stage: S,
    input: Receiver<S::Input>,
    output: SyncSender<S::Output>,
    cancellation: &Cancellation,
) {
    let mut buffer = Vec::new();
    for item in input.iter().map(Some).chain(std::iter::once(None)) {
        if cancellation.is_cancelled() {
            tracing::debug!("stage cancelled");
            return;
        }
        step(&mut stage, item, &mut buffer);
        for produced in buffer.drain(..) {
            if output.send(produced).is_err() {
                tracing::debug!("downstream stage stopped, dropping the rest");
                return;
            }
        }
    }
}

fn collect(mut collector: Collector, events: Receiver<Result<Event, Error>>, cancellation: &Cancellation) -> Collector {
    for event in events {
        if !collector.accept(event, cancellation) {
            break;
        }
    }
    collector
}

fn threaded(input: String, options: &Options, capacity: usize) -> (Document, Option<Error>) {
    let cancellation = &options.cancellation;
    let (fragment_sender, fragment_receiver) = sync_channel(capacity);
    let (element_sender, element_receiver) = sync_channel(capacity);
    let (event_sender, event_receiver) = sync_channel(capacity);

    let collector = std::thread::scope(|scope| {
        scope.spawn(move || {
            for fragment in Preprocessor::new(input, options) {
                if cancellation.is_cancelled() || fragment_sender.send(fragment).is_err() {
                    tracing::debug!("preprocessor stopped early");
                    return;
                }
            }
        });
        scope.spawn(move || forward(Assembler::new(), fragment_receiver, element_sender, cancellation));
        scope.spawn(move || {
            forward(
                SubstitutionEngine::new(options),
                element_receiver,
                event_sender,
                cancellation,
            );
        });
        // Dropping the receiver on return unblocks any stage still sending.
        collect(Collector::new(options), event_receiver, cancellation)
    });
    collector.finish(cancellation)
}

#[cfg(test)]
#[allow(clippy::panic, clippy::indexing_slicing)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::model::Element;

    const DOCUMENT: &str = "= Title\n:toc:\n\nintro with {sp}space\n\n== One\n\n* a\n* b\n\n----\ncode <1>\n----\n<1> note\n\n== Two\n\n|===\n|x |y\n|===\n\nfootnote:[here]\n";

    #[rstest]
    #[case::threaded(Execution::Threaded { capacity: 1 })]
    #[case::wide(Execution::Threaded { capacity: 64 })]
    fn test_threaded_matches_sequential(#[case] execution: Execution) {
        let (sequential, error) = run(DOCUMENT.to_string(), &Options::default());
        assert!(error.is_none());
        let options = Options::builder().with_execution(execution).build();
        let (threaded, error) = run(DOCUMENT.to_string(), &options);
        assert!(error.is_none());
        assert_eq!(threaded, sequential);
    }

    #[rstest]
    #[case::sequential(Execution::Sequential)]
    #[case::threaded(Execution::Threaded { capacity: 2 })]
    fn test_cancelled_before_start(#[case] execution: Execution) {
        let cancellation = Cancellation::new();
        cancellation.cancel();
        let options = Options::builder()
            .with_execution(execution)
            .with_cancellation(cancellation)
            .build();
        let (document, error) = run(DOCUMENT.to_string(), &options);
        assert!(matches!(error, Some(Error::Cancelled)));
        assert!(document.elements.is_empty());
    }

    #[rstest]
    #[case::sequential(Execution::Sequential)]
    #[case::threaded(Execution::Threaded { capacity: 1 })]
    fn test_fatal_error_keeps_earlier_elements(#[case] execution: Execution) {
        let options = Options::builder().with_execution(execution).build();
        let input = "first\n\n[subs=bogus]\nsecond\n\nthird\n";
        let (document, error) = run(input.to_string(), &options);
        assert!(matches!(error, Some(Error::UnsupportedSubstitution(_))));
        assert_eq!(document.elements.len(), 1);
        assert!(matches!(document.elements[0], Element::Paragraph(_)));
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_assembly_errors_are_not_fatal() {
        let (document, error) = run("+\ntext\n".to_string(), &Options::default());
        assert!(error.is_none());
        assert!(!document.elements.is_empty());
        assert!(logs_contain("recovered"));
    }
}
