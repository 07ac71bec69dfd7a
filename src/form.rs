//! The form orchestrator: binds a schema to a live multipart source.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use futures::stream::{FuturesUnordered, StreamExt};
use tracing::debug;

use crate::builder::FormBuilder;
use crate::config::FormOptions;
use crate::engine::{
    Claim, CompletionTracker, ErrorCleanup, FieldCollector, InFlightFiles, RuleChain, finalize,
};
use crate::error::FormError;
use crate::schema::{DiskTarget, FieldKind, FieldSpec, Schema, SinkKind, SizeLimit};
use crate::sink::{BufferSink, CallbackSink, DiskSink};
use crate::source::{FilePart, MultipartSource, SourceEvent};
use crate::value::{CollectedValue, Converter, FormResult, Value};

/// A schema plus the options used to parse submissions against it.
#[derive(Debug, Clone)]
pub struct Form {
    schema: Arc<Schema>,
    options: FormOptions,
}

impl Form {
    pub fn new(schema: Schema, options: FormOptions) -> Self {
        Self {
            schema: Arc::new(schema),
            options,
        }
    }

    pub fn builder() -> FormBuilder {
        FormBuilder::new()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn options(&self) -> &FormOptions {
        &self.options
    }

    /// Consume `source` and validate everything it emits.
    pub async fn parse<S: MultipartSource>(&self, source: S) -> Result<FormResult, FormError> {
        parse(source, &self.schema, &self.options).await
    }
}

/// Consume `source`, validating and collecting its fields and files per
/// `schema`.
///
/// Resolves exactly once: with the complete result after the source ended
/// and every rule and file part settled, or with the first error. On error
/// every file written for this parse is removed and the source is detached.
pub async fn parse<S: MultipartSource>(
    mut source: S,
    schema: &Schema,
    options: &FormOptions,
) -> Result<FormResult, FormError> {
    let mut session = Session::new(schema, options);
    let mut units: FuturesUnordered<BoxFuture<'static, UnitOutcome>> = FuturesUnordered::new();
    let mut source_open = true;

    loop {
        let wake = tokio::select! {
            biased;
            Some(outcome) = units.next(), if !units.is_empty() => Wake::Unit(outcome),
            event = source.next_event(), if source_open => Wake::Event(event),
            else => break,
        };

        let step = match wake {
            Wake::Unit(outcome) => session.on_unit(outcome),
            Wake::Event(SourceEvent::Field { key, value }) => {
                session.on_field(key, value, &mut units).map(|()| false)
            }
            Wake::Event(SourceEvent::File { key, part }) => {
                session.on_file(key, part, &mut units).await.map(|()| false)
            }
            Wake::Event(SourceEvent::Error(source_err)) => {
                source_open = false;
                Err(FormError::Decoder { source: source_err })
            }
            Wake::Event(SourceEvent::End) => {
                debug!(pending = session.tracker.pending(), "multipart source ended");
                source_open = false;
                Ok(session.tracker.finish_decoder())
            }
        };

        match step {
            Ok(false) => {}
            Ok(true) => return session.finish(units, &mut source).await,
            Err(err) => return Err(session.fail(err, units, &mut source).await),
        }
    }

    // The source is closed and nothing is in flight.
    session.finish(units, &mut source).await
}

enum Wake {
    Unit(UnitOutcome),
    Event(SourceEvent),
}

enum UnitOutcome {
    /// A rule chain or file part finished, successfully or not
    Settled {
        unit: u64,
        key: String,
        seq: u64,
        result: Result<CollectedValue, FormError>,
    },
    /// A part nobody asked for was read to its end
    Drained { key: String },
}

struct Session<'a> {
    schema: &'a Schema,
    options: &'a FormOptions,
    collector: FieldCollector,
    tracker: CompletionTracker,
    cleanup: ErrorCleanup,
    in_flight: InFlightFiles,
    next_unit: u64,
}

impl<'a> Session<'a> {
    fn new(schema: &'a Schema, options: &'a FormOptions) -> Self {
        Self {
            schema,
            options,
            collector: FieldCollector::new(),
            tracker: CompletionTracker::new(),
            cleanup: ErrorCleanup::new(),
            in_flight: InFlightFiles::default(),
            next_unit: 0,
        }
    }

    fn on_field(
        &mut self,
        key: String,
        value: String,
        units: &mut FuturesUnordered<BoxFuture<'static, UnitOutcome>>,
    ) -> Result<(), FormError> {
        let schema = self.schema;
        let Some((spec, converter)) = schema.get(&key).and_then(scalar_spec) else {
            debug!(key = %key, "ignoring unexpected field");
            return Ok(());
        };

        let seq = match self.collector.claim(spec) {
            Claim::Accept(seq) => seq,
            Claim::Drop => {
                debug!(key = %key, "dropping repeated field");
                return Ok(());
            }
            Claim::Duplicate => return Err(FormError::DuplicateNotAllowed { key }),
        };

        let value = match converter {
            Some(converter) => converter
                .apply(Value::Text(value))
                .map_err(|detail| FormError::ValidationFailed {
                    key: key.clone(),
                    detail,
                })?,
            None => Value::Text(value),
        };
        let value = CollectedValue::Scalar(value);

        if spec.rules.is_empty() {
            return self.collector.merge(spec, seq, value);
        }

        let chain = RuleChain::new(spec.rules.clone());
        let unit = self.begin_unit();
        units.push(
            async move {
                let result = chain.evaluate(&key, &value).await.map(|()| value);
                UnitOutcome::Settled {
                    unit,
                    key,
                    seq,
                    result,
                }
            }
            .boxed(),
        );
        Ok(())
    }

    async fn on_file(
        &mut self,
        key: String,
        part: FilePart,
        units: &mut FuturesUnordered<BoxFuture<'static, UnitOutcome>>,
    ) -> Result<(), FormError> {
        let schema = self.schema;
        let Some((spec, sink, max_size)) = schema.get(&key).and_then(file_spec) else {
            debug!(key = %key, "draining unexpected file part");
            units.push(drain(key, part));
            return Ok(());
        };

        let seq = match self.collector.claim(spec) {
            Claim::Accept(seq) => seq,
            Claim::Drop => {
                debug!(key = %key, "draining repeated file part");
                units.push(drain(key, part));
                return Ok(());
            }
            Claim::Duplicate => return Err(FormError::DuplicateNotAllowed { key }),
        };

        debug!(key = %key, filename = part.filename(), sink = sink.name(), "file part started");
        let stream = part.into_stream();
        let unit = self.begin_unit();
        let consume: BoxFuture<'static, Result<CollectedValue, FormError>> = match sink {
            SinkKind::Disk(target) => {
                let path = match target {
                    DiskTarget::Auto => self.options.temp_file_path(),
                    DiskTarget::Path(path) => path.clone(),
                };
                let disk = DiskSink::create(&key, path.clone(), max_size.clone()).await?;
                self.in_flight.register(unit, path);
                disk.consume(stream).boxed()
            }
            SinkKind::Buffer {
                encoding,
                converter,
            } => BufferSink::new(&key, max_size.clone(), *encoding, converter.clone())
                .consume(stream)
                .boxed(),
            SinkKind::Callback(consumer) => {
                CallbackSink::new(&key, Arc::clone(consumer), max_size.clone())
                    .consume(stream)
                    .boxed()
            }
        };

        let chain = RuleChain::new(spec.rules.clone());
        units.push(
            async move {
                let result = match consume.await {
                    Ok(value) => chain.evaluate(&key, &value).await.map(|()| value),
                    Err(err) => Err(err),
                };
                UnitOutcome::Settled {
                    unit,
                    key,
                    seq,
                    result,
                }
            }
            .boxed(),
        );
        Ok(())
    }

    /// Returns `true` when this outcome completes the parse.
    fn on_unit(&mut self, outcome: UnitOutcome) -> Result<bool, FormError> {
        let (unit, key, seq, value) = match outcome {
            UnitOutcome::Drained { key } => {
                debug!(key = %key, "drained file part");
                return Ok(false);
            }
            UnitOutcome::Settled {
                unit,
                key,
                seq,
                result,
            } => (unit, key, seq, result?),
        };

        if let Some(spec) = self.schema.get(&key) {
            debug!(key = %key, size = value.size(), "value accepted");
            self.collector.merge(spec, seq, value)?;
        }
        // Released only after the merge, so a file that never made it into the
        // result is still removed on failure.
        self.in_flight.release(unit);
        Ok(self.tracker.complete())
    }

    fn begin_unit(&mut self) -> u64 {
        let unit = self.next_unit;
        self.next_unit += 1;
        self.tracker.begin();
        unit
    }

    async fn finish<S>(
        self,
        units: FuturesUnordered<BoxFuture<'static, UnitOutcome>>,
        source: &mut S,
    ) -> Result<FormResult, FormError>
    where
        S: MultipartSource + ?Sized,
    {
        match finalize(self.schema, &self.collector) {
            Ok(()) => {
                drop(units);
                Ok(self.collector.publish())
            }
            Err(err) => Err(self.fail(err, units, source).await),
        }
    }

    async fn fail<S>(
        mut self,
        error: FormError,
        units: FuturesUnordered<BoxFuture<'static, UnitOutcome>>,
        source: &mut S,
    ) -> FormError
    where
        S: MultipartSource + ?Sized,
    {
        self.cleanup.report(&mut self.tracker, &error);
        // Cancel in-flight units first: their streams stop and their file
        // handles close before the files are removed.
        drop(units);
        let mut files = self.collector.disk_paths();
        files.extend(self.in_flight.drain());
        self.cleanup.unwind(files, source).await;
        error
    }
}

fn scalar_spec(spec: &FieldSpec) -> Option<(&FieldSpec, &Option<Converter>)> {
    match &spec.kind {
        FieldKind::Scalar { converter } => Some((spec, converter)),
        FieldKind::File { .. } => None,
    }
}

fn file_spec(spec: &FieldSpec) -> Option<(&FieldSpec, &SinkKind, &Option<SizeLimit>)> {
    match &spec.kind {
        FieldKind::File { sink, max_size } => Some((spec, sink, max_size)),
        FieldKind::Scalar { .. } => None,
    }
}

fn drain(key: String, part: FilePart) -> BoxFuture<'static, UnitOutcome> {
    async move {
        let mut stream = part.into_stream();
        while let Some(chunk) = stream.next().await {
            if chunk.is_err() {
                break;
            }
        }
        UnitOutcome::Drained { key }
    }
    .boxed()
}
