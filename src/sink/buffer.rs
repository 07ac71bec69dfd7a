//! In-memory buffer sink.

use futures::StreamExt;

use super::SizeCounter;
use crate::error::FormError;
use crate::schema::SizeLimit;
use crate::source::ByteStream;
use crate::value::{CollectedValue, Converter, TextEncoding, Value};

/// Collects a file part in memory.
///
/// On end the bytes are decoded with the optional encoding, then passed
/// through the optional converter.
#[derive(Debug)]
pub struct BufferSink {
    counter: SizeCounter,
    chunks: Vec<Vec<u8>>,
    encoding: Option<TextEncoding>,
    converter: Option<Converter>,
}

impl BufferSink {
    pub fn new(
        key: &str,
        limit: Option<SizeLimit>,
        encoding: Option<TextEncoding>,
        converter: Option<Converter>,
    ) -> Self {
        Self {
            counter: SizeCounter::new(key, limit),
            chunks: Vec::new(),
            encoding,
            converter,
        }
    }

    pub async fn consume(mut self, mut stream: ByteStream) -> Result<CollectedValue, FormError> {
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| FormError::sink_io(self.counter.key(), e))?;
            self.counter.add(chunk.len())?;
            self.chunks.push(chunk);
        }

        let size = self.counter.size();
        let data = self.chunks.concat();
        let value = materialize(data, self.encoding, self.converter.as_ref()).map_err(|detail| {
            FormError::ValidationFailed {
                key: self.counter.key().to_string(),
                detail,
            }
        })?;
        Ok(CollectedValue::BufferedFile { data: value, size })
    }
}

/// Turn the concatenated bytes into the value handed to the rules.
pub(crate) fn materialize(
    data: Vec<u8>,
    encoding: Option<TextEncoding>,
    converter: Option<&Converter>,
) -> Result<Value, String> {
    let value = match encoding {
        Some(encoding) => Value::Text(encoding.decode(&data)),
        None => Value::Bytes(data),
    };
    match converter {
        Some(converter) => converter.apply(value),
        None => Ok(value),
    }
}
