//! Lossless Huffman codec over Unicode scalar values with a self-describing
//! binary container and parallel chunked body coding.
//!
//! The container is `header_len (u16 LE) · header · [segment…]`: the header
//! carries the codebook as flat 9-byte leaf records, and each segment frame
//! (`pad_zeros (u8) · byte_length (u32 LE) · bytes`) decodes independently
//! because its final byte is padded out to a codebook boundary.
//!
//! ```
//! use ranran::{CodecOptions, compress, count_scalars, decompress};
//!
//! let text = "this is a test for compression";
//! let freq = count_scalars(text);
//! let options = CodecOptions::default();
//!
//! let compressed = compress(text.as_bytes(), &freq, &options)?;
//! let restored = decompress(&compressed.bytes, &options)?;
//! assert_eq!(restored.bytes, text.as_bytes());
//! # Ok::<(), ranran::CodecError>(())
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use thiserror::Error;

pub mod body;
pub mod codebook;
pub mod freq;
pub mod header;

mod frame;

pub use body::{Segment, decode_segment, encode_segment};
pub use codebook::{CodeEntry, Node, PrefixTable, Symbol, build_codebook};
pub use freq::{
    FrequencyTable, count_scalars, frequency_table_from_json, frequency_table_to_json,
};

/// Suffix the surrounding platform gives compressed blobs. The codec itself
/// never inspects file names.
pub const COMPRESSED_EXTENSION: &str = "ranran";

#[derive(Debug, Clone)]
pub struct CodecOptions {
    /// Number of chunks the scalar stream is split into on encode, and the
    /// worker pool cap in both directions. The container format does not
    /// record it; decode takes the segment count from the frames.
    pub chunk_count: usize,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self { chunk_count: 3 }
    }
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("frequency table has no symbols")]
    EmptyAlphabet,
    #[error("scalar U+{0:04X} is missing from the prefix table")]
    UnknownSymbol(u32),
    #[error("huffman code deeper than 32 bits")]
    CodeTooLong,
    #[error("malformed header: {0}")]
    MalformedHeader(&'static str),
    #[error("malformed segment: {0}")]
    MalformedSegment(&'static str),
    #[error("invalid code: {0}")]
    InvalidCode(&'static str),
    #[error("truncated segment: {0}")]
    TruncatedSegment(&'static str),
    #[error("truncated file: {0}")]
    TruncatedFile(&'static str),
    #[error("alphabet needs a {0}-byte header, the length field caps it at 65535")]
    AlphabetTooLarge(usize),
    #[error("segment body exceeds the 4 GiB frame limit")]
    SegmentTooLarge,
    #[error("invalid options: {0}")]
    InvalidOptions(&'static str),
    #[error("invalid frequency table: {0}")]
    InvalidFrequencyTable(&'static str),
    #[error("frequency table is not valid json: {0}")]
    FrequencyTableJson(#[from] serde_json::Error),
    #[error("input is not valid utf-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
    #[error("operation cancelled")]
    Cancelled,
    #[error("internal error: {0}")]
    Internal(&'static str),
}

/// Shared cancel signal. Encode workers poll it between symbols, decode
/// workers between bytes; a cancelled run discards all partial output.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CodecStats {
    pub segment_count: usize,
    pub header_bytes: usize,
    pub body_bytes: usize,
    pub distinct_symbols: usize,
}

#[derive(Debug, Clone)]
pub struct CompressedFile {
    pub bytes: Vec<u8>,
    pub stats: CodecStats,
}

#[derive(Debug, Clone)]
pub struct DecompressedFile {
    pub bytes: Vec<u8>,
    pub stats: CodecStats,
}

struct EncodeTask {
    index: usize,
    scalars: Vec<char>,
}

struct DecodeTask {
    index: usize,
    segment: Segment,
}

pub fn compress(
    input: &[u8],
    freq: &FrequencyTable,
    options: &CodecOptions,
) -> Result<CompressedFile, CodecError> {
    compress_with_cancel(input, freq, options, &CancelFlag::new())
}

pub fn compress_with_cancel(
    input: &[u8],
    freq: &FrequencyTable,
    options: &CodecOptions,
    cancel: &CancelFlag,
) -> Result<CompressedFile, CodecError> {
    validate_options(options)?;

    if input.is_empty() {
        return Ok(CompressedFile {
            bytes: Vec::new(),
            stats: CodecStats::default(),
        });
    }

    let text = std::str::from_utf8(input)?;
    let (tree, table) = codebook::build_codebook(freq)?;
    let header = header::serialize_tree(&tree);

    let scalars: Vec<char> = text.chars().collect();
    let tasks = split_scalars(&scalars, options.chunk_count);
    let segment_count = tasks.len();

    let table = Arc::new(table);
    let queue = Arc::new(Mutex::new(VecDeque::from(tasks)));
    let results = Arc::new(Mutex::new(vec![None::<Segment>; segment_count]));
    let error = Arc::new(Mutex::new(None::<CodecError>));

    let mut handles = Vec::new();
    for _ in 0..worker_count(segment_count, options) {
        let queue_ref = Arc::clone(&queue);
        let results_ref = Arc::clone(&results);
        let error_ref = Arc::clone(&error);
        let table_ref = Arc::clone(&table);
        let cancel_ref = cancel.clone();

        handles.push(std::thread::spawn(move || {
            encode_worker(queue_ref, results_ref, error_ref, table_ref, cancel_ref)
        }));
    }

    for handle in handles {
        let _ = handle.join();
    }

    if let Some(err) = lock(&error)?.take() {
        return Err(err);
    }

    let mut segments = Vec::with_capacity(segment_count);
    for slot in lock(&results)?.drain(..) {
        segments.push(slot.ok_or(CodecError::Internal("missing encoded segment"))?);
    }

    let body_bytes = segments.iter().map(|segment| segment.bytes.len()).sum();
    let bytes = frame::encode_container(&header, &segments)?;

    Ok(CompressedFile {
        bytes,
        stats: CodecStats {
            segment_count,
            header_bytes: header.len(),
            body_bytes,
            distinct_symbols: table.len(),
        },
    })
}

pub fn decompress(
    container: &[u8],
    options: &CodecOptions,
) -> Result<DecompressedFile, CodecError> {
    decompress_with_cancel(container, options, &CancelFlag::new())
}

pub fn decompress_with_cancel(
    container: &[u8],
    options: &CodecOptions,
    cancel: &CancelFlag,
) -> Result<DecompressedFile, CodecError> {
    validate_options(options)?;

    if container.is_empty() {
        return Ok(DecompressedFile {
            bytes: Vec::new(),
            stats: CodecStats::default(),
        });
    }

    let (header, segments) = frame::decode_container(container)?;
    let header_bytes = header.len();
    let distinct_symbols = header_bytes / header::LEAF_RECORD_LEN;

    // A header-only container is the compressed form of the empty stream.
    if segments.is_empty() {
        return Ok(DecompressedFile {
            bytes: Vec::new(),
            stats: CodecStats {
                segment_count: 0,
                header_bytes,
                body_bytes: 0,
                distinct_symbols,
            },
        });
    }

    let tree = Arc::new(header::parse_tree(&header)?);
    let segment_count = segments.len();
    let body_bytes: usize = segments.iter().map(|segment| segment.bytes.len()).sum();

    let tasks: VecDeque<DecodeTask> = segments
        .into_iter()
        .enumerate()
        .map(|(index, segment)| DecodeTask { index, segment })
        .collect();
    let queue = Arc::new(Mutex::new(tasks));
    let results = Arc::new(Mutex::new(vec![None::<String>; segment_count]));
    let error = Arc::new(Mutex::new(None::<CodecError>));

    let mut handles = Vec::new();
    for _ in 0..worker_count(segment_count, options) {
        let queue_ref = Arc::clone(&queue);
        let results_ref = Arc::clone(&results);
        let error_ref = Arc::clone(&error);
        let tree_ref = Arc::clone(&tree);
        let cancel_ref = cancel.clone();

        handles.push(std::thread::spawn(move || {
            decode_worker(queue_ref, results_ref, error_ref, tree_ref, cancel_ref)
        }));
    }

    for handle in handles {
        let _ = handle.join();
    }

    if let Some(err) = lock(&error)?.take() {
        return Err(err);
    }

    let mut text = String::new();
    for slot in lock(&results)?.drain(..) {
        text.push_str(&slot.ok_or(CodecError::Internal("missing decoded segment"))?);
    }

    Ok(DecompressedFile {
        bytes: text.into_bytes(),
        stats: CodecStats {
            segment_count,
            header_bytes,
            body_bytes,
            distinct_symbols,
        },
    })
}

fn encode_worker(
    queue: Arc<Mutex<VecDeque<EncodeTask>>>,
    results: Arc<Mutex<Vec<Option<Segment>>>>,
    error: Arc<Mutex<Option<CodecError>>>,
    table: Arc<PrefixTable>,
    cancel: CancelFlag,
) {
    loop {
        if has_error(&error) {
            break;
        }

        let task = {
            let mut guard = match lock(&queue) {
                Ok(value) => value,
                Err(err) => {
                    set_error(&error, err);
                    break;
                }
            };
            guard.pop_front()
        };
        let Some(task) = task else { break };

        match body::encode_segment(&table, &task.scalars, &cancel) {
            Ok(segment) => {
                if let Err(err) = store_result(&results, task.index, segment) {
                    set_error(&error, err);
                    break;
                }
            }
            Err(err) => {
                set_error(&error, err);
                break;
            }
        }
    }
}

fn decode_worker(
    queue: Arc<Mutex<VecDeque<DecodeTask>>>,
    results: Arc<Mutex<Vec<Option<String>>>>,
    error: Arc<Mutex<Option<CodecError>>>,
    tree: Arc<Node>,
    cancel: CancelFlag,
) {
    loop {
        if has_error(&error) {
            break;
        }

        let task = {
            let mut guard = match lock(&queue) {
                Ok(value) => value,
                Err(err) => {
                    set_error(&error, err);
                    break;
                }
            };
            guard.pop_front()
        };
        let Some(task) = task else { break };

        match body::decode_segment(&tree, &task.segment.bytes, task.segment.pad_zeros, &cancel) {
            Ok(decoded) => {
                if let Err(err) = store_result(&results, task.index, decoded) {
                    set_error(&error, err);
                    break;
                }
            }
            Err(err) => {
                set_error(&error, err);
                break;
            }
        }
    }
}

fn split_scalars(scalars: &[char], chunk_count: usize) -> Vec<EncodeTask> {
    let chunk_size = scalars.len().div_ceil(chunk_count).max(1);
    scalars
        .chunks(chunk_size)
        .enumerate()
        .map(|(index, piece)| EncodeTask {
            index,
            scalars: piece.to_vec(),
        })
        .collect()
}

// Workers write only to their own index, so the pool needs no more hands
// than there are tasks.
fn worker_count(task_count: usize, options: &CodecOptions) -> usize {
    task_count.min(options.chunk_count).max(1)
}

fn validate_options(options: &CodecOptions) -> Result<(), CodecError> {
    if options.chunk_count == 0 {
        return Err(CodecError::InvalidOptions(
            "chunk_count must be greater than 0",
        ));
    }
    Ok(())
}

fn store_result<T>(
    results: &Mutex<Vec<Option<T>>>,
    index: usize,
    value: T,
) -> Result<(), CodecError> {
    let mut guard = lock(results)?;
    let slot = guard
        .get_mut(index)
        .ok_or(CodecError::Internal("result index out of range"))?;
    *slot = Some(value);
    Ok(())
}

fn lock<'a, T>(mutex: &'a Mutex<T>) -> Result<MutexGuard<'a, T>, CodecError> {
    mutex.lock().map_err(|_| CodecError::Internal("codec mutex poisoned"))
}

fn has_error(error: &Mutex<Option<CodecError>>) -> bool {
    error.lock().map(|guard| guard.is_some()).unwrap_or(true)
}

fn set_error(error: &Mutex<Option<CodecError>>, value: CodecError) {
    if let Ok(mut guard) = error.lock()
        && guard.is_none()
    {
        *guard = Some(value);
    }
}
