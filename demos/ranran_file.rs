//! File-in/file-out demo for the codec.
//!
//! `cargo run --example ranran_file -- compress input.txt` writes
//! `input.txt.ranran`; `-- decompress input.txt.ranran` writes the original
//! back next to it.

use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use ranran::{COMPRESSED_EXTENSION, CodecOptions, compress, count_scalars, decompress};

fn help_text() -> String {
    "usage: cargo run --example ranran_file -- <compress|decompress> <path> [--chunks <N>]"
        .to_string()
}

struct DemoConfig {
    mode: String,
    path: PathBuf,
    chunk_count: usize,
}

impl DemoConfig {
    fn from_args() -> Result<Self, String> {
        let mut args = env::args().skip(1);

        let mode = args.next().ok_or_else(help_text)?;
        if mode == "--help" || mode == "-h" {
            return Err(help_text());
        }
        if mode != "compress" && mode != "decompress" {
            return Err(format!("unknown mode: {mode}\n{}", help_text()));
        }

        let path = PathBuf::from(args.next().ok_or_else(help_text)?);
        let mut chunk_count = CodecOptions::default().chunk_count;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--chunks" => {
                    let value = args.next().ok_or("missing value for --chunks")?;
                    chunk_count = value
                        .parse::<usize>()
                        .map_err(|_| "invalid --chunks".to_string())?;
                }
                _ => return Err(format!("unknown argument: {arg}\n{}", help_text())),
            }
        }

        Ok(Self {
            mode,
            path,
            chunk_count,
        })
    }
}

fn main() {
    let cfg = match DemoConfig::from_args() {
        Ok(value) => value,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    let options = CodecOptions {
        chunk_count: cfg.chunk_count,
    };
    let data = match fs::read(&cfg.path) {
        Ok(value) => value,
        Err(err) => {
            eprintln!("cannot read {}: {err}", cfg.path.display());
            std::process::exit(1);
        }
    };

    let started = Instant::now();
    let result = if cfg.mode == "compress" {
        run_compress(&cfg.path, &data, &options)
    } else {
        run_decompress(&cfg.path, &data, &options)
    };
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

    match result {
        Ok(summary) => println!("{summary} elapsed_ms={elapsed_ms:.2}"),
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}

fn run_compress(
    path: &PathBuf,
    data: &[u8],
    options: &CodecOptions,
) -> Result<String, String> {
    let text = std::str::from_utf8(data).map_err(|err| format!("input is not utf-8: {err}"))?;
    let freq = count_scalars(text);

    let compressed =
        compress(data, &freq, options).map_err(|err| format!("compress failed: {err}"))?;

    let mut out_path = path.clone().into_os_string();
    out_path.push(".");
    out_path.push(COMPRESSED_EXTENSION);
    let out_path = PathBuf::from(out_path);
    fs::write(&out_path, &compressed.bytes)
        .map_err(|err| format!("cannot write {}: {err}", out_path.display()))?;

    let ratio = if data.is_empty() {
        0.0
    } else {
        compressed.bytes.len() as f64 / data.len() as f64
    };
    Ok(format!(
        "wrote {} in_bytes={} out_bytes={} ratio={ratio:.4} segments={} symbols={}",
        out_path.display(),
        data.len(),
        compressed.bytes.len(),
        compressed.stats.segment_count,
        compressed.stats.distinct_symbols,
    ))
}

fn run_decompress(
    path: &PathBuf,
    data: &[u8],
    options: &CodecOptions,
) -> Result<String, String> {
    let restored = decompress(data, options).map_err(|err| format!("decompress failed: {err}"))?;

    let out_path = if path.extension().is_some_and(|ext| ext == COMPRESSED_EXTENSION) {
        path.with_extension("")
    } else {
        let mut with_suffix = path.clone().into_os_string();
        with_suffix.push(".out");
        PathBuf::from(with_suffix)
    };
    fs::write(&out_path, &restored.bytes)
        .map_err(|err| format!("cannot write {}: {err}", out_path.display()))?;

    Ok(format!(
        "wrote {} in_bytes={} out_bytes={} segments={}",
        out_path.display(),
        data.len(),
        restored.bytes.len(),
        restored.stats.segment_count,
    ))
}
