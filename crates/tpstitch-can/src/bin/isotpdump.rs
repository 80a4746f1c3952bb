use std::io::{BufWriter, IsTerminal, Write};
use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, ValueEnum};
use tpstitch_can::{CanMessage, TranscriptParser, reassemble};
use tpstitch_utils::logging::init_tracing;
use tpstitch_utils::stdio::{get_input_reader, get_output_writer};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// One `ID: DATA` line per message
    #[default]
    Text,
    /// CSV with an `id,len,data` header
    Csv,
}

/// Reassemble ISO-TP (ISO 15765-2) messages from a hex transcript of CAN frames
///
/// Each input line holds one frame: a 3 hex digit identifier followed by up to 8 hex data bytes.
/// Whitespace within a line is ignored.
///
///     $ printf '7E803123456\n1FF1008112233445566\n1FF21778899\n' | isotpdump
///     7E8: 123456
///     1FF: 1122334455667788
///
/// Malformed lines and protocol violations are logged to stderr and skipped.
#[derive(Debug, Parser)]
#[clap(version, verbatim_doc_comment)]
struct Args {
    #[clap(short, long, default_value_t = tracing::Level::INFO)]
    log_level: tracing::Level,

    /// Output format for reassembled messages
    #[clap(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Path to the input transcript. stdin if '-' or if not passed
    input: Option<PathBuf>,

    /// Path to the output. stdout if '-' or if not passed
    output: Option<PathBuf>,
}

enum MessageWriter {
    Text(BufWriter<Box<dyn Write>>),
    Csv(csv::Writer<Box<dyn Write>>),
}

impl MessageWriter {
    fn new(format: OutputFormat, output: Box<dyn Write>) -> Self {
        match format {
            OutputFormat::Text => MessageWriter::Text(BufWriter::new(output)),
            OutputFormat::Csv => MessageWriter::Csv(csv::Writer::from_writer(output)),
        }
    }

    fn write(&mut self, msg: &CanMessage) -> eyre::Result<()> {
        match self {
            MessageWriter::Text(writer) => msg.write(writer)?,
            MessageWriter::Csv(writer) => writer.serialize(msg)?,
        }
        Ok(())
    }

    fn flush(&mut self) -> eyre::Result<()> {
        match self {
            MessageWriter::Text(writer) => writer.flush()?,
            MessageWriter::Csv(writer) => writer.flush()?,
        }
        Ok(())
    }
}

fn main() -> eyre::Result<()> {
    if std::io::stderr().is_terminal() {
        color_eyre::install()?;
    }

    let args = Args::parse();
    init_tracing(args.log_level);

    let input = get_input_reader(args.input.as_deref())?;
    let output = get_output_writer(args.output.as_deref())?;
    let mut writer = MessageWriter::new(args.format, output);

    let start = Instant::now();
    let mut frames = 0usize;
    let mut messages = 0usize;
    let mut errors = 0usize;
    let mut malformed = 0usize;

    let raw_frames = TranscriptParser::new(input).filter_map(|f| {
        f.inspect(|_| frames += 1)
            .inspect_err(|e| {
                malformed += 1;
                tracing::error!("{e:#}");
            })
            .ok()
    });
    for msg in reassemble(raw_frames) {
        match msg {
            Ok(msg) => {
                messages += 1;
                writer.write(&msg)?;
            }
            Err(e) => {
                errors += 1;
                tracing::error!("{e}");
            }
        }
    }
    writer.flush()?;

    tracing::info!(
        "Reassembled {messages} messages from {frames} frames ({malformed} malformed lines, {errors} protocol errors) in {:?}",
        start.elapsed()
    );

    Ok(())
}
