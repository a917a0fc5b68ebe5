//! The batch driver behind the `x3dfilter` binary: argument parsing, importer and writer
//! selection, the run time limit and the mapping of failures to exit codes.
//!
//! The command line is `filter… input output [flags]`. The flags below are read by the driver,
//! every other flag (with its values) is handed to the `set_arguments` of every filter.
//!
//! | flag | value |
//! |---|---|
//! | `-loglevel` | `off`, `error`, `warn`, `info`, `debug`, `trace` or `all` |
//! | `-exportVersion` | `3.0` to `3.3` |
//! | `-outputType` | `ascii` or `binary` |
//! | `-binaryCompressionMethod` | `SMALLEST`, `FASTEST`, `LOSSLESS` or `STRINGS` |
//! | `-quantizeParam` | a positive number |
//! | `-minimumSize` | a count |
//! | `-maxRunTime` | minutes |
//! | `-parsingStrictness` | `STRICT` or `TOLERANT` |
//! | `-nonWeb3DFileStyles` | comma separated [`StyleHints`] |

use crate::*;
use std::{
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
    sync::mpsc,
    thread::JoinHandle,
    time::Duration,
};

/// The process exit codes of the driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ExitCode {
    /// The conversion finished.
    Success = 0,
    /// The command line could not be understood.
    InvalidArguments = 1,
    /// A filter name is not registered.
    InvalidFilterSpecified = 2,
    /// The input document is malformed.
    InvalidInputFile = 3,
    /// The output could not be created or written.
    CannotWriteOutputFile = 4,
    /// The input or output encoding is not supported.
    UnsupportedFormat = 5,
    /// Reading failed.
    IoException = 6,
    /// The process ran out of memory.
    OutOfMemory = 7,
    /// An internal failure.
    ExceptionalError = 8,
    /// Some geometry could not be converted.
    NotAllGeometryConvertible = 9,
    /// The run time limit given by `-maxRunTime` was reached.
    MaxRunTimeExceeded = 10,
}

impl ExitCode {
    /// The numeric code.
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(c: ExitCode) -> Self {
        std::process::ExitCode::from(c as u8)
    }
}

const EXPORT_VERSIONS: [&str; 4] = ["3.0", "3.1", "3.2", "3.3"];
const COMPRESSION_METHODS: [&str; 4] = ["SMALLEST", "FASTEST", "LOSSLESS", "STRINGS"];

/// The encodings the driver can write.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputType {
    /// Text output, here the classic encoding.
    #[default]
    Ascii,
    /// The compressed binary encoding.
    Binary,
}

impl FromStr for OutputType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match &*s.to_ascii_lowercase() {
            "ascii" => Ok(Self::Ascii),
            "binary" => Ok(Self::Binary),
            _ => Err(Error::InvalidArgument(format!("unknown output type '{}'", s))),
        }
    }
}

/// A parsed command line.
#[derive(Clone, Debug, PartialEq)]
pub struct Options {
    /// The filter names, in chain order.
    pub filters: Vec<String>,
    /// The input file.
    pub input: PathBuf,
    /// The output file.
    pub output: PathBuf,
    /// The maximum level of log messages.
    pub log_level: log::LevelFilter,
    /// The X3D version to write in the output header, instead of the version of the input.
    pub export_version: Option<String>,
    /// The requested output encoding.
    pub output_type: OutputType,
    /// Binary encoding settings. They are checked but have no effect on text output.
    pub compression_method: Option<String>,
    /// See [`Options::compression_method`].
    pub quantize_param: Option<f32>,
    /// See [`Options::compression_method`].
    pub minimum_size: Option<usize>,
    /// The run time limit.
    pub max_run_time: Option<Duration>,
    /// How importers treat input they cannot represent.
    pub strictness: Strictness,
    /// Conversion hints for COLLADA input.
    pub hints: StyleHints,
    /// The flags handed to the filters.
    pub filter_args: Vec<String>,
}

fn expect_value<'a>(flag: &str, it: &mut impl Iterator<Item = &'a String>) -> Result<&'a str> {
    it.next()
        .map(|s| &**s)
        .ok_or_else(|| Error::InvalidArgument(format!("{} expects a value", flag)))
}

fn parse_number<T: FromStr>(flag: &str, s: &str) -> Result<T> {
    s.parse()
        .map_err(|_| Error::InvalidArgument(format!("{}: '{}' is not a number", flag, s)))
}

fn parse_log_level(s: &str) -> Result<log::LevelFilter> {
    if s.eq_ignore_ascii_case("all") {
        return Ok(log::LevelFilter::Trace);
    }
    s.parse()
        .map_err(|_| Error::InvalidArgument(format!("unknown log level '{}'", s)))
}

impl Options {
    /// Parse the arguments following the program name.
    pub fn parse(args: &[String]) -> Result<Self> {
        let split = args
            .iter()
            .position(|a| a.starts_with('-'))
            .unwrap_or(args.len());
        let (positional, flags) = args.split_at(split);
        let [filters @ .., input, output] = positional else {
            return Err(Error::InvalidArgument(
                "expected filter names followed by the input and output files".into(),
            ));
        };
        let mut opts = Options {
            filters: filters.to_vec(),
            input: input.into(),
            output: output.into(),
            log_level: log::LevelFilter::Warn,
            export_version: None,
            output_type: OutputType::default(),
            compression_method: None,
            quantize_param: None,
            minimum_size: None,
            max_run_time: None,
            strictness: Strictness::default(),
            hints: StyleHints::default(),
            filter_args: vec![],
        };
        let mut it = flags.iter();
        while let Some(flag) = it.next() {
            match &**flag {
                "-loglevel" => opts.log_level = parse_log_level(expect_value(flag, &mut it)?)?,
                "-exportVersion" => {
                    let v = expect_value(flag, &mut it)?;
                    if !EXPORT_VERSIONS.contains(&v) {
                        return Err(Error::InvalidArgument(format!(
                            "cannot export version {}",
                            v
                        )));
                    }
                    opts.export_version = Some(v.into())
                }
                "-outputType" => opts.output_type = expect_value(flag, &mut it)?.parse()?,
                "-binaryCompressionMethod" => {
                    let v = expect_value(flag, &mut it)?.to_ascii_uppercase();
                    if !COMPRESSION_METHODS.contains(&&*v) {
                        return Err(Error::InvalidArgument(format!(
                            "unknown compression method '{}'",
                            v
                        )));
                    }
                    opts.compression_method = Some(v)
                }
                "-quantizeParam" => {
                    let q: f32 = parse_number(flag, expect_value(flag, &mut it)?)?;
                    if q.is_nan() || q <= 0. {
                        return Err(Error::InvalidArgument(format!(
                            "{} must be positive",
                            flag
                        )));
                    }
                    opts.quantize_param = Some(q)
                }
                "-minimumSize" => {
                    opts.minimum_size = Some(parse_number(flag, expect_value(flag, &mut it)?)?)
                }
                "-maxRunTime" => {
                    let minutes: f64 = parse_number(flag, expect_value(flag, &mut it)?)?;
                    let secs = minutes * 60.;
                    if !secs.is_finite() || secs <= 0. {
                        return Err(Error::InvalidArgument(format!(
                            "{} must be a positive number of minutes",
                            flag
                        )));
                    }
                    opts.max_run_time = Some(Duration::from_secs_f64(secs))
                }
                "-parsingStrictness" => {
                    opts.strictness = expect_value(flag, &mut it)?.parse()?
                }
                "-nonWeb3DFileStyles" => opts.hints = expect_value(flag, &mut it)?.parse()?,
                _ => opts.filter_args.push(flag.clone()),
            }
        }
        Ok(opts)
    }
}

/// The input encodings, by file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputFormat {
    /// X3D XML (`.x3d`).
    X3d,
    /// COLLADA (`.dae`).
    Collada,
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase()
}

impl InputFormat {
    /// The format of `path`.
    pub fn of(path: &Path) -> Result<Self> {
        match &*extension(path) {
            "x3d" => Ok(Self::X3d),
            "dae" => Ok(Self::Collada),
            _ => Err(Error::UnsupportedFormat(format!(
                "cannot read {}",
                path.display()
            ))),
        }
    }
}

fn check_output(path: &Path, output_type: OutputType) -> Result<()> {
    match (&*extension(path), output_type) {
        ("x3dv" | "wrl", OutputType::Ascii) => Ok(()),
        (_, OutputType::Binary) => Err(Error::UnsupportedFormat(
            "binary output is not supported".into(),
        )),
        _ => Err(Error::UnsupportedFormat(format!(
            "cannot write {}",
            path.display()
        ))),
    }
}

/// Ends the process with [`ExitCode::MaxRunTimeExceeded`] if it is still alive when the time
/// budget runs out. Dropping the watchdog stops it.
#[derive(Debug)]
pub struct Watchdog {
    stop: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl Watchdog {
    /// Start a watchdog thread for `budget`.
    pub fn start(budget: Duration) -> Result<Self> {
        let (stop, rx) = mpsc::channel::<()>();
        let thread = std::thread::Builder::new()
            .name("watchdog".into())
            .spawn(move || {
                if let Err(mpsc::RecvTimeoutError::Timeout) = rx.recv_timeout(budget) {
                    log::error!("maximum run time of {:?} exceeded", budget);
                    std::process::exit(ExitCode::MaxRunTimeExceeded.code());
                }
            })?;
        Ok(Self {
            stop: Some(stop),
            thread: Some(thread),
        })
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        // closing the channel wakes the thread
        drop(self.stop.take());
        if let Some(t) = self.thread.take() {
            let _ = t.join();
        }
    }
}

/// Run one conversion.
///
/// The filters are created and configured before any file is touched, so bad filter names or
/// arguments never leave a partial output behind.
pub fn run(opts: &Options) -> Result<()> {
    let registry = FilterRegistry::standard();
    let mut filters = opts
        .filters
        .iter()
        .map(|name| registry.create(name))
        .collect::<Result<Vec<_>>>()?;
    for f in &mut filters {
        f.set_arguments(&opts.filter_args)?;
    }
    let format = InputFormat::of(&opts.input)?;
    check_output(&opts.output, opts.output_type)?;
    if opts.compression_method.is_some()
        || opts.quantize_param.is_some()
        || opts.minimum_size.is_some()
    {
        log::info!("binary encoding settings have no effect on text output");
    }
    if !opts.input.is_file() {
        return Err(format!("cannot read input file {}", opts.input.display()).into());
    }

    let _watchdog = opts.max_run_time.map(Watchdog::start).transpose()?;
    log::info!(
        "{} -> {} through [{}]",
        opts.input.display(),
        opts.output.display(),
        opts.filters.join(", ")
    );
    let out = BufWriter::new(File::create(&opts.output).map_err(Error::Output)?);
    let writer = ClassicWriter::new(out).with_version(opts.export_version.clone());
    let mut head = FilterChain::build(filters, Box::new(writer));
    match format {
        InputFormat::X3d => X3dImporter::new(opts.strictness).import_file(&opts.input, &mut *head),
        InputFormat::Collada => ColladaImporter::new(opts.strictness, opts.hints)
            .import_file(&opts.input, &mut *head),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::tests::args;

    #[test]
    fn flags_are_split_between_driver_and_filters() {
        let opts = Options::parse(&args(
            "Appearance TriangleToIFS in.dae out.x3dv -loglevel debug -diffuse 1 0 0 \
             -parsingStrictness STRICT -nonWeb3DFileStyles UNCOLORED -appAndMat -maxRunTime 0.5",
        ))
        .unwrap();
        assert_eq!(opts.filters, ["Appearance", "TriangleToIFS"]);
        assert_eq!(opts.input, Path::new("in.dae"));
        assert_eq!(opts.output, Path::new("out.x3dv"));
        assert_eq!(opts.log_level, log::LevelFilter::Debug);
        assert_eq!(opts.strictness, Strictness::Strict);
        assert!(opts.hints.uncolored);
        assert_eq!(opts.max_run_time, Some(Duration::from_secs(30)));
        assert_eq!(opts.filter_args, args("-diffuse 1 0 0 -appAndMat"));
    }

    #[test]
    fn bad_command_lines() {
        for line in [
            "out.x3dv",
            "in.x3d out.x3dv -loglevel",
            "in.x3d out.x3dv -loglevel chatty",
            "in.x3d out.x3dv -exportVersion 4.0",
            "in.x3d out.x3dv -maxRunTime soon",
            "in.x3d out.x3dv -maxRunTime -1",
            "in.x3d out.x3dv -quantizeParam 0",
            "in.x3d out.x3dv -parsingStrictness sloppy",
        ] {
            let err = Options::parse(&args(line)).unwrap_err();
            assert_eq!(err.exit_code(), ExitCode::InvalidArguments, "{}", line);
        }
        let opts = Options::parse(&args("in.x3d out.x3dv -loglevel ALL")).unwrap();
        assert!(opts.filters.is_empty());
        assert_eq!(opts.log_level, log::LevelFilter::Trace);
    }

    #[test]
    fn formats_follow_extensions() {
        assert_eq!(InputFormat::of(Path::new("a.X3D")).unwrap(), InputFormat::X3d);
        assert_eq!(InputFormat::of(Path::new("a.dae")).unwrap(), InputFormat::Collada);
        assert!(InputFormat::of(Path::new("a.obj")).is_err());
        assert!(check_output(Path::new("a.wrl"), OutputType::Ascii).is_ok());
        assert!(check_output(Path::new("a.x3db"), OutputType::Ascii).is_err());
        assert_eq!(
            check_output(Path::new("a.x3dv"), OutputType::Binary)
                .unwrap_err()
                .exit_code(),
            ExitCode::UnsupportedFormat
        );
    }

    #[test]
    fn filters_are_checked_before_io() {
        let opts = Options::parse(&args("Frobnicate missing.x3d out.x3dv")).unwrap();
        assert_eq!(run(&opts).unwrap_err().exit_code(), ExitCode::InvalidFilterSpecified);
        let opts = Options::parse(&args("Appearance missing.x3d out.x3dv -diffuse 1")).unwrap();
        assert_eq!(run(&opts).unwrap_err().exit_code(), ExitCode::InvalidArguments);
        let opts = Options::parse(&args("Identity missing.x3d out.x3dv")).unwrap();
        assert_eq!(run(&opts).unwrap_err().exit_code(), ExitCode::InvalidInputFile);
        assert!(!Path::new("out.x3dv").exists());
    }

    #[test]
    fn watchdog_stops_on_drop() {
        let dog = Watchdog::start(Duration::from_secs(3600)).unwrap();
        drop(dog);
    }
}
