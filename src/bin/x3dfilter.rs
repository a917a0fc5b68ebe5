use std::process::ExitCode;
use x3d_filter::{driver, FilterRegistry, Options};

fn usage() -> String {
    let filters: Vec<_> = FilterRegistry::standard().names().collect();
    format!(
        "usage: x3dfilter filter... input output [flags]\n\
         input: .x3d or .dae, output: .x3dv or .wrl\n\
         filters: {}\n\
         flags: -loglevel LEVEL -exportVersion 3.x -outputType ascii|binary \
         -binaryCompressionMethod M -quantizeParam Q -minimumSize N -maxRunTime MINUTES \
         -parsingStrictness STRICT|TOLERANT -nonWeb3DFileStyles UNCOLORED,MATRIX_TRANSFORM",
        filters.join(" ")
    )
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let opts = match Options::parse(&args) {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("{}\n{}", e, usage());
            return e.exit_code().into();
        }
    };
    // RUST_LOG still wins over -loglevel
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(opts.log_level.as_str()),
    )
    .init();
    match driver::run(&opts) {
        Ok(()) => x3d_filter::ExitCode::Success.into(),
        Err(e) => {
            log::error!("{}", e);
            e.exit_code().into()
        }
    }
}
