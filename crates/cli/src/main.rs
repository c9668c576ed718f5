use std::process::ExitCode;

fn main() -> ExitCode {
    careline_cli::run()
}
