use std::process::ExitCode;

fn main() -> ExitCode {
    campusmart_cli::run()
}
