use std::process::ExitCode;

fn main() -> ExitCode {
    ecomarket_cli::run()
}
