use std::process::ExitCode;

fn main() -> ExitCode {
    match gitsim::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            gitsim::ui::output::error(format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}
