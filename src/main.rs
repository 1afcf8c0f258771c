use bamboozler::errors::AppError;
use mimalloc::MiMalloc;
use std::process::ExitCode;
use tracing::error;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> ExitCode {
    bamboozler::init_tracing();
    match bamboozler::cli::parse_from_env().and_then(bamboozler::run_from_args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(AppError::HelpRequested { text }) => {
            print!("{text}");
            ExitCode::SUCCESS
        }
        Err(AppError::MissingSubcommand { usage }) => {
            eprint!("{usage}");
            ExitCode::from(1)
        }
        Err(error) => {
            error!("{error}");
            ExitCode::from(1)
        }
    }
}
