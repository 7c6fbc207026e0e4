use std::process::ExitCode;

fn main() -> ExitCode {
    // A missing .env file is normal; real environment variables still apply.
    let _ = dotenvy::dotenv();
    slotkeeper_cli::run()
}
