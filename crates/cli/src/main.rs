use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    shopmate_cli::run().await
}
